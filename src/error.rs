use crate::config::ConfigError;
use crate::notify::NotificationError;
use thiserror::Error;

/// Failure talking to the remote sonar service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response code: {0}")]
    Status(u16),
}

/// The remote answered 200 but the body is not a distance.
#[derive(Debug, Error)]
#[error("malformed distance reading: {body:?}")]
pub struct ParseError {
    pub body: String,
}

/// The chart service URL could not be assembled.
#[derive(Debug, Error)]
#[error("can't build chart url. Reason: {0}")]
pub struct ChartError(pub String);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("can't load sonar configuration. Reason: {0}")]
    Config(#[from] ConfigError),
    #[error("can't access remote service. Reason: {0}")]
    Remote(#[from] RemoteError),
    #[error("can't read distance. Reason: {0}")]
    Parse(#[from] ParseError),
    #[error("can't send notification. Reason: {0}")]
    Notification(#[from] NotificationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_status_reason_is_readable() {
        let err = ServiceError::from(RemoteError::Status(503));

        assert_eq!(
            err.to_string(),
            "can't access remote service. Reason: response code: 503"
        );
    }

    #[test]
    fn parse_error_quotes_body() {
        let err = ServiceError::from(ParseError {
            body: "n/a".to_string(),
        });

        assert_eq!(
            err.to_string(),
            "can't read distance. Reason: malformed distance reading: \"n/a\""
        );
    }
}
