//! Line chart of the distance history, rendered by an external chart service.
//!
//! The URL follows the Google Image Charts parameter set (`cht`, `chd`, ...);
//! only the query string is built here.

use crate::error::ChartError;
use crate::filter::HISTORY_CAPACITY;

pub const CHART_SERVICE_URL: &str = "https://image-charts.com/chart";

const CHART_SIZE: &str = "450x350";
const LINE_COLOR: &str = "65b459";
const TEXT_COLOR: &str = "FFFFFF";
const BACKGROUND_COLOR: &str = "777777";
const AREA_GRADIENT: &str = "c,lg,0,363433,1,2E2B2A,0";

/// Builds the chart URL for `history` (oldest first). An empty history gives
/// an empty series on a 0..0 axis.
pub fn distance_chart_url(history: &[f64]) -> Result<String, ChartError> {
    let (min, max) = bounds(history);
    let series = history
        .iter()
        .map(|value| format!("{value:.1}"))
        .collect::<Vec<_>>()
        .join(",");
    let title = format!("Distance measurements (Last {HISTORY_CAPACITY} values)");
    let axis_style = format!("0,{TEXT_COLOR},12,0|1,{TEXT_COLOR},12,0|2,{TEXT_COLOR},12,0");

    let params = [
        ("cht", "lc".to_string()),
        ("chs", CHART_SIZE.to_string()),
        ("chd", format!("t:{series}")),
        ("chds", format!("{min:.1},{max:.1}")),
        ("chco", LINE_COLOR.to_string()),
        ("chdl", "Distance".to_string()),
        ("chls", "2,1,0".to_string()),
        ("chm", format!("d,{TEXT_COLOR},0,-1,3")),
        ("chtt", title),
        ("chts", format!("{TEXT_COLOR},14")),
        ("chg", "25,25,3,2".to_string()),
        ("chxt", "x,y,y".to_string()),
        ("chxl", "0:|Time|2:|Distance".to_string()),
        ("chxp", "0,50|2,50".to_string()),
        ("chxr", format!("1,{min:.1},{max:.1}")),
        ("chxs", axis_style),
        ("chf", format!("bg,s,{BACKGROUND_COLOR}|{AREA_GRADIENT}")),
    ];

    reqwest::Url::parse_with_params(CHART_SERVICE_URL, &params)
        .map(String::from)
        .map_err(|err| ChartError(err.to_string()))
}

fn bounds(history: &[f64]) -> (f64, f64) {
    if history.is_empty() {
        return (0.0, 0.0);
    }
    history
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(*value), max.max(*value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_value(url: &str, key: &str) -> Option<String> {
        let parsed = reqwest::Url::parse(url).ok()?;
        parsed
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn empty_history_yields_empty_series() {
        let url = distance_chart_url(&[]).expect("chart url");

        assert!(url.starts_with(CHART_SERVICE_URL));
        assert_eq!(query_value(&url, "chd").as_deref(), Some("t:"));
        assert_eq!(query_value(&url, "chxr").as_deref(), Some("1,0.0,0.0"));
    }

    #[test]
    fn series_and_axis_follow_history() {
        let url = distance_chart_url(&[40.0, 40.5, 38.3]).expect("chart url");

        assert_eq!(query_value(&url, "chd").as_deref(), Some("t:40.0,40.5,38.3"));
        assert_eq!(query_value(&url, "chxr").as_deref(), Some("1,38.3,40.5"));
        assert_eq!(query_value(&url, "chs").as_deref(), Some("450x350"));
        assert_eq!(
            query_value(&url, "chtt").as_deref(),
            Some("Distance measurements (Last 100 values)")
        );
    }

    #[test]
    fn same_history_gives_same_url() {
        let history = [12.0, 13.5, 14.0];

        assert_eq!(
            distance_chart_url(&history).ok(),
            distance_chart_url(&history).ok()
        );
    }
}
