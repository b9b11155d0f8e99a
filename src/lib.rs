pub mod api;
pub mod chart;
pub mod config;
pub mod error;
pub mod filter;
pub mod monitor;
pub mod notify;
pub mod schedule;
pub mod sonar;
