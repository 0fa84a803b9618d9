pub mod api;
pub mod app;
pub mod chart;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod fetch_error;
pub mod fetcher;
pub mod logging;
pub mod pipeline;
pub mod scheduler;
pub mod series;
