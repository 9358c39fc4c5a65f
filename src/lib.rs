pub mod action;
pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod telemetry;
pub mod ui;
