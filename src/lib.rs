pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod insights;
pub mod metrics;
pub mod range;
pub mod sources;
