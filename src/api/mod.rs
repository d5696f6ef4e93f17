//! API layer - HTTP endpoint handlers.

mod handlers;
mod health;
mod metrics;
mod query;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use handlers::{missing_name, not_found, read_message, write_message};
pub use health::{health, stats, HealthResponse};
pub use metrics::prometheus_metrics;
pub use routes::admin_routes;
