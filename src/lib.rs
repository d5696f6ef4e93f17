// Shared components
pub mod config;
pub mod error;
pub mod metrics;

// Queue core
pub mod queue;
pub mod ratelimit;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod shutdown;
