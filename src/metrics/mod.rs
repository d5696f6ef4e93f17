//! Prometheus metrics for the queue service.
//!
//! - Message metrics (pushes by delivery path, pops by outcome)
//! - Queue registry metrics (queues created, buffered messages, waiting consumers)
//! - Rate limiting metrics
//! - Panic containment metrics

mod helpers;

pub use helpers::{encode_metrics, MessageMetrics, PanicMetrics, QueueMetrics, RateLimitMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "mq";

lazy_static! {
    // ============================================================================
    // Message Metrics
    // ============================================================================

    /// Total messages accepted by push, by delivery path
    pub static ref MESSAGES_PUSHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_messages_pushed_total", METRIC_PREFIX),
        "Total messages accepted by push",
        &["path"]
    ).unwrap();

    /// Delivered messages put back because their consumer went away
    pub static ref MESSAGES_REQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_requeued_total", METRIC_PREFIX),
        "Delivered messages returned to the queue after the consumer went away"
    ).unwrap();

    /// Total pop calls, by outcome
    pub static ref POPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_pops_total", METRIC_PREFIX),
        "Total pop calls by result",
        &["result"]
    ).unwrap();

    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Total queues created since start
    pub static ref QUEUES_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queues_created_total", METRIC_PREFIX),
        "Total queues created"
    ).unwrap();

    /// Number of live queues
    pub static ref QUEUES_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_queues_active", METRIC_PREFIX),
        "Number of queues in the registry"
    ).unwrap();

    /// Messages currently held in queue buffers
    pub static ref MESSAGES_BUFFERED: IntGauge = register_int_gauge!(
        format!("{}_messages_buffered", METRIC_PREFIX),
        "Messages currently buffered across all queues"
    ).unwrap();

    /// Consumers currently blocked in a long-poll
    pub static ref CONSUMERS_WAITING: IntGauge = register_int_gauge!(
        format!("{}_consumers_waiting", METRIC_PREFIX),
        "Consumers currently waiting for a message"
    ).unwrap();

    // ============================================================================
    // Rate Limiting Metrics
    // ============================================================================

    /// Operations that had to wait for a token
    pub static ref RATELIMIT_WAITS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_rate_limit_waits_total", METRIC_PREFIX),
        "Queue operations delayed by the rate limiter"
    ).unwrap();

    // ============================================================================
    // Failure Containment
    // ============================================================================

    pub static ref PANICS_RECOVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_panics_recovered_total", METRIC_PREFIX),
        "Request handler panics caught and converted to responses"
    ).unwrap();
}
