//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CONSUMERS_WAITING, MESSAGES_BUFFERED, MESSAGES_PUSHED_TOTAL, MESSAGES_REQUEUED_TOTAL,
    PANICS_RECOVERED_TOTAL, POPS_TOTAL, QUEUES_ACTIVE, QUEUES_CREATED_TOTAL,
    RATELIMIT_WAITS_TOTAL,
};
use crate::queue::RegistryStats;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording message metrics
pub struct MessageMetrics;

impl MessageMetrics {
    /// Record a push handed directly to a waiting consumer
    pub fn record_rendezvous_push() {
        MESSAGES_PUSHED_TOTAL.with_label_values(&["rendezvous"]).inc();
    }

    /// Record a push stored in the buffer
    pub fn record_buffered_push() {
        MESSAGES_PUSHED_TOTAL.with_label_values(&["buffered"]).inc();
    }

    /// Record a pop served from the buffer
    pub fn record_buffered_pop() {
        POPS_TOTAL.with_label_values(&["buffered"]).inc();
    }

    /// Record a pop served by a producer handoff
    pub fn record_rendezvous_pop() {
        POPS_TOTAL.with_label_values(&["rendezvous"]).inc();
    }

    /// Record a delivered message put back after its consumer went away
    pub fn record_requeued() {
        MESSAGES_REQUEUED_TOTAL.inc();
    }

    /// Record a pop that found nothing before its deadline
    pub fn record_empty_pop() {
        POPS_TOTAL.with_label_values(&["empty"]).inc();
    }
}

/// Helper struct for queue registry metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_queue_created() {
        QUEUES_CREATED_TOTAL.inc();
    }

    /// Refresh the point-in-time gauges from a registry snapshot
    pub fn update_from_stats(stats: &RegistryStats) {
        QUEUES_ACTIVE.set(stats.total_queues as i64);
        MESSAGES_BUFFERED.set(stats.total_buffered as i64);
        CONSUMERS_WAITING.set(stats.total_waiting as i64);
    }
}

/// Helper struct for rate limit metrics
pub struct RateLimitMetrics;

impl RateLimitMetrics {
    /// Record an operation that had to sleep for a token
    pub fn record_wait() {
        RATELIMIT_WAITS_TOTAL.inc();
    }
}

pub struct PanicMetrics;

impl PanicMetrics {
    pub fn record_recovered() {
        PANICS_RECOVERED_TOTAL.inc();
    }
}
