use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use super::{Queue, QueueStats};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::metrics::QueueMetrics;

/// Named queues shared by every request.
///
/// Queues are created on first access and live for the rest of the process.
pub struct QueueRegistry {
    /// queue name -> Queue
    queues: DashMap<String, Arc<Queue>>,
    /// Limits applied to every queue created from here on
    config: QueueConfig,
    closed: AtomicBool,
}

impl QueueRegistry {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            queues: DashMap::new(),
            config,
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Return the queue called `name`, creating it on first access.
    ///
    /// Concurrent first access for the same name yields one shared queue:
    /// the miss and the insert happen under the same shard write lock.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<Queue>, QueueError> {
        if name.is_empty() {
            return Err(QueueError::EmptyName);
        }

        if let Some(queue) = self.queues.get(name) {
            return Ok(queue.clone());
        }

        let queue = self
            .queues
            .entry(name.to_string())
            .or_insert_with(|| {
                QueueMetrics::record_queue_created();
                tracing::info!(queue = %name, "Queue created");
                Arc::new(Queue::new(name, self.config))
            })
            .clone();

        // Raced with shutdown: make sure the new queue does not accept work
        if self.closed.load(Ordering::Acquire) {
            queue.close();
        }

        Ok(queue)
    }

    /// Look up a queue without creating it
    pub fn get(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues.get(name).map(|q| q.clone())
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Close every queue; part of graceful shutdown.
    ///
    /// Producers waiting for buffer space are released with
    /// `QueueError::Closed` and waiting consumers return empty-handed.
    pub fn close_all(&self) -> usize {
        self.closed.store(true, Ordering::Release);

        let queues: Vec<Arc<Queue>> = self.queues.iter().map(|q| q.value().clone()).collect();
        for queue in &queues {
            queue.close();
        }

        tracing::info!(queues = queues.len(), "Closed all queues");
        queues.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RegistryStats {
        let mut queues: Vec<QueueStats> = self.queues.iter().map(|q| q.stats()).collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));

        RegistryStats {
            total_queues: queues.len(),
            total_buffered: queues.iter().map(|q| q.buffered).sum(),
            total_waiting: queues.iter().map(|q| q.waiting_consumers).sum(),
            queues,
        }
    }
}

/// Statistics about the queue registry
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_queues: usize,
    pub total_buffered: usize,
    pub total_waiting: usize,
    pub queues: Vec<QueueStats>,
}
