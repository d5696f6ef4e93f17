use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::queue::QueueRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<QueueRegistry>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(QueueRegistry::new(settings.queue));

        Self {
            settings: Arc::new(settings),
            registry,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
