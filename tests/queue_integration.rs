//! Queue core integration tests
//!
//! These tests drive `QueueRegistry` and `Queue` directly, without the HTTP
//! layer. Time-dependent tests run on tokio's paused clock.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use longpoll_mq::config::QueueConfig;
use longpoll_mq::queue::{Message, Queue, QueueRegistry};

fn fast_config(max_size: usize) -> QueueConfig {
    QueueConfig {
        max_size,
        max_readers: 100,
        rps: 1_000_000,
        burst: 1_000_000,
    }
}

fn msg(s: impl Into<String>) -> Message {
    Message::try_from(s.into()).unwrap()
}

async fn wait_for_consumers(queue: &Queue, n: usize) {
    while queue.stats().waiting_consumers < n {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Buffer Path
// =============================================================================

mod buffer_tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_within_buffer() {
        let registry = QueueRegistry::new(fast_config(100));
        let queue = registry.get_or_create("fifo").unwrap();

        for i in 0..50 {
            queue.push(msg(format!("m{i}"))).await.unwrap();
        }
        for i in 0..50 {
            assert_eq!(queue.pop(Duration::ZERO).await, Some(msg(format!("m{i}"))));
        }
        assert_eq!(queue.pop(Duration::ZERO).await, None);
    }

    #[tokio::test]
    async fn test_no_loss_under_buffering() {
        let registry = QueueRegistry::new(fast_config(10));
        let queue = registry.get_or_create("kept").unwrap();

        queue.push(msg("only")).await.unwrap();
        assert_eq!(queue.pop(Duration::from_secs(1)).await, Some(msg("only")));
        assert_eq!(queue.pop(Duration::ZERO).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backpressure_blocks_extra_push() {
        let max_size = 5;
        let queue = Arc::new(Queue::new("bp", fast_config(max_size)));

        for i in 0..max_size {
            tokio::time::timeout(Duration::from_secs(1), queue.push(msg(format!("m{i}"))))
                .await
                .expect("push within capacity must not block")
                .unwrap();
        }

        let extra = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(msg("extra")).await })
        };

        // Still blocked after a long while
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!extra.is_finished());
        assert_eq!(queue.len(), max_size);

        assert_eq!(queue.pop(Duration::ZERO).await, Some(msg("m0")));
        extra.await.unwrap().unwrap();
        assert_eq!(queue.len(), max_size);
    }
}

// =============================================================================
// Long-Polling
// =============================================================================

mod long_poll_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_nothing_after_deadline() {
        let registry = QueueRegistry::new(fast_config(10));
        let queue = registry.get_or_create("idle").unwrap();

        let start = Instant::now();
        assert_eq!(queue.pop(Duration::from_secs(2)).await, None);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(3), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rendezvous_latency() {
        let registry = Arc::new(QueueRegistry::new(fast_config(10)));
        let queue = registry.get_or_create("fast").unwrap();

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::from_secs(10)).await })
        };
        wait_for_consumers(&queue, 1).await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        let pushed_at = Instant::now();
        queue.push(msg("now")).await.unwrap();

        let received = consumer.await.unwrap();
        assert_eq!(received, Some(msg("now")));
        assert!(pushed_at.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_consumer_does_not_swallow_later_push() {
        let queue = Arc::new(Queue::new("expired", fast_config(10)));

        assert_eq!(queue.pop(Duration::from_secs(1)).await, None);

        // The expired registration must not be chosen for the handoff
        queue.push(msg("after")).await.unwrap();
        assert_eq!(queue.pop(Duration::ZERO).await, Some(msg("after")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_long_poll_keeps_message() {
        let queue = Arc::new(Queue::new("cancel", fast_config(10)));

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::from_secs(60)).await })
        };
        wait_for_consumers(&queue, 1).await;

        // Abort the consumer (client went away) right after a handoff
        queue.push(msg("orphan")).await.unwrap();
        consumer.abort();
        let outcome = consumer.await;

        match outcome {
            Ok(received) => assert_eq!(received, Some(msg("orphan"))),
            Err(e) => {
                assert!(e.is_cancelled());
                assert_eq!(queue.pop(Duration::ZERO).await, Some(msg("orphan")));
            }
        }
    }
}

// =============================================================================
// Concurrency
// =============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_message_delivered_exactly_once() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 250;
        const TOTAL: usize = PRODUCERS * PER_PRODUCER;

        let registry = Arc::new(QueueRegistry::new(fast_config(8)));
        let delivered = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let queue = registry.get_or_create("shared").unwrap();
                    for i in 0..PER_PRODUCER {
                        queue.push(msg(format!("{p}-{i}"))).await.unwrap();
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let registry = registry.clone();
                let delivered = delivered.clone();
                tokio::spawn(async move {
                    let queue = registry.get_or_create("shared").unwrap();
                    let mut received = Vec::new();
                    while delivered.load(Ordering::SeqCst) < TOTAL {
                        if let Some(m) = queue.pop(Duration::from_millis(50)).await {
                            delivered.fetch_add(1, Ordering::SeqCst);
                            received.push(m);
                        }
                    }
                    received
                })
            })
            .collect();

        let run = async {
            for producer in producers {
                producer.await.unwrap();
            }
            let mut all = Vec::new();
            for consumer in consumers {
                all.extend(consumer.await.unwrap());
            }
            all
        };
        let all = tokio::time::timeout(Duration::from_secs(30), run)
            .await
            .expect("messages were lost");

        let mut seen = HashSet::new();
        for m in &all {
            assert!(seen.insert(m.as_bytes().to_vec()), "message delivered twice");
        }
        assert_eq!(all.len(), TOTAL);

        let queue = registry.get("shared").unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_yields_one_queue() {
        let registry = Arc::new(QueueRegistry::new(fast_config(10)));

        let a = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_or_create("orders").unwrap() })
        };
        let b = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.get_or_create("orders").unwrap() })
        };
        let a = a.await.unwrap();
        let b = b.await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        a.push(msg("shared")).await.unwrap();
        assert_eq!(b.pop(Duration::ZERO).await, Some(msg("shared")));
    }
}

// =============================================================================
// Rate Limiting
// =============================================================================

mod rate_limit_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_sustained_rate() {
        let config = QueueConfig {
            max_size: 1_000,
            ..QueueConfig::default()
        };
        let registry = QueueRegistry::new(config);
        let queue = registry.get_or_create("throttled").unwrap();
        let rps = config.rps as usize;

        let start = Instant::now();
        for i in 0..config.burst as usize {
            queue.push(msg(format!("b{i}"))).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(10));

        // Beyond the burst, pushes are paced at the sustained rate
        for i in 0..rps * 2 {
            queue.push(msg(format!("s{i}"))).await.unwrap();
        }
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(1_900), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(2_500), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queues_have_independent_limiters() {
        let config = QueueConfig {
            burst: 3,
            ..QueueConfig::default()
        };
        let registry = QueueRegistry::new(config);
        let a = registry.get_or_create("a").unwrap();
        let b = registry.get_or_create("b").unwrap();

        let start = Instant::now();
        for _ in 0..3 {
            a.push(msg("x")).await.unwrap();
        }
        for _ in 0..3 {
            b.push(msg("y")).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
