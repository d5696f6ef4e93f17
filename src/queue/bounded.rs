//! A single named queue: bounded buffer plus long-polling consumers.
//!
//! Producers hand messages straight to the oldest waiting consumer when one
//! exists and only fall back to the buffer otherwise. The buffer and the
//! waiter list sit behind one lock, so a consumer never registers while a
//! message is buffered and a producer never buffers while a live consumer
//! is registered.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Semaphore, SemaphorePermit};
use tokio::time::{timeout_at, Instant};

use super::Message;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::metrics::MessageMetrics;
use crate::ratelimit::TokenBucket;

/// Upper bound on a single long-poll when the requested timeout overflows the clock.
const MAX_WAIT: Duration = Duration::from_secs(86_400 * 365);

struct QueueState {
    /// FIFO of messages no consumer has claimed yet
    buffer: VecDeque<Message>,
    /// Delivery slots of blocked consumers, oldest first
    waiting: VecDeque<oneshot::Sender<Message>>,
    /// Requeued messages stored without a buffer slot
    overflow: usize,
    closed: bool,
}

impl QueueState {
    /// Offer a message to waiting consumers, oldest first.
    ///
    /// A consumer whose deadline already fired has closed its slot, so the
    /// send fails and hands the message back; the next waiter is tried.
    /// Returns the message if nobody claimed it.
    fn hand_off(&mut self, mut message: Message) -> Result<(), Message> {
        while let Some(slot) = self.waiting.pop_front() {
            match slot.send(message) {
                Ok(()) => return Ok(()),
                Err(returned) => message = returned,
            }
        }
        Err(message)
    }

    fn live_waiters(&self) -> usize {
        self.waiting.iter().filter(|slot| !slot.is_closed()).count()
    }
}

/// Outcome of trying to register a consumer.
enum Registered<'a> {
    /// A message was buffered between the first check and registration
    Ready(Message),
    Waiting(Registration<'a>),
    Closed,
}

/// A blocked consumer's side of the rendezvous.
///
/// Dropping a registration claims its slot; a message that was delivered
/// but never returned to the caller goes back to the queue.
struct Registration<'a> {
    queue: &'a Queue,
    slot: oneshot::Receiver<Message>,
    _reader: SemaphorePermit<'a>,
}

impl Registration<'_> {
    async fn wait_until(&mut self, deadline: Instant) -> Option<Message> {
        match timeout_at(deadline, &mut self.slot).await {
            Ok(Ok(message)) => Some(message),
            // Sender dropped: the queue was closed
            Ok(Err(_)) => None,
            Err(_) => self.claim(),
        }
    }

    /// Shut the slot so no producer can deliver into it, then take
    /// whatever landed before the close.
    fn claim(&mut self) -> Option<Message> {
        self.slot.close();
        self.slot.try_recv().ok()
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Some(message) = self.claim() {
            self.queue.requeue(message);
        }
    }
}

/// Point-in-time view of a queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub name: String,
    pub buffered: usize,
    pub waiting_consumers: usize,
    pub capacity: usize,
    pub available_tokens: u32,
}

pub struct Queue {
    name: String,
    state: Mutex<QueueState>,
    /// One permit per free buffer slot; producers wait here when full
    free_slots: Semaphore,
    /// One permit per consumer allowed to block at once
    reader_slots: Semaphore,
    limiter: TokenBucket,
    config: QueueConfig,
}

impl Queue {
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState {
                buffer: VecDeque::with_capacity(config.max_size),
                waiting: VecDeque::new(),
                overflow: 0,
                closed: false,
            }),
            free_slots: Semaphore::new(config.max_size),
            reader_slots: Semaphore::new(config.max_readers),
            limiter: TokenBucket::new(config.burst, config.rps),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a message available to exactly one consumer.
    ///
    /// Returns once the message was handed to a waiting consumer or stored
    /// in the buffer. Blocks while the buffer is full and nobody is waiting.
    pub async fn push(&self, message: Message) -> Result<(), QueueError> {
        self.limiter.acquire().await;

        let message = {
            let mut state = self.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            match state.hand_off(message) {
                Ok(()) => {
                    self.record_rendezvous();
                    return Ok(());
                }
                Err(message) => message,
            }
        };

        let permit = self
            .free_slots
            .acquire()
            .await
            .map_err(|_| QueueError::Closed)?;

        let mut state = self.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }

        // A consumer may have registered while we waited for space
        match state.hand_off(message) {
            Ok(()) => {
                self.record_rendezvous();
                Ok(())
            }
            Err(message) => {
                state.buffer.push_back(message);
                permit.forget();
                MessageMetrics::record_buffered_push();
                tracing::trace!(queue = %self.name, buffered = state.buffer.len(), "Message buffered");
                Ok(())
            }
        }
    }

    /// Take a message, waiting up to `timeout` for one to arrive.
    ///
    /// A zero timeout checks the buffer once. `None` means nothing arrived
    /// before the deadline.
    pub async fn pop(&self, timeout: Duration) -> Option<Message> {
        self.limiter.acquire().await;

        if let Some(message) = self.take_buffered() {
            return Some(message);
        }
        if timeout.is_zero() {
            MessageMetrics::record_empty_pop();
            return None;
        }

        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + MAX_WAIT);

        // The wait for a reader slot counts against the same deadline
        let reader = match timeout_at(deadline, self.reader_slots.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                MessageMetrics::record_empty_pop();
                return None;
            }
        };

        let mut registration = match self.register(reader) {
            Registered::Ready(message) => return Some(message),
            Registered::Waiting(registration) => registration,
            Registered::Closed => {
                MessageMetrics::record_empty_pop();
                return None;
            }
        };

        let received = registration.wait_until(deadline).await;
        match &received {
            Some(_) => MessageMetrics::record_rendezvous_pop(),
            None => {
                MessageMetrics::record_empty_pop();
                tracing::trace!(queue = %self.name, ?timeout, "Long-poll expired");
            }
        }
        received
    }

    fn take_buffered(&self) -> Option<Message> {
        let mut state = self.lock();
        let message = state.buffer.pop_front()?;
        self.release_slot(&mut state);
        MessageMetrics::record_buffered_pop();
        Some(message)
    }

    fn release_slot(&self, state: &mut QueueState) {
        if state.overflow > 0 {
            state.overflow -= 1;
        } else {
            self.free_slots.add_permits(1);
        }
    }

    fn register<'a>(&'a self, reader: SemaphorePermit<'a>) -> Registered<'a> {
        let mut state = self.lock();

        if let Some(message) = state.buffer.pop_front() {
            self.release_slot(&mut state);
            MessageMetrics::record_buffered_pop();
            return Registered::Ready(message);
        }
        if state.closed {
            return Registered::Closed;
        }

        // Slots of consumers that already gave up
        state.waiting.retain(|slot| !slot.is_closed());

        let (tx, rx) = oneshot::channel();
        state.waiting.push_back(tx);

        Registered::Waiting(Registration {
            queue: self,
            slot: rx,
            _reader: reader,
        })
    }

    /// Put back a message whose consumer went away after delivery.
    fn requeue(&self, message: Message) {
        let mut state = self.lock();
        let message = match state.hand_off(message) {
            Ok(()) => return,
            Err(message) => message,
        };

        match self.free_slots.try_acquire() {
            Ok(permit) => permit.forget(),
            Err(_) => state.overflow += 1,
        }
        state.buffer.push_front(message);
        MessageMetrics::record_requeued();
        tracing::debug!(queue = %self.name, "Requeued message from abandoned consumer");
    }

    fn record_rendezvous(&self) {
        MessageMetrics::record_rendezvous_push();
        tracing::trace!(queue = %self.name, "Message handed to waiting consumer");
    }

    /// Reject further pushes and release everyone blocked on this queue.
    ///
    /// Buffered messages stay readable.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        // Dropping the senders wakes blocked consumers with nothing
        state.waiting.clear();
        self.free_slots.close();
        self.reader_slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().buffer.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let (buffered, waiting_consumers) = {
            let state = self.lock();
            (state.buffer.len(), state.live_waiters())
        };
        QueueStats {
            name: self.name.clone(),
            buffered,
            waiting_consumers,
            capacity: self.config.max_size,
            available_tokens: self.limiter.available(),
        }
    }
}
