//! Token Bucket algorithm implementation

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::metrics::RateLimitMetrics;

/// Tokens are tracked in thousandths so that slow refill rates accumulate
/// partial tokens between calls instead of rounding them away.
const MILLI: u64 = 1_000;

#[derive(Debug)]
struct BucketState {
    /// Current number of tokens (scaled by 1000 for precision)
    millitokens: u64,
    /// Last refill timestamp
    last_refill: Instant,
}

/// Token Bucket for rate limiting.
///
/// Tokens are refilled at a constant rate up to the bucket capacity.
/// The refill and the consume happen under one short lock so concurrent
/// callers never observe a half-applied refill.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    /// Maximum bucket capacity
    capacity: u32,
    /// Tokens added per second
    refill_rate: u32,
}

impl TokenBucket {
    /// Create a new token bucket, initially full
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                millitokens: u64::from(capacity) * MILLI,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate: refill_rate.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let ceiling = u64::from(self.capacity) * MILLI;
        let room = ceiling.saturating_sub(state.millitokens);
        if room == 0 {
            state.last_refill = now;
            return;
        }

        let rate = u128::from(self.refill_rate);
        let elapsed = now.saturating_duration_since(state.last_refill);
        // refill_rate tokens/sec == refill_rate millitokens/ms
        let added = elapsed.as_nanos() * rate / 1_000_000;
        if added >= u128::from(room) {
            state.millitokens = ceiling;
            state.last_refill = now;
            return;
        }

        // Only the time covered by whole millitokens is consumed; the
        // remainder carries over to the next call.
        let added = added as u64;
        let credited = u128::from(added) * 1_000_000 / rate;
        state.millitokens += added;
        state.last_refill += Duration::from_nanos(credited as u64);
    }

    /// Try to consume one token from the bucket.
    /// Returns true if a token was available, false otherwise.
    pub fn try_consume(&self) -> bool {
        self.try_consume_or_wait().is_ok()
    }

    /// Consume one token, or report how long until one will be available.
    pub fn try_consume_or_wait(&self) -> Result<(), Duration> {
        let mut state = self.lock();
        self.refill(&mut state, Instant::now());

        if state.millitokens >= MILLI {
            state.millitokens -= MILLI;
            return Ok(());
        }

        let missing = MILLI - state.millitokens;
        // missing millitokens at refill_rate millitokens/ms
        let nanos = (missing * 1_000_000).div_ceil(u64::from(self.refill_rate));
        Err(Duration::from_nanos(nanos))
    }

    /// Wait until a token is available, then consume it.
    ///
    /// Never fails; only delays the caller.
    pub async fn acquire(&self) {
        let mut waited = false;
        loop {
            match self.try_consume_or_wait() {
                Ok(()) => break,
                Err(wait) => {
                    if !waited {
                        RateLimitMetrics::record_wait();
                        waited = true;
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Get the current number of whole tokens available
    pub fn available(&self) -> u32 {
        let mut state = self.lock();
        self.refill(&mut state, Instant::now());
        u32::try_from(state.millitokens / MILLI).unwrap_or(self.capacity)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> u32 {
        self.refill_rate
    }
}
