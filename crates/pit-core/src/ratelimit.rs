//! Token-bucket rate limiting.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

/// A token bucket shared across all requests issued by a single regulator
/// client.
///
/// Capacity `B` tokens refill continuously at rate `R` tokens/second, up to
/// the bucket's capacity. Callers `acquire` one token per outbound request
/// and await if none is available, so a burst of `B` requests can go out
/// immediately while steady-state traffic is held to `R` requests/second.
/// This is deliberately closer to how a real rate limiter behaves than a
/// fixed "sleep `1/R` seconds between calls" gate: short bursts aren't
/// penalized and the long-run rate is still bounded.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<State>,
    capacity: f64,
    refill_per_sec: f64,
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a bucket with the given capacity and refill rate (tokens per
    /// second). The bucket starts full.
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            state: Mutex::new(State {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_per_sec: f64::from(refill_per_sec.max(1)),
        }
    }

    /// Waits until one token is available, then consumes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                state.refill(self.capacity, self.refill_per_sec);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.tokens;
                    Some(Duration::from_secs_f64(deficit / self.refill_per_sec))
                }
            };
            match wait {
                None => return,
                Some(delay) => sleep(delay).await,
            }
        }
    }
}

impl State {
    fn refill(&mut self, capacity: f64, refill_per_sec: f64) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
    }
}
