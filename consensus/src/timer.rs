use crate::messages::RoundNumber;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::time::{sleep, Duration, Instant, Sleep};

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
pub mod timer_tests;

/// Single-fire round deadline. Re-arming replaces the previous deadline, so
/// at most one expiry is ever outstanding.
pub struct RoundTimer {
    base_delay: u64,
    sleep: Pin<Box<Sleep>>,
}

impl RoundTimer {
    /// Caps the backoff at base * 2^6.
    const MAX_BACKOFF_EXPONENT: u64 = 6;

    pub fn new(base_delay: u64) -> Self {
        let sleep = Box::pin(sleep(Duration::from_millis(base_delay)));
        Self { base_delay, sleep }
    }

    /// Arm the deadline for a round. Rounds reached through view-changes
    /// wait exponentially longer, to ride out sustained partitions.
    pub fn arm(&mut self, round: RoundNumber) {
        let exponent = round.min(Self::MAX_BACKOFF_EXPONENT);
        let delay = self.base_delay.saturating_mul(1 << exponent);
        self.sleep
            .as_mut()
            .reset(Instant::now() + Duration::from_millis(delay));
    }
}

impl Future for RoundTimer {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.sleep.as_mut().poll(cx)
    }
}
