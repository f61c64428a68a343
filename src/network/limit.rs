//! Per-connection command rate limiting.
//!
//! Wraps a `governor` direct limiter: a token bucket refilled at
//! `limits.commands_per_second`, with a burst of the same size.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;

/// Token bucket for one connection's inbound commands.
pub struct CommandLimiter {
    inner: DefaultDirectRateLimiter,
}

impl CommandLimiter {
    /// A zero rate falls back to one command per second.
    pub fn new(per_second: u32) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(nonzero!(1u32));
        Self {
            inner: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    /// Consume one token. Returns `false` when the bucket is empty.
    pub fn check(&self) -> bool {
        self.inner.check().is_ok()
    }
}
