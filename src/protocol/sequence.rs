//! # Sequence Number Generation
//!
//! Correlation ids linking a request message to its response. The generator
//! is an explicit, injectable component so tests can pin the sequence space
//! deterministically instead of depending on process-global state.

use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

/// Sequence numbers fit in 31 bits; the monotonic counter wraps at this
/// modulus (2^31 - 1).
pub const SEQUENCE_MODULUS: u32 = 2_147_483_647;

/// Source of request correlation ids.
pub trait SequenceProvider: Send + Sync {
    fn next(&self) -> u32;
}

/// Monotonically increasing counter modulo 2^31 - 1. The default provider
/// when sequence tracking is enabled; guarantees uniqueness among any
/// realistic set of concurrently pending requests.
#[derive(Debug, Default)]
pub struct MonotonicSequence {
    counter: AtomicU32,
}

impl MonotonicSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from a known point. Used by tests that need to
    /// exercise the wrap boundary.
    pub fn starting_at(value: u32) -> Self {
        Self {
            counter: AtomicU32::new(value % SEQUENCE_MODULUS),
        }
    }
}

impl SequenceProvider for MonotonicSequence {
    fn next(&self) -> u32 {
        let mut current = self.counter.load(Ordering::Relaxed);
        loop {
            let next = (current + 1) % SEQUENCE_MODULUS;
            match self.counter.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Random 31-bit ids with no correlation guarantee. The fallback when
/// sequence tracking is disabled: messages still carry an id, but nothing
/// waits on it.
#[derive(Debug, Default)]
pub struct RandomSequence;

impl SequenceProvider for RandomSequence {
    fn next(&self) -> u32 {
        rand::rng().random_range(1..SEQUENCE_MODULUS)
    }
}
