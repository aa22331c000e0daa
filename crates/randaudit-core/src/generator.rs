//! Hybrid xorshift / linear-congruential sequence generator.
//!
//! Each draw scrambles the 32-bit state with three shift-xor steps, then feeds
//! the result through `x = (a * x + c) mod m` with `m = 2^31 - 1`. The new state
//! divided by `m` is the output, so every value lies in `[0, 1)`.
//!
//! # Determinism
//!
//! Two generators built from the same seed and driven through the same calls
//! produce bit-identical outputs. The xorshift step runs in a 64-bit register
//! and is masked back to 32 bits after every shift, so the result never
//! depends on native integer width.
//!
//! # Known limitation
//!
//! A zero state is not special-cased. Zero is a fixed point of the xorshift
//! step alone; the congruential increment moves the state off it on the same
//! draw, but the first output after a zero seed is `c / m`, which is tiny.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::source::{SeedSource, ThreadSeed};

/// Congruential multiplier.
pub const MULTIPLIER: u64 = 1597;
/// Congruential increment.
pub const INCREMENT: u64 = 51749;
/// Congruential modulus, the Mersenne prime `2^31 - 1`.
pub const MODULUS: u64 = (1 << 31) - 1;

const MASK_32: u64 = 0xFFFF_FFFF;

/// Errors raised by generator draws.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// `next_int` was asked for an empty interval.
    #[error("invalid range: low ({low}) is greater than high ({high})")]
    InvalidRange { low: i64, high: i64 },
}

/// One xorshift round on a 32-bit value held in a 64-bit register.
fn xorshift32(state: u32) -> u32 {
    let mut x = state as u64;
    x ^= (x << 13) & MASK_32;
    x ^= (x >> 17) & MASK_32;
    x ^= (x << 5) & MASK_32;
    (x & MASK_32) as u32
}

/// `(a * x + c) mod m`. The product fits comfortably in 64 bits.
fn congruential(x: u32) -> u32 {
    ((MULTIPLIER * x as u64 + INCREMENT) % MODULUS) as u32
}

/// Deterministic sequence generator.
///
/// ```
/// use randaudit_core::Generator;
///
/// let mut a = Generator::new(Some(42));
/// let mut b = Generator::new(Some(42));
/// assert_eq!(a.next_vector(16), b.next_vector(16));
///
/// let roll = a.next_int(1, 6).unwrap();
/// assert!((1..=6).contains(&roll));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    state: u32,
}

impl Generator {
    /// Create a generator. `None` draws a seed from [`ThreadSeed`].
    pub fn new(seed: Option<u32>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::from_source(&mut ThreadSeed),
        }
    }

    /// Create a generator from an explicit seed.
    pub fn with_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Create a generator seeded by the given source.
    pub fn from_source(source: &mut impl SeedSource) -> Self {
        let seed = source.next_seed();
        log::debug!("seeding generator from {} source: {seed:#010x}", source.kind());
        Self::with_seed(seed)
    }

    /// Current internal state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance the state one step and return it as a float in `[0, 1)`.
    pub fn next_float(&mut self) -> f64 {
        let mixed = xorshift32(self.state);
        self.state = congruential(mixed);
        self.state as f64 / MODULUS as f64
    }

    /// Integer uniformly drawn from the closed interval `[low, high]`.
    pub fn next_int(&mut self, low: i64, high: i64) -> Result<i64, GeneratorError> {
        if low > high {
            return Err(GeneratorError::InvalidRange { low, high });
        }
        // i128 keeps `high - low + 1` exact for the full i64 range.
        let span = high as i128 - low as i128 + 1;
        let offset = (self.next_float() * span as f64).floor() as i128;
        Ok((low as i128 + offset) as i64)
    }

    /// `size` successive draws from [`next_float`](Self::next_float).
    pub fn next_vector(&mut self, size: usize) -> Vec<f64> {
        (0..size).map(|_| self.next_float()).collect()
    }
}

/// Never ends; every item is one [`Generator::next_float`] draw.
impl Iterator for Generator {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_float())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// A generator that can be shared between threads.
///
/// Every draw takes the lock, so each read-modify-write of the state is
/// exclusive. Outputs stay deterministic per draw; how draws interleave across
/// threads is up to the scheduler.
#[derive(Debug)]
pub struct SharedGenerator {
    inner: Mutex<Generator>,
}

impl SharedGenerator {
    pub fn new(generator: Generator) -> Self {
        Self {
            inner: Mutex::new(generator),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Generator) -> T) -> T {
        // The state is a plain u32 and is valid even if a holder panicked.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    pub fn next_float(&self) -> f64 {
        self.with(Generator::next_float)
    }

    pub fn next_int(&self, low: i64, high: i64) -> Result<i64, GeneratorError> {
        self.with(|g| g.next_int(low, high))
    }

    /// Drawn under a single lock, so the vector is one contiguous run of the
    /// underlying sequence.
    pub fn next_vector(&self, size: usize) -> Vec<f64> {
        self.with(|g| g.next_vector(size))
    }

    /// Unwrap the generator, keeping its current state.
    pub fn into_inner(self) -> Generator {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Generator> for SharedGenerator {
    fn from(generator: Generator) -> Self {
        Self::new(generator)
    }
}
