//! # randaudit-core
//!
//! Deterministic pseudo-random sequence generation for the `randaudit`
//! randomness battery.
//!
//! ## Quick Start
//!
//! ```
//! use randaudit_core::{FixedSeed, Generator};
//!
//! // Reproducible: the seed is injected explicitly
//! let mut rng = Generator::from_source(&mut FixedSeed(42));
//! let sample = rng.next_vector(1000);
//! assert!(sample.iter().all(|x| (0.0..1.0).contains(x)));
//! ```
//!
//! ## Architecture
//!
//! SeedSource → Generator → `Vec<f64>` → test battery
//!
//! Raw bytes from external producers take the other entry point:
//! bytes → [`conditioning`] → `Vec<f64>` → test battery.

pub mod conditioning;
pub mod generator;
pub mod source;

pub use conditioning::{ConditioningError, unit_from_bytes, unit_from_words, words_from_bytes};
pub use generator::{Generator, GeneratorError, INCREMENT, MODULUS, MULTIPLIER, SharedGenerator};
pub use source::{FixedSeed, SeedKind, SeedSource, ThreadSeed};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
