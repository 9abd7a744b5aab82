//! N-gram language model and fitness scoring for substitution ciphers.
//!
//! This crate provides:
//! - Dense, smoothed n-gram tables over a small symbol alphabet, for any order
//! - A fitness score for candidate cipher-to-plain keys, meant to be called
//!   many times per second by an external key search
//! - Training utilities (tokenizer, parallel counting, cached tables on disk)
//!
//! Model construction is the only fallible operation; scoring never fails.

/// N-gram models, alphabet and scoring.
pub mod model;

/// Error type of model construction and persistence.
pub mod error;

/// I/O utilities (file loading, path helpers).
pub mod io;

pub use error::{ModelError, Result};
