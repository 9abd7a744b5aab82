//! Error type shared by model construction and table persistence.
//!
//! Scoring never fails: degenerate inputs yield a score of `0.0`.

use thiserror::Error;

/// Errors raised while building, merging, saving or loading a model.
#[derive(Debug, Error)]
pub enum ModelError {
	/// `dim^order` does not fit in a dense table.
	#[error("Table of {dim}^{order} cells exceeds capacity; the largest admissible dimension for order {order} is {max_dim}")]
	CapacityExceeded { dim: usize, order: usize, max_dim: usize },

	/// The n-gram order must be at least 1.
	#[error("Invalid n-gram order: {0} (must be >= 1)")]
	InvalidOrder(usize),

	/// The alphabet dimension must be at least 1.
	#[error("Invalid alphabet dimension: {0} (must be >= 1)")]
	InvalidDimension(usize),

	/// The smoothing scale must be finite and strictly positive.
	#[error("Invalid smoothing scale: {0} (must be finite and > 0)")]
	InvalidScale(f64),

	/// A corpus name that is not a plain file name of the data folder.
	#[error("Invalid corpus name: {0:?}")]
	InvalidName(String),

	/// Two counters or tables do not share the same shape.
	#[error("Shape mismatch: expected {expected_dim}^{expected_order}, found {found_dim}^{found_order}")]
	ShapeMismatch {
		expected_dim: usize,
		expected_order: usize,
		found_dim: usize,
		found_order: usize,
	},

	/// A deserialized table violates the table invariants.
	#[error("Corrupt table: {0}")]
	CorruptTable(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Encoding error: {0}")]
	Encoding(#[from] postcard::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;
