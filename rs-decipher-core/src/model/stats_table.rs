use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::indexer::{self, index};
use crate::error::{ModelError, Result};

/// Frozen, smoothed n-gram table of a reference language.
///
/// Holds one value per n-tuple of a `dim`-symbol alphabet, addressed by
/// [`indexer::index`]. Produced by [`NGramCounter::freeze`](super::builder::NGramCounter::freeze)
/// or loaded from disk; there is no way to mutate it afterwards, so it can be
/// shared between scoring workers behind an `Arc` without locking.
///
/// # Invariants
/// - `cells.len() == dim^order`
/// - every cell is finite and `>= 0.0`; unobserved tuples hold exactly `0.0`
/// - the table is only meaningful for the exact alphabet ordering it was built with
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "RawTable")]
pub struct StatsTable {
	dim: usize,
	order: usize,
	cells: Vec<f64>,
}

/// Unchecked wire form, validated into a [`StatsTable`].
#[derive(Deserialize)]
struct RawTable {
	dim: usize,
	order: usize,
	cells: Vec<f64>,
}

impl TryFrom<RawTable> for StatsTable {
	type Error = ModelError;

	fn try_from(raw: RawTable) -> Result<Self> {
		let expected = indexer::table_cells(raw.dim, raw.order)?;
		if raw.cells.len() != expected {
			return Err(ModelError::CorruptTable(format!(
				"{} cells found, {}^{} = {} expected",
				raw.cells.len(),
				raw.dim,
				raw.order,
				expected
			)));
		}
		if let Some(offset) = raw.cells.iter().position(|c| !c.is_finite() || *c < 0.0) {
			return Err(ModelError::CorruptTable(format!(
				"cell {offset} holds {}",
				raw.cells[offset]
			)));
		}
		Ok(Self { dim: raw.dim, order: raw.order, cells: raw.cells })
	}
}

impl StatsTable {
	/// Wraps already smoothed cells. Callers guarantee the invariants.
	pub(crate) fn from_cells(dim: usize, order: usize, cells: Vec<f64>) -> Self {
		debug_assert_eq!(Some(cells.len()), dim.checked_pow(order as u32));
		Self { dim, order, cells }
	}

	/// Alphabet dimension the table was built over.
	pub fn dim(&self) -> usize {
		self.dim
	}

	/// N-gram order.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Number of cells (`dim^order`).
	pub fn len(&self) -> usize {
		self.cells.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}

	/// All cells in index order.
	pub fn cells(&self) -> &[f64] {
		&self.cells
	}

	/// Value at a flattened offset.
	#[inline]
	pub fn cell(&self, offset: usize) -> f64 {
		self.cells[offset]
	}

	/// Value of an n-tuple, or `None` if the tuple has the wrong length
	/// or a symbol outside the alphabet.
	pub fn get(&self, tuple: &[usize]) -> Option<f64> {
		if tuple.len() != self.order || tuple.iter().any(|&p| p >= self.dim) {
			return None;
		}
		Some(self.cells[index(tuple, self.dim)])
	}

	/// Number of n-grams observed at least once.
	pub fn observed(&self) -> usize {
		self.cells.iter().filter(|&&c| c > 0.0).count()
	}

	/// Writes the table to `path` (postcard encoding).
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		fs::write(&path, &bytes)?;
		info!("Saved {}^{} table to {} ({} bytes)", self.dim, self.order, path.as_ref().display(), bytes.len());
		Ok(())
	}

	/// Reads a table written by [`StatsTable::save`].
	///
	/// # Errors
	/// Fails on I/O errors, on undecodable bytes and on tables violating the
	/// table invariants.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = fs::read(&path)?;
		let table: Self = postcard::from_bytes(&bytes)?;
		debug!("Loaded {}^{} table from {}", table.dim, table.order, path.as_ref().display());
		Ok(table)
	}
}
