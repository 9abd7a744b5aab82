use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};

use super::config::ModelConfig;
use super::indexer::{index, table_cells_with_limit};
use super::stats_table::StatsTable;
use super::token::{Token, TokenClass};
use super::window::ContextWindow;
use crate::error::{ModelError, Result};

/// Below this many cells the smoothing sweep runs on the calling thread.
const PARALLEL_SWEEP_THRESHOLD: usize = 1 << 16;

/// Raw n-gram counts of a model under construction.
///
/// This is the mutable phase of a model: corpora are fed with
/// [`add_tokens`](Self::add_tokens), partial counters built on other threads
/// are combined with [`merge`](Self::merge), and [`freeze`](Self::freeze)
/// consumes the counter to produce the immutable [`StatsTable`].
///
/// # Invariants
/// - `counts.len() == dim^order <= max_cells`
/// - counts saturate at `u32::MAX`
#[derive(Clone, Debug)]
pub struct NGramCounter {
	dim: usize,
	order: usize,
	remove_spaces: bool,
	smoothing_scale: f64,
	counts: Vec<u32>,
}

impl NGramCounter {
	/// Creates an empty counter for a `dim`-symbol alphabet.
	///
	/// # Errors
	/// The capacity check runs before the count table is allocated:
	/// `CapacityExceeded` if `dim^order` exceeds `config.max_cells`,
	/// `InvalidDimension` / `InvalidOrder` for zero parameters,
	/// `InvalidScale` unless the smoothing scale is finite and positive.
	pub fn new(dim: usize, config: &ModelConfig) -> Result<Self> {
		if !(config.smoothing_scale.is_finite() && config.smoothing_scale > 0.0) {
			return Err(ModelError::InvalidScale(config.smoothing_scale));
		}
		let cells = table_cells_with_limit(dim, config.order, config.max_cells)?;
		debug!("Allocating {cells} counters for a {dim}^{} model", config.order);
		Ok(Self {
			dim,
			order: config.order,
			remove_spaces: config.remove_spaces,
			smoothing_scale: config.smoothing_scale,
			counts: vec![0; cells],
		})
	}

	/// An empty counter with the same shape and settings.
	fn empty_like(&self) -> Self {
		Self { counts: vec![0; self.counts.len()], ..*self }
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn order(&self) -> usize {
		self.order
	}

	/// Raw count of an n-tuple (every symbol must be `< dim`).
	pub fn raw_count(&self, tuple: &[usize]) -> u32 {
		self.counts[index(tuple, self.dim)]
	}

	/// Counts every n-gram of one token stream.
	///
	/// - `NewLine` tokens are invisible: they neither enter nor reset the window
	/// - `Other` tokens are dropped when spaces are removed, otherwise their
	///   symbol takes part in the context like a letter
	/// - a token without a symbol breaks continuity
	///
	/// Each call is an independent document: no n-gram spans two calls.
	pub fn add_tokens<'a, I>(&mut self, tokens: I)
	where
		I: IntoIterator<Item = &'a Token>,
	{
		let mut window = ContextWindow::new(self.dim, self.order);
		for token in tokens {
			match token.class {
				TokenClass::NewLine => continue,
				TokenClass::Other if self.remove_spaces => continue,
				_ => (),
			}
			if let Some(offset) = window.push(token.symbol) {
				let count = &mut self.counts[offset];
				*count = count.saturating_add(1);
			}
		}
	}

	/// Adds the counts of `other` into this counter.
	///
	/// # Errors
	/// Returns `ShapeMismatch` if the dimensions or orders differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.dim != other.dim || self.order != other.order {
			return Err(ModelError::ShapeMismatch {
				expected_dim: self.dim,
				expected_order: self.order,
				found_dim: other.dim,
				found_order: other.order,
			});
		}

		for (count, extra) in self.counts.iter_mut().zip(&other.counts) {
			*count = count.saturating_add(*extra);
		}
		Ok(())
	}

	/// Applies the smoothing transform and freezes the model.
	///
	/// Every cell becomes `K * ln(1 + count)`: unseen n-grams stay at exactly
	/// `0.0` ("no information"), observed ones get a positive, sub-linear score.
	/// Large tables are swept on one scoped thread per CPU, each owning a
	/// contiguous index range.
	pub fn freeze(self) -> StatsTable {
		let scale = self.smoothing_scale;
		let mut cells = vec![0.0; self.counts.len()];

		if cells.len() < PARALLEL_SWEEP_THRESHOLD {
			smooth(&mut cells, &self.counts, scale);
		} else {
			let workers = num_cpus::get().max(1);
			let chunk_size = cells.len().div_ceil(workers);
			thread::scope(|scope| {
				for (out, raw) in cells.chunks_mut(chunk_size).zip(self.counts.chunks(chunk_size)) {
					scope.spawn(move || smooth(out, raw, scale));
				}
			});
		}

		let table = StatsTable::from_cells(self.dim, self.order, cells);
		info!(
			"Froze {}^{} model: {} of {} n-grams observed",
			self.dim,
			self.order,
			table.observed(),
			table.len()
		);
		table
	}
}

fn smooth(out: &mut [f64], raw: &[u32], scale: f64) {
	for (cell, &count) in out.iter_mut().zip(raw) {
		*cell = scale * (1.0 + count as f64).ln();
	}
}

/// Builds a smoothed model from a single token stream.
///
/// Uses the default smoothing scale; see [`build_with_config`] to tune it.
///
/// # Errors
/// Fails only when the table does not fit (see [`NGramCounter::new`]).
pub fn build(tokens: &[Token], dim: usize, order: usize, remove_spaces: bool) -> Result<StatsTable> {
	let config = ModelConfig { order, remove_spaces, ..ModelConfig::default() };
	build_with_config(tokens, dim, &config)
}

/// Builds a smoothed model from a single token stream with explicit settings.
pub fn build_with_config(tokens: &[Token], dim: usize, config: &ModelConfig) -> Result<StatsTable> {
	let mut counter = NGramCounter::new(dim, config)?;
	counter.add_tokens(tokens);
	Ok(counter.freeze())
}

/// Builds a model from independent documents, counting them in parallel.
///
/// Documents are split into one chunk per CPU; each worker fills a partial
/// counter and sends it back over a channel to be merged. No n-gram spans
/// two documents.
pub fn build_parallel<D>(documents: &[D], dim: usize, config: &ModelConfig) -> Result<StatsTable>
where
	D: AsRef<[Token]> + Sync,
{
	let mut total = NGramCounter::new(dim, config)?;
	if documents.is_empty() {
		return Ok(total.freeze());
	}

	let workers = num_cpus::get().clamp(1, documents.len());
	let chunk_size = documents.len().div_ceil(workers);
	debug!("Counting {} documents on {workers} workers", documents.len());

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for chunk in documents.chunks(chunk_size) {
			let tx = tx.clone();
			let mut partial = total.empty_like();
			scope.spawn(move || {
				for document in chunk {
					partial.add_tokens(document.as_ref());
				}
				if tx.send(partial).is_err() {
					warn!("Partial counter dropped: receiver closed");
				}
			});
		}
	});
	drop(tx);

	for partial in rx.iter() {
		total.merge(&partial)?;
	}
	Ok(total.freeze())
}
