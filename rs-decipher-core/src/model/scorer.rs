use super::config::ScoreWeights;
use super::mapping::CandidateMapping;
use super::stats_table::StatsTable;
use super::window::ContextWindow;

/// Index of coincidence of a monogram histogram, scaled by alphabet size.
///
/// `dim * Σ (count / total)^2`: `1.0` for a uniform distribution, `dim` when
/// every symbol is the same. Returns `0.0` for an empty histogram.
pub fn index_of_coincidence(counts: &[usize], total: usize) -> f64 {
	if total == 0 {
		return 0.0;
	}
	let total = total as f64;
	let sum: f64 = counts
		.iter()
		.map(|&count| {
			let frequency = count as f64 / total;
			frequency * frequency
		})
		.sum();
	counts.len() as f64 * sum
}

/// Fitness of a candidate decipherment with the default weights.
///
/// See [`score_with_weights`].
#[inline]
pub fn score(c_to_p: &CandidateMapping, c_array: &[Option<usize>], table: &StatsTable, p_counts: &mut [usize]) -> f64 {
	score_with_weights(c_to_p, c_array, table, p_counts, ScoreWeights::default())
}

/// Fitness of a candidate decipherment: higher is better.
///
/// Deciphers `c_array` through `c_to_p`, averages the table value of every
/// n-gram with full context, and divides by the index of coincidence of the
/// deciphered monograms so that keys collapsing many cipher symbols onto a
/// frequent plain symbol are penalized.
///
/// # Notes
/// - `p_counts` (length `table.dim()`) is reset and left holding the monogram
///   histogram of the decipherment. Reusing it keeps the call allocation-free.
/// - Unmapped or missing symbols break continuity: no n-gram spans them.
/// - Returns `0.0` when no n-gram or no monogram could be formed.
/// - Plain indices produced by the mapping must be `< table.dim()`.
/// - Counters grow by at most one per element of `c_array`, so `usize`
///   never overflows.
pub fn score_with_weights(
	c_to_p: &CandidateMapping,
	c_array: &[Option<usize>],
	table: &StatsTable,
	p_counts: &mut [usize],
	weights: ScoreWeights,
) -> f64 {
	debug_assert_eq!(p_counts.len(), table.dim());
	p_counts.fill(0);

	let mut window = ContextWindow::new(table.dim(), table.order());
	let mut running_score = 0.0;
	let mut total_ngrams = 0usize;
	let mut total_monograms = 0usize;

	for &c in c_array {
		let p = c.and_then(|c| c_to_p.get(c));
		if let Some(p) = p {
			p_counts[p] += 1;
			total_monograms += 1;
		}
		if let Some(offset) = window.push(p) {
			running_score += table.cell(offset);
			total_ngrams += 1;
		}
	}

	if total_ngrams == 0 || total_monograms == 0 {
		return 0.0;
	}

	let average = running_score / total_ngrams as f64;
	let ic = index_of_coincidence(p_counts, total_monograms);
	weights.score_scale * average / ic
}

/// A scoring worker bound to one frozen table.
///
/// Owns its monogram buffer, so a search running on several threads keeps one
/// `Scorer` per thread and shares the table read-only.
#[derive(Debug, Clone)]
pub struct Scorer<'t> {
	table: &'t StatsTable,
	weights: ScoreWeights,
	p_counts: Vec<usize>,
}

impl<'t> Scorer<'t> {
	pub fn new(table: &'t StatsTable) -> Self {
		Self::with_weights(table, ScoreWeights::default())
	}

	pub fn with_weights(table: &'t StatsTable, weights: ScoreWeights) -> Self {
		Self { table, weights, p_counts: vec![0; table.dim()] }
	}

	pub fn table(&self) -> &'t StatsTable {
		self.table
	}

	/// Scores `c_array` deciphered through `c_to_p`.
	pub fn score(&mut self, c_to_p: &CandidateMapping, c_array: &[Option<usize>]) -> f64 {
		score_with_weights(c_to_p, c_array, self.table, &mut self.p_counts, self.weights)
	}

	/// Monogram histogram of the last scored decipherment.
	pub fn monograms(&self) -> &[usize] {
		&self.p_counts
	}
}
