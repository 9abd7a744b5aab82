use serde::{Deserialize, Serialize};

use super::indexer::MAX_TABLE_CELLS;

/// Default scale `K` of the smoothing transform `K * ln(1 + count)`.
pub const DEFAULT_SMOOTHING_SCALE: f64 = 10_000.0;

/// Default multiplier applied to `average / IC` by the scorer.
pub const DEFAULT_SCORE_SCALE: f64 = 1_000.0;

/// Parameters of an n-gram model build.
///
/// The alphabet dimension is not part of the configuration: it always comes
/// from the alphabet the tokens were produced with.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
	/// Length of the n-grams (3, 4 and 6 are the usual choices).
	pub order: usize,

	/// Elide `Other` tokens (word boundaries) from the n-gram context.
	pub remove_spaces: bool,

	/// Scale `K` of the smoothing transform.
	pub smoothing_scale: f64,

	/// Upper bound on `dim^order`.
	pub max_cells: usize,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			order: 3,
			remove_spaces: true,
			smoothing_scale: DEFAULT_SMOOTHING_SCALE,
			max_cells: MAX_TABLE_CELLS,
		}
	}
}

impl ModelConfig {
	pub fn with_order(order: usize) -> Self {
		Self { order, ..Self::default() }
	}
}

/// Weights of the fitness score.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ScoreWeights {
	pub score_scale: f64,
}

impl Default for ScoreWeights {
	fn default() -> Self {
		Self { score_scale: DEFAULT_SCORE_SCALE }
	}
}
