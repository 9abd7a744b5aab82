//! Top-level module for the n-gram fitness system.
//!
//! A model goes through two phases:
//! - under construction (`NGramCounter`): raw counts are accumulated from
//!   token streams, possibly on several threads
//! - frozen (`StatsTable`): smoothed values, read-only, shared by scorers
//!
//! The scorer then rates candidate keys (`CandidateMapping`) against a frozen table.

/// Symbol classes and text tokenization.
pub mod alphabet;

/// Raw n-gram counting, smoothing and freezing.
pub mod builder;

/// Build and scoring parameters.
pub mod config;

/// Mixed-radix flattening of n-tuples and table capacity planning.
pub mod indexer;

/// Candidate cipher-to-plain keys.
pub mod mapping;

/// Fitness score of a candidate decipherment.
pub mod scorer;

/// Frozen smoothed table and its persistence.
pub mod stats_table;

/// Named tables loaded from a corpus folder, with on-disk caching.
pub mod store;

/// Corpus tokens.
pub mod token;

/// Rolling context of the last `n - 1` symbols.
///
/// Not exposed publicly.
mod window;

pub use alphabet::Alphabet;
pub use builder::{NGramCounter, build, build_parallel, build_with_config};
pub use config::{ModelConfig, ScoreWeights};
pub use mapping::CandidateMapping;
pub use scorer::{Scorer, index_of_coincidence, score, score_with_weights};
pub use stats_table::StatsTable;
pub use store::ModelStore;
pub use token::{Token, TokenClass};
