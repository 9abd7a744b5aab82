use serde::{Deserialize, Serialize};

/// Class of a corpus token as produced by a tokenizer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenClass {
	/// A letter of the alphabet.
	Letter,
	/// Anything else (word boundary, punctuation). May still carry a symbol,
	/// e.g. a "space" class of the alphabet.
	Other,
	/// End of a line. Never carries a symbol and is invisible to the model.
	NewLine,
}

/// A classified corpus token.
///
/// # Invariants
/// - `symbol`, when present, lies in `[0, dim)` of the alphabet that produced it
/// - a `NewLine` token has no symbol
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token {
	pub class: TokenClass,
	pub symbol: Option<usize>,
}

impl Token {
	pub fn letter(symbol: usize) -> Self {
		Self { class: TokenClass::Letter, symbol: Some(symbol) }
	}

	pub fn other(symbol: Option<usize>) -> Self {
		Self { class: TokenClass::Other, symbol }
	}

	pub fn new_line() -> Self {
		Self { class: TokenClass::NewLine, symbol: None }
	}
}
