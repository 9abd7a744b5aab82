use serde::{Deserialize, Serialize};

use super::mapping::CandidateMapping;
use super::token::{Token, TokenClass};

/// Ordered set of symbol classes a model is built over.
///
/// Letters take indices `0..letters.len()`; the optional word boundary takes
/// the next index. A table is only meaningful for the exact ordering of the
/// alphabet it was built with.
///
/// # Notes
/// - Input is lowercased before lookup.
/// - Any whitespace except `\n` maps to the word boundary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
	letters: Vec<char>,
	boundary: Option<char>,
}

impl Alphabet {
	/// Builds an alphabet from its letters and an optional boundary symbol
	/// (used when rendering deciphered text).
	pub fn new(letters: &str, boundary: Option<char>) -> Self {
		let mut seen = Vec::new();
		for c in letters.chars().flat_map(char::to_lowercase) {
			if !seen.contains(&c) {
				seen.push(c);
			}
		}
		Self { letters: seen, boundary }
	}

	/// `a..z`, dimension 26.
	pub fn latin() -> Self {
		Self::new("abcdefghijklmnopqrstuvwxyz", None)
	}

	/// `a..z` plus a space class, dimension 27.
	pub fn latin_with_space() -> Self {
		Self::new("abcdefghijklmnopqrstuvwxyz", Some(' '))
	}

	/// Number of symbol classes.
	pub fn dim(&self) -> usize {
		self.letters.len() + usize::from(self.boundary.is_some())
	}

	/// Index of the word boundary class, if any.
	pub fn boundary_symbol(&self) -> Option<usize> {
		self.boundary.map(|_| self.letters.len())
	}

	/// Index of a letter, or `None` if `c` is not a letter of the alphabet.
	pub fn symbol_of(&self, c: char) -> Option<usize> {
		let c = c.to_lowercase().next()?;
		self.letters.iter().position(|&l| l == c)
	}

	/// Character of a symbol index.
	pub fn char_of(&self, symbol: usize) -> Option<char> {
		match self.letters.get(symbol) {
			Some(&c) => Some(c),
			None if Some(symbol) == self.boundary_symbol() => self.boundary,
			None => None,
		}
	}

	/// Classifies every character of `text`.
	///
	/// - letters → `Letter`
	/// - `\n` → `NewLine` (`\r` is dropped)
	/// - other whitespace → `Other` carrying the boundary symbol (if any)
	/// - anything else → `Other` without symbol
	pub fn tokenize(&self, text: &str) -> Vec<Token> {
		text.chars()
			.filter(|&c| c != '\r')
			.map(|c| match self.symbol_of(c) {
				Some(symbol) => Token::letter(symbol),
				None if c == '\n' => Token::new_line(),
				None if c.is_whitespace() => Token::other(self.boundary_symbol()),
				None => Token::other(None),
			})
			.collect()
	}

	/// Converts text into a cipher-symbol sequence.
	///
	/// Line breaks are dropped; word boundaries keep their symbol when the
	/// alphabet has one, other non-letters become "no symbol" markers.
	pub fn encode(&self, text: &str) -> Vec<Option<usize>> {
		self.tokenize(text)
			.into_iter()
			.filter(|token| token.class != TokenClass::NewLine)
			.map(|token| token.symbol)
			.collect()
	}

	/// Renders a cipher sequence through a mapping; unmapped positions
	/// become `placeholder`.
	pub fn decode(&self, c_array: &[Option<usize>], mapping: &CandidateMapping, placeholder: char) -> String {
		c_array
			.iter()
			.map(|&c| c.and_then(|c| mapping.get(c)).and_then(|p| self.char_of(p)).unwrap_or(placeholder))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Alphabet::latin(), 26, None)]
	#[case(Alphabet::latin_with_space(), 27, Some(26))]
	fn dimensions(#[case] alphabet: Alphabet, #[case] dim: usize, #[case] boundary: Option<usize>) {
		assert_eq!(alphabet.dim(), dim);
		assert_eq!(alphabet.boundary_symbol(), boundary);
	}

	#[test]
	fn tokenize_classes() {
		let alphabet = Alphabet::latin_with_space();
		let tokens = alphabet.tokenize("Ab c,\r\nz");
		let classes: Vec<_> = tokens.iter().map(|t| t.class).collect();
		assert_eq!(
			classes,
			vec![
				TokenClass::Letter,
				TokenClass::Letter,
				TokenClass::Other,
				TokenClass::Letter,
				TokenClass::Other,
				TokenClass::NewLine,
				TokenClass::Letter
			]
		);
		let symbols: Vec<_> = tokens.iter().map(|t| t.symbol).collect();
		assert_eq!(symbols, vec![Some(0), Some(1), Some(26), Some(2), None, None, Some(25)]);
	}

	#[test]
	fn encode_and_decode() {
		let alphabet = Alphabet::latin();
		let c_array = alphabet.encode("hi there\nyou");
		assert_eq!(c_array.len(), 11);
		assert_eq!(c_array[2], None);
		assert_eq!(alphabet.decode(&c_array, &CandidateMapping::identity(26), '_'), "hi_thereyou");
		assert_eq!(alphabet.decode(&c_array[..2], &CandidateMapping::unmapped(26), '?'), "??");
	}

	#[test]
	fn duplicate_letters_are_ignored() {
		let alphabet = Alphabet::new("abBa", None);
		assert_eq!(alphabet.dim(), 2);
		assert_eq!(alphabet.char_of(2), None);
	}
}
