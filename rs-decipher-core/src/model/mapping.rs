use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A (possibly partial) cipher-to-plain key.
///
/// Entry `c` holds the plain-alphabet index cipher symbol `c` deciphers to,
/// or `None` while the search has not assigned it yet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CandidateMapping {
	plain: Vec<Option<usize>>,
}

impl CandidateMapping {
	/// A mapping of `len` cipher symbols, none of them assigned.
	pub fn unmapped(len: usize) -> Self {
		Self { plain: vec![None; len] }
	}

	/// Maps every cipher symbol `c` to plain symbol `c`.
	pub fn identity(len: usize) -> Self {
		Self { plain: (0..len).map(Some).collect() }
	}

	pub fn from_slice(plain: &[Option<usize>]) -> Self {
		Self { plain: plain.to_vec() }
	}

	/// A random bijection between `len` cipher and `len` plain symbols.
	pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
		let mut plain: Vec<Option<usize>> = (0..len).map(Some).collect();
		plain.shuffle(rng);
		Self { plain }
	}

	/// Plain symbol of cipher symbol `c`; out-of-range symbols are unmapped.
	#[inline]
	pub fn get(&self, c: usize) -> Option<usize> {
		self.plain.get(c).copied().flatten()
	}

	/// Assigns `c -> p`. Panics if `c` is out of range.
	pub fn set(&mut self, c: usize, p: usize) {
		self.plain[c] = Some(p);
	}

	/// Removes the assignment of `c`.
	pub fn clear(&mut self, c: usize) {
		self.plain[c] = None;
	}

	/// Exchanges the plain symbols of two cipher symbols.
	pub fn swap(&mut self, a: usize, b: usize) {
		self.plain.swap(a, b);
	}

	/// Number of cipher symbols.
	pub fn len(&self) -> usize {
		self.plain.len()
	}

	pub fn is_empty(&self) -> bool {
		self.plain.is_empty()
	}

	/// Number of assigned cipher symbols.
	pub fn mapped_count(&self) -> usize {
		self.plain.iter().filter(|p| p.is_some()).count()
	}

	pub fn as_slice(&self) -> &[Option<usize>] {
		&self.plain
	}
}

impl From<Vec<Option<usize>>> for CandidateMapping {
	fn from(plain: Vec<Option<usize>>) -> Self {
		Self { plain }
	}
}
