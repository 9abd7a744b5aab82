/// Sliding context over the last `order - 1` resolved symbols.
///
/// Instead of storing the symbols, the window keeps their flattened
/// mixed-radix offset modulo `dim^(order-1)` together with the number of
/// consecutive resolved symbols seen so far. Pushing a symbol then yields the
/// n-gram offset `prefix * dim + p` directly, which is exactly what
/// [`index`](super::indexer::index) would compute for the full tuple.
///
/// # Invariants
/// - `prefix < prefix_cells`
/// - `run` never exceeds `order - 1`
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContextWindow {
	dim: usize,
	context: usize,
	prefix_cells: usize,
	prefix: usize,
	run: usize,
}

impl ContextWindow {
	/// Creates an empty window for n-grams of `order` symbols over `dim`.
	///
	/// `dim^order` must already have passed the capacity check, so
	/// `dim^(order-1)` cannot overflow.
	pub(crate) fn new(dim: usize, order: usize) -> Self {
		let context = order - 1;
		Self {
			dim,
			context,
			prefix_cells: dim.pow(context as u32),
			prefix: 0,
			run: 0,
		}
	}

	/// Pushes the next position of the sequence.
	///
	/// Returns the flattened n-gram offset when the previous `order - 1`
	/// positions were all resolved. `None` breaks continuity: no n-gram may
	/// span it.
	#[inline]
	pub(crate) fn push(&mut self, symbol: Option<usize>) -> Option<usize> {
		let Some(p) = symbol else {
			self.reset();
			return None;
		};

		let offset = self.prefix * self.dim + p;
		let complete = self.run == self.context;
		self.prefix = offset % self.prefix_cells;
		if !complete {
			self.run += 1;
		}
		complete.then_some(offset)
	}

	/// Forgets every position seen so far.
	#[inline]
	pub(crate) fn reset(&mut self) {
		self.prefix = 0;
		self.run = 0;
	}
}
