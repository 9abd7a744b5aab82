use log::warn;

use crate::error::{ModelError, Result};

/// Largest number of cells a dense table may hold.
///
/// Matches the maximum array length of the reference tables, so that a table
/// accepted here is accepted everywhere a trained model is exchanged.
pub const MAX_TABLE_CELLS: usize = i32::MAX as usize;

/// Flattens an n-tuple of symbol indices into a table offset (Horner scheme).
///
/// `offset = p1; offset = offset * dim + p_i` for the remaining positions.
///
/// # Notes
/// - Every `p_i` must lie in `[0, dim)`. This is only checked in debug builds:
///   the function sits on the scoring hot path.
#[inline]
pub fn index(tuple: &[usize], dim: usize) -> usize {
	tuple.iter().fold(0, |offset, &p| {
		debug_assert!(p < dim, "symbol {p} out of range for dimension {dim}");
		offset * dim + p
	})
}

/// Inverse of [`index`]: expands an offset back into its `order` symbols.
pub fn unindex(mut offset: usize, dim: usize, order: usize) -> Vec<usize> {
	let mut tuple = vec![0; order];
	for slot in tuple.iter_mut().rev() {
		*slot = offset % dim;
		offset /= dim;
	}
	tuple
}

/// Exact `dim^order`, or `None` on overflow.
fn checked_cells(dim: usize, order: usize) -> Option<usize> {
	u32::try_from(order).ok().and_then(|exp| dim.checked_pow(exp))
}

fn fits(dim: usize, order: usize, limit: usize) -> bool {
	checked_cells(dim, order).is_some_and(|cells| cells <= limit)
}

/// Returns the greatest `d` such that `d^order <= limit`.
///
/// Starts from `floor(exp(ln(limit) / order))` and corrects the float
/// estimate with exact integer powers, so `d^order <= limit < (d+1)^order`.
pub fn max_admissible_dim(order: usize, limit: usize) -> usize {
	if order == 0 {
		return 0;
	}
	let estimate = ((limit as f64).ln() / order as f64).exp().floor();
	let mut dim = if estimate.is_finite() && estimate > 0.0 { estimate as usize } else { 0 };

	while dim > 0 && !fits(dim, order, limit) {
		dim -= 1;
	}
	while fits(dim + 1, order, limit) {
		dim += 1;
	}
	dim
}

/// Number of cells needed for a `dim^order` table, checked against
/// [`MAX_TABLE_CELLS`].
///
/// # Errors
/// - `InvalidDimension` / `InvalidOrder` for zero parameters
/// - `CapacityExceeded` if the table would not fit
pub fn table_cells(dim: usize, order: usize) -> Result<usize> {
	table_cells_with_limit(dim, order, MAX_TABLE_CELLS)
}

/// Same as [`table_cells`] with a caller-provided cell limit.
pub fn table_cells_with_limit(dim: usize, order: usize, limit: usize) -> Result<usize> {
	if dim == 0 {
		return Err(ModelError::InvalidDimension(dim));
	}
	if order == 0 {
		return Err(ModelError::InvalidOrder(order));
	}

	match checked_cells(dim, order) {
		Some(cells) if cells <= limit => Ok(cells),
		_ => {
			let max_dim = max_admissible_dim(order, limit);
			warn!("Refusing {dim}^{order} table (limit {limit} cells, max dimension {max_dim})");
			Err(ModelError::CapacityExceeded { dim, order, max_dim })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashSet;

	#[rstest]
	#[case(2, 3)]
	#[case(3, 4)]
	#[case(5, 2)]
	#[case(27, 3)]
	fn index_is_a_bijection(#[case] dim: usize, #[case] order: usize) {
		let cells = dim.pow(order as u32);
		let mut seen = HashSet::new();
		for offset in 0..cells {
			let tuple = unindex(offset, dim, order);
			assert!(tuple.iter().all(|&p| p < dim));
			let back = index(&tuple, dim);
			assert_eq!(back, offset);
			assert!(seen.insert(tuple));
		}
		assert_eq!(seen.len(), cells);
	}

	#[test]
	fn index_is_big_endian() {
		assert_eq!(index(&[1, 0, 1], 2), 5);
		assert_eq!(index(&[0, 1, 0], 2), 2);
		assert_eq!(index(&[2, 25, 7], 26), 2 * 676 + 25 * 26 + 7);
	}

	#[rstest]
	#[case(1)]
	#[case(3)]
	#[case(4)]
	#[case(6)]
	#[case(31)]
	fn max_dim_is_tight(#[case] order: usize) {
		let d = max_admissible_dim(order, MAX_TABLE_CELLS);
		assert!(fits(d, order, MAX_TABLE_CELLS));
		assert!(!fits(d + 1, order, MAX_TABLE_CELLS));
	}

	#[test]
	fn known_limits() {
		// 1290^3 = 2_146_689_000 and 1291^3 = 2_151_685_171
		assert_eq!(max_admissible_dim(3, MAX_TABLE_CELLS), 1290);
		// 215^4 = 2_136_750_625 and 216^4 = 2_176_782_336
		assert_eq!(max_admissible_dim(4, MAX_TABLE_CELLS), 215);
		assert_eq!(max_admissible_dim(2, 100), 10);
		assert_eq!(max_admissible_dim(2, 99), 9);
		assert_eq!(max_admissible_dim(3, 0), 0);
	}

	#[test]
	fn capacity_error_reports_max_dim() {
		match table_cells(1291, 3) {
			Err(ModelError::CapacityExceeded { dim, order, max_dim }) => {
				assert_eq!((dim, order, max_dim), (1291, 3, 1290));
			}
			other => panic!("expected capacity error, got {other:?}"),
		}
		assert_eq!(table_cells(1290, 3).unwrap(), 2_146_689_000);
	}

	#[test]
	fn overflowing_power_is_a_capacity_error() {
		assert!(matches!(
			table_cells(usize::MAX, 6),
			Err(ModelError::CapacityExceeded { max_dim: 35, .. })
		));
	}

	#[test]
	fn zero_parameters_are_rejected() {
		assert!(matches!(table_cells(0, 3), Err(ModelError::InvalidDimension(0))));
		assert!(matches!(table_cells(26, 0), Err(ModelError::InvalidOrder(0))));
	}

	#[test]
	fn custom_limit() {
		assert_eq!(table_cells_with_limit(10, 2, 100).unwrap(), 100);
		assert!(matches!(
			table_cells_with_limit(11, 2, 100),
			Err(ModelError::CapacityExceeded { max_dim: 10, .. })
		));
	}
}
