//! Comparison of the distributed result against the serial reference sort.

use log::error;

use crate::error::SortError;
use crate::reference::serial_radix_sort;
use crate::tools::try_filled;
use crate::types::RadixKey;

/// Sort a copy of `original` serially and compare it with `sorted`.
///
/// The original is left untouched. Any difference, including a different
/// length, is a [`SortError::CorrectnessMismatch`].
pub fn check_correct<T: RadixKey>(original: &[T], sorted: &[T]) -> Result<(), SortError> {
    let mut expected = try_filled(original.len(), T::zero())?;
    expected.copy_from_slice(original);
    serial_radix_sort(&mut expected)?;

    let mismatch = expected
        .iter()
        .zip(sorted)
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != sorted.len()).then(|| expected.len().min(sorted.len())));

    match mismatch {
        Some(index) => {
            error!(
                "distributed result of {} elements differs from the reference at index {index}",
                original.len()
            );
            Err(SortError::CorrectnessMismatch { index })
        }
        None => Ok(()),
    }
}
