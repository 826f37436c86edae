//! Local counting sort by a single digit.

use std::ops::Index;

use crate::constants::RADIX;
use crate::error::SortError;
use crate::tools::try_filled;
use crate::types::{digit, RadixKey};

/// Count of local elements per digit value for one digit pass.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct DigitHistogram {
    counts: [usize; RADIX],
}

impl DigitHistogram {
    /// Histogram from explicit counts.
    pub fn from_counts(counts: [usize; RADIX]) -> Self {
        Self { counts }
    }

    /// Tally the digit at position `exp` of every key.
    pub fn tally<T: RadixKey>(keys: &[T], exp: T) -> Self {
        let mut counts = [0; RADIX];
        for &key in keys {
            counts[digit(key, exp)] += 1;
        }
        Self { counts }
    }

    /// The counts, indexed by digit value.
    pub fn counts(&self) -> &[usize; RADIX] {
        &self.counts
    }

    /// Total number of tallied elements.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Inclusive prefix sum of the counts.
    ///
    /// Slot `d` holds the number of elements with digit `<= d`.
    pub fn cumulative(&self) -> [usize; RADIX] {
        let mut cumulative = self.counts;
        for d in 1..RADIX {
            cumulative[d] += cumulative[d - 1];
        }
        cumulative
    }
}

impl Index<usize> for DigitHistogram {
    type Output = usize;

    fn index(&self, digit: usize) -> &usize {
        &self.counts[digit]
    }
}

/// Stable counting sort of `keys` by the digit at position `exp`.
///
/// Returns the reordered partition together with its digit histogram. Keys
/// with equal digits keep the relative order they had on entry, which is what
/// makes the repeated passes of an LSD radix sort correct.
pub fn counting_sort_by_digit<T: RadixKey>(
    keys: &[T],
    exp: T,
) -> Result<(Vec<T>, DigitHistogram), SortError> {
    let histogram = DigitHistogram::tally(keys, exp);
    let mut cumulative = histogram.cumulative();

    let mut output = try_filled(keys.len(), T::zero())?;

    // Walk backwards so that equal digits end up in their original order.
    for &key in keys.iter().rev() {
        let d = digit(key, exp);
        cumulative[d] -= 1;
        output[cumulative[d]] = key;
    }

    Ok((output, histogram))
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use rand::Rng;

    use super::{counting_sort_by_digit, DigitHistogram};
    use crate::tools::seeded_rng;
    use crate::types::digit;

    #[test]
    fn test_histogram_counts() {
        let keys = [5_u32, 3, 3, 1, 13, 20];
        let histogram = DigitHistogram::tally(&keys, 1);

        assert_eq!(histogram[0], 1);
        assert_eq!(histogram[1], 1);
        assert_eq!(histogram[3], 3);
        assert_eq!(histogram[5], 1);
        assert_eq!(histogram.total(), keys.len());
        assert_eq!(histogram.cumulative()[9], keys.len());
        assert_eq!(histogram.cumulative()[3], 5);
    }

    #[test]
    fn test_counting_sort_is_stable() {
        // 21, 11 and 31 share their last digit and must stay in that order.
        let keys = [21_u32, 40, 11, 2, 31, 9];

        let (sorted, histogram) = counting_sort_by_digit(&keys, 1).unwrap();

        assert_eq!(sorted, vec![40, 21, 11, 31, 2, 9]);
        assert_eq!(histogram[1], 3);

        let (sorted, _) = counting_sort_by_digit(&sorted, 10).unwrap();
        assert_eq!(sorted, vec![2, 9, 11, 21, 31, 40]);
    }

    #[test]
    fn test_counting_sort_random() {
        let mut rng = seeded_rng(0);
        let keys = (0..500).map(|_| rng.gen_range(0..10_000_u64)).collect_vec();

        let (sorted, histogram) = counting_sort_by_digit(&keys, 100).unwrap();

        // Bucketed by the hundreds digit and a permutation of the input.
        assert!(sorted
            .iter()
            .tuple_windows()
            .all(|(&a, &b)| digit(a, 100) <= digit(b, 100)));
        assert_eq!(
            sorted.iter().copied().sorted().collect_vec(),
            keys.iter().copied().sorted().collect_vec()
        );
        assert_eq!(histogram.total(), keys.len());
    }

    #[test]
    fn test_empty_partition() {
        let (sorted, histogram) = counting_sort_by_digit::<u32>(&[], 1).unwrap();
        assert!(sorted.is_empty());
        assert_eq!(histogram, DigitHistogram::default());
    }
}
