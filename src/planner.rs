//! Global ordering plan for one digit pass.
//!
//! Every rank gathers the histograms of all ranks and derives the same
//! global tables from them. There is no coordinating rank.

use crate::constants::RADIX;
use crate::error::SortError;
use crate::histogram::DigitHistogram;

/// Global tables derived from all ranks' histograms for one digit pass.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct OrderingPlan {
    global_counts: [usize; RADIX],
    cumulative: [usize; RADIX],
    left_of_me: [usize; RADIX],
}

impl OrderingPlan {
    /// Build the plan for `rank` from the histograms of all ranks, in rank order.
    pub fn new(histograms: &[DigitHistogram], rank: usize) -> Self {
        let mut global_counts = [0; RADIX];
        let mut left_of_me = [0; RADIX];

        for (owner, histogram) in histograms.iter().enumerate() {
            for (d, &count) in histogram.counts().iter().enumerate() {
                global_counts[d] += count;
                if owner < rank {
                    left_of_me[d] += count;
                }
            }
        }

        let cumulative = DigitHistogram::from_counts(global_counts).cumulative();

        Self {
            global_counts,
            cumulative,
            left_of_me,
        }
    }

    /// Build the plan from the flat all-gathered table of `RADIX` counts per rank.
    pub fn from_table(table: &[usize], rank: usize) -> Result<Self, SortError> {
        if table.len() % RADIX != 0 {
            return Err(SortError::ProtocolViolation(format!(
                "histogram table of length {} is not a multiple of {RADIX}",
                table.len()
            )));
        }

        let histograms = table
            .chunks_exact(RADIX)
            .map(|chunk| {
                let mut counts = [0; RADIX];
                counts.copy_from_slice(chunk);
                DigitHistogram::from_counts(counts)
            })
            .collect::<Vec<_>>();

        Ok(Self::new(&histograms, rank))
    }

    /// Number of elements with digit `d` across all ranks.
    pub fn global_counts(&self) -> &[usize; RADIX] {
        &self.global_counts
    }

    /// Number of elements with digit `<= d` across all ranks.
    pub fn cumulative(&self) -> &[usize; RADIX] {
        &self.cumulative
    }

    /// Number of elements with digit `d` held by lower ranks.
    pub fn left_of_me(&self) -> &[usize; RADIX] {
        &self.left_of_me
    }

    /// First global index of this rank's elements with digit `d`.
    pub fn bucket_start(&self, d: usize) -> usize {
        self.cumulative[d] - self.global_counts[d] + self.left_of_me[d]
    }

    /// Total number of elements in the pass.
    pub fn total(&self) -> usize {
        self.cumulative[RADIX - 1]
    }
}

#[cfg(test)]
mod test {
    use super::OrderingPlan;
    use crate::histogram::DigitHistogram;

    fn histogram(pairs: &[(usize, usize)]) -> DigitHistogram {
        let mut counts = [0; 10];
        for &(d, c) in pairs {
            counts[d] = c;
        }
        DigitHistogram::from_counts(counts)
    }

    #[test]
    fn test_plan_tables() {
        let histograms = [
            histogram(&[(0, 1), (3, 2)]),
            histogram(&[(0, 2), (5, 1)]),
            histogram(&[(3, 1), (5, 2)]),
        ];

        let plan = OrderingPlan::new(&histograms, 2);

        assert_eq!(plan.global_counts()[0], 3);
        assert_eq!(plan.global_counts()[3], 3);
        assert_eq!(plan.global_counts()[5], 3);

        assert_eq!(plan.cumulative()[0], 3);
        assert_eq!(plan.cumulative()[3], 6);
        assert_eq!(plan.cumulative()[9], 9);

        assert_eq!(plan.left_of_me()[0], 3);
        assert_eq!(plan.left_of_me()[3], 2);
        assert_eq!(plan.left_of_me()[5], 1);

        // Rank 2's digit-3 elements follow the two from rank 0.
        assert_eq!(plan.bucket_start(3), 5);
        assert_eq!(plan.bucket_start(5), 7);
        assert_eq!(plan.total(), 9);
    }

    #[test]
    fn test_rank_zero_has_nothing_left() {
        let histograms = [histogram(&[(1, 4)]), histogram(&[(1, 4)])];
        let plan = OrderingPlan::new(&histograms, 0);

        assert!(plan.left_of_me().iter().all(|&c| c == 0));
        assert_eq!(plan.bucket_start(1), 0);
    }

    #[test]
    fn test_every_rank_agrees_on_global_tables() {
        let histograms = [histogram(&[(2, 3)]), histogram(&[(7, 1), (2, 1)])];

        let plans = (0..2)
            .map(|rank| OrderingPlan::new(&histograms, rank))
            .collect::<Vec<_>>();

        assert_eq!(plans[0].cumulative(), plans[1].cumulative());
        assert_eq!(plans[0].global_counts(), plans[1].global_counts());
    }

    #[test]
    fn test_from_table() {
        let mut table = vec![0; 20];
        table[4] = 2;
        table[14] = 1;

        let plan = OrderingPlan::from_table(&table, 1).unwrap();
        assert_eq!(plan.left_of_me()[4], 2);
        assert_eq!(plan.global_counts()[4], 3);

        assert!(OrderingPlan::from_table(&table[..15], 1).is_err());
    }
}
