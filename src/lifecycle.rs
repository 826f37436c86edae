//! Driving a full distributed sort from the root array and back.

use std::fmt;
use std::time::{Duration, Instant};

use log::debug;

use crate::constants::ROOT;
use crate::error::SortError;
use crate::oracle::check_correct;
use crate::radix::digit_pass;
use crate::reference::max_value;
use crate::tools::try_filled;
use crate::transport::Transport;
use crate::types::{digit_positions, RadixKey};

/// How an array of `len` elements is split across the ranks.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PartitionPlan {
    /// Length of the original array.
    pub len: usize,
    /// Number of elements per rank.
    pub partition_size: usize,
    /// Length after padding, `partition_size * ranks`.
    pub padded_len: usize,
    /// Number of zeros prepended to the original array.
    pub padding_offset: usize,
}

impl PartitionPlan {
    /// Plan for `len` elements on `ranks` ranks.
    pub fn new(len: usize, ranks: usize) -> Self {
        let partition_size = len.div_ceil(ranks);
        let padded_len = partition_size * ranks;
        Self {
            len,
            partition_size,
            padded_len,
            padding_offset: padded_len - len,
        }
    }

    fn to_header(self) -> [usize; 4] {
        [
            self.len,
            self.partition_size,
            self.padded_len,
            self.padding_offset,
        ]
    }

    fn from_header(header: [usize; 4]) -> Self {
        Self {
            len: header[0],
            partition_size: header[1],
            padded_len: header[2],
            padding_offset: header[3],
        }
    }

    /// The input with `padding_offset` zeros in front of it.
    pub fn pad<T: RadixKey>(&self, input: &[T]) -> Result<Vec<T>, SortError> {
        let mut padded = try_filled(self.padded_len, T::zero())?;
        padded[self.padding_offset..].copy_from_slice(input);
        Ok(padded)
    }
}

/// The stages of a sort, in the order they are passed through.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Nothing distributed yet.
    Init,
    /// Every rank holds its partition.
    Scattered,
    /// The pass for the given digit position (0 is the least significant) is done.
    DigitPass(usize),
    /// The partitions are back on the root.
    Gathered,
    /// The root compared the result with the reference sort.
    Verified,
    /// The sort is finished.
    Done,
}

impl Phase {
    fn can_advance_to(self, next: Phase) -> bool {
        use Phase::{DigitPass, Done, Gathered, Init, Scattered, Verified};
        matches!(
            (self, next),
            (Init, Scattered)
                | (Scattered, DigitPass(0))
                | (Scattered, Gathered)
                | (DigitPass(_), Gathered)
                | (Gathered, Verified)
                | (Gathered, Done)
                | (Verified, Done)
        ) || matches!((self, next), (DigitPass(a), DigitPass(b)) if b == a + 1)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DigitPass(position) => write!(f, "digit pass {position}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Result of a sort on the root rank.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SortOutcome<T> {
    /// The sorted array without padding.
    pub sorted: Vec<T>,
    /// How the array was split.
    pub plan: PartitionPlan,
    /// Number of digit passes run.
    pub passes: usize,
    /// Time from padding to the stripped result. The correctness check is not included.
    pub elapsed: Duration,
}

/// Runs the distributed sort on one rank.
///
/// All ranks construct a lifecycle and call [`PartitionLifecycle::sort`] (or
/// [`PartitionLifecycle::sort_and_verify`]) together. Only the root rank passes
/// the input and only the root rank gets an outcome back.
pub struct PartitionLifecycle<'t, X: Transport> {
    transport: &'t X,
    phase: Phase,
}

impl<'t, X: Transport> PartitionLifecycle<'t, X> {
    /// A lifecycle in the [`Phase::Init`] state.
    pub fn new(transport: &'t X) -> Self {
        Self {
            transport,
            phase: Phase::Init,
        }
    }

    fn advance(&mut self, next: Phase) -> Result<(), SortError> {
        if !self.phase.can_advance_to(next) {
            return Err(SortError::ProtocolViolation(format!(
                "rank {} cannot move from {} to {next}",
                self.transport.rank(),
                self.phase
            )));
        }
        debug!("rank {}: {} -> {next}", self.transport.rank(), self.phase);
        self.phase = next;
        Ok(())
    }

    /// Sort the array held by the root rank across all ranks.
    ///
    /// `input` is required on the root rank and ignored everywhere else.
    pub fn sort<T: RadixKey>(
        &mut self,
        input: Option<&[T]>,
    ) -> Result<Option<SortOutcome<T>>, SortError> {
        let transport = self.transport;
        let rank = transport.rank();
        let size = transport.size();

        // Init: the root pads the array and finds the maximum.
        let start = Instant::now();
        let mut header = [0_usize; 4];
        let mut max = [T::zero()];
        let mut padded = None;

        if rank == ROOT {
            let input = input.ok_or(SortError::MissingInput { rank })?;
            let plan = PartitionPlan::new(input.len(), size);
            header = plan.to_header();
            max[0] = max_value(input);
            padded = Some(plan.pad(input)?);
        }

        // All ranks need the maximum to know the number of digit passes and
        // the plan to know their partition size.
        transport.broadcast(&mut max, ROOT)?;
        transport.broadcast(&mut header, ROOT)?;
        let plan = PartitionPlan::from_header(header);
        let max = max[0];

        transport.barrier()?;
        let mut partition = transport.scatter(padded.as_deref(), plan.partition_size, ROOT)?;
        drop(padded);
        transport.barrier()?;
        self.advance(Phase::Scattered)?;

        let mut passes = 0;
        for exp in digit_positions(max) {
            partition = digit_pass(&partition, exp, transport)?;
            self.advance(Phase::DigitPass(passes))?;
            passes += 1;
        }

        // We now collect the partitions in rank order on root and strip the
        // leading zeros that were added for the even split.
        let gathered = transport.gather(&partition, ROOT)?;
        self.advance(Phase::Gathered)?;

        Ok(gathered.map(|mut sorted| {
            sorted.drain(..plan.padding_offset);
            SortOutcome {
                sorted,
                plan,
                passes,
                elapsed: start.elapsed(),
            }
        }))
    }

    /// [`Self::sort`] followed by a check of the result against the serial
    /// reference sort on the root rank.
    pub fn sort_and_verify<T: RadixKey>(
        &mut self,
        input: Option<&[T]>,
    ) -> Result<Option<SortOutcome<T>>, SortError> {
        let outcome = self.sort(input)?;

        if let (Some(outcome), Some(input)) = (&outcome, input) {
            check_correct(input, &outcome.sorted)?;
            self.advance(Phase::Verified)?;
        }

        self.advance(Phase::Done)?;
        Ok(outcome)
    }
}

/// Sort the root rank's array across all ranks of `transport`.
///
/// Returns the sorted array on the root rank and `None` elsewhere.
pub fn distributed_radix_sort<T: RadixKey, X: Transport>(
    input: Option<&[T]>,
    transport: &X,
) -> Result<Option<Vec<T>>, SortError> {
    let mut lifecycle = PartitionLifecycle::new(transport);
    let outcome = lifecycle.sort(input)?;
    lifecycle.advance(Phase::Done)?;
    Ok(outcome.map(|outcome| outcome.sorted))
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use rand::Rng;
    use rand_distr::{Distribution, Geometric};

    use super::{distributed_radix_sort, PartitionLifecycle, PartitionPlan, Phase, SortOutcome};
    use crate::error::SortError;
    use crate::tools::seeded_rng;
    use crate::transport::{LocalGroup, Transport};

    fn sort_on(size: usize, input: &[u32]) -> SortOutcome<u32> {
        let mut results = LocalGroup::new(size)
            .run(|transport| {
                let input = transport.is_root().then_some(input);
                PartitionLifecycle::new(&transport).sort_and_verify(input)
            })
            .unwrap()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(results.iter().skip(1).all(|outcome| outcome.is_none()));
        results.swap_remove(0).unwrap()
    }

    #[test]
    fn test_partition_plan() {
        let plan = PartitionPlan::new(7, 3);
        assert_eq!(plan.partition_size, 3);
        assert_eq!(plan.padded_len, 9);
        assert_eq!(plan.padding_offset, 2);

        let plan = PartitionPlan::new(4, 4);
        assert_eq!(plan.padding_offset, 0);

        let plan = PartitionPlan::new(0, 3);
        assert_eq!(plan.padded_len, 0);

        assert_eq!(PartitionPlan::new(2, 3).pad(&[5_u32, 6]).unwrap(), vec![0, 5, 6]);
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::Init.can_advance_to(Phase::Scattered));
        assert!(Phase::DigitPass(1).can_advance_to(Phase::DigitPass(2)));
        assert!(!Phase::DigitPass(1).can_advance_to(Phase::DigitPass(1)));
        assert!(!Phase::Init.can_advance_to(Phase::Gathered));
        assert!(!Phase::Done.can_advance_to(Phase::Init));
    }

    #[test]
    fn test_single_rank() {
        let outcome = sort_on(1, &[5, 3, 3, 1]);
        assert_eq!(outcome.sorted, vec![1, 3, 3, 5]);
        assert_eq!(outcome.passes, 1);
    }

    #[test]
    fn test_no_padding() {
        let outcome = sort_on(4, &[40, 10, 20, 30]);
        assert_eq!(outcome.sorted, vec![10, 20, 30, 40]);
        assert_eq!(outcome.plan.padding_offset, 0);
        assert_eq!(outcome.passes, 2);
    }

    #[test]
    fn test_padding_is_stripped() {
        let input = [12, 7, 30, 1, 7, 19, 4];
        let outcome = sort_on(3, &input);
        assert_eq!(outcome.plan.padded_len, 9);
        assert_eq!(outcome.plan.padding_offset, 2);
        assert_eq!(outcome.sorted, vec![1, 4, 7, 7, 12, 19, 30]);
    }

    #[test]
    fn test_duplicates() {
        let outcome = sort_on(2, &[4, 4, 2, 2]);
        assert_eq!(outcome.sorted, vec![2, 2, 4, 4]);
    }

    #[test]
    fn test_singleton_on_many_ranks() {
        let outcome = sort_on(5, &[42]);
        assert_eq!(outcome.sorted, vec![42]);
        assert_eq!(outcome.plan.padding_offset, 4);
    }

    #[test]
    fn test_empty_and_all_zero() {
        assert!(sort_on(3, &[]).sorted.is_empty());

        let outcome = sort_on(3, &[0, 0, 0, 0]);
        assert_eq!(outcome.sorted, vec![0, 0, 0, 0]);
        assert_eq!(outcome.passes, 0);
    }

    #[test]
    fn test_matches_reference_for_many_sizes() {
        let mut rng = seeded_rng(22443);
        for size in 1..=6 {
            for len in [1, 2, 5, 17, 64, 257] {
                let input = (0..len)
                    .map(|_| rng.gen_range(0..=len as u32 * 10))
                    .collect_vec();
                let outcome = sort_on(size, &input);
                assert_eq!(outcome.sorted, input.iter().copied().sorted().collect_vec());
            }
        }
    }

    #[test]
    fn test_skewed_input() {
        // Many duplicates of small values and a long tail.
        let mut rng = seeded_rng(7931);
        let geometric = Geometric::new(0.05).unwrap();
        let input = (0..300)
            .map(|_| geometric.sample(&mut rng) as u32)
            .collect_vec();

        let outcome = sort_on(4, &input);
        assert_eq!(outcome.sorted, input.iter().copied().sorted().collect_vec());
    }

    #[test]
    fn test_already_sorted_input_is_unchanged() {
        let input = (0..100).map(|i| i * 3).collect_vec();
        let outcome = sort_on(3, &input);
        assert_eq!(outcome.sorted, input);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let mut rng = seeded_rng(124);
        let input = (0..200).map(|_| rng.gen_range(0..=200_u32)).collect_vec();

        let first = sort_on(4, &input);
        let second = sort_on(4, &input);
        assert_eq!(first.sorted, second.sorted);
        assert_eq!(first.passes, second.passes);
    }

    #[test]
    fn test_wide_keys() {
        let input = vec![u64::MAX, 0, 1 << 40, 12345678901234, u64::MAX - 1];
        let results = LocalGroup::new(2)
            .run(|transport| {
                let input = transport.is_root().then_some(input.as_slice());
                distributed_radix_sort(input, &transport)
            })
            .unwrap();

        assert_eq!(
            results[0].clone().unwrap(),
            Some(input.iter().copied().sorted().collect_vec())
        );
        assert_eq!(results[1].clone().unwrap(), None);
    }

    #[test]
    fn test_missing_root_input() {
        let results = LocalGroup::new(1)
            .run(|transport| distributed_radix_sort::<u32, _>(None, &transport))
            .unwrap();

        assert_eq!(results[0], Err(SortError::MissingInput { rank: 0 }));
    }
}
