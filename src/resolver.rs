//! Global destinations of the local elements in one digit pass.

use crate::constants::RADIX;
use crate::planner::OrderingPlan;
use crate::types::{digit, RadixKey};

/// Where a local element goes in the current digit pass.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Destination {
    /// Index in the global (padded) array.
    pub global_index: usize,
    /// Rank owning `global_index`.
    pub rank: usize,
    /// Index inside the owning rank's partition.
    pub slot: usize,
}

impl Destination {
    /// Split a global index into owning rank and local slot.
    pub fn from_global_index(global_index: usize, partition_size: usize) -> Self {
        Self {
            global_index,
            rank: global_index / partition_size,
            slot: global_index % partition_size,
        }
    }
}

/// Assigns consecutive global indices to the local elements of each digit bucket.
///
/// The bucket of digit `d` starts after all lower digit buckets. Inside the
/// bucket elements are ordered by source rank and then by local order, so the
/// permutation only depends on the data and not on message timing.
pub struct DestinationResolver<'p> {
    plan: &'p OrderingPlan,
    placed: [usize; RADIX],
    partition_size: usize,
}

impl<'p> DestinationResolver<'p> {
    /// New resolver for one pass.
    pub fn new(plan: &'p OrderingPlan, partition_size: usize) -> Self {
        Self {
            plan,
            placed: [0; RADIX],
            partition_size,
        }
    }

    /// Destination of the next local element with digit `d`.
    pub fn next(&mut self, d: usize) -> Destination {
        let global_index = self.plan.bucket_start(d) + self.placed[d];
        self.placed[d] += 1;
        Destination::from_global_index(global_index, self.partition_size)
    }
}

/// Pair every element of `partition` with its destination, in partition order.
pub fn resolve_destinations<'a, T: RadixKey>(
    partition: &'a [T],
    exp: T,
    plan: &'a OrderingPlan,
    partition_size: usize,
) -> impl Iterator<Item = (T, Destination)> + 'a {
    let mut resolver = DestinationResolver::new(plan, partition_size);
    partition
        .iter()
        .map(move |&value| (value, resolver.next(digit(value, exp))))
}
