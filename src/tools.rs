//! Utility routines.

use itertools::Itertools;
use mpi::{
    datatype::{Partition, PartitionMut},
    traits::{CommunicatorCollectives, Equivalence, Root},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    error::SortError,
    transport::{Message, Transport},
};

/// Gather array to all processes
pub fn gather_to_all<T: Equivalence, C: CommunicatorCollectives>(arr: &[T], comm: &C) -> Vec<T> {
    // First we need to broadcast the individual sizes on each process.

    let size = comm.size();

    let local_len = arr.len() as i32;

    let mut sizes = vec![0; size as usize];

    comm.all_gather_into(&local_len, &mut sizes);

    let recv_len = sizes.iter().sum::<i32>() as usize;

    // Now we have the size of each local contribution.
    let mut recvbuffer = Vec::<T>::with_capacity(recv_len);
    let buf: &mut [T] = unsafe { std::mem::transmute(recvbuffer.spare_capacity_mut()) };

    let recv_displs = displacements(&sizes);

    let mut receiv_partition = PartitionMut::new(buf, sizes, &recv_displs[..]);

    comm.all_gather_varcount_into(arr, &mut receiv_partition);

    unsafe { recvbuffer.set_len(recv_len) };

    recvbuffer
}

/// Gather distributed array to the root rank.
///
/// The result is a `Vec<T>` on root and `None` on all other ranks.
pub fn gather_to_root<T: Equivalence, C: CommunicatorCollectives>(
    arr: &[T],
    root: usize,
    comm: &C,
) -> Option<Vec<T>> {
    let n = arr.len() as i32;
    let rank = comm.rank();
    let size = comm.size();
    let root_process = comm.process_at_rank(root as i32);

    // We first communicate the length of the array to root.

    if rank == root as i32 {
        // We are at root.

        let mut counts = vec![0_i32; size as usize];
        root_process.gather_into_root(&n, &mut counts);

        // We now have all ranks at root. Can now a varcount gather to get
        // the array elements.

        let nelements = counts.iter().sum::<i32>();
        let mut new_arr = Vec::<T>::with_capacity(nelements as usize);
        let new_arr_buf: &mut [T] = unsafe { std::mem::transmute(new_arr.spare_capacity_mut()) };

        let displs = displacements(counts.as_slice());

        let mut partition = PartitionMut::new(new_arr_buf, counts, &displs[..]);

        root_process.gather_varcount_into_root(arr, &mut partition);

        unsafe { new_arr.set_len(nelements as usize) };
        Some(new_arr)
    } else {
        root_process.gather_into(&n);
        root_process.gather_varcount_into(arr);
        None
    }
}

/// Redistribute an array via an all_to_all_varcount operation.
///
/// `counts[r]` consecutive elements of `arr` go to rank `r`. Returns the
/// received elements in source rank order together with the number of
/// elements received from each rank.
pub fn redistribute<T: Equivalence, C: CommunicatorCollectives>(
    arr: &[T],
    counts: &[i32],
    comm: &C,
) -> (Vec<T>, Vec<i32>) {
    assert_eq!(counts.len(), comm.size() as usize);

    // First send the counts around via an alltoall operation.

    let mut recv_counts = vec![0; counts.len()];

    comm.all_to_all_into(counts, &mut recv_counts);

    // We have the recv_counts. Allocate space and setup the partitions.

    let nelems = recv_counts.iter().sum::<i32>() as usize;

    let mut output = Vec::<T>::with_capacity(nelems);
    let out_buf: &mut [T] = unsafe { std::mem::transmute(output.spare_capacity_mut()) };

    let send_partition = Partition::new(arr, counts, displacements(counts));
    let mut recv_partition =
        PartitionMut::new(out_buf, &recv_counts[..], displacements(&recv_counts));

    comm.all_to_all_varcount_into(&send_partition, &mut recv_partition);

    unsafe { output.set_len(nelems) };

    (output, recv_counts)
}

/// Compute displacements from a vector of counts.
///
/// This is useful for global MPI varcount operations. Let
/// count [ 3, 4, 5]. Then the corresponding displacements are
// [0, 3, 7]. Note that the last element `5` is ignored.
pub fn displacements(counts: &[i32]) -> Vec<i32> {
    counts
        .iter()
        .scan(0, |acc, &x| {
            let tmp = *acc;
            *acc += x;
            Some(tmp)
        })
        .collect()
}

/// A vector of `len` copies of `value`.
///
/// Fails with [`SortError::AllocationFailure`] instead of aborting when the
/// memory is not available.
pub fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, SortError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(SortError::allocation(len))?;
    buf.resize(len, value);
    Ok(buf)
}

/// Check if a distributed array is sorted.
///
/// Each rank checks its own part. The boundaries between consecutive
/// non-empty parts are compared on every rank.
pub fn is_sorted_array<T: Message + PartialOrd, X: Transport>(
    arr: &[T],
    transport: &X,
) -> Result<bool, SortError> {
    let sorted = arr.iter().tuple_windows().all(|(elem1, elem2)| elem1 <= elem2);

    // Every rank contributes (sorted, non-empty, first, last).
    let (first, last) = match (arr.first(), arr.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => (T::default(), T::default()),
    };
    let flags = transport.all_gather(&[sorted as u8, !arr.is_empty() as u8])?;
    let bounds = transport.all_gather(&[first, last])?;

    let mut previous_last: Option<T> = None;
    for (flag, bound) in flags.chunks_exact(2).zip(bounds.chunks_exact(2)) {
        if flag[0] == 0 {
            return Ok(false);
        }
        if flag[1] == 0 {
            continue;
        }
        if let Some(prev) = previous_last {
            if prev > bound[0] {
                return Ok(false);
            }
        }
        previous_last = Some(bound[1]);
    }

    Ok(true)
}

/// Get a seeded rng
pub fn seeded_rng(seed: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed as u64)
}

#[cfg(test)]
mod test {
    use itertools::Itertools;

    use super::{displacements, is_sorted_array, try_filled};
    use crate::error::SortError;
    use crate::transport::{LocalGroup, Transport};

    #[test]
    fn test_displacements() {
        assert_eq!(displacements(&[3, 4, 5]), vec![0, 3, 7]);
        assert!(displacements(&[]).is_empty());
    }

    #[test]
    fn test_try_filled() {
        assert_eq!(try_filled(3, 1_u8).unwrap(), vec![1, 1, 1]);
        assert!(matches!(
            try_filled(usize::MAX, 0_u64),
            Err(SortError::AllocationFailure { .. })
        ));
    }

    #[test]
    fn test_is_sorted_array() {
        let results = LocalGroup::new(3)
            .run(|transport| {
                let rank = transport.rank() as u32;
                // Rank 1 holds nothing; the boundary check has to skip it.
                let sorted = match rank {
                    1 => vec![],
                    _ => (10 * rank..10 * rank + 5).collect_vec(),
                };
                let unsorted = vec![5 - rank, 6 - rank];
                (
                    is_sorted_array(&sorted, &transport).unwrap(),
                    is_sorted_array(&unsorted, &transport).unwrap(),
                )
            })
            .unwrap();

        assert!(results.iter().all(|&(sorted, _)| sorted));
        assert!(results.iter().all(|&(_, unsorted)| !unsorted));
    }
}
