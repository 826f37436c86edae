//! Transport over an MPI communicator.

use itertools::Itertools;
use mpi::traits::{CommunicatorCollectives, Root};

use super::{check_block_count, check_scatter_input, Message, Transport};
use crate::error::SortError;
use crate::tools::{gather_to_all, gather_to_root, redistribute, try_filled};

/// A [`Transport`] backed by an MPI communicator, one process per rank.
///
/// MPI aborts the job on communication failures, so apart from input
/// validation the operations here always succeed.
pub struct MpiTransport<'c, C: CommunicatorCollectives> {
    comm: &'c C,
}

impl<'c, C: CommunicatorCollectives> MpiTransport<'c, C> {
    /// Wrap a communicator.
    pub fn new(comm: &'c C) -> Self {
        Self { comm }
    }
}

impl<C: CommunicatorCollectives> Transport for MpiTransport<'_, C> {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn barrier(&self) -> Result<(), SortError> {
        self.comm.barrier();
        Ok(())
    }

    fn broadcast<T: Message>(&self, buf: &mut [T], root: usize) -> Result<(), SortError> {
        self.comm
            .process_at_rank(root as i32)
            .broadcast_into(buf);
        Ok(())
    }

    fn scatter<T: Message>(
        &self,
        send: Option<&[T]>,
        chunk_len: usize,
        root: usize,
    ) -> Result<Vec<T>, SortError> {
        let root_process = self.comm.process_at_rank(root as i32);
        let mut recv = try_filled(chunk_len, T::default())?;

        if self.rank() == root {
            let send = check_scatter_input(send, chunk_len, self.size(), root)?;
            root_process.scatter_into_root(send, &mut recv[..]);
        } else {
            root_process.scatter_into(&mut recv[..]);
        }

        Ok(recv)
    }

    fn gather<T: Message>(&self, local: &[T], root: usize) -> Result<Option<Vec<T>>, SortError> {
        Ok(gather_to_root(local, root, self.comm))
    }

    fn all_gather<T: Message>(&self, local: &[T]) -> Result<Vec<T>, SortError> {
        Ok(gather_to_all(local, self.comm))
    }

    fn all_to_all<T: Message>(&self, blocks: Vec<Vec<T>>) -> Result<Vec<Vec<T>>, SortError> {
        check_block_count(blocks.len(), self.size())?;

        // The block lengths travel as the varcount counts.
        let counts = blocks.iter().map(|block| block.len() as i32).collect_vec();
        let flat = blocks.concat();

        let (received, recv_counts) = redistribute(&flat, &counts, self.comm);

        let mut offset = 0;
        let inbound = recv_counts
            .iter()
            .map(|&count| {
                let block = received[offset..offset + count as usize].to_vec();
                offset += count as usize;
                block
            })
            .collect_vec();

        Ok(inbound)
    }
}
