//! Message passing between the ranks of a fixed worker group.
//!
//! The sort only talks to its peers through [`Transport`]. The MPI backend
//! runs one process per rank. The local backend runs one thread per rank
//! inside a single process and is what the test suite uses.
mod local;
mod mpi_backend;

pub use local::{LocalGroup, LocalTransport};
pub use mpi_backend::MpiTransport;

use mpi::traits::Equivalence;

use crate::constants::ROOT;
use crate::error::SortError;

/// Types that can be sent between ranks.
pub trait Message: Equivalence + Copy + Default + Send + 'static {}

impl<T: Equivalence + Copy + Default + Send + 'static> Message for T {}

/// Collective and exchange operations over a fixed group of ranks.
///
/// Every rank has to call the same sequence of operations. All operations
/// block until the data this rank needs has arrived.
pub trait Transport {
    /// Rank of this worker.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Whether this worker is the root rank.
    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Block until every rank has reached the barrier.
    fn barrier(&self) -> Result<(), SortError>;

    /// Copy `buf` from `root` into `buf` on every other rank.
    fn broadcast<T: Message>(&self, buf: &mut [T], root: usize) -> Result<(), SortError>;

    /// Split `send` on `root` into equal contiguous chunks of `chunk_len`.
    ///
    /// Rank `r` receives chunk `r`. `send` is ignored on all other ranks.
    fn scatter<T: Message>(
        &self,
        send: Option<&[T]>,
        chunk_len: usize,
        root: usize,
    ) -> Result<Vec<T>, SortError>;

    /// Concatenate the local arrays in rank order on `root`.
    ///
    /// Returns `Some` on `root` and `None` on all other ranks.
    fn gather<T: Message>(&self, local: &[T], root: usize) -> Result<Option<Vec<T>>, SortError>;

    /// Concatenate the local arrays in rank order on every rank.
    fn all_gather<T: Message>(&self, local: &[T]) -> Result<Vec<T>, SortError>;

    /// Send `blocks[r]` to rank `r` (this rank included) and return the
    /// received blocks indexed by source rank.
    fn all_to_all<T: Message>(&self, blocks: Vec<Vec<T>>) -> Result<Vec<Vec<T>>, SortError>;
}

pub(crate) fn check_block_count(blocks: usize, size: usize) -> Result<(), SortError> {
    if blocks != size {
        return Err(SortError::ProtocolViolation(format!(
            "expected {size} outbound blocks, got {blocks}"
        )));
    }
    Ok(())
}

pub(crate) fn check_scatter_input<T>(
    send: Option<&[T]>,
    chunk_len: usize,
    size: usize,
    rank: usize,
) -> Result<&[T], SortError> {
    let send = send.ok_or(SortError::MissingInput { rank })?;
    if send.len() != chunk_len * size {
        return Err(SortError::ProtocolViolation(format!(
            "cannot scatter {} elements in {size} chunks of {chunk_len}",
            send.len()
        )));
    }
    Ok(send)
}
