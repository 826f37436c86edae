//! Block exchange of one digit pass.
//!
//! Every rank packs its elements into one block per destination rank, the
//! blocks are swapped in a single all-to-all round and each rank writes the
//! received values into its next partition at the slots the sender computed.

use log::trace;

use crate::constants::BLOCK_FACTOR;
use crate::error::SortError;
use crate::planner::OrderingPlan;
use crate::resolver::resolve_destinations;
use crate::tools::try_filled;
use crate::transport::Transport;
use crate::types::{BlockEntry, RadixKey};

/// (value, slot) pairs addressed to a single rank.
///
/// The capacity is `BLOCK_FACTOR * partition_size` integers, which is
/// `partition_size` pairs. The number of valid entries is the length of the
/// block; there is no terminating sentinel.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ExchangeBlock<T: RadixKey> {
    entries: Vec<BlockEntry<T>>,
    partition_size: usize,
}

impl<T: RadixKey> ExchangeBlock<T> {
    /// An empty block for a partition of `partition_size` elements.
    pub fn new(partition_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            partition_size,
        }
    }

    /// Wrap entries that arrived from a peer and validate them.
    pub fn received(
        entries: Vec<BlockEntry<T>>,
        partition_size: usize,
        source: usize,
    ) -> Result<Self, SortError> {
        let block = Self {
            entries,
            partition_size,
        };

        if block.len() > block.capacity() {
            return Err(SortError::ProtocolViolation(format!(
                "block from rank {source} holds {} entries, capacity is {}",
                block.len(),
                block.capacity()
            )));
        }

        if let Some(entry) = block.entries.iter().find(|e| e.slot >= partition_size) {
            return Err(SortError::ProtocolViolation(format!(
                "block from rank {source} addresses slot {} of a partition of {partition_size}",
                entry.slot
            )));
        }

        Ok(block)
    }

    /// Maximum number of (value, slot) pairs.
    pub fn capacity(&self) -> usize {
        BLOCK_FACTOR * self.partition_size / 2
    }

    /// Number of valid entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the block carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. Exceeding the capacity is a protocol violation.
    pub fn push(&mut self, entry: BlockEntry<T>) -> Result<(), SortError> {
        if self.len() == self.capacity() {
            return Err(SortError::ProtocolViolation(format!(
                "exchange block overflow at capacity {}",
                self.capacity()
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// The valid entries.
    pub fn entries(&self) -> &[BlockEntry<T>] {
        &self.entries
    }

    fn into_entries(self) -> Vec<BlockEntry<T>> {
        self.entries
    }
}

/// Pack the local partition into one block per destination rank.
///
/// `partition` must already be bucketed by the digit at `exp` so that the
/// destinations follow local order inside every digit bucket.
pub fn build_blocks<T: RadixKey>(
    partition: &[T],
    exp: T,
    plan: &OrderingPlan,
    size: usize,
) -> Result<Vec<ExchangeBlock<T>>, SortError> {
    let partition_size = partition.len();
    let mut blocks = (0..size)
        .map(|_| ExchangeBlock::new(partition_size))
        .collect::<Vec<_>>();

    for (value, dest) in resolve_destinations(partition, exp, plan, partition_size) {
        let block = blocks.get_mut(dest.rank).ok_or_else(|| {
            SortError::ProtocolViolation(format!(
                "global index {} is outside the group of {size} ranks",
                dest.global_index
            ))
        })?;
        block.push(BlockEntry::new(value, dest.slot))?;
    }

    Ok(blocks)
}

/// Swap blocks with every rank, including this one.
///
/// Returns the inbound blocks indexed by source rank.
pub fn exchange_blocks<T: RadixKey, X: Transport>(
    blocks: Vec<ExchangeBlock<T>>,
    partition_size: usize,
    transport: &X,
) -> Result<Vec<ExchangeBlock<T>>, SortError> {
    let rank = transport.rank();
    for (dest, block) in blocks.iter().enumerate() {
        trace!("rank {rank}: {} entries for rank {dest}", block.len());
    }

    let outbound = blocks
        .into_iter()
        .map(ExchangeBlock::into_entries)
        .collect();

    transport
        .all_to_all(outbound)?
        .into_iter()
        .enumerate()
        .map(|(source, entries)| ExchangeBlock::received(entries, partition_size, source))
        .collect()
}

/// Write the inbound blocks into a fresh partition.
///
/// Every slot has to be written exactly once, otherwise elements were lost
/// or duplicated on the way.
pub fn apply_blocks<T: RadixKey>(
    inbound: &[ExchangeBlock<T>],
    partition_size: usize,
) -> Result<Vec<T>, SortError> {
    let mut next = try_filled(partition_size, T::zero())?;
    let mut written = try_filled(partition_size, false)?;

    for (source, block) in inbound.iter().enumerate() {
        for entry in block.entries() {
            let seen = written.get_mut(entry.slot).ok_or_else(|| {
                SortError::ProtocolViolation(format!(
                    "rank {source} addressed slot {} of a partition of {partition_size}",
                    entry.slot
                ))
            })?;
            if *seen {
                return Err(SortError::ProtocolViolation(format!(
                    "slot {} written twice, last by rank {source}",
                    entry.slot
                )));
            }
            *seen = true;
            next[entry.slot] = entry.value;
        }
    }

    if let Some(slot) = written.iter().position(|&seen| !seen) {
        return Err(SortError::ProtocolViolation(format!(
            "slot {slot} received no element"
        )));
    }

    Ok(next)
}
