//! One distributed digit pass.

use log::debug;

use crate::error::SortError;
use crate::exchange::{apply_blocks, build_blocks, exchange_blocks};
use crate::histogram::counting_sort_by_digit;
use crate::planner::OrderingPlan;
use crate::transport::Transport;
use crate::types::RadixKey;

/// Redistribute the partitions of all ranks by the digit at position `exp`.
///
/// Every rank passes its current partition, all of equal length, and gets
/// back its next partition. Afterwards the concatenation of all partitions in
/// rank order is stably bucketed by that digit. The pass ends with a barrier,
/// so no rank starts the next pass while another one is still exchanging.
pub fn digit_pass<T: RadixKey, X: Transport>(
    partition: &[T],
    exp: T,
    transport: &X,
) -> Result<Vec<T>, SortError> {
    let rank = transport.rank();
    let size = transport.size();
    let partition_size = partition.len();

    let (local, histogram) = counting_sort_by_digit(partition, exp)?;

    // Every rank sees every histogram and derives the same global tables.
    let table = transport.all_gather(histogram.counts())?;
    let plan = OrderingPlan::from_table(&table, rank)?;

    if plan.total() != partition_size * size {
        return Err(SortError::ProtocolViolation(format!(
            "ranks disagree on the partition size: {} elements in total, expected {}",
            plan.total(),
            partition_size * size
        )));
    }

    let blocks = build_blocks(&local, exp, &plan, size)?;
    let inbound = exchange_blocks(blocks, partition_size, transport)?;
    let next = apply_blocks(&inbound, partition_size)?;

    debug!(
        "rank {rank}: digit pass at exp {exp} received {} elements",
        inbound.iter().map(|block| block.len()).sum::<usize>()
    );

    transport.barrier()?;

    Ok(next)
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use rand::Rng;

    use super::digit_pass;
    use crate::exchange::{apply_blocks, build_blocks, exchange_blocks, ExchangeBlock};
    use crate::histogram::counting_sort_by_digit;
    use crate::planner::OrderingPlan;
    use crate::tools::seeded_rng;
    use crate::transport::{LocalGroup, Transport};
    use crate::types::{digit, digit_positions};

    type PassTrace = Vec<(Vec<ExchangeBlock<u32>>, Vec<u32>)>;

    // Sort seeded per-rank data pass by pass and record what every rank
    // received and kept in each pass.
    fn trace_passes(size: usize, partition_size: usize) -> Vec<PassTrace> {
        LocalGroup::new(size)
            .run(|transport| {
                let rank = transport.rank();
                let mut rng = seeded_rng(100 + rank);
                let mut partition = (0..partition_size)
                    .map(|_| rng.gen_range(0..1_000_000_u32))
                    .collect_vec();

                let mut trace = Vec::new();
                for exp in digit_positions(999_999_u32) {
                    let (local, histogram) = counting_sort_by_digit(&partition, exp).unwrap();
                    let table = transport.all_gather(histogram.counts()).unwrap();
                    let plan = OrderingPlan::from_table(&table, rank).unwrap();
                    let blocks = build_blocks(&local, exp, &plan, size).unwrap();
                    let inbound = exchange_blocks(blocks, partition_size, &transport).unwrap();
                    let next = apply_blocks(&inbound, partition_size).unwrap();

                    // The composed pass lands on the same partition.
                    assert_eq!(digit_pass(&partition, exp, &transport).unwrap(), next);

                    trace.push((inbound, next.clone()));
                    partition = next;
                }
                trace
            })
            .unwrap()
    }

    #[test]
    fn test_digit_pass_buckets_globally() {
        let data = [93_u32, 17, 40, 11, 2, 58, 64, 35, 70, 9, 21, 46];
        let size = 3;
        let chunk = data.len() / size;

        let results = LocalGroup::new(size)
            .run(|transport| {
                let start = transport.rank() * chunk;
                digit_pass(&data[start..start + chunk], 1, &transport).unwrap()
            })
            .unwrap();

        let combined = results.concat();
        assert_eq!(
            combined,
            vec![40, 70, 11, 21, 2, 93, 64, 35, 46, 17, 58, 9]
        );
        assert!(combined
            .iter()
            .tuple_windows()
            .all(|(&a, &b)| digit(a, 1) <= digit(b, 1)));
    }

    #[test]
    fn test_mismatched_partitions_are_rejected() {
        let results = LocalGroup::new(2)
            .run(|transport| {
                let partition = if transport.rank() == 0 {
                    vec![1_u32, 2]
                } else {
                    vec![3_u32]
                };
                digit_pass(&partition, 1, &transport)
            })
            .unwrap();

        assert!(results.iter().all(|result| result.is_err()));
    }

    #[test]
    fn test_repeated_passes_move_elements_identically() {
        let first = trace_passes(4, 50);
        let second = trace_passes(4, 50);

        assert_eq!(first.len(), 4);
        for (rank, (a, b)) in first.iter().zip(&second).enumerate() {
            assert_eq!(a.len(), 6, "rank {rank} ran the wrong number of passes");
            for (pass, (run1, run2)) in a.iter().zip(b).enumerate() {
                assert_eq!(run1.0, run2.0, "inbound blocks of rank {rank} differ in pass {pass}");
                assert_eq!(run1.1, run2.1, "partition of rank {rank} differs in pass {pass}");
            }
        }

        // After the last pass the partitions are globally sorted.
        let sorted = first.iter().flat_map(|trace| trace[5].1.clone()).collect_vec();
        assert!(sorted.iter().tuple_windows().all(|(a, b)| a <= b));
    }
}
