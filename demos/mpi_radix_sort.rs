//! Sort a random array held by rank 0 across all MPI ranks.
use itertools::Itertools;
use mpi::traits::Communicator;
use radix_blocks::{
    benchmark::{generate_input, InputKind},
    lifecycle::PartitionLifecycle,
    radix::digit_pass,
    tools::{is_sorted_array, seeded_rng},
    types::digit_positions,
    MpiTransport,
};
use rand::Rng;

pub fn main() {
    let universe = mpi::initialize().unwrap();
    let world = universe.world();
    let transport = MpiTransport::new(&world);

    // A length that does not divide evenly by most rank counts.
    let n = 10_007;
    let input = (world.rank() == 0).then(|| generate_input(n, 22443, InputKind::Random));

    let outcome = PartitionLifecycle::new(&transport)
        .sort_and_verify(input.as_deref())
        .unwrap();

    if let Some(outcome) = outcome {
        assert_eq!(outcome.sorted.len(), n);
        println!(
            "Sorted {} keys on {} ranks in {} passes ({} padding).",
            n,
            world.size(),
            outcome.passes,
            outcome.plan.padding_offset
        );
    }

    // Now sort data that already lives on the ranks, pass by pass, and check
    // the distributed result without gathering it.
    let mut rng = seeded_rng(world.rank() as usize);
    let mut partition = (0..1000)
        .map(|_| rng.gen_range(0..1_000_000_u32))
        .collect_vec();

    for exp in digit_positions(999_999) {
        partition = digit_pass(&partition, exp, &transport).unwrap();
    }

    assert!(is_sorted_array(&partition, &transport).unwrap());

    if world.rank() == 0 {
        println!("Distributed partitions are sorted.");
    }
}
