//! Run a single digit pass on random per-rank data and check the bucketing.
use itertools::Itertools;
use mpi::traits::Communicator;
use radix_blocks::{
    radix::digit_pass,
    tools::{gather_to_root, is_sorted_array},
    types::digit,
    MpiTransport,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn main() {
    let universe = mpi::initialize().unwrap();
    let comm = universe.world();
    let transport = MpiTransport::new(&comm);

    // Every rank gets its own rng and the same number of keys.
    let mut rng = ChaCha8Rng::seed_from_u64(comm.rank() as u64);
    let nkeys = 1000;
    let keys = (0..nkeys).map(|_| rng.gen_range(0..1_000_000_u64)).collect_vec();

    let exp = 100;
    let next = digit_pass(&keys, exp, &transport).unwrap();
    assert_eq!(next.len(), nkeys);

    // After the pass the digits at `exp` are sorted across the ranks.
    let digits = next.iter().map(|&key| digit(key, exp) as u64).collect_vec();
    assert!(is_sorted_array(&digits, &transport).unwrap());

    if let (Some(before), Some(after)) = (
        gather_to_root(&keys, 0, &comm),
        gather_to_root(&next, 0, &comm),
    ) {
        assert_eq!(
            before.iter().sorted().collect_vec(),
            after.iter().sorted().collect_vec()
        );
        println!("Digit pass bucketed {} keys.", after.len());
    }
}
