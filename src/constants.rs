//! Crate wide constants.

use std::time::Duration;

/// Number of distinct digit values per pass (decimal digits).
pub const RADIX: usize = 10;

/// Rank that owns the global array before scatter and after gather.
pub const ROOT: usize = 0;

/// An exchange block holds `BLOCK_FACTOR * partition_size` integers,
/// i.e. `partition_size` (value, slot) pairs.
pub const BLOCK_FACTOR: usize = 2;

/// Seeds used for the repeated benchmark runs. Run `i` uses `SEEDS[i]`.
pub const SEEDS: [u64; 10] = [1, 2, 22443, 16882, 7931, 10723, 24902, 124, 25282, 2132];

/// Number of runs averaged per array size.
pub const RUNS: usize = 10;

/// Array sizes run while strictly below this ceiling.
pub const SIZE_CEILING: usize = 20_000_000;

/// How long a local worker waits for a peer message before giving up.
pub const DEFAULT_RECV_DEADLINE: Duration = Duration::from_secs(60);

/// Exit code of a run whose result disagrees with the serial reference.
pub const EXIT_CORRECTNESS: i32 = 1;

/// Exit code of every other fatal failure.
pub const EXIT_FAILURE: i32 = 2;
