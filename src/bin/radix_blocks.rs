//! Benchmark of the distributed radix sort. Run with `mpirun`.
//!
//! Prints `size mean_seconds` on the root rank for every array size. A result
//! that differs from the serial reference sort aborts all ranks with exit code 1.

use mpi::traits::Communicator;
use radix_blocks::{
    benchmark::{run_distributed_benchmark, BenchmarkConfig},
    constants::EXIT_FAILURE,
    MpiTransport, Transport,
};

pub fn main() {
    let Some(universe) = mpi::initialize() else {
        eprintln!("MPI could not be initialised.");
        std::process::exit(EXIT_FAILURE);
    };
    let world = universe.world();
    let transport = MpiTransport::new(&world);

    let config = BenchmarkConfig::default();
    let stdout = std::io::stdout();

    if let Err(err) = run_distributed_benchmark(&config, &transport, &mut stdout.lock()) {
        eprintln!("Rank {}: {err}", transport.rank());
        world.abort(err.exit_code());
    }
}
