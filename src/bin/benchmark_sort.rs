//! Benchmark of the serial reference sorts.
//!
//! Usage: `benchmark_sort [radix|quick]`. Prints `size,mean_seconds` for every
//! array size.

use radix_blocks::{
    benchmark::{run_serial_benchmark, BenchmarkConfig},
    constants::EXIT_FAILURE,
    reference::SerialAlgorithm,
};

pub fn main() {
    let algorithm = match std::env::args().nth(1) {
        None => SerialAlgorithm::default(),
        Some(name) => match SerialAlgorithm::from_name(&name) {
            Some(algorithm) => algorithm,
            None => {
                eprintln!("Unknown algorithm {name}. Use radix or quick.");
                std::process::exit(EXIT_FAILURE);
            }
        },
    };

    let config = BenchmarkConfig::default();
    let stdout = std::io::stdout();

    if let Err(err) = run_serial_benchmark(&config, algorithm, &mut stdout.lock()) {
        eprintln!("{algorithm} benchmark failed: {err}");
        std::process::exit(err.exit_code());
    }
}
