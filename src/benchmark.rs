//! Benchmark drivers for the distributed and the serial sort.
//!
//! Both drivers sort arrays of sizes 1, 2, 4, ... below a ceiling, repeat
//! every size a fixed number of times with fixed seeds and print one line
//! per size with the mean time per run.

use std::io::Write;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::constants::{RUNS, SEEDS, SIZE_CEILING};
use crate::error::SortError;
use crate::lifecycle::PartitionLifecycle;
use crate::reference::SerialAlgorithm;
use crate::tools::seeded_rng;
use crate::transport::Transport;

/// Key type of the benchmark arrays.
pub type BenchKey = u32;

/// The shape of a generated input array of length `n`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum InputKind {
    /// Uniform values in `[0, n]`.
    #[default]
    Random,
    /// `0, 1, ..., n - 1`.
    Ordered,
    /// `n - 1, ..., 1, 0`.
    Reversed,
    /// Uniform values with exactly one digit.
    OneDigit,
    /// Uniform values with exactly four digits.
    FourDigit,
    /// Uniform values with exactly eight digits.
    EightDigit,
}

/// Generate a reproducible input array.
pub fn generate_input(size: usize, seed: u64, kind: InputKind) -> Vec<BenchKey> {
    let mut rng = seeded_rng(seed as usize);
    let n = size as BenchKey;
    match kind {
        InputKind::Random => (0..size).map(|_| rng.gen_range(0..=n)).collect(),
        InputKind::Ordered => (0..n).collect(),
        InputKind::Reversed => (0..n).rev().collect(),
        InputKind::OneDigit => (0..size).map(|_| rng.gen_range(0..=9)).collect(),
        InputKind::FourDigit => (0..size).map(|_| rng.gen_range(1000..=9999)).collect(),
        InputKind::EightDigit => (0..size)
            .map(|_| rng.gen_range(10_000_000..=99_999_999))
            .collect(),
    }
}

/// Parameters of a benchmark.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BenchmarkConfig {
    /// Sizes run while strictly below this value.
    pub size_ceiling: usize,
    /// Number of runs per size.
    pub runs: usize,
    /// Seed of each run, reused cyclically if there are fewer seeds than runs.
    pub seeds: Vec<u64>,
    /// Shape of the generated arrays.
    pub kind: InputKind,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            size_ceiling: SIZE_CEILING,
            runs: RUNS,
            seeds: SEEDS.to_vec(),
            kind: InputKind::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Set the size ceiling.
    pub fn with_size_ceiling(mut self, size_ceiling: usize) -> Self {
        self.size_ceiling = size_ceiling;
        self
    }

    /// Set the number of runs per size.
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Set the input shape.
    pub fn with_kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }

    /// The array sizes 1, 2, 4, ... below the ceiling.
    pub fn sizes(&self) -> impl Iterator<Item = usize> {
        let ceiling = self.size_ceiling;
        std::iter::successors(Some(1_usize), |&size| size.checked_mul(2))
            .take_while(move |&size| size < ceiling)
    }

    /// Seed of run number `run`.
    pub fn seed(&self, run: usize) -> u64 {
        if self.seeds.is_empty() {
            run as u64
        } else {
            self.seeds[run % self.seeds.len()]
        }
    }
}

/// Total time of the runs of one array size.
///
/// One accumulator is used per size and reset before its first run.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct TimingAccumulator {
    total: Duration,
    runs: u32,
}

impl TimingAccumulator {
    /// Forget all recorded runs.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one run.
    pub fn add(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.runs += 1;
    }

    /// Mean time per recorded run.
    pub fn mean(&self) -> Duration {
        if self.runs == 0 {
            Duration::ZERO
        } else {
            self.total / self.runs
        }
    }
}

/// Output line layout.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ReportFormat {
    /// `size mean`, written by the distributed driver.
    SpaceSeparated,
    /// `size,mean`, written by the serial driver.
    CommaSeparated,
}

/// Mean time of one array size.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SizeReport {
    /// Array size.
    pub size: usize,
    /// Mean time per run.
    pub mean: Duration,
}

impl SizeReport {
    /// The report line, with the mean in seconds and six decimals.
    pub fn line(&self, format: ReportFormat) -> String {
        let seconds = self.mean.as_secs_f64();
        match format {
            ReportFormat::SpaceSeparated => format!("{} {seconds:.6}", self.size),
            ReportFormat::CommaSeparated => format!("{},{seconds:.6}", self.size),
        }
    }

    fn write_to<W: Write>(&self, format: ReportFormat, out: &mut W) -> Result<(), SortError> {
        writeln!(out, "{}", self.line(format)).map_err(|err| SortError::Output(err.to_string()))
    }
}

/// Run the distributed benchmark on every rank of `transport`.
///
/// The root generates the arrays, checks every result against the serial
/// reference and writes one line per size to `out`. A wrong result stops
/// the benchmark with [`SortError::CorrectnessMismatch`].
pub fn run_distributed_benchmark<X: Transport, W: Write>(
    config: &BenchmarkConfig,
    transport: &X,
    out: &mut W,
) -> Result<Vec<SizeReport>, SortError> {
    let mut reports = Vec::new();
    let mut timing = TimingAccumulator::default();

    for size in config.sizes() {
        transport.barrier()?;
        timing.reset();

        for run in 0..config.runs {
            transport.barrier()?;

            let input = transport
                .is_root()
                .then(|| generate_input(size, config.seed(run), config.kind));

            let outcome = PartitionLifecycle::new(transport).sort_and_verify(input.as_deref())?;

            if let Some(outcome) = outcome {
                debug!("size {size} run {run}: {} passes", outcome.passes);
                timing.add(outcome.elapsed);

                if run == config.runs - 1 {
                    let report = SizeReport {
                        size,
                        mean: timing.mean(),
                    };
                    report.write_to(ReportFormat::SpaceSeparated, out)?;
                    reports.push(report);
                }
            }

            transport.barrier()?;
        }
    }

    Ok(reports)
}

/// Run the serial benchmark of `algorithm` and write one line per size to `out`.
pub fn run_serial_benchmark<W: Write>(
    config: &BenchmarkConfig,
    algorithm: SerialAlgorithm,
    out: &mut W,
) -> Result<Vec<SizeReport>, SortError> {
    let mut reports = Vec::new();
    let mut timing = TimingAccumulator::default();

    for size in config.sizes() {
        timing.reset();

        for run in 0..config.runs {
            let mut input = generate_input(size, config.seed(run), config.kind);

            let start = Instant::now();
            algorithm.sort(&mut input)?;
            timing.add(start.elapsed());
        }

        let report = SizeReport {
            size,
            mean: timing.mean(),
        };
        report.write_to(ReportFormat::CommaSeparated, out)?;
        reports.push(report);
    }

    Ok(reports)
}
