//! Errors of the distributed sort.

use std::collections::TryReserveError;
use std::fmt;

use crate::constants::{EXIT_CORRECTNESS, EXIT_FAILURE};

/// Errors produced while sorting.
///
/// None of these are recoverable inside a digit pass. A failure on one
/// worker leaves its peers in an inconsistent protocol state, so callers
/// are expected to tear down the whole group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    /// A partition, histogram table or exchange buffer could not be allocated.
    AllocationFailure {
        /// Number of elements requested.
        requested: usize,
    },
    /// The gathered result differs from the serial reference sort.
    CorrectnessMismatch {
        /// First position at which the two arrays differ.
        index: usize,
    },
    /// A broken exchange invariant, e.g. an overfull block.
    ProtocolViolation(String),
    /// A peer did not deliver an expected message before the deadline.
    PeerTimeout {
        /// Rank that was waited for.
        peer: usize,
    },
    /// A peer went away in the middle of the protocol.
    PeerDisconnected {
        /// Rank that disappeared.
        peer: usize,
    },
    /// The root rank was not given an input array.
    MissingInput {
        /// Rank that expected the input.
        rank: usize,
    },
    /// A local worker thread panicked.
    WorkerPanicked {
        /// Rank of the worker.
        rank: usize,
    },
    /// Writing a report line failed.
    Output(String),
}

impl SortError {
    /// Process exit code for this failure.
    ///
    /// Correctness failures are distinguishable from every other failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CorrectnessMismatch { .. } => EXIT_CORRECTNESS,
            _ => EXIT_FAILURE,
        }
    }

    pub(crate) fn allocation(requested: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| Self::AllocationFailure { requested }
    }
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailure { requested } => {
                write!(f, "failed to allocate buffer of {requested} elements")
            }
            Self::CorrectnessMismatch { index } => {
                write!(f, "result differs from reference sort at index {index}")
            }
            Self::ProtocolViolation(msg) => write!(f, "protocol violation: {msg}"),
            Self::PeerTimeout { peer } => write!(f, "timed out waiting for rank {peer}"),
            Self::PeerDisconnected { peer } => write!(f, "rank {peer} disconnected"),
            Self::MissingInput { rank } => write!(f, "root rank {rank} has no input array"),
            Self::WorkerPanicked { rank } => write!(f, "worker {rank} panicked"),
            Self::Output(msg) => write!(f, "failed to write report: {msg}"),
        }
    }
}

impl std::error::Error for SortError {}

#[cfg(test)]
mod test {
    use super::SortError;

    #[test]
    fn test_exit_codes_are_distinct() {
        let mismatch = SortError::CorrectnessMismatch { index: 3 };
        let violation = SortError::ProtocolViolation("overfull block".into());

        assert_eq!(mismatch.exit_code(), 1);
        assert_ne!(mismatch.exit_code(), violation.exit_code());
        assert_ne!(violation.exit_code(), 0);
    }

    #[test]
    fn test_display() {
        let err = SortError::PeerTimeout { peer: 2 };
        assert_eq!(err.to_string(), "timed out waiting for rank 2");
    }
}
