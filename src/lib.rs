//! A distributed LSD radix sort that exchanges fixed-size blocks between ranks.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod benchmark;
pub mod constants;
pub mod error;
pub mod exchange;
pub mod histogram;
pub mod lifecycle;
pub mod oracle;
pub mod planner;
pub mod radix;
pub mod reference;
pub mod resolver;
pub mod tools;
pub mod transport;
pub mod types;

pub use error::SortError;
pub use lifecycle::{distributed_radix_sort, PartitionLifecycle, SortOutcome};
pub use transport::{LocalGroup, LocalTransport, MpiTransport, Transport};
