//! Single process reference sorts.
//!
//! These serve as the correctness oracle for the distributed sort and as
//! the baselines of the serial benchmark.

use std::fmt::{self, Display};

use crate::error::SortError;
use crate::histogram::counting_sort_by_digit;
use crate::types::{digit_positions, RadixKey};

/// Maximum of `keys`, or zero for an empty slice.
///
/// The running maximum starts at zero, which is correct since keys are unsigned.
pub fn max_value<T: RadixKey>(keys: &[T]) -> T {
    keys.iter().fold(T::zero(), |max, &key| max.max(key))
}

/// Serial LSD radix sort with a counting sort per decimal digit.
pub fn serial_radix_sort<T: RadixKey>(keys: &mut Vec<T>) -> Result<(), SortError> {
    for exp in digit_positions(max_value(keys)) {
        let (sorted, _) = counting_sort_by_digit(keys, exp)?;
        *keys = sorted;
    }
    Ok(())
}

/// The serial algorithms available to the benchmark.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum SerialAlgorithm {
    /// LSD radix sort, see [`serial_radix_sort`].
    #[default]
    Radix,
    /// The standard library's comparison sort.
    Quick,
}

impl SerialAlgorithm {
    /// Sort `keys` in place.
    pub fn sort<T: RadixKey>(&self, keys: &mut Vec<T>) -> Result<(), SortError> {
        match self {
            Self::Radix => serial_radix_sort(keys),
            Self::Quick => {
                keys.sort_unstable();
                Ok(())
            }
        }
    }

    /// Parse the algorithm name used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "radix" => Some(Self::Radix),
            "quick" | "quicksort" => Some(Self::Quick),
            _ => None,
        }
    }
}

impl Display for SerialAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radix => write!(f, "radix"),
            Self::Quick => write!(f, "quick"),
        }
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use rand::Rng;

    use super::{max_value, serial_radix_sort, SerialAlgorithm};
    use crate::tools::seeded_rng;

    #[test]
    fn test_max_value() {
        assert_eq!(max_value::<u32>(&[]), 0);
        assert_eq!(max_value(&[3_u32, 17, 4]), 17);
    }

    #[test]
    fn test_serial_radix_sort() {
        let mut keys = vec![170_u32, 45, 75, 90, 802, 24, 2, 66];
        serial_radix_sort(&mut keys).unwrap();
        assert_eq!(keys, vec![2, 24, 45, 66, 75, 90, 170, 802]);
    }

    #[test]
    fn test_serial_algorithms_agree() {
        let mut rng = seeded_rng(3);
        let keys = (0..1000).map(|_| rng.gen::<u64>()).collect_vec();

        let mut radix = keys.clone();
        SerialAlgorithm::Radix.sort(&mut radix).unwrap();

        let mut quick = keys;
        SerialAlgorithm::Quick.sort(&mut quick).unwrap();

        assert_eq!(radix, quick);
    }

    #[test]
    fn test_full_width_keys_terminate() {
        let mut keys = vec![u8::MAX, 0, 128, 7];
        serial_radix_sort(&mut keys).unwrap();
        assert_eq!(keys, vec![0, 7, 128, 255]);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(SerialAlgorithm::from_name("quicksort"), Some(SerialAlgorithm::Quick));
        assert_eq!(SerialAlgorithm::from_name("radix"), Some(SerialAlgorithm::Radix));
        assert_eq!(SerialAlgorithm::from_name("heap"), None);
    }
}
