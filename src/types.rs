//! Key and message types shared by the sort stages.

use std::fmt::Display;
use std::mem::offset_of;

use mpi::datatype::{UncommittedDatatypeRef, UncommittedUserDatatype, UserDatatype};
use mpi::traits::Equivalence;
use num::{NumCast, PrimInt, Unsigned};

use crate::constants::RADIX;

/// Trait that every key fed into the distributed radix sort needs to satisfy.
///
/// Keys are unsigned, so the digit of every admissible key is in `0..RADIX`
/// and a running maximum may start at zero.
pub trait RadixKey:
    Equivalence + PrimInt + Unsigned + Default + Display + Send + Sync + 'static
{
}

impl<T: Equivalence + PrimInt + Unsigned + Default + Display + Send + Sync + 'static> RadixKey
    for T
{
}

// RADIX fits into every unsigned primitive.
#[inline]
fn radix<T: RadixKey>() -> T {
    <T as NumCast>::from(RADIX).unwrap_or_else(T::max_value)
}

/// The digit of `value` at position `exp` (1, 10, 100, ...).
#[inline]
pub fn digit<T: RadixKey>(value: T, exp: T) -> usize {
    ((value / exp) % radix::<T>()).to_usize().unwrap_or_default()
}

/// The position following `exp`, or `None` if it is not representable in `T`.
#[inline]
pub fn next_exp<T: RadixKey>(exp: T) -> Option<T> {
    exp.checked_mul(&radix::<T>())
}

/// The digit positions `1, 10, 100, ...` that keys bounded by `max` occupy.
///
/// The sequence stops once `max / exp` is zero or the next position does not
/// fit into `T`. Its length is the number of digit passes of a sort.
pub fn digit_positions<T: RadixKey>(max: T) -> impl Iterator<Item = T> {
    std::iter::successors(Some(T::one()), |&exp| next_exp(exp))
        .take_while(move |&exp| max / exp > T::zero())
}

/// One entry of an exchange block: a key and the slot it occupies on the
/// receiving rank.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct BlockEntry<T: RadixKey> {
    /// The key being moved.
    pub value: T,
    /// Index inside the receiving rank's next partition.
    pub slot: usize,
}

impl<T: RadixKey> BlockEntry<T> {
    /// New entry.
    pub fn new(value: T, slot: usize) -> Self {
        Self { value, slot }
    }
}

unsafe impl<T: RadixKey> Equivalence for BlockEntry<T> {
    type Out = UserDatatype;

    // Depending on the MPI implementation the below offset needs
    // to be an i64 or isize. If it is an i64 Clippy warns about
    // a useless conversion. But this warning is MPI implementation
    // dependent. So switch off here.

    #[allow(clippy::useless_conversion)]
    fn equivalent_datatype() -> Self::Out {
        UserDatatype::structured::<UncommittedDatatypeRef>(
            &[1, 1],
            &[
                (offset_of!(BlockEntry<T>, value) as i64)
                    .try_into()
                    .unwrap(),
                (offset_of!(BlockEntry<T>, slot) as i64).try_into().unwrap(),
            ],
            &[
                UncommittedUserDatatype::contiguous(1, &<T as Equivalence>::equivalent_datatype())
                    .as_ref(),
                usize::equivalent_datatype().into(),
            ],
        )
    }
}

impl<T: RadixKey> Display for BlockEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(value: {}, slot: {})", self.value, self.slot)
    }
}
