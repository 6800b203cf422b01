//! Element trait and datatype tags.
//!
//! Messages travel between ranks as type-erased payloads. Every payload is
//! stamped with the [`DatatypeTag`] of its element type so that a receive
//! posted for another type is reported as
//! [`Error::DatatypeMismatch`](crate::Error::DatatypeMismatch) instead of
//! being silently reinterpreted.
//!
//! | Rust Type | Tag     |
//! |-----------|---------|
//! | `f32`     | `F32`   |
//! | `f64`     | `F64`   |
//! | `i32`     | `I32`   |
//! | `i64`     | `I64`   |
//! | `u8`      | `U8`    |
//! | `u32`     | `U32`   |
//! | `u64`     | `U64`   |

use std::any::Any;

use crate::error::{Error, Result};

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Runtime tag identifying the element type of a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit floating point
    F32 = 0,
    /// 64-bit floating point
    F64 = 1,
    /// 32-bit signed integer
    I32 = 2,
    /// 64-bit signed integer
    I64 = 3,
    /// 8-bit unsigned integer
    U8 = 4,
    /// 32-bit unsigned integer
    U32 = 5,
    /// 64-bit unsigned integer
    U64 = 6,
}

/// Trait for types that can be sent between ranks.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
pub trait Element: sealed::Sealed + Copy + Send + std::fmt::Debug + 'static {
    /// The datatype tag stamped on outgoing payloads.
    const TAG: DatatypeTag;
}

macro_rules! impl_element {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Element for $ty {
            const TAG: DatatypeTag = $tag;
        }
    };
}

impl_element!(f32, DatatypeTag::F32);
impl_element!(f64, DatatypeTag::F64);
impl_element!(i32, DatatypeTag::I32);
impl_element!(i64, DatatypeTag::I64);
impl_element!(u8, DatatypeTag::U8);
impl_element!(u32, DatatypeTag::U32);
impl_element!(u64, DatatypeTag::U64);

/// A type-erased message body.
pub(crate) struct Payload {
    tag: DatatypeTag,
    count: usize,
    data: Box<dyn Any + Send>,
}

impl Payload {
    pub(crate) fn pack<T: Element>(data: &[T]) -> Self {
        Payload {
            tag: T::TAG,
            count: data.len(),
            data: Box::new(data.to_vec()),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn datatype(&self) -> DatatypeTag {
        self.tag
    }

    /// Recover the elements, checking the datatype tag first.
    pub(crate) fn unpack<T: Element>(self) -> Result<Vec<T>> {
        if self.tag != T::TAG {
            return Err(Error::DatatypeMismatch {
                expected: T::TAG,
                found: self.tag,
            });
        }
        self.data
            .downcast::<Vec<T>>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::Internal("payload does not match its datatype tag".into()))
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("tag", &self.tag)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_tag_values_are_sequential() {
        let tags = [
            DatatypeTag::F32,
            DatatypeTag::F64,
            DatatypeTag::I32,
            DatatypeTag::I64,
            DatatypeTag::U8,
            DatatypeTag::U32,
            DatatypeTag::U64,
        ];
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32, "Tag {tag:?} should have value {i}");
        }
    }

    #[test]
    fn trait_is_implemented() {
        fn assert_element<T: Element>() {}
        assert_element::<f32>();
        assert_element::<f64>();
        assert_element::<i32>();
        assert_element::<i64>();
        assert_element::<u8>();
        assert_element::<u32>();
        assert_element::<u64>();
    }

    #[test]
    fn payload_keeps_elements_and_count() {
        let payload = Payload::pack(&[3i64, -1, 4]);
        assert_eq!(payload.count(), 3);
        assert_eq!(payload.datatype(), DatatypeTag::I64);
        assert_eq!(payload.unpack::<i64>().unwrap(), vec![3, -1, 4]);
    }

    #[test]
    fn payload_rejects_other_element_type() {
        let payload = Payload::pack(&[1.5f64]);
        let err = payload.unpack::<i32>().unwrap_err();
        assert_eq!(
            err,
            Error::DatatypeMismatch {
                expected: DatatypeTag::I32,
                found: DatatypeTag::F64,
            }
        );
    }
}
