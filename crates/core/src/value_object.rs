//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: two values with the same attributes are
//! the same value. In this workspace the price string, the movement kind and a
//! validated quantity are value objects; products and movements are entities.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value. To "modify" one, build
/// a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Price(String);
///
/// impl ValueObject for Price {}
///
/// assert_eq!(Price("9.99".into()), Price("9.99".into()));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
