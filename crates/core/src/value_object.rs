//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// `Money` amounts over the same cents are the same amount. "Modifying" a
/// value object means constructing a new one, which keeps them safe to copy
/// across threads and trivially comparable in tests.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
