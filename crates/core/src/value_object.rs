//! Value object trait: equality by value, not identity.
//!
//! A promotion reference attached to a product is the typical example here:
//! two references pointing at the same promotion are interchangeable, which
//! is what lets a detach remove every copy of a stale reference at once.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
