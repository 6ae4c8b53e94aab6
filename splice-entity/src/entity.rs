//! Trait implemented by opaque entity-reference types.

/// A type wrapping a small dense index, usable as the key of a
/// [`PrimaryMap`](crate::PrimaryMap) or [`SecondaryMap`](crate::SecondaryMap).
pub trait EntityRef: Copy + Eq + Ord + std::hash::Hash {
    /// Create a new entity reference from a linear index.
    fn new(index: usize) -> Self;

    /// Get the index of this reference.
    fn index(self) -> usize;
}

/// Generates an [`EntityRef`] implementation for a tuple struct wrapping a
/// `u32`, along with `Debug`/`Display` impls that render as `prefixNN`.
///
/// This is the same shape `cranelift-entity`'s own entity types use (e.g.
/// `Ebb`, `Value`, `Inst`): a newtype over `u32` plus this macro, rather than
/// hand-writing the boilerplate per type.
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident, $display_prefix:expr) => {
        impl $crate::EntityRef for $entity {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $entity {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, concat!($display_prefix, "{}"), self.0)
            }
        }

        impl std::fmt::Debug for $entity {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                (self as &dyn std::fmt::Display).fmt(f)
            }
        }
    };
}
