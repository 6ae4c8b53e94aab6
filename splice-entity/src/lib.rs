//! Densely numbered entity references and the offset-keyed auxiliary maps
//! built on top of them.
//!
//! Entities in an IR module (byte intervals, code blocks, symbols, proxy
//! blocks) are referenced by opaque, `Copy` handles wrapping a `u32` index
//! rather than by pointer or `Rc`, for the same reasons a compiler IR avoids
//! raw references between its own nodes: it keeps the representation
//! trivially `Copy`, sidesteps aliasing/borrowing conflicts when one entity's
//! mutation needs to look at another, and keeps each reference to four bytes
//! instead of a pointer's eight (or more, once you account for an `Rc`'s
//! refcount).

mod entity;
mod map;
mod offset;

pub use entity::EntityRef;
pub use map::{PrimaryMap, SecondaryMap};
pub use offset::OffsetMap;
