//! Byte intervals and the code blocks laid out on top of them.

use crate::ids::{ByteIntervalId, CodeBlockId};
use std::collections::{BTreeMap, BTreeSet};

/// A symbolic expression attached to a byte-interval-relative offset —
/// e.g. "the four bytes at this offset are a relocatable reference to
/// symbol X". The core mutation engine treats the payload opaquely; it
/// only needs to shift or drop entries by offset.
#[derive(Clone, Debug)]
pub struct SymbolicExpr {
    pub referent_symbol_name: String,
    pub addend: i64,
}

/// A contiguous instruction span inside a [`ByteInterval`].
///
/// A code block's `size` must be nonzero at every point the IR is
/// consistent; the mutation engine transiently creates size-0 blocks
/// mid-algorithm but must eliminate them before returning.
#[derive(Copy, Clone, Debug)]
pub struct CodeBlock {
    byte_interval: ByteIntervalId,
    offset: u32,
    size: u32,
}

impl CodeBlock {
    pub fn new(byte_interval: ByteIntervalId, offset: u32, size: u32) -> Self {
        Self {
            byte_interval,
            offset,
            size,
        }
    }

    pub fn byte_interval(&self) -> ByteIntervalId {
        self.byte_interval
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    /// The offset one past this block's last byte.
    pub fn end_offset(&self) -> u32 {
        self.offset + self.size
    }
}

/// Owns a contiguous byte string, the code blocks laid out on it, and the
/// symbolic expressions attached to byte offsets within it.
#[derive(Clone, Debug)]
pub struct ByteInterval {
    contents: Vec<u8>,
    /// Blocks belonging to this interval, kept ordered by `(offset, id)`
    /// so a stable offset-ascending walk doesn't need to re-sort on every
    /// mutation.
    blocks: BTreeSet<(u32, CodeBlockId)>,
    symbolic_expressions: BTreeMap<i64, SymbolicExpr>,
}

impl ByteInterval {
    pub fn new(contents: Vec<u8>) -> Self {
        Self {
            contents,
            blocks: BTreeSet::new(),
            symbolic_expressions: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.contents.len() as u32
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Vec<u8> {
        &mut self.contents
    }

    pub fn set_contents(&mut self, contents: Vec<u8>) {
        self.contents = contents;
    }

    /// Register that `block` (at `offset`) belongs to this interval.
    pub fn add_block(&mut self, id: CodeBlockId, offset: u32) {
        self.blocks.insert((offset, id));
    }

    /// Remove a block's membership. Does not touch the block's own
    /// storage, which is owned by the module's `PrimaryMap`.
    pub fn remove_block(&mut self, id: CodeBlockId, offset: u32) {
        self.blocks.remove(&(offset, id));
    }

    /// Re-key a block's membership after its offset changed.
    pub fn rekey_block(&mut self, id: CodeBlockId, old_offset: u32, new_offset: u32) {
        self.blocks.remove(&(old_offset, id));
        self.blocks.insert((new_offset, id));
    }

    /// Blocks belonging to this interval, in ascending offset order.
    pub fn blocks_ascending(&self) -> impl Iterator<Item = CodeBlockId> + '_ {
        self.blocks.iter().map(|&(_, id)| id)
    }

    pub fn symbolic_expressions(&self) -> &BTreeMap<i64, SymbolicExpr> {
        &self.symbolic_expressions
    }

    pub fn symbolic_expressions_mut(&mut self) -> &mut BTreeMap<i64, SymbolicExpr> {
        &mut self.symbolic_expressions
    }

    pub fn set_symbolic_expressions(&mut self, map: BTreeMap<i64, SymbolicExpr>) {
        self.symbolic_expressions = map;
    }
}
