//! Entity reference types for the IR's owned collections.

use splice_entity::entity_impl;

/// Reference to a [`Section`](crate::Section) owned by a
/// [`Module`](crate::Module).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionId(u32);
entity_impl!(SectionId, "section");

/// Reference to a [`ByteInterval`](crate::ByteInterval) owned by a
/// [`Section`](crate::Section).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteIntervalId(u32);
entity_impl!(ByteIntervalId, "bi");

/// Reference to a [`CodeBlock`](crate::CodeBlock) owned by a
/// [`ByteInterval`](crate::ByteInterval).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeBlockId(u32);
entity_impl!(CodeBlockId, "block");

/// Reference to a [`ProxyBlock`](crate::ProxyBlock) owned by a
/// [`Module`](crate::Module).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyBlockId(u32);
entity_impl!(ProxyBlockId, "proxy");

/// Reference to a [`Symbol`](crate::Symbol) owned by a
/// [`Module`](crate::Module).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(u32);
entity_impl!(SymbolId, "symbol");

/// A CFG node is either a code block or a non-addressable proxy.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum CfgNode {
    Block(CodeBlockId),
    Proxy(ProxyBlockId),
}

impl From<CodeBlockId> for CfgNode {
    fn from(b: CodeBlockId) -> Self {
        CfgNode::Block(b)
    }
}

impl From<ProxyBlockId> for CfgNode {
    fn from(p: ProxyBlockId) -> Self {
        CfgNode::Proxy(p)
    }
}
