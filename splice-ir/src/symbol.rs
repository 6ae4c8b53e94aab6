//! Symbols: named entities whose payload is an address, a block, or a
//! proxy.

use crate::ids::{CodeBlockId, ProxyBlockId};

/// What a [`Symbol`] actually refers to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Payload {
    /// A fixed address, not tied to any block (e.g. an absolute symbol).
    Address(u64),
    /// A code block — the common case for function/label symbols.
    Block(CodeBlockId),
    /// A proxy block — used for externally or ambiguously defined
    /// symbols.
    Proxy(ProxyBlockId),
}

/// A named entity in the module's symbol table.
#[derive(Clone, Debug)]
pub struct Symbol {
    name: String,
    payload: Payload,
}

impl Symbol {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Payload {
        self.payload
    }

    /// The block this symbol refers to, if its payload is a block.
    pub fn referent_block(&self) -> Option<CodeBlockId> {
        match self.payload {
            Payload::Block(b) => Some(b),
            _ => None,
        }
    }

    /// Redirect this symbol's referent to a different block.
    ///
    /// No-op if this symbol's payload isn't a block.
    pub fn retarget_block(&mut self, new_block: CodeBlockId) {
        if let Payload::Block(_) = self.payload {
            self.payload = Payload::Block(new_block);
        }
    }
}
