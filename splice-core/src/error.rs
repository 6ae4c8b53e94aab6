//! Error types raised by the mutation engine and the patch driver.
//!
//! Precondition violations — offset bounds, non-empty fragments, no
//! interior zero-size blocks, instruction-boundary checks — are
//! programmer errors, not recoverable conditions, and are reported via
//! `assert!`/`debug_assert!` panics rather than as a variant here.

use splice_ir::{CodeBlockId, UnsupportedTarget};

/// Errors that can be raised while splicing a fragment into a block or
/// while applying a rewriting pass.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The assembler reported a syntax error in a patch's assembled text.
    #[error("{line}:{column}: {message}")]
    AssemblySyntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Two insertions in the same block resolved to overlapping ranges.
    #[error(
        "overlapping edits in block {block:?}: an earlier edit ends at {first_end}, \
         but the next edit starts at {next_offset}"
    )]
    OverlappingEdits {
        block: CodeBlockId,
        first_end: u32,
        next_offset: u32,
    },

    /// A trailing zero-sized fragment block could not be repaired: it has
    /// referring symbols or incoming edges but no unique fall-through
    /// successor to substitute in its place.
    #[error("block {block:?} is zero-sized with no unique successor to fold into")]
    UnresolvedZeroBlock { block: CodeBlockId },

    /// No target triple is defined for this instruction set.
    #[error("unsupported ISA: {0}")]
    UnsupportedIsa(String),

    /// No target triple is defined for this file format.
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
}

impl From<UnsupportedTarget> for Error {
    fn from(e: UnsupportedTarget) -> Self {
        match e {
            UnsupportedTarget::Isa(isa) => Error::UnsupportedIsa(format!("{isa:?}")),
            UnsupportedTarget::FileFormat(format) => Error::UnsupportedFileFormat(format!("{format:?}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
