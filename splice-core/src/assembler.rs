//! The assembler front-end boundary.
//!
//! Parsing textual assembly into instruction bytes is out of scope for
//! this crate; only the interface the driver needs is modeled here. No
//! implementation ships in this workspace — tests construct an
//! [`AssembledFragment`] fixture by hand instead of invoking a real
//! assembler.

use crate::error::Error;
use crate::modify::{Fragment, FragmentBlock, FragmentEdge, FragmentSymbol};
use crate::patch::X86Syntax;
use splice_ir::SymbolicExpr;
use std::collections::BTreeMap;

/// A syntax error reported by an assembler, with enough position
/// information to reproduce the original spec's "offending line with a
/// column caret" diagnostic.
#[derive(Clone, Debug)]
pub struct AsmSyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// The full source line the error occurred on, for the caret-style
    /// log message.
    pub source_line: String,
}

impl From<AsmSyntaxError> for Error {
    fn from(e: AsmSyntaxError) -> Self {
        Error::AssemblySyntax {
            line: e.line,
            column: e.column,
            message: e.message,
        }
    }
}

/// The fully assembled result of one or more `assemble` calls on a single
/// assembler instance: bytes, the blocks/CFG/symbols/symbolic-expressions
/// found inside them, ready to be handed to
/// [`splice`](crate::modify::splice).
#[derive(Clone, Debug)]
pub struct AssembledFragment {
    pub bytes: Vec<u8>,
    pub blocks: Vec<FragmentBlock>,
    pub cfg: Vec<FragmentEdge>,
    pub sym_exprs: BTreeMap<i64, SymbolicExpr>,
    pub symbols: Vec<FragmentSymbol>,
}

impl From<AssembledFragment> for Fragment {
    fn from(f: AssembledFragment) -> Self {
        Fragment {
            bytes: f.bytes,
            blocks: f.blocks,
            cfg: f.cfg,
            sym_exprs: f.sym_exprs,
            symbols: f.symbols,
        }
    }
}

/// Accumulates assembly text across a sequence of `assemble` calls (the
/// driver feeds the prologue snippets, then the patch body, then the
/// epilogue snippets into one instance) and produces the combined
/// fragment on [`Self::finalize`].
pub trait Assembler {
    /// Feed another chunk of assembly text into this assembler instance.
    fn assemble(&mut self, text: &str, syntax: X86Syntax) -> Result<(), AsmSyntaxError>;

    /// Finish assembling and produce the combined fragment.
    ///
    /// Takes `self: Box<Self>` rather than `self` by value so the driver
    /// can hold assembler instances as `Box<dyn Assembler>` (it needs a
    /// fresh instance per patch invocation, built from a factory closure,
    /// not a single statically known concrete type) — a plain by-value
    /// `self` receiver would make this trait impossible to use as a trait
    /// object at all.
    fn finalize(self: Box<Self>) -> AssembledFragment;
}
