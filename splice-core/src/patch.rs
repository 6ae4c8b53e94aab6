//! The patch interface: caller-supplied assembly plus its ABI
//! requirements.

use crate::abi::Constraints;
use splice_ir::{Function, Module};

/// x86 assembler syntax dialect a patch's assembly is written in.
/// Irrelevant for non-x86 targets.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum X86Syntax {
    Att,
    Intel,
}

/// Everything a patch's `get_asm` implementation needs to know about
/// where it's being inserted.
pub struct PatchContext<'a> {
    pub module: &'a Module,
    pub function: &'a Function,
    pub block: splice_ir::CodeBlockId,
    pub offset: u32,
    /// The ABI's chosen net stack adjustment at this insertion point, so
    /// a patch referencing the stack can account for the synthesizer's
    /// own pushes.
    pub stack_adjustment: i64,
}

/// A caller-registered fragment of assembly to be spliced into the
/// binary, plus the ABI requirements its body needs wrapped around it.
pub trait Patch {
    /// Produce the patch's assembly text, given the insertion context and
    /// the scratch registers the ABI synthesizer allocated for it.
    fn get_asm(&self, context: &PatchContext<'_>, scratch_regs: &[&str]) -> String;

    /// This patch's ABI requirements.
    fn constraints(&self) -> Constraints;
}
