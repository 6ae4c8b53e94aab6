//! The instruction decoder boundary, used only for instruction-boundary
//! checks when `expensive_assertions` is enabled.
//!
//! No concrete decoder ships in this crate; the `capstone` dev-dependency
//! lets tests exercise the boundary-check helpers below against real x86
//! bytes without any production code depending on a specific disassembler.

use crate::scope::Instruction;
use splice_ir::{CodeBlock, Module};

/// Decodes the instructions inside a code block, for scopes that declare
/// `needs_disassembly() == true` and for the expensive instruction-
/// boundary assertion in [`crate::rewriting::RewritingContext`].
pub trait InstructionDecoder {
    fn instructions(&self, module: &Module, block: &CodeBlock) -> Vec<Instruction>;
}

/// Whether `offset` falls strictly inside an instruction rather than on
/// an instruction boundary, given `instructions` decoded from the start
/// of the block.
///
/// A partial disassembly — decoding stopped before reaching the end of
/// the block, e.g. because the trailing bytes aren't valid code — means
/// any offset past the last decoded instruction cannot be verified and is
/// treated as being mid-instruction, erring conservative.
pub fn is_partial_disassembly(instructions: &[Instruction], block_size: u32) -> bool {
    match instructions.last() {
        Some(last) => last.offset + last.length < block_size,
        None => block_size > 0,
    }
}

/// Every offset that is NOT a valid instruction boundary within
/// `instructions` — the complement of "starts an instruction" for the
/// `[0, block_size)` range that the boundary assertion checks against.
pub fn nonterminator_instructions(instructions: &[Instruction], block_size: u32) -> Vec<u32> {
    let starts: std::collections::HashSet<u32> = instructions.iter().map(|i| i.offset).collect();
    (0..block_size).filter(|o| !starts.contains(o)).collect()
}

/// Assert that `offset` and `offset + length` both fall on instruction
/// boundaries within `instructions`. Only called when the driver's
/// `expensive_assertions` flag is set, since decoding a block purely to
/// validate a caller-supplied offset is not free.
pub fn validate_offset_and_length(instructions: &[Instruction], offset: u32, length: u32) {
    let starts: std::collections::HashSet<u32> = instructions.iter().map(|i| i.offset).collect();
    assert!(
        starts.contains(&offset),
        "offset {offset} does not fall on an instruction boundary"
    );
    if length > 0 {
        assert!(
            starts.contains(&(offset + length)) || instructions.iter().any(|i| i.offset + i.length == offset + length),
            "replacement_length {length} does not end on an instruction boundary"
        );
    }
}
