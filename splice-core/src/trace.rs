//! Debug-logging helpers, gated on `log::Level::Debug` the way the rest
//! of this workspace's `log` call sites are, so production builds pay
//! nothing for them.

use crate::decoder::InstructionDecoder;
use splice_ir::{CodeBlock, Module};

/// Dump a block's decoded instructions to the `debug` log level, prefixed
/// with `label` — used around a patch invocation to show the
/// before/after state of the block being edited.
pub fn log_block_asm(decoder: &dyn InstructionDecoder, module: &Module, block: &CodeBlock, label: &str) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let instructions = decoder.instructions(module, block);
    log::debug!(
        "{label}: block at byte interval offset {} size {} ({} instructions)",
        block.offset(),
        block.size(),
        instructions.len()
    );
    for insn in instructions {
        log::debug!("  +{:#x} (len {})", insn.offset, insn.length);
    }
}

/// Emit the multi-line assembly-syntax-error diagnostic: the message,
/// then the offending source line, then a caret pointing at the column.
pub fn log_assembly_syntax_error(line: usize, column: usize, message: &str, source_line: &str) {
    log::error!("assembly error at line {line}, column {column}: {message}");
    log::error!("    {source_line}");
    log::error!("    {}^", " ".repeat(column.saturating_sub(1)));
}
