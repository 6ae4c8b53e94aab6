//! Where a patch should be inserted, as a capability trait rather than a
//! fixed enum of constructors.
//!
//! The full scope DSL (`AllFunctions`, `AllBlocks`, `FunctionEntry`, …)
//! is out of scope here; only the four predicates the driver actually
//! calls are modeled, plus the one concrete scope
//! ([`SpecificLocation`]) the driver needs for `insert_at`/`replace_at`.
//! Other scope kinds are free to be supplied by a downstream crate
//! implementing this same trait.

use splice_ir::{CodeBlockId, Function, Module};

/// A single decoded instruction, as produced by an
/// [`InstructionDecoder`](crate::decoder::InstructionDecoder).
#[derive(Copy, Clone, Debug)]
pub struct Instruction {
    pub offset: u32,
    pub length: u32,
}

/// Abstract description of *where*, within a function and block, a patch
/// should be applied.
pub trait Scope {
    /// Whether this scope considers `func` a candidate at all.
    fn function_matches(&self, module: &Module, func: &Function) -> bool;

    /// Whether this scope considers `block` (within a function already
    /// accepted by [`Self::function_matches`]) a candidate.
    fn block_matches(&self, module: &Module, func: &Function, block: CodeBlockId) -> bool;

    /// The candidate byte offsets within `block`, in the order this scope
    /// prefers them tried. The driver takes the first one.
    fn potential_offsets<'a>(
        &'a self,
        func: &'a Function,
        block: CodeBlockId,
        instructions: Option<&'a [Instruction]>,
    ) -> Box<dyn Iterator<Item = u32> + 'a>;

    /// How many original bytes, starting at the resolved offset, this
    /// scope's insertion replaces.
    fn replacement_length(&self) -> u32;

    /// Whether the driver must decode `block` before calling
    /// [`Self::potential_offsets`].
    fn needs_disassembly(&self) -> bool;
}

/// A scope that fixes a single, already-known `(function, block, offset)`
/// position — what `insert_at`/`replace_at` construct under the hood.
pub struct SpecificLocation {
    pub block: CodeBlockId,
    pub offset: u32,
    pub replacement_length: u32,
}

impl SpecificLocation {
    pub fn new(block: CodeBlockId, offset: u32, replacement_length: u32) -> Self {
        Self {
            block,
            offset,
            replacement_length,
        }
    }
}

impl Scope for SpecificLocation {
    fn function_matches(&self, _module: &Module, func: &Function) -> bool {
        func.all_blocks.contains(&self.block)
    }

    fn block_matches(&self, _module: &Module, _func: &Function, block: CodeBlockId) -> bool {
        block == self.block
    }

    fn potential_offsets<'a>(
        &'a self,
        _func: &'a Function,
        _block: CodeBlockId,
        _instructions: Option<&'a [Instruction]>,
    ) -> Box<dyn Iterator<Item = u32> + 'a> {
        Box::new(std::iter::once(self.offset))
    }

    fn replacement_length(&self) -> u32 {
        self.replacement_length
    }

    fn needs_disassembly(&self) -> bool {
        false
    }
}
