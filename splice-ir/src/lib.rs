//! Content-addressable intermediate representation for already-linked
//! binaries: modules, sections, byte intervals, code blocks, proxy
//! blocks, symbols, and a control-flow graph, plus the named auxiliary
//! tables that ride alongside them.
//!
//! This crate models the data only. The rules for mutating it while
//! keeping it structurally consistent — splicing assembled fragments into
//! a block, synthesising ABI prologues, resolving patch scopes — live in
//! `splice-core`.

mod aux_data;
mod byte_interval;
mod cfg;
mod function;
mod ids;
mod module;
mod proxy;
mod section;
mod symbol;

pub use aux_data::{
    AuxDataTables, CfiDirective, ElementOffsetSnapshot, ElfSymbolBinding, ElfSymbolInfo,
    ElfSymbolKind, ElfSymbolVisibility, FunctionTables, PeImportEntry, PeImportedSymbol,
};
pub use byte_interval::{ByteInterval, CodeBlock, SymbolicExpr};
pub use cfg::{Cfg, Edge, EdgeLabel};
pub use function::Function;
pub use ids::{ByteIntervalId, CfgNode, CodeBlockId, ProxyBlockId, SectionId, SymbolId};
pub use module::{FileFormat, Isa, Module, UnsupportedTarget};
pub use proxy::ProxyBlock;
pub use section::Section;
pub use symbol::{Payload, Symbol};

/// An `(element, displacement)` pair identifying a byte position inside
/// a byte interval or code block. Most aux tables key off of this.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Offset<K> {
    pub element: K,
    pub displacement: i64,
}

impl<K> Offset<K> {
    pub fn new(element: K, displacement: i64) -> Self {
        Self {
            element,
            displacement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_triple_combines_isa_and_format() {
        let m = Module::new(Isa::X86_64, FileFormat::Elf);
        assert_eq!(m.target_triple().unwrap(), "x86_64-pc-linux");
        let m = Module::new(Isa::Arm64, FileFormat::Pe);
        assert_eq!(m.target_triple().unwrap(), "arm64-pc-win32");
    }

    #[test]
    fn target_triple_rejects_isa_with_no_defined_mapping() {
        let m = Module::new(Isa::Mips32, FileFormat::Elf);
        assert_eq!(m.target_triple(), Err(UnsupportedTarget::Isa(Isa::Mips32)));
    }

    #[test]
    fn target_triple_rejects_file_format_with_no_defined_mapping() {
        let m = Module::new(Isa::X86_64, FileFormat::Undefined);
        assert_eq!(
            m.target_triple(),
            Err(UnsupportedTarget::FileFormat(FileFormat::Undefined))
        );
    }

    #[test]
    fn add_block_registers_membership_in_its_byte_interval() {
        let mut m = Module::new(Isa::X86_64, FileFormat::Elf);
        let bi = m.add_byte_interval(ByteInterval::new(vec![0x90; 10]));
        let block = m.add_block(CodeBlock::new(bi, 0, 10));
        let blocks: Vec<_> = m.byte_interval(bi).blocks_ascending().collect();
        assert_eq!(blocks, vec![block]);
    }
}
