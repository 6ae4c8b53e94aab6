//! The top-level IR container.

use crate::aux_data::AuxDataTables;
use crate::byte_interval::ByteInterval;
use crate::cfg::Cfg;
use crate::ids::{ByteIntervalId, CodeBlockId, ProxyBlockId, SectionId, SymbolId};
use crate::proxy::ProxyBlock;
use crate::section::Section;
use crate::symbol::Symbol;
use splice_entity::PrimaryMap;

/// Instruction set architecture of the module being rewritten.
///
/// Mirrors the subset of the IR library's own (much larger) ISA
/// enumeration that this engine's target-triple generation actually
/// covers; `Mips32` and `Undefined` stand in for the rest, which the
/// original carries but never maps to a triple either.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Isa {
    X86_64,
    I386,
    Arm,
    Arm64,
    Mips32,
    Undefined,
}

/// On-disk container format of the module being rewritten.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FileFormat {
    Elf,
    Pe,
    /// Any format the IR library can represent but this engine's target-
    /// triple generation has no mapping for (e.g. raw, Mach-O).
    Undefined,
}

/// Error produced when a (ISA, format) pair has no defined target
/// triple.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UnsupportedTarget {
    Isa(Isa),
    FileFormat(FileFormat),
}

impl Isa {
    fn triple_arch(self) -> Option<&'static str> {
        match self {
            Isa::X86_64 => Some("x86_64"),
            Isa::I386 => Some("i386"),
            Isa::Arm => Some("arm"),
            Isa::Arm64 => Some("arm64"),
            Isa::Mips32 | Isa::Undefined => None,
        }
    }
}

impl FileFormat {
    fn triple_os(self) -> Option<&'static str> {
        match self {
            FileFormat::Elf => Some("linux"),
            FileFormat::Pe => Some("win32"),
            FileFormat::Undefined => None,
        }
    }
}

/// Container of sections, symbols, proxies, a CFG, and the module's named
/// auxiliary tables.
///
/// Every owned entity (byte intervals, code blocks, proxies, symbols) is
/// stored in a dense [`PrimaryMap`] keyed by its entity reference rather
/// than behind a tree of `Rc`/`RefCell`; cross-references between
/// entities (a symbol's referent, a CFG edge's endpoints, a block's
/// owning byte interval) are just the corresponding id, resolved back
/// through the owning map.
pub struct Module {
    isa: Isa,
    file_format: FileFormat,
    sections: PrimaryMap<SectionId, Section>,
    byte_intervals: PrimaryMap<ByteIntervalId, ByteInterval>,
    blocks: PrimaryMap<CodeBlockId, crate::byte_interval::CodeBlock>,
    proxies: PrimaryMap<ProxyBlockId, ProxyBlock>,
    symbols: PrimaryMap<SymbolId, Symbol>,
    cfg: Cfg,
    aux_data: AuxDataTables,
}

impl Module {
    pub fn new(isa: Isa, file_format: FileFormat) -> Self {
        Self {
            isa,
            file_format,
            sections: PrimaryMap::new(),
            byte_intervals: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            proxies: PrimaryMap::new(),
            symbols: PrimaryMap::new(),
            cfg: Cfg::new(),
            aux_data: AuxDataTables::new(),
        }
    }

    pub fn isa(&self) -> Isa {
        self.isa
    }

    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    /// The `{arch}-pc-{os}` target triple for this module's (ISA, file
    /// format) pair, for callers that need to configure an assembler
    /// backend for it.
    pub fn target_triple(&self) -> Result<String, UnsupportedTarget> {
        let arch = self.isa.triple_arch().ok_or(UnsupportedTarget::Isa(self.isa))?;
        let os = self
            .file_format
            .triple_os()
            .ok_or(UnsupportedTarget::FileFormat(self.file_format))?;
        Ok(format!("{arch}-pc-{os}"))
    }

    pub fn add_section(&mut self, section: Section) -> SectionId {
        self.sections.push(section)
    }

    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id]
    }

    pub fn section_mut(&mut self, id: SectionId) -> &mut Section {
        &mut self.sections[id]
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &Section)> {
        self.sections.iter()
    }

    pub fn add_byte_interval(&mut self, bi: ByteInterval) -> ByteIntervalId {
        self.byte_intervals.push(bi)
    }

    pub fn byte_interval(&self, id: ByteIntervalId) -> &ByteInterval {
        &self.byte_intervals[id]
    }

    pub fn byte_interval_mut(&mut self, id: ByteIntervalId) -> &mut ByteInterval {
        &mut self.byte_intervals[id]
    }

    pub fn add_block(&mut self, block: crate::byte_interval::CodeBlock) -> CodeBlockId {
        let bi = block.byte_interval();
        let offset = block.offset();
        let id = self.blocks.push(block);
        self.byte_intervals[bi].add_block(id, offset);
        id
    }

    pub fn block(&self, id: CodeBlockId) -> &crate::byte_interval::CodeBlock {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: CodeBlockId) -> &mut crate::byte_interval::CodeBlock {
        &mut self.blocks[id]
    }

    pub fn blocks(&self) -> &PrimaryMap<CodeBlockId, crate::byte_interval::CodeBlock> {
        &self.blocks
    }

    pub fn add_proxy(&mut self, proxy: ProxyBlock) -> ProxyBlockId {
        self.proxies.push(proxy)
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter()
    }

    /// Find an existing symbol by name, if any. Used by
    /// `get_or_insert_extern_symbol` to avoid creating duplicate externs.
    pub fn find_symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .find(|(_, sym)| sym.name() == name)
            .map(|(id, _)| id)
    }

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn cfg_mut(&mut self) -> &mut Cfg {
        &mut self.cfg
    }

    pub fn aux_data(&self) -> &AuxDataTables {
        &self.aux_data
    }

    pub fn aux_data_mut(&mut self) -> &mut AuxDataTables {
        &mut self.aux_data
    }
}
