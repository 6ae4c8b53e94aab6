//! Named auxiliary tables attached to a [`Module`](crate::Module).
//!
//! A handful of these are keyed by byte offset (`comments`, `padding`,
//! `symbolicExpressionSizes`, `cfiDirectives`) and are backed by
//! [`OffsetMap`]; the rest are plain tables keyed by UUID or symbol.

use crate::ids::{ByteIntervalId, CodeBlockId, SymbolId};
use splice_entity::OffsetMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// ELF symbol kind, as recorded in `elfSymbolInfo`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ElfSymbolKind {
    NoType,
    Object,
    Func,
}

/// ELF symbol binding, as recorded in `elfSymbolInfo`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ElfSymbolBinding {
    Local,
    Global,
    Weak,
}

/// ELF symbol visibility, as recorded in `elfSymbolInfo`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ElfSymbolVisibility {
    Default,
    Hidden,
    Protected,
}

/// One row of the `elfSymbolInfo` aux table.
#[derive(Clone, Debug)]
pub struct ElfSymbolInfo {
    pub size: u64,
    pub kind: ElfSymbolKind,
    pub binding: ElfSymbolBinding,
    pub visibility: ElfSymbolVisibility,
    pub section_index: u64,
}

/// One row of the `peImportedSymbols` aux table: a symbol imported from
/// a named DLL.
#[derive(Clone, Debug)]
pub struct PeImportedSymbol {
    pub symbol: SymbolId,
}

/// One row of the `peImportEntries` aux table: the address, ordinal, and
/// owning library of an import thunk.
#[derive(Clone, Debug)]
pub struct PeImportEntry {
    pub address: u64,
    pub ordinal: i32,
    pub function: String,
    pub library: String,
}

/// A single CFI directive (e.g. `.cfi_def_cfa_offset`), opaque to the
/// engine beyond being offset-keyed. Discarded wholesale after a
/// rewriting pass since the engine makes no attempt to keep unwind
/// metadata consistent with its edits.
#[derive(Clone, Debug)]
pub struct CfiDirective {
    pub directive: String,
    pub operands: Vec<i64>,
}

/// The UUID-keyed function-grouping tables, from which
/// [`Function`](crate::Function) is derived on demand.
#[derive(Clone, Debug, Default)]
pub struct FunctionTables {
    pub entries: HashMap<Uuid, BTreeSet<CodeBlockId>>,
    pub blocks: HashMap<Uuid, BTreeSet<CodeBlockId>>,
    pub names: HashMap<Uuid, SymbolId>,
}

/// All of a module's named auxiliary tables.
///
/// Offset-keyed tables get dedicated, statically typed fields backed by
/// [`OffsetMap`] since the mutation engine's rewrite path needs to treat
/// all three identically; everything else is a plain table, matching how
/// little structure the original format imposes on them.
#[derive(Clone, Debug, Default)]
pub struct AuxDataTables {
    pub functions: FunctionTables,
    /// Original leaf-function status per function UUID, computed once at
    /// the start of a rewriting pass and read (never recomputed) by the
    /// ABI synthesizer thereafter.
    pub leaf_functions: HashMap<Uuid, bool>,
    pub elf_symbol_info: HashMap<SymbolId, ElfSymbolInfo>,
    pub symbol_forwarding: HashMap<SymbolId, SymbolId>,
    pub pe_imported_symbols: Vec<PeImportedSymbol>,
    pub pe_import_entries: Vec<PeImportEntry>,
    /// Preload-ordered list of shared libraries to link against.
    pub libraries: Vec<String>,
    pub library_paths: Vec<String>,
    pub comments: OffsetMap<ByteIntervalId, String>,
    pub padding: OffsetMap<ByteIntervalId, u32>,
    pub symbolic_expression_sizes: OffsetMap<ByteIntervalId, u32>,
    /// Removed wholesale by [`RewritingContext::apply`] once a pass
    /// completes; `None` after that point.
    pub cfi_directives: Option<OffsetMap<ByteIntervalId, Vec<CfiDirective>>>,
    /// Marker strings describing the binary's type, e.g. `"DYN"` for a
    /// position-independent executable/shared object, `"EXEC"` for a
    /// non-PIE executable.
    pub binary_type: Vec<String>,
}

impl AuxDataTables {
    pub fn new() -> Self {
        Self {
            cfi_directives: Some(OffsetMap::new()),
            ..Default::default()
        }
    }

    /// Whether the module's `binaryType` table marks it as a
    /// position-independent (`DYN`) binary.
    pub fn is_position_independent(&self) -> bool {
        self.binary_type.iter().any(|t| t == "DYN")
    }

    /// Remove the `cfiDirectives` table wholesale, as required at the end
    /// of a rewriting pass.
    pub fn drop_cfi_directives(&mut self) {
        self.cfi_directives = None;
    }

    /// Append `libname` to `libraries`, prepending instead when
    /// `preload` is set.
    pub fn add_library(&mut self, libname: String, preload: bool) {
        if self.libraries.iter().any(|l| l == &libname) {
            return;
        }
        if preload {
            self.libraries.insert(0, libname);
        } else {
            self.libraries.push(libname);
        }
    }

    /// Append `libpath` to `libraryPaths`, prepending instead when
    /// `preload` is set.
    pub fn add_library_path(&mut self, libpath: String, preload: bool) {
        if self.library_paths.iter().any(|p| p == &libpath) {
            return;
        }
        if preload {
            self.library_paths.insert(0, libpath);
        } else {
            self.library_paths.push(libpath);
        }
    }
}

/// A snapshot of one element's offset-keyed entries as a plain
/// displacement map, used when "upgrading" an ad hoc table into an
/// [`OffsetMap`] (see `splice_core::modify`'s aux-table rewrite path).
pub type ElementOffsetSnapshot<V> = BTreeMap<i64, V>;
