//! The patch driver: turns a bag of pending insertions into an ordered
//! sequence of calls into the mutation engine, plus the extern-symbol and
//! function-stub helpers that manufacture targets for it.
//!
//! Grounded in `original_source/gtirb_rewriting/rewriting.py`'s
//! `RewritingContext.apply` and `original_source/gtirb_rewriting/utils.py`'s
//! `_get_or_insert_extern_symbol`/`_add_function`.

use crate::abi::{Abi, ConstraintFlags};
use crate::assembler::Assembler;
use crate::decoder::{self, InstructionDecoder};
use crate::error::{Error, Result};
use crate::modify::{self, Fragment, ModifyCache};
use crate::patch::{Patch, PatchContext, X86Syntax};
use crate::scope::Scope;
use splice_entity::EntityRef;
use splice_ir::{
    ByteInterval, CodeBlock, CodeBlockId, Edge, EdgeLabel, ElfSymbolBinding, ElfSymbolInfo,
    ElfSymbolKind, ElfSymbolVisibility, FileFormat, Function, Module, PeImportEntry,
    PeImportedSymbol, Payload, Section, Symbol, SymbolId,
};
use std::collections::HashSet;
use uuid::Uuid;

/// One pending insertion: where it goes, and what it puts there.
struct Insertion {
    scope: Box<dyn Scope>,
    patch: Box<dyn Patch>,
}

/// One pending *function* insertion: a fresh function to manufacture
/// before any ordinary insertion is applied.
struct FunctionInsertion {
    symbol: SymbolId,
    block: CodeBlockId,
    patch: Box<dyn Patch>,
}

/// Orchestrates one rewriting pass over a [`Module`]: resolves every
/// registered scope to a concrete position, synthesizes ABI
/// prologues/epilogues, assembles the combined text, and hands the result
/// to [`modify::splice`].
///
/// Owns the module for the duration of the pass (mirrors the original's
/// `with rewriting_context(module) as ctx:` pattern, whose `__exit__`
/// is what actually calls `apply`).
pub struct RewritingContext<'m> {
    module: &'m mut Module,
    abi: Box<dyn Abi>,
    decoder: Box<dyn InstructionDecoder>,
    new_assembler: Box<dyn Fn(u64) -> Box<dyn Assembler>>,
    insertions: Vec<Insertion>,
    function_insertions: Vec<FunctionInsertion>,
    patch_id: u64,
    /// Whether to pay for the instruction-boundary sanity check on the
    /// first insertion of each edited block. Off by default since it
    /// requires a decode that scopes not declaring `needs_disassembly`
    /// would otherwise avoid.
    pub expensive_assertions: bool,
}

impl<'m> RewritingContext<'m> {
    pub fn new(
        module: &'m mut Module,
        abi: Box<dyn Abi>,
        decoder: Box<dyn InstructionDecoder>,
        new_assembler: Box<dyn Fn(u64) -> Box<dyn Assembler>>,
    ) -> Self {
        update_leaf_functions(module);
        Self {
            module,
            abi,
            decoder,
            new_assembler,
            insertions: Vec::new(),
            function_insertions: Vec::new(),
            patch_id: 0,
            expensive_assertions: false,
        }
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    /// Register `patch` at an arbitrary, possibly-multi-matching `scope`.
    pub fn register_insertion(&mut self, scope: Box<dyn Scope>, patch: Box<dyn Patch>) {
        self.insertions.push(Insertion { scope, patch });
    }

    /// Register `patch` to be inserted at the exact, already-known
    /// `(block, offset)` position, replacing nothing.
    pub fn insert_at(&mut self, block: CodeBlockId, offset: u32, patch: Box<dyn Patch>) {
        self.register_insertion(
            Box::new(crate::scope::SpecificLocation::new(block, offset, 0)),
            patch,
        );
    }

    /// Register `patch` to replace `length` bytes starting at `offset`.
    pub fn replace_at(&mut self, block: CodeBlockId, offset: u32, length: u32, patch: Box<dyn Patch>) {
        self.register_insertion(
            Box::new(crate::scope::SpecificLocation::new(block, offset, length)),
            patch,
        );
    }

    /// Decorate `name` the way the target platform's linker would expect
    /// to see an external call target spelled, then return the existing
    /// module symbol of that (decorated) name if one already exists, or
    /// create a new proxy-backed one and record the platform-specific
    /// import metadata plus the owning library.
    ///
    /// Per the specification's open question on `decorate_extern_symbol`:
    /// the PLT-marker decoration is applied only when the module's
    /// `binaryType` aux data actually marks it position-independent
    /// (`DYN`), not merely because the file format is ELF — see
    /// DESIGN.md.
    pub fn get_or_insert_extern_symbol(
        &mut self,
        name: &str,
        libname: &str,
        preload: bool,
        libpath: Option<&str>,
    ) -> SymbolId {
        let decorated = decorate_extern_symbol(self.module, name);
        if let Some(existing) = self.module.find_symbol_by_name(&decorated) {
            return existing;
        }

        let proxy = self.module.add_proxy(splice_ir::ProxyBlock);
        let symbol = self
            .module
            .add_symbol(Symbol::new(decorated, Payload::Proxy(proxy)));

        match self.module.file_format() {
            FileFormat::Elf => {
                self.module.aux_data_mut().elf_symbol_info.insert(
                    symbol,
                    ElfSymbolInfo {
                        size: 0,
                        kind: ElfSymbolKind::Func,
                        binding: ElfSymbolBinding::Global,
                        visibility: ElfSymbolVisibility::Default,
                        section_index: 0,
                    },
                );
            }
            FileFormat::Pe => {
                let aux = self.module.aux_data_mut();
                aux.symbol_forwarding.insert(symbol, symbol);
                aux.pe_imported_symbols.push(PeImportedSymbol { symbol });
                aux.pe_import_entries.push(PeImportEntry {
                    address: 0,
                    ordinal: -1,
                    function: name.to_string(),
                    library: libname.to_string(),
                });
            }
            // No import-table convention is defined for a format this
            // engine can't otherwise target; the symbol still gets
            // created, just without platform-specific metadata.
            FileFormat::Undefined => {}
        }

        self.module
            .aux_data_mut()
            .add_library(libname.to_string(), preload);
        if let Some(path) = libpath {
            self.module
                .aux_data_mut()
                .add_library_path(path.to_string(), preload);
        }

        symbol
    }

    /// Allocate a fresh, single-`nop` code block plus a symbol whose
    /// referent is that block, and queue `patch` to become the block's
    /// real body once [`Self::apply`] runs. Returns the symbol so other
    /// patches can call it.
    pub fn register_insert_function(&mut self, name: &str, patch: Box<dyn Patch>) -> SymbolId {
        let section_name = format!(".text.splice_stub_{}", self.function_insertions.len());
        let section = Section::new(section_name);
        let section_id = self.module.add_section(section);

        let nop = self.abi.nop();
        let nop_len = nop.len() as u32;
        let bi = self.module.add_byte_interval(ByteInterval::new(nop));
        self.module.section_mut(section_id).add_byte_interval(bi);

        let block = self.module.add_block(CodeBlock::new(bi, 0, nop_len));
        let symbol = self
            .module
            .add_symbol(Symbol::new(name.to_string(), Payload::Block(block)));

        self.function_insertions.push(FunctionInsertion {
            symbol,
            block,
            patch,
        });

        symbol
    }

    /// Run the five-step apply protocol (§4.D): materialize function
    /// stubs, apply their bodies, then walk original functions in
    /// ascending UUID order, blocks in ascending address order,
    /// insertions in ascending resolved offset, splicing each in turn.
    pub fn apply(&mut self) -> Result<()> {
        let cache = ModifyCache::build(self.module);

        self.materialize_function_stubs();
        self.apply_function_patches(&cache)?;

        let mut functions = Function::all(self.module);
        functions.sort_by_key(|f| f.uuid);

        for func in &functions {
            let matching: Vec<usize> = self
                .insertions
                .iter()
                .enumerate()
                .filter(|(_, ins)| ins.scope.function_matches(self.module, func))
                .map(|(i, _)| i)
                .collect();
            if matching.is_empty() {
                continue;
            }

            let mut blocks: Vec<CodeBlockId> = func.all_blocks.iter().copied().collect();
            blocks.sort_by_key(|&b| {
                let blk = self.module.block(b);
                (blk.byte_interval().index(), blk.offset())
            });

            for block in blocks {
                let block_insertions: Vec<usize> = matching
                    .iter()
                    .copied()
                    .filter(|&i| self.insertions[i].scope.block_matches(self.module, func, block))
                    .collect();
                if block_insertions.is_empty() {
                    continue;
                }
                self.apply_block(&cache, func, block, block_insertions)?;
            }
        }

        self.module.aux_data_mut().drop_cfi_directives();
        Ok(())
    }

    /// Step 2: fill in the CFG/aux-table wiring for every queued function
    /// insertion. The block and symbol themselves were already allocated
    /// eagerly by [`Self::register_insert_function`]; what's left is the
    /// return edge to a fresh proxy and the `functionEntries` /
    /// `functionBlocks` / `functionNames` rows, which need entity ids
    /// that only exist once the module is mutable here.
    fn materialize_function_stubs(&mut self) {
        for insertion in &self.function_insertions {
            let proxy = self.module.add_proxy(splice_ir::ProxyBlock);
            self.module.cfg_mut().insert(Edge {
                source: splice_ir::CfgNode::Block(insertion.block),
                target: splice_ir::CfgNode::Proxy(proxy),
                label: EdgeLabel::Return,
            });

            let uuid = Uuid::new_v4();
            let tables = &mut self.module.aux_data_mut().functions;
            tables.entries.entry(uuid).or_default().insert(insertion.block);
            tables.blocks.entry(uuid).or_default().insert(insertion.block);
            tables.names.insert(uuid, insertion.symbol);
            self.module.aux_data_mut().leaf_functions.insert(uuid, true);

            if self.module.file_format() == FileFormat::Elf {
                self.module.aux_data_mut().elf_symbol_info.insert(
                    insertion.symbol,
                    ElfSymbolInfo {
                        size: 0,
                        kind: ElfSymbolKind::Func,
                        binding: ElfSymbolBinding::Global,
                        visibility: ElfSymbolVisibility::Default,
                        section_index: 0,
                    },
                );
            }
        }
    }

    /// Step 3: replace each function stub's placeholder `nop` with the
    /// patch's real prologue+body+epilogue. Function patches must carry
    /// empty constraints (no scratch registers, no clobbers, no flags, no
    /// alignment, no caller-saved preservation) — violating that is a
    /// programmer error, not a recoverable one.
    fn apply_function_patches(&mut self, cache: &ModifyCache) -> Result<()> {
        let insertions = std::mem::take(&mut self.function_insertions);
        let functions = Function::all(self.module);

        for insertion in &insertions {
            let constraints = insertion.patch.constraints();
            assert!(
                constraints.is_empty(),
                "function patches must have empty ABI constraints"
            );

            let func = functions
                .iter()
                .find(|f| f.all_blocks.contains(&insertion.block))
                .expect("function stub was registered in materialize_function_stubs");

            let registers = self.abi.allocate_patch_registers(&constraints);
            let (prologue, epilogue, stack_adjustment) =
                self.abi.create_prologue_and_epilogue(&constraints, &registers, true);

            let body = {
                let context = PatchContext {
                    module: &*self.module,
                    function: func,
                    block: insertion.block,
                    offset: 0,
                    stack_adjustment,
                };
                insertion.patch.get_asm(&context, &[])
            };

            let syntax = X86Syntax::Att;
            let mut asm = (self.new_assembler)(self.patch_id);
            self.patch_id += 1;
            self.assemble_all(&mut *asm, &prologue, syntax)?;
            self.assemble_one(&mut *asm, &body, syntax)?;
            self.assemble_all(&mut *asm, &epilogue, syntax)?;

            let fragment: Fragment = asm.finalize().into();
            let size = self.module.block(insertion.block).size();
            modify::splice(self.module, cache, insertion.block, 0, size, fragment)?;
        }

        Ok(())
    }

    fn assemble_all(&self, asm: &mut dyn Assembler, lines: &[String], syntax: X86Syntax) -> Result<()> {
        for line in lines {
            self.assemble_one(asm, line, syntax)?;
        }
        Ok(())
    }

    fn assemble_one(&self, asm: &mut dyn Assembler, text: &str, syntax: X86Syntax) -> Result<()> {
        asm.assemble(text, syntax).map_err(|e| {
            crate::trace::log_assembly_syntax_error(e.line, e.column, &e.message, &e.source_line);
            Error::from(e)
        })
    }

    /// Resolve, sort, overlap-check, and splice every insertion targeting
    /// one block.
    fn apply_block(
        &mut self,
        cache: &ModifyCache,
        func: &Function,
        block: CodeBlockId,
        insertion_indices: Vec<usize>,
    ) -> Result<()> {
        let needs_disassembly = insertion_indices
            .iter()
            .any(|&i| self.insertions[i].scope.needs_disassembly());
        let instructions = if needs_disassembly || self.expensive_assertions {
            let block_val = *self.module.block(block);
            Some(self.decoder.instructions(self.module, &block_val))
        } else {
            None
        };

        let mut resolved: Vec<(usize, u32, u32)> = Vec::with_capacity(insertion_indices.len());
        for &idx in &insertion_indices {
            let ins = &self.insertions[idx];
            let offset = ins
                .scope
                .potential_offsets(func, block, instructions.as_deref())
                .next()
                .expect("scope yielded no candidate offsets for a block it claims to match");
            resolved.push((idx, offset, ins.scope.replacement_length()));
        }
        // Stable: ties keep registration order, matching the ordering
        // guarantee in §5 of the specification.
        resolved.sort_by_key(|&(_, offset, _)| offset);

        for w in resolved.windows(2) {
            let (_, first_offset, first_len) = w[0];
            let (_, next_offset, _) = w[1];
            if next_offset < first_offset + first_len {
                return Err(Error::OverlappingEdits {
                    block,
                    first_end: first_offset + first_len,
                    next_offset,
                });
            }
        }

        if self.expensive_assertions {
            if let (Some(instructions), Some(&(_, offset, length))) = (&instructions, resolved.first()) {
                decoder::validate_offset_and_length(instructions, offset, length);
            }
        }

        let original_offset = self.module.block(block).offset();
        let mut actual_block = block;
        let mut total_insert_len: i64 = 0;

        for (idx, offset, replacement_length) in resolved {
            let current_offset = self.module.block(actual_block).offset();
            let effective_offset = (offset as i64 + total_insert_len
                - (current_offset as i64 - original_offset as i64)) as u32;

            let constraints = self.insertions[idx].patch.constraints();
            let registers = self.abi.allocate_patch_registers(&constraints);
            let is_leaf = func.is_leaf(self.module);
            let (prologue, epilogue, stack_adjustment) =
                self.abi.create_prologue_and_epilogue(&constraints, &registers, is_leaf);
            let syntax = if constraints.flags.contains(ConstraintFlags::X86_SYNTAX_INTEL) {
                X86Syntax::Intel
            } else {
                X86Syntax::Att
            };

            crate::trace::log_block_asm(
                &*self.decoder,
                self.module,
                self.module.block(actual_block),
                "before patch",
            );

            let body = {
                let scratch: Vec<&str> = registers.scratch.iter().copied().collect();
                let context = PatchContext {
                    module: &*self.module,
                    function: func,
                    block: actual_block,
                    offset: effective_offset,
                    stack_adjustment,
                };
                self.insertions[idx].patch.get_asm(&context, &scratch)
            };

            let mut asm = (self.new_assembler)(self.patch_id);
            self.patch_id += 1;
            self.assemble_all(&mut *asm, &prologue, syntax)?;
            self.assemble_one(&mut *asm, &body, syntax)?;
            self.assemble_all(&mut *asm, &epilogue, syntax)?;

            let fragment: Fragment = asm.finalize().into();
            let inserted_len = fragment.bytes.len() as u32;
            let (end_block, inserted) = modify::splice(
                self.module,
                cache,
                actual_block,
                effective_offset,
                replacement_length,
                fragment,
            )?;
            debug_assert_eq!(inserted, inserted_len);

            actual_block = end_block;
            total_insert_len += inserted as i64 - replacement_length as i64;
        }

        Ok(())
    }
}

/// Populate the `leafFunctions` cache for every function already defined
/// in `module` that doesn't yet have an entry, so the ABI layer can make
/// leaf-aware prologue/epilogue decisions for the whole pass.
///
/// Grounded in `_update_leaf_functions`: it runs once, before any patch
/// is applied, and never overwrites an existing entry — a later patch in
/// this (or a prior) pass may add a call to a function that started as a
/// leaf, and that function's prologue/epilogue must stay consistent with
/// the assumption it was synthesised under rather than flip mid-pass.
fn update_leaf_functions(module: &mut Module) {
    let functions = Function::all(module);
    for func in &functions {
        if module.aux_data().leaf_functions.contains_key(&func.uuid) {
            continue;
        }
        let is_leaf = might_be_leaf_function(module, func);
        module
            .aux_data_mut()
            .leaf_functions
            .insert(func.uuid, is_leaf);
    }
}

/// Whether `func` might be a leaf function, judged purely by the absence
/// of `Call` edges leaving any of its blocks.
///
/// Grounded in `_might_be_leaf_function`: "might", because this is only
/// trustworthy before any rewrite has had a chance to insert a new call.
fn might_be_leaf_function(module: &Module, func: &Function) -> bool {
    func.all_blocks.iter().all(|&block| {
        module
            .cfg()
            .outgoing(splice_ir::CfgNode::Block(block))
            .all(|edge| edge.label != EdgeLabel::Call)
    })
}

/// Decorate an external call target's name the way the module's target
/// platform would expect to see it, per the specification's open
/// question: the ELF PLT-marker decoration is applied only when the
/// module is actually position-independent, not merely because it's ELF.
pub fn decorate_extern_symbol(module: &Module, name: &str) -> String {
    match module.file_format() {
        FileFormat::Elf if module.aux_data().is_position_independent() => format!("{name}@plt"),
        _ => name.to_string(),
    }
}

/// The `{arch}-pc-{os}` target triple a caller should configure its
/// assembler backend for, given the module's (ISA, file format) pair.
///
/// A thin wrapper over [`Module::target_triple`] that turns the
/// IR-level [`splice_ir::UnsupportedTarget`] into this crate's own
/// [`Error::UnsupportedIsa`]/[`Error::UnsupportedFileFormat`] variants,
/// per §6's "target triples are generated as ..." platform convention
/// and §7's corresponding fatal error kinds.
pub fn target_triple(module: &Module) -> Result<String> {
    Ok(module.target_triple()?)
}

/// Every name currently registered in the module's symbol table, for
/// callers that want to avoid colliding with one before registering a new
/// patch-introduced symbol.
pub fn existing_symbol_names(module: &Module) -> HashSet<&str> {
    module.symbols().map(|(_, s)| s.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::SystemV;
    use crate::assembler::AssembledFragment;
    use crate::decoder::InstructionDecoder;
    use crate::scope::{Instruction, SpecificLocation};
    use splice_ir::{FileFormat, Isa};

    struct FixedDecoder;
    impl InstructionDecoder for FixedDecoder {
        fn instructions(&self, _module: &Module, block: &CodeBlock) -> Vec<Instruction> {
            vec![Instruction {
                offset: 0,
                length: block.size(),
            }]
        }
    }

    struct FakeAssembler {
        bytes: Vec<u8>,
    }
    impl Assembler for FakeAssembler {
        fn assemble(&mut self, text: &str, _syntax: X86Syntax) -> std::result::Result<(), crate::assembler::AsmSyntaxError> {
            // Each assembled "line" in these tests is just a literal byte
            // count encoded as repeated 0x90s, keeping the fixture free of
            // needing a real assembler.
            self.bytes.extend(std::iter::repeat(0x90u8).take(text.len()));
            Ok(())
        }

        fn finalize(self: Box<Self>) -> AssembledFragment {
            let this = *self;
            let size = this.bytes.len() as u32;
            AssembledFragment {
                bytes: this.bytes,
                blocks: vec![crate::modify::FragmentBlock { size }],
                cfg: Vec::new(),
                sym_exprs: Default::default(),
                symbols: Vec::new(),
            }
        }
    }

    struct NopPatch;
    impl Patch for NopPatch {
        fn get_asm(&self, _ctx: &PatchContext<'_>, _scratch: &[&str]) -> String {
            "nopnopnop".to_string() // 9 "bytes" under the fake assembler above
        }

        fn constraints(&self) -> crate::abi::Constraints {
            crate::abi::Constraints::default()
        }
    }

    fn fixture() -> (Module, CodeBlockId) {
        let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
        let bi = module.add_byte_interval(ByteInterval::new(vec![0x90; 10]));
        let block = module.add_block(CodeBlock::new(bi, 0, 10));
        let uuid = Uuid::new_v4();
        let tables = &mut module.aux_data_mut().functions;
        tables.entries.entry(uuid).or_default().insert(block);
        tables.blocks.entry(uuid).or_default().insert(block);
        module.aux_data_mut().leaf_functions.insert(uuid, true);
        (module, block)
    }

    #[test]
    fn apply_inserts_patch_at_specific_location() {
        let (mut module, block) = fixture();
        let mut ctx = RewritingContext::new(
            &mut module,
            Box::new(SystemV),
            Box::new(FixedDecoder),
            Box::new(|_id| Box::new(FakeAssembler { bytes: Vec::new() }) as Box<dyn Assembler>),
        );
        ctx.insert_at(block, 4, Box::new(NopPatch));
        ctx.apply().unwrap();

        assert_eq!(module.block(block).size(), 19); // 10 original + 9 inserted
    }

    #[test]
    fn overlapping_insertions_in_same_block_are_rejected() {
        let (mut module, block) = fixture();
        let mut ctx = RewritingContext::new(
            &mut module,
            Box::new(SystemV),
            Box::new(FixedDecoder),
            Box::new(|_id| Box::new(FakeAssembler { bytes: Vec::new() }) as Box<dyn Assembler>),
        );
        ctx.register_insertion(
            Box::new(SpecificLocation::new(block, 2, 4)),
            Box::new(NopPatch),
        );
        ctx.register_insertion(
            Box::new(SpecificLocation::new(block, 3, 2)),
            Box::new(NopPatch),
        );

        let err = ctx.apply().unwrap_err();
        assert!(matches!(err, Error::OverlappingEdits { .. }));
    }

    #[test]
    fn function_stub_is_registered_as_a_leaf_function_and_gets_a_body() {
        let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
        let mut ctx = RewritingContext::new(
            &mut module,
            Box::new(SystemV),
            Box::new(FixedDecoder),
            Box::new(|_id| Box::new(FakeAssembler { bytes: Vec::new() }) as Box<dyn Assembler>),
        );
        let symbol = ctx.register_insert_function("my_new_fn", Box::new(NopPatch));
        ctx.apply().unwrap();

        // The stub's one-byte no-op body is gone; the patch's assembled
        // body (9 bytes under the fake assembler) replaced it outright, so
        // any CFG edge the stub carried before the patch ran is dropped
        // along with it (splice()'s replaces_last_insn rule). A real
        // assembler would re-derive a return edge from the patch's own
        // `ret` instruction; the fake one here doesn't model control flow.
        let referent = module.symbol(symbol).referent_block().unwrap();
        assert_eq!(module.block(referent).size(), 9);
        let func = Function::owning(&module, referent).expect("stub registered as a function");
        assert!(func.is_leaf(&module));
        assert_eq!(module.symbol(symbol).name(), "my_new_fn");
    }

    #[test]
    fn get_or_insert_extern_symbol_is_idempotent_and_decorates_pie_targets() {
        let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
        module.aux_data_mut().binary_type.push("DYN".to_string());
        let mut ctx = RewritingContext::new(
            &mut module,
            Box::new(SystemV),
            Box::new(FixedDecoder),
            Box::new(|_id| Box::new(FakeAssembler { bytes: Vec::new() }) as Box<dyn Assembler>),
        );

        let first = ctx.get_or_insert_extern_symbol("malloc", "libc.so.6", false, None);
        let second = ctx.get_or_insert_extern_symbol("malloc", "libc.so.6", false, None);
        assert_eq!(first, second);
        assert_eq!(module.symbol(first).name(), "malloc@plt");
        assert_eq!(module.aux_data().libraries, vec!["libc.so.6".to_string()]);
    }

    #[test]
    fn target_triple_rejects_an_isa_with_no_defined_mapping() {
        let module = Module::new(splice_ir::Isa::Mips32, FileFormat::Elf);
        let err = target_triple(&module).unwrap_err();
        assert!(matches!(err, Error::UnsupportedIsa(_)));
    }

    #[test]
    fn target_triple_reports_the_configured_triple() {
        let module = Module::new(Isa::X86_64, FileFormat::Elf);
        assert_eq!(target_triple(&module).unwrap(), "x86_64-pc-linux");
    }
}
