//! The mutation engine: splicing an assembled fragment into an existing
//! code block while preserving every structural invariant of the IR.

use crate::error::{Error, Result};
use splice_ir::{
    ByteIntervalId, Cfg, CfgNode, CodeBlock, CodeBlockId, Edge, EdgeLabel, Module, Payload,
    SymbolicExpr,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Per-block bookkeeping built once at the start of a rewriting pass and
/// consulted (read-only) by every call into [`splice`].
///
/// Building the block→function map and the per-block return-edge set up
/// front avoids re-deriving them from the aux tables on every single
/// insertion, which matters once a function has dozens of patches applied
/// to it.
#[derive(Default)]
pub struct ModifyCache {
    block_function: HashMap<CodeBlockId, Uuid>,
    return_edges: HashMap<CodeBlockId, Vec<Edge>>,
}

impl ModifyCache {
    pub fn build(module: &Module) -> Self {
        let mut block_function = HashMap::new();
        for func in splice_ir::Function::all(module) {
            for &block in &func.all_blocks {
                block_function.insert(block, func.uuid);
            }
        }
        let mut return_edges: HashMap<CodeBlockId, Vec<Edge>> = HashMap::new();
        for edge in module.cfg().iter() {
            if edge.label == EdgeLabel::Return {
                if let CfgNode::Block(b) = edge.source {
                    return_edges.entry(b).or_default().push(*edge);
                }
            }
        }
        Self {
            block_function,
            return_edges,
        }
    }

    pub fn function_of(&self, block: CodeBlockId) -> Option<Uuid> {
        self.block_function.get(&block).copied()
    }

    pub fn return_edges_of(&self, block: CodeBlockId) -> &[Edge] {
        self.return_edges.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A reference to a block within a [`Fragment`] that is still being
/// assembled: either one of the fragment's own blocks (by index) or a
/// block/proxy that already exists in the module (e.g. the target of a
/// call to an extern symbol, or a return edge to an existing proxy).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FragmentNode {
    Local(usize),
    Existing(CfgNode),
}

/// A CFG edge internal to a fragment, expressed in terms of
/// [`FragmentNode`]s rather than real entity ids (the fragment's own
/// blocks don't have ids until `splice` allocates them).
#[derive(Copy, Clone, Debug)]
pub struct FragmentEdge {
    pub source: FragmentNode,
    pub target: FragmentNode,
    pub label: EdgeLabel,
}

/// One of the new code blocks a fragment introduces.
#[derive(Copy, Clone, Debug)]
pub struct FragmentBlock {
    pub size: u32,
}

/// What a fragment-local symbol points at.
#[derive(Copy, Clone, Debug)]
pub enum FragmentPayload {
    Local(usize),
    Existing(Payload),
}

/// A symbol introduced by a fragment (e.g. a label the patch's assembly
/// defines internally).
#[derive(Clone, Debug)]
pub struct FragmentSymbol {
    pub name: String,
    pub payload: FragmentPayload,
}

/// The output of assembling a patch's text: raw bytes plus the blocks,
/// control flow, symbolic expressions, and symbols found inside them.
///
/// This is what `splice` consumes; producing one is the assembler's job
/// (out of scope for this crate — see
/// [`crate::assembler::Assembler::finalize`]).
#[derive(Clone, Debug)]
pub struct Fragment {
    pub bytes: Vec<u8>,
    pub blocks: Vec<FragmentBlock>,
    pub cfg: Vec<FragmentEdge>,
    /// Symbolic expressions keyed by offset relative to the start of
    /// `bytes`.
    pub sym_exprs: BTreeMap<i64, SymbolicExpr>,
    pub symbols: Vec<FragmentSymbol>,
}

impl Fragment {
    fn last_index(&self) -> usize {
        self.blocks.len() - 1
    }

    fn validate(&self) {
        assert!(!self.bytes.is_empty(), "fragment must carry at least one byte");
        assert!(!self.blocks.is_empty(), "fragment must carry at least one block");
        assert!(self.blocks[0].size > 0, "a fragment's first block cannot be size-0");
        let last = self.last_index();
        for (i, b) in self.blocks.iter().enumerate() {
            if i != last {
                assert!(b.size > 0, "only a fragment's last block may be size-0");
            }
        }
        assert!(
            self.cfg
                .iter()
                .all(|e| e.source != FragmentNode::Local(last)),
            "a fragment's last block must have no outgoing edges"
        );
    }
}

/// Redirect every edge and symbol referent pointing at `old` to point at
/// `new` instead, then drop `old` from its byte interval's block
/// membership.
///
/// `old` is not reclaimed as an entity (this workspace's entity maps
/// never free slots, the same convention `cranelift-entity` follows);
/// once this returns, `old` is simply unreferenced by any edge, symbol,
/// or byte interval, so it is no longer "a code block in the module" by
/// any definition that matters to the postconditions this engine
/// promises.
fn substitute_block(module: &mut Module, old: CodeBlockId, new: CfgNode) {
    module.cfg_mut().retarget_source(CfgNode::Block(old), new);
    module.cfg_mut().retarget_target(CfgNode::Block(old), new);

    let symbol_ids: Vec<_> = module.symbols().map(|(id, _)| id).collect();
    for sym_id in symbol_ids {
        if module.symbol(sym_id).referent_block() == Some(old) {
            match new {
                CfgNode::Block(b) => module.symbol_mut(sym_id).retarget_block(b),
                CfgNode::Proxy(p) => {
                    // A symbol's payload is `Block` or `Proxy`, never both;
                    // retargeting to a proxy means replacing the payload
                    // outright rather than going through `retarget_block`.
                    let name = module.symbol(sym_id).name().to_string();
                    *module.symbol_mut(sym_id) = splice_ir::Symbol::new(name, Payload::Proxy(p));
                }
            }
        }
    }

    let old_block = *module.block(old);
    module
        .byte_interval_mut(old_block.byte_interval())
        .remove_block(old, old_block.offset());
}

fn rewrite_offset_submap<V: Clone>(
    table: &mut splice_entity::OffsetMap<ByteIntervalId, V>,
    bi: ByteIntervalId,
    p: i64,
    replacement_length: i64,
    size_delta: i64,
) {
    if let Some(old) = table.delete_element(bi) {
        let mut new = BTreeMap::new();
        for (k, v) in old {
            if k < p {
                new.insert(k, v);
            } else if k >= p + replacement_length {
                new.insert(k + size_delta, v);
            }
        }
        table.replace_element(bi, new);
    }
}

fn rewrite_sym_exprs(
    map: &BTreeMap<i64, SymbolicExpr>,
    p: i64,
    replacement_length: i64,
    size_delta: i64,
    fragment_exprs: &BTreeMap<i64, SymbolicExpr>,
) -> BTreeMap<i64, SymbolicExpr> {
    let mut new = BTreeMap::new();
    for (&k, v) in map {
        if k < p {
            new.insert(k, v.clone());
        } else if k >= p + replacement_length {
            new.insert(k + size_delta, v.clone());
        }
    }
    for (&rel, v) in fragment_exprs {
        new.insert(p + rel, v.clone());
    }
    new
}

/// Splice `fragment` into `block` at `offset`, deleting `replacement_length`
/// bytes of the original block's contents starting there.
///
/// Returns `(end_block, bytes_inserted)`: `end_block` is whichever block now
/// owns the final byte of the inserted fragment, for the driver to resume
/// tracking subsequent insertions into the same original block.
pub fn splice(
    module: &mut Module,
    _cache: &ModifyCache,
    block: CodeBlockId,
    offset: u32,
    replacement_length: u32,
    fragment: Fragment,
) -> Result<(CodeBlockId, u32)> {
    fragment.validate();

    let original = *module.block(block);
    let bi = original.byte_interval();
    let original_size = original.size();

    assert!(offset <= original_size, "offset out of bounds");
    assert!(
        replacement_length <= original_size - offset,
        "replacement_length exceeds the block's remaining bytes"
    );
    let size_delta = fragment.bytes.len() as i64 - replacement_length as i64;
    let p = (original.offset() + offset) as i64;

    let inserts_at_end = replacement_length == 0 && offset == original_size;
    let replaces_last_insn =
        replacement_length > 0 && offset + replacement_length == original_size;
    let block_has_outgoing_edges = module.cfg().outgoing(CfgNode::Block(block)).next().is_some();
    let trivial = fragment.cfg.is_empty()
        && fragment.symbols.is_empty()
        && !inserts_at_end
        && !replaces_last_insn
        && !block_has_outgoing_edges;

    if trivial {
        splice_bytes(module, bi, p, replacement_length as i64, &fragment.bytes);
        shift_offsets(module, bi, p, size_delta, Some(block));
        module.block_mut(block).set_size((original_size as i64 + size_delta) as u32);
        rewrite_bi_aux_data(module, bi, p, replacement_length as i64, size_delta, &fragment.sym_exprs);
        return Ok((block, fragment.bytes.len() as u32));
    }

    general_splice(
        module,
        block,
        offset,
        replacement_length,
        original,
        bi,
        original_size,
        p,
        size_delta,
        inserts_at_end,
        replaces_last_insn,
        fragment,
    )
}

#[allow(clippy::too_many_arguments)]
fn general_splice(
    module: &mut Module,
    block: CodeBlockId,
    offset: u32,
    replacement_length: u32,
    original: CodeBlock,
    bi: ByteIntervalId,
    original_size: u32,
    p: i64,
    size_delta: i64,
    inserts_at_end: bool,
    replaces_last_insn: bool,
    fragment: Fragment,
) -> Result<(CodeBlockId, u32)> {
    let n = fragment.blocks.len();
    let last_idx = n - 1;

    // Relative offsets within the fragment, computed from the *original*
    // (pre tail-extension) per-block sizes: extending the tail block's
    // size only pushes its end out, never its start.
    let mut rel_offsets = vec![0u32; n];
    for i in 1..n {
        rel_offsets[i] = rel_offsets[i - 1] + fragment.blocks[i - 1].size;
    }

    let mut sizes: Vec<u32> = fragment.blocks.iter().map(|b| b.size).collect();
    sizes[last_idx] += original_size - offset - replacement_length;

    // Allocate real ids for every fragment block up front so CFG/symbol
    // work below can use real entity references. Offsets are placeholders
    // until the physical layout shift later in this function.
    let frag_ids: Vec<CodeBlockId> = sizes
        .iter()
        .map(|&size| module.add_block(CodeBlock::new(bi, 0, size)))
        .collect();
    // `add_block` above also registered membership at the placeholder
    // offset 0; drop that now, it's re-added once offsets are final.
    for (i, &id) in frag_ids.iter().enumerate() {
        let _ = i;
        module.byte_interval_mut(bi).remove_block(id, 0);
    }

    let translate_node = |n: FragmentNode| -> CfgNode {
        match n {
            FragmentNode::Local(i) => CfgNode::Block(frag_ids[i]),
            FragmentNode::Existing(node) => node,
        }
    };
    for e in &fragment.cfg {
        module.cfg_mut().insert(Edge {
            source: translate_node(e.source),
            target: translate_node(e.target),
            label: e.label,
        });
    }
    for sym in &fragment.symbols {
        let payload = match sym.payload {
            FragmentPayload::Local(i) => Payload::Block(frag_ids[i]),
            FragmentPayload::Existing(p) => p,
        };
        module.add_symbol(splice_ir::Symbol::new(sym.name.clone(), payload));
    }

    // Step 1: truncate the original block.
    module.block_mut(block).set_size(offset);

    // Step 3/4: figure out whether a synthetic fall-through from `block`
    // into the fragment's first block is needed, and classify how
    // `block`'s original outgoing edges get redirected.
    let block_had_fallthrough = module.cfg().has_outgoing_fallthrough(CfgNode::Block(block));
    let add_entry_fallthrough = !inserts_at_end || block_had_fallthrough;

    let outgoing: Vec<Edge> = module
        .cfg()
        .outgoing(CfgNode::Block(block))
        .copied()
        .collect();
    for e in &outgoing {
        module.cfg_mut().remove(e);
    }

    if add_entry_fallthrough {
        module.cfg_mut().insert(Edge {
            source: CfgNode::Block(block),
            target: CfgNode::Block(frag_ids[0]),
            label: EdgeLabel::Fallthrough,
        });
    }

    for e in &outgoing {
        if inserts_at_end {
            if e.label == EdgeLabel::Fallthrough {
                module.cfg_mut().insert(Edge {
                    source: CfgNode::Block(frag_ids[last_idx]),
                    ..*e
                });
            } else {
                module.cfg_mut().insert(*e);
            }
        } else if replaces_last_insn {
            if e.label == EdgeLabel::Fallthrough {
                module.cfg_mut().insert(Edge {
                    source: CfgNode::Block(frag_ids[last_idx]),
                    ..*e
                });
            }
            // non-fall-through edges of a replaced instruction are
            // discarded: they described control leaving bytes that no
            // longer exist.
        } else {
            module.cfg_mut().insert(Edge {
                source: CfgNode::Block(frag_ids[last_idx]),
                ..*e
            });
        }
    }

    // `live[i]` tracks whether `frag_ids[i]` is still a standalone block
    // after head/tail repairs, or has been folded into something else.
    let mut live = vec![true; n];
    let mut head_block: CodeBlockId = frag_ids[0];

    // Step 5: zero-size head repair.
    if module.block(block).size() == 0 {
        if add_entry_fallthrough {
            module.cfg_mut().remove(&Edge {
                source: CfgNode::Block(block),
                target: CfgNode::Block(frag_ids[0]),
                label: EdgeLabel::Fallthrough,
            });
        }
        module.block_mut(block).set_size(sizes[0]);
        substitute_block(module, frag_ids[0], CfgNode::Block(block));
        live[0] = false;
        head_block = block;
    }

    // Step 6: zero-size tail repair.
    let tail_size = sizes[last_idx];
    let mut tail_dropped = false;
    if tail_size == 0 && live.get(last_idx).copied().unwrap_or(true) {
        let tail_node = if last_idx == 0 {
            CfgNode::Block(head_block)
        } else {
            CfgNode::Block(frag_ids[last_idx])
        };
        let incoming: Vec<Edge> = module.cfg().incoming(tail_node).copied().collect();
        let has_symbol_referent = if let CfgNode::Block(b) = tail_node {
            module
                .symbols()
                .any(|(_, s)| s.referent_block() == Some(b))
        } else {
            false
        };

        if incoming.is_empty() && !has_symbol_referent {
            let outgoing_tail: Vec<Edge> = module.cfg().outgoing(tail_node).copied().collect();
            for e in &outgoing_tail {
                module.cfg_mut().remove(e);
            }
            if let CfgNode::Block(b) = tail_node {
                if last_idx != 0 {
                    live[last_idx] = false;
                }
                let bl = *module.block(b);
                module.byte_interval_mut(bl.byte_interval()).remove_block(b, bl.offset());
            }
            tail_dropped = true;
        } else {
            let outgoing_tail: Vec<Edge> = module.cfg().outgoing(tail_node).copied().collect();
            let fallthroughs: Vec<&Edge> = outgoing_tail
                .iter()
                .filter(|e| e.label == EdgeLabel::Fallthrough)
                .collect();
            if outgoing_tail.len() == 1 && fallthroughs.len() == 1 {
                let target = outgoing_tail[0].target;
                if let CfgNode::Block(b) = tail_node {
                    substitute_block(module, b, target);
                    if last_idx != 0 {
                        live[last_idx] = false;
                    }
                }
                tail_dropped = true;
            } else if let CfgNode::Block(b) = tail_node {
                return Err(Error::UnresolvedZeroBlock { block: b });
            }
        }
    }

    // Step 7: physical layout shift.
    splice_bytes(module, bi, p, replacement_length as i64, &fragment.bytes);
    shift_offsets(module, bi, p, size_delta, Some(block));

    for i in 0..n {
        if i == 0 && head_block == block {
            continue; // folded into `block`, which keeps its own offset
        }
        if !live[i] {
            continue; // folded or dropped, never placed
        }
        let new_offset = (p + rel_offsets[i] as i64) as u32;
        module.block_mut(frag_ids[i]).set_offset(new_offset);
        module.block_mut(frag_ids[i]).set_size(sizes[i]);
        module.byte_interval_mut(bi).add_block(frag_ids[i], new_offset);
    }

    // Step 8: rewrite symbolic expressions and offset-keyed aux tables.
    rewrite_bi_aux_data(module, bi, p, replacement_length as i64, size_delta, &fragment.sym_exprs);

    let _ = tail_dropped;
    let end_node = if last_idx == 0 {
        CfgNode::Block(head_block)
    } else {
        CfgNode::Block(frag_ids[last_idx])
    };
    let end_block = match end_node {
        CfgNode::Block(b) => b,
        CfgNode::Proxy(_) => block,
    };

    Ok((end_block, fragment.bytes.len() as u32))
}

fn splice_bytes(module: &mut Module, bi: ByteIntervalId, p: i64, replacement_length: i64, new_bytes: &[u8]) {
    let interval = module.byte_interval_mut(bi);
    let contents = interval.contents_mut();
    let p = p as usize;
    let end = p + replacement_length as usize;
    let mut spliced = Vec::with_capacity(contents.len() - (end - p) + new_bytes.len());
    spliced.extend_from_slice(&contents[..p]);
    spliced.extend_from_slice(new_bytes);
    spliced.extend_from_slice(&contents[end..]);
    interval.set_contents(spliced);
}

fn shift_offsets(
    module: &mut Module,
    bi: ByteIntervalId,
    p: i64,
    size_delta: i64,
    exclude: Option<CodeBlockId>,
) {
    let to_shift: Vec<CodeBlockId> = module
        .byte_interval(bi)
        .blocks_ascending()
        .filter(|&id| Some(id) != exclude && module.block(id).offset() as i64 >= p)
        .collect();
    for id in to_shift {
        let old_offset = module.block(id).offset();
        let new_offset = (old_offset as i64 + size_delta) as u32;
        module.byte_interval_mut(bi).rekey_block(id, old_offset, new_offset);
        module.block_mut(id).set_offset(new_offset);
    }
}

fn rewrite_bi_aux_data(
    module: &mut Module,
    bi: ByteIntervalId,
    p: i64,
    replacement_length: i64,
    size_delta: i64,
    fragment_sym_exprs: &BTreeMap<i64, SymbolicExpr>,
) {
    {
        let interval = module.byte_interval_mut(bi);
        let rewritten = rewrite_sym_exprs(
            interval.symbolic_expressions(),
            p,
            replacement_length,
            size_delta,
            fragment_sym_exprs,
        );
        interval.set_symbolic_expressions(rewritten);
    }

    let aux = module.aux_data_mut();
    rewrite_offset_submap(&mut aux.comments, bi, p, replacement_length, size_delta);
    rewrite_offset_submap(&mut aux.padding, bi, p, replacement_length, size_delta);
    rewrite_offset_submap(&mut aux.symbolic_expression_sizes, bi, p, replacement_length, size_delta);
    if let Some(cfi) = aux.cfi_directives.as_mut() {
        rewrite_offset_submap(cfi, bi, p, replacement_length, size_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_ir::{ByteInterval, FileFormat, Isa};

    fn fixture() -> (Module, CodeBlockId) {
        let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
        let bi = module.add_byte_interval(ByteInterval::new(vec![0x90; 10]));
        let block = module.add_block(CodeBlock::new(bi, 0, 10));
        (module, block)
    }

    fn single_block_fragment(bytes: Vec<u8>) -> Fragment {
        let size = bytes.len() as u32;
        Fragment {
            bytes,
            blocks: vec![FragmentBlock { size }],
            cfg: Vec::new(),
            sym_exprs: BTreeMap::new(),
            symbols: Vec::new(),
        }
    }

    #[test]
    fn trivial_splice_extends_block_and_contents() {
        let (mut module, block) = fixture();
        let cache = ModifyCache::build(&module);
        let fragment = single_block_fragment(vec![0xAA, 0xBB]);

        let (end_block, inserted) = splice(&mut module, &cache, block, 4, 0, fragment).unwrap();

        assert_eq!(end_block, block);
        assert_eq!(inserted, 2);
        assert_eq!(module.block(block).size(), 12);
        assert_eq!(
            module.byte_interval(module.block(block).byte_interval()).contents(),
            &[0x90, 0x90, 0x90, 0x90, 0xAA, 0xBB, 0x90, 0x90, 0x90, 0x90, 0x90, 0x90]
        );
        let blocks: Vec<_> = module
            .byte_interval(module.block(block).byte_interval())
            .blocks_ascending()
            .collect();
        assert_eq!(blocks, vec![block]);
    }

    #[test]
    fn interior_edit_with_branch_edge_creates_new_block() {
        let (mut module, block) = fixture();
        let proxy = module.add_proxy(splice_ir::ProxyBlock);
        module.cfg_mut().insert(Edge {
            source: CfgNode::Block(block),
            target: CfgNode::Proxy(proxy),
            label: EdgeLabel::Branch,
        });
        let cache = ModifyCache::build(&module);
        let fragment = single_block_fragment(vec![0xAA, 0xBB]);

        let (_end_block, inserted) = splice(&mut module, &cache, block, 4, 0, fragment).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(module.block(block).size(), 4);

        let bi = module.block(block).byte_interval();
        let blocks: Vec<_> = module.byte_interval(bi).blocks_ascending().collect();
        assert_eq!(blocks.len(), 2);
        let new_block = blocks[1];
        assert_eq!(module.block(new_block).size(), 8);

        assert!(module
            .cfg()
            .iter()
            .any(|e| e.source == CfgNode::Block(block)
                && e.target == CfgNode::Block(new_block)
                && e.label == EdgeLabel::Fallthrough));
        assert!(module
            .cfg()
            .iter()
            .any(|e| e.source == CfgNode::Block(new_block)
                && e.target == CfgNode::Proxy(proxy)
                && e.label == EdgeLabel::Branch));
    }

    #[test]
    fn replaces_last_insn_drops_non_fallthrough_edge() {
        let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
        let bi = module.add_byte_interval(ByteInterval::new(vec![0x90; 6]));
        let block = module.add_block(CodeBlock::new(bi, 0, 6));
        let proxy = module.add_proxy(splice_ir::ProxyBlock);
        module.cfg_mut().insert(Edge {
            source: CfgNode::Block(block),
            target: CfgNode::Proxy(proxy),
            label: EdgeLabel::Branch,
        });
        let cache = ModifyCache::build(&module);
        let fragment = single_block_fragment(vec![0x90, 0x90]);

        splice(&mut module, &cache, block, 4, 2, fragment).unwrap();

        assert_eq!(module.block(block).size(), 4);
        assert!(!module
            .cfg()
            .iter()
            .any(|e| e.target == CfgNode::Proxy(proxy)));
    }

    #[test]
    fn comments_aux_table_shifts_past_insertion_point() {
        let (mut module, block) = fixture();
        let bi = module.block(block).byte_interval();
        module.aux_data_mut().comments.insert(bi, 6, "hi".to_string());
        let cache = ModifyCache::build(&module);
        let fragment = single_block_fragment(vec![0xAA; 4]);

        splice(&mut module, &cache, block, 2, 0, fragment).unwrap();

        assert_eq!(module.aux_data().comments.lookup(bi, 6), None);
        assert_eq!(
            module.aux_data().comments.lookup(bi, 10),
            Some(&"hi".to_string())
        );
    }
}
