//! Table-driven scenarios exercising `splice` purely through the public
//! API, one per row of the setup/operation/expected table this engine is
//! built against. Unit tests alongside the implementation already cover
//! four of these from the inside; this file adds the two that need a
//! full end-to-end splice to observe (a preserved return edge, and the
//! ambiguous-zero-block error) and keeps all six together as a single
//! reference point.

use splice_core::error::Error;
use splice_core::modify::{self, Fragment, FragmentBlock, FragmentEdge, FragmentNode, ModifyCache};
use splice_ir::{ByteInterval, CfgNode, CodeBlock, Edge, EdgeLabel, FileFormat, Isa, Module};

fn fragment(bytes: Vec<u8>, sizes: &[u32]) -> Fragment {
    Fragment {
        bytes,
        blocks: sizes.iter().map(|&size| FragmentBlock { size }).collect(),
        cfg: Vec::new(),
        sym_exprs: Default::default(),
        symbols: Vec::new(),
    }
}

/// Scenario 1: a trivial interior insertion with no edges or symbols
/// folds into the existing block instead of splitting it.
#[test]
fn scenario_1_trivial_insertion_extends_the_block_in_place() {
    let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
    let bi = module.add_byte_interval(ByteInterval::new(vec![0x11; 10]));
    let block = module.add_block(CodeBlock::new(bi, 0, 10));
    let cache = ModifyCache::build(&module);

    let (end_block, inserted) = modify::splice(
        &mut module,
        &cache,
        block,
        4,
        0,
        fragment(vec![0xAA, 0xBB], &[2]),
    )
    .unwrap();

    assert_eq!(end_block, block);
    assert_eq!(inserted, 2);
    assert_eq!(module.block(block).size(), 12);
    assert_eq!(
        module.byte_interval(bi).contents(),
        &[0x11, 0x11, 0x11, 0x11, 0xAA, 0xBB, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11]
    );
    assert_eq!(module.byte_interval(bi).blocks_ascending().count(), 1);
}

/// Scenario 2: the same insertion into a block with an outgoing branch
/// splits it, carrying the branch onto the new tail block and wiring a
/// fresh fall-through into it.
#[test]
fn scenario_2_branch_edge_forces_a_split_with_fallthrough_into_the_new_block() {
    let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
    let bi = module.add_byte_interval(ByteInterval::new(vec![0x11; 10]));
    let block = module.add_block(CodeBlock::new(bi, 0, 10));
    let target = module.add_block(CodeBlock::new(bi, 100, 1));
    module.cfg_mut().insert(Edge {
        source: CfgNode::Block(block),
        target: CfgNode::Block(target),
        label: EdgeLabel::Branch,
    });
    let cache = ModifyCache::build(&module);

    modify::splice(
        &mut module,
        &cache,
        block,
        4,
        0,
        fragment(vec![0xAA, 0xBB], &[2]),
    )
    .unwrap();

    assert_eq!(module.block(block).size(), 4);
    let new_block = module
        .byte_interval(bi)
        .blocks_ascending()
        .find(|&b| b != block && b != target)
        .expect("split produced a new tail block");
    assert_eq!(module.block(new_block).size(), 8);

    assert!(module.cfg().iter().any(|e| e.source == CfgNode::Block(block)
        && e.target == CfgNode::Block(new_block)
        && e.label == EdgeLabel::Fallthrough));
    assert!(module.cfg().iter().any(|e| e.source == CfgNode::Block(new_block)
        && e.target == CfgNode::Block(target)
        && e.label == EdgeLabel::Branch));
    assert!(!module
        .cfg()
        .iter()
        .any(|e| e.source == CfgNode::Block(block) && e.label == EdgeLabel::Branch));
}

/// Scenario 3: appending after a block that ends in a `ret` (no
/// fall-through, no replacement) must not wire a synthetic fall-through
/// into the new tail — that would imply control reaches code that a
/// `ret` never falls into.
#[test]
fn scenario_3_insert_after_a_return_preserves_return_semantics() {
    let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
    let bi = module.add_byte_interval(ByteInterval::new(vec![0x11; 5]));
    let block = module.add_block(CodeBlock::new(bi, 0, 5));
    let proxy = module.add_proxy(splice_ir::ProxyBlock);
    module.cfg_mut().insert(Edge {
        source: CfgNode::Block(block),
        target: CfgNode::Proxy(proxy),
        label: EdgeLabel::Return,
    });
    let cache = ModifyCache::build(&module);

    modify::splice(&mut module, &cache, block, 5, 0, fragment(vec![0x90], &[1])).unwrap();

    assert_eq!(module.block(block).size(), 5);
    let new_block = module
        .byte_interval(bi)
        .blocks_ascending()
        .find(|&b| b != block)
        .expect("a new trailing block was created");
    assert_eq!(module.block(new_block).size(), 1);

    assert!(!module
        .cfg()
        .iter()
        .any(|e| e.source == CfgNode::Block(block) && e.label == EdgeLabel::Fallthrough));
    assert!(module.cfg().iter().any(|e| e.source == CfgNode::Block(block)
        && e.target == CfgNode::Proxy(proxy)
        && e.label == EdgeLabel::Return));
}

/// Scenario 4: replacing a trailing branch instruction drops the branch
/// edge outright rather than carrying it to the replacement — the bytes
/// that edge described no longer exist.
#[test]
fn scenario_4_replacing_the_last_instruction_discards_its_branch_edge() {
    let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
    let bi = module.add_byte_interval(ByteInterval::new(vec![0x11; 6]));
    let block = module.add_block(CodeBlock::new(bi, 0, 6));
    let target = module.add_block(CodeBlock::new(bi, 100, 1));
    module.cfg_mut().insert(Edge {
        source: CfgNode::Block(block),
        target: CfgNode::Block(target),
        label: EdgeLabel::Branch,
    });
    let cache = ModifyCache::build(&module);

    modify::splice(
        &mut module,
        &cache,
        block,
        4,
        2,
        fragment(vec![0x90, 0x90], &[2]),
    )
    .unwrap();

    assert_eq!(module.block(block).size(), 4);
    assert!(!module.cfg().iter().any(|e| e.target == CfgNode::Block(target)));
}

/// Scenario 5: an offset-keyed aux table entry past the insertion point
/// shifts by the inserted length; nothing moves in from the replaced
/// range, and nothing before the insertion point is disturbed.
#[test]
fn scenario_5_comments_aux_table_shifts_past_the_insertion_point() {
    let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
    let bi = module.add_byte_interval(ByteInterval::new(vec![0x11; 8]));
    let block = module.add_block(CodeBlock::new(bi, 0, 8));
    module.aux_data_mut().comments.insert(bi, 6, "hi".to_string());
    let cache = ModifyCache::build(&module);

    modify::splice(
        &mut module,
        &cache,
        block,
        2,
        0,
        fragment(vec![0xAA, 0xAA, 0xAA, 0xAA], &[4]),
    )
    .unwrap();

    assert_eq!(module.aux_data().comments.lookup(bi, 6), None);
    assert_eq!(
        module.aux_data().comments.lookup(bi, 10),
        Some(&"hi".to_string())
    );
}

/// Scenario 6: a fragment's trailing empty block that still has incoming
/// edges, but whose outgoing edges aren't a single unambiguous
/// fall-through, can't be folded into anything — `splice` has to refuse
/// rather than guess which successor absorbs it.
///
/// The tail only ever comes out empty when the edit reaches the end of
/// the original block, so this appends (`inserts_at_end`) rather than
/// editing an interior range: `block` already has two outgoing
/// fall-through edges of its own, both of which get redirected onto the
/// fragment's zero-size tail, leaving it with two fall-through
/// successors and no way to pick one.
#[test]
fn scenario_6_ambiguous_trailing_empty_block_is_rejected() {
    let mut module = Module::new(Isa::X86_64, FileFormat::Elf);
    let bi = module.add_byte_interval(ByteInterval::new(vec![0x11; 4]));
    let block = module.add_block(CodeBlock::new(bi, 0, 4));
    let landing_a = module.add_block(CodeBlock::new(bi, 200, 1));
    let landing_b = module.add_block(CodeBlock::new(bi, 300, 1));
    module.cfg_mut().insert(Edge {
        source: CfgNode::Block(block),
        target: CfgNode::Block(landing_a),
        label: EdgeLabel::Fallthrough,
    });
    module.cfg_mut().insert(Edge {
        source: CfgNode::Block(block),
        target: CfgNode::Block(landing_b),
        label: EdgeLabel::Fallthrough,
    });
    let cache = ModifyCache::build(&module);

    // Block 0 carries the inserted bytes; block 1 is the zero-size tail.
    // It gets an incoming edge from block 0 here (a fragment's last block
    // may have incoming edges, just never outgoing ones of its own — see
    // `Fragment::validate`); `block`'s two pre-existing fall-throughs are
    // what land on it once `splice` redirects them.
    let frag = Fragment {
        bytes: vec![0xAA, 0xAA],
        blocks: vec![FragmentBlock { size: 2 }, FragmentBlock { size: 0 }],
        cfg: vec![FragmentEdge {
            source: FragmentNode::Local(0),
            target: FragmentNode::Local(1),
            label: EdgeLabel::Branch,
        }],
        sym_exprs: Default::default(),
        symbols: Vec::new(),
    };

    let err = modify::splice(&mut module, &cache, block, 4, 0, frag).unwrap_err();
    assert!(matches!(err, Error::UnresolvedZeroBlock { .. }));
}
