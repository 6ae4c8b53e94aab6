//! Functions as a derived grouping over the function-related aux tables.

use crate::ids::{CodeBlockId, SymbolId};
use crate::module::Module;
use std::collections::BTreeSet;
use uuid::Uuid;

/// A function, materialised on demand from `functionEntries`,
/// `functionBlocks`, and `functionNames` rather than stored directly in
/// the IR — mirroring how the original project treats functions as a
/// view over aux data, not a first-class persisted entity.
#[derive(Clone, Debug)]
pub struct Function {
    pub uuid: Uuid,
    pub entry_blocks: BTreeSet<CodeBlockId>,
    pub all_blocks: BTreeSet<CodeBlockId>,
    pub names: Vec<SymbolId>,
}

impl Function {
    /// Every function defined in `module`'s aux tables.
    pub fn all(module: &Module) -> Vec<Function> {
        let tables = &module.aux_data().functions;
        tables
            .blocks
            .keys()
            .map(|&uuid| Function {
                uuid,
                entry_blocks: tables.entries.get(&uuid).cloned().unwrap_or_default(),
                all_blocks: tables.blocks.get(&uuid).cloned().unwrap_or_default(),
                names: tables.names.get(&uuid).copied().into_iter().collect(),
            })
            .collect()
    }

    /// The function that owns `block`, if any.
    pub fn owning(module: &Module, block: CodeBlockId) -> Option<Function> {
        let tables = &module.aux_data().functions;
        let (&uuid, _) = tables
            .blocks
            .iter()
            .find(|(_, blocks)| blocks.contains(&block))?;
        Some(Function {
            uuid,
            entry_blocks: tables.entries.get(&uuid).cloned().unwrap_or_default(),
            all_blocks: tables.blocks.get(&uuid).cloned().unwrap_or_default(),
            names: tables.names.get(&uuid).copied().into_iter().collect(),
        })
    }

    /// Whether the `leafFunctions` cache marks this function as a leaf.
    ///
    /// The cache is computed once per rewriting pass and must not be
    /// recomputed mid-pass: later patches may introduce call edges that
    /// would otherwise make a function that started as a leaf look
    /// non-leaf, even though its prologue/epilogue was already synthesised
    /// under the original assumption. A function absent from the cache
    /// defaults to a leaf, matching the cache's own population rule.
    pub fn is_leaf(&self, module: &Module) -> bool {
        module
            .aux_data()
            .leaf_functions
            .get(&self.uuid)
            .copied()
            .unwrap_or(true)
    }
}
