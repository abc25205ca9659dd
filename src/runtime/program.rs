//! Per-actor block forests and their structural edits
//!
//! Every node lives in exactly one place. Moves are remove-then-insert, and
//! a move that would put a block beneath itself is refused before anything
//! is detached, so a failed edit never loses a subtree.

use std::collections::HashMap;

use super::block::{BlockNode, ParamValue};
use super::error::{ProgramError, ProgramResult};
use super::ids::{ActorId, BlockId};

/// Program store: actor id to ordered top-level blocks
#[derive(Debug, Clone, Default)]
pub struct ProgramStore {
    forests: HashMap<ActorId, Vec<BlockNode>>,
}

impl ProgramStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level blocks of an actor (empty if it has no program)
    pub fn forest(&self, actor: &ActorId) -> &[BlockNode] {
        self.forests.get(actor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the actor currently has at least one block
    pub fn has_program(&self, actor: &ActorId) -> bool {
        !self.forest(actor).is_empty()
    }

    /// Iterate over every non-empty forest
    pub fn forests(&self) -> impl Iterator<Item = (&ActorId, &[BlockNode])> {
        self.forests
            .iter()
            .filter(|(_, blocks)| !blocks.is_empty())
            .map(|(actor, blocks)| (actor, blocks.as_slice()))
    }

    /// Find a block in any forest, returning its owner
    pub fn locate(&self, id: BlockId) -> Option<(ActorId, &BlockNode)> {
        self.forests.iter().find_map(|(actor, blocks)| {
            blocks
                .iter()
                .find_map(|block| block.find(id))
                .map(|block| (*actor, block))
        })
    }

    /// Find a block in any forest
    pub fn find(&self, id: BlockId) -> Option<&BlockNode> {
        self.locate(id).map(|(_, block)| block)
    }

    fn find_mut(&mut self, id: BlockId) -> Option<&mut BlockNode> {
        self.forests
            .values_mut()
            .flat_map(|blocks| blocks.iter_mut())
            .find_map(|block| block.find_mut(id))
    }

    fn find_in_forest_mut(&mut self, actor: &ActorId, id: BlockId) -> Option<&mut BlockNode> {
        self.forests
            .get_mut(actor)?
            .iter_mut()
            .find_map(|block| block.find_mut(id))
    }

    /// Append `node` under `parent`, or at the actor's top level.
    ///
    /// The node's owner and parent fields are rewritten to the destination.
    pub fn insert(
        &mut self,
        mut node: BlockNode,
        parent: Option<BlockId>,
        actor: ActorId,
    ) -> ProgramResult<BlockId> {
        if let Some(existing) = node.subtree_ids().into_iter().find(|id| self.find(*id).is_some()) {
            return Err(ProgramError::DuplicateBlock(existing));
        }

        let id = node.id;
        node.relabel(actor, parent);

        match parent {
            Some(parent_id) => {
                let parent_node = self
                    .find_in_forest_mut(&actor, parent_id)
                    .ok_or(ProgramError::ParentNotFound {
                        parent: parent_id,
                        actor,
                    })?;
                if !parent_node.kind.is_container() {
                    return Err(ProgramError::NotAContainer(parent_id));
                }
                parent_node.children.push(node);
            }
            None => self.forests.entry(actor).or_default().push(node),
        }

        Ok(id)
    }

    /// Detach a block (and its subtree) from wherever it lives
    pub fn remove(&mut self, id: BlockId) -> ProgramResult<BlockNode> {
        self.forests
            .values_mut()
            .find_map(|blocks| take_from(blocks, id))
            .ok_or(ProgramError::BlockNotFound(id))
    }

    /// Move a block to the end of a new parent's children, or to an actor's
    /// top level. Identity, parameters and children are preserved.
    pub fn move_block(
        &mut self,
        id: BlockId,
        actor: ActorId,
        parent: Option<BlockId>,
    ) -> ProgramResult<()> {
        let (_, block) = self.locate(id).ok_or(ProgramError::BlockNotFound(id))?;

        if let Some(parent_id) = parent {
            if block.contains(parent_id) {
                return Err(ProgramError::WouldCycle {
                    block: id,
                    parent: parent_id,
                });
            }
            let target = self
                .forest(&actor)
                .iter()
                .find_map(|root| root.find(parent_id))
                .ok_or(ProgramError::ParentNotFound {
                    parent: parent_id,
                    actor,
                })?;
            if !target.kind.is_container() {
                return Err(ProgramError::NotAContainer(parent_id));
            }
        }

        let node = self.remove(id)?;
        self.insert(node, parent, actor)?;
        Ok(())
    }

    /// Set a named parameter on a block
    pub fn update_param(&mut self, id: BlockId, name: &str, value: &ParamValue) -> ProgramResult<()> {
        let block = self.find_mut(id).ok_or(ProgramError::BlockNotFound(id))?;
        block.kind.set_param(name, value)
    }

    /// Exchange the two actors' whole forests, relabelling every node's owner
    pub fn swap_forests(&mut self, first: ActorId, second: ActorId) {
        if first == second {
            return;
        }
        let mut from_first = self.forests.remove(&first).unwrap_or_default();
        let mut from_second = self.forests.remove(&second).unwrap_or_default();

        for block in &mut from_second {
            block.relabel(first, None);
        }
        for block in &mut from_first {
            block.relabel(second, None);
        }

        self.forests.insert(first, from_second);
        self.forests.insert(second, from_first);
    }

    /// Remove an actor's forest entirely
    pub fn drop_actor(&mut self, actor: &ActorId) -> Vec<BlockNode> {
        self.forests.remove(actor).unwrap_or_default()
    }

    /// Number of nodes across all forests, each subtree node counted once
    pub fn total_block_count(&self) -> usize {
        self.forests
            .values()
            .flat_map(|blocks| blocks.iter())
            .map(BlockNode::count)
            .sum()
    }
}

fn take_from(blocks: &mut Vec<BlockNode>, id: BlockId) -> Option<BlockNode> {
    if let Some(index) = blocks.iter().position(|block| block.id == id) {
        return Some(blocks.remove(index));
    }
    blocks
        .iter_mut()
        .find_map(|block| take_from(&mut block.children, id))
}
