//! Per-run execution state, keyed by (actor, block)
//!
//! Rebuilt from the forests when a run starts and dropped when it stops.
//! Leaf blocks only use `fired`; repeat blocks also count completed
//! iterations against the count captured at seeding time.

use std::collections::HashMap;

use super::block::{BlockKind, BlockNode};
use super::ids::{ActorId, BlockId};

/// Execution state of one block in the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionEntry {
    /// Block completed for this run
    pub fired: bool,
    /// Finished iterations (repeat blocks only)
    pub completed_iterations: u32,
    /// Iteration target (repeat blocks only), already clamped to >= 1
    pub repeat_count: Option<u32>,
}

impl ExecutionEntry {
    fn seeded(block: &BlockNode) -> Self {
        let repeat_count = match &block.kind {
            BlockKind::Control(control) => Some(control.effective_repeat_count()),
            _ => None,
        };
        Self {
            fired: false,
            completed_iterations: 0,
            repeat_count,
        }
    }
}

/// Side table of execution entries for the active run
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    entries: HashMap<(ActorId, BlockId), ExecutionEntry>,
}

impl ExecutionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh entry for every reachable block of every forest
    pub fn begin_run<'a>(
        &mut self,
        forests: impl IntoIterator<Item = (&'a ActorId, &'a [BlockNode])>,
    ) {
        self.entries.clear();
        for (actor, blocks) in forests {
            self.seed(*actor, blocks);
        }
    }

    /// Discard every entry
    pub fn end_run(&mut self) {
        self.entries.clear();
    }

    fn seed(&mut self, actor: ActorId, blocks: &[BlockNode]) {
        for block in blocks {
            self.entries
                .insert((actor, block.id), ExecutionEntry::seeded(block));
            self.seed(actor, &block.children);
        }
    }

    /// Entry for a block, seeding it if the block was placed after the run began
    pub fn entry(&mut self, actor: ActorId, block: &BlockNode) -> &mut ExecutionEntry {
        self.entries
            .entry((actor, block.id))
            .or_insert_with(|| ExecutionEntry::seeded(block))
    }

    /// Read-only lookup
    pub fn get(&self, actor: &ActorId, block: &BlockId) -> Option<&ExecutionEntry> {
        self.entries.get(&(*actor, *block))
    }

    /// Whether the block already completed in this run
    pub fn is_fired(&self, actor: &ActorId, block: &BlockId) -> bool {
        self.get(actor, block).is_some_and(|entry| entry.fired)
    }

    /// Mark a block completed
    pub fn mark_fired(&mut self, actor: ActorId, block: &BlockNode) {
        self.entry(actor, block).fired = true;
    }

    /// Count one finished iteration of a repeat block, returning the new count
    pub fn increment_repeat(&mut self, actor: ActorId, block: &BlockNode) -> u32 {
        let entry = self.entry(actor, block);
        entry.completed_iterations += 1;
        entry.completed_iterations
    }

    /// Reseed the given subtrees so they execute again from the start
    pub fn reset_branch(&mut self, actor: ActorId, blocks: &[BlockNode]) {
        self.seed(actor, blocks);
    }

    /// Drop the entries of the given subtrees
    pub fn forget_branch(&mut self, actor: &ActorId, block: &BlockNode) {
        for id in block.subtree_ids() {
            self.entries.remove(&(*actor, id));
        }
    }

    /// Drop every entry owned by an actor
    pub fn forget_actor(&mut self, actor: &ActorId) {
        self.entries.retain(|(owner, _), _| owner != actor);
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries exist
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
