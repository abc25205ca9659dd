//! Shared stage state: actors, programs and the active run
//!
//! `World` is the single owner of the actor registry and the program store.
//! A run's execution table and debounce set live in `RunState`, created on
//! run start and dropped on stop. All writers (tick drivers and user edits)
//! go through `&mut World`, which the `Stage` keeps behind one mutex.

use serde::{Deserialize, Serialize};

use super::StageConfig;
use super::actor::{Actor, ActorRegistry};
use super::block::{BlockNode, ParamValue};
use super::collision::{CollisionDebounce, overlapping_pairs};
use super::error::{ActorError, ProgramError, Result, StageError};
use super::events::{CollisionEvent, StageEvent};
use super::execution::ExecutionTracker;
use super::ids::{ActorId, BlockId};
use super::interpreter::step_actor;
use super::program::ProgramStore;

/// State that exists only while a run is active
#[derive(Debug)]
pub struct RunState {
    generation: u64,
    tracker: ExecutionTracker,
    debounce: CollisionDebounce,
    driven: Vec<ActorId>,
}

impl RunState {
    /// Run generation, unique per world
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Execution table
    pub fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    /// Collision debounce set
    pub fn debounce(&self) -> &CollisionDebounce {
        &self.debounce
    }

    /// Actors that receive a tick driver
    pub fn driven(&self) -> &[ActorId] {
        &self.driven
    }
}

/// Result of asking the world to tick one actor
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The actor's program advanced
    Ticked(Vec<StageEvent>),
    /// No run, or the run this tick belonged to has ended
    Stale,
    /// The actor was removed
    ActorGone,
}

/// One actor's program as exposed to renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorProgram {
    /// Owner
    pub actor: ActorId,
    /// Top-level blocks
    pub blocks: Vec<BlockNode>,
}

/// Read-only view of the whole stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Whether a run is active
    pub running: bool,
    /// Actors in creation order
    pub actors: Vec<Actor>,
    /// Programs, in actor order
    pub programs: Vec<ActorProgram>,
    /// Exact node count over all programs
    pub total_blocks: usize,
}

/// Actors, programs and run state
pub struct World {
    actors: ActorRegistry,
    programs: ProgramStore,
    run: Option<RunState>,
    collision_radius: f64,
    generations: u64,
}

impl World {
    /// A world holding the two default sprites
    pub fn new(config: &StageConfig) -> Self {
        Self::from_registry(
            ActorRegistry::with_defaults(config.seed, config.spawn_spread),
            config,
        )
    }

    /// A world holding the given actors (at least one)
    pub fn with_actors(actors: Vec<Actor>, config: &StageConfig) -> Result<Self> {
        if actors.is_empty() {
            return Err(StageError::Config(
                "a stage needs at least one actor".to_string(),
            ));
        }
        Ok(Self::from_registry(
            ActorRegistry::with_actors(actors, config.seed, config.spawn_spread),
            config,
        ))
    }

    fn from_registry(actors: ActorRegistry, config: &StageConfig) -> Self {
        Self {
            actors,
            programs: ProgramStore::new(),
            run: None,
            collision_radius: config.collision_radius,
            generations: 0,
        }
    }

    /// Actor registry
    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    /// Program store
    pub fn programs(&self) -> &ProgramStore {
        &self.programs
    }

    /// Active run, if any
    pub fn run_state(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Whether a run is active
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Spawn a new actor
    pub fn add_actor(&mut self) -> ActorId {
        self.actors.add()
    }

    /// Rename an actor
    pub fn rename_actor(&mut self, id: &ActorId, name: impl Into<String>) -> Result<()> {
        Ok(self.actors.rename(id, name)?)
    }

    /// Place an actor by hand. The baseline pose is left alone.
    pub fn set_actor_pose(&mut self, id: &ActorId, x: f64, y: f64, heading: f64) -> Result<()> {
        Ok(self.actors.update_position(id, x, y, Some(heading))?)
    }

    /// Remove an actor with its program and run state
    pub fn remove_actor(&mut self, id: &ActorId) -> Result<Actor> {
        let actor = self.actors.remove(id)?;
        self.programs.drop_actor(id);
        if let Some(run) = self.run.as_mut() {
            run.tracker.forget_actor(id);
            run.debounce.forget_actor(id);
        }
        Ok(actor)
    }

    /// Insert a block under a parent or at an actor's top level
    pub fn insert_block(
        &mut self,
        node: BlockNode,
        parent: Option<BlockId>,
        actor: ActorId,
    ) -> Result<BlockId> {
        if !self.actors.contains(&actor) {
            return Err(ActorError::NotFound(actor).into());
        }
        Ok(self.programs.insert(node, parent, actor)?)
    }

    /// Remove a block and its subtree
    pub fn remove_block(&mut self, id: BlockId) -> Result<BlockNode> {
        let owner = self.owner_of(id)?;
        let node = self.programs.remove(id)?;
        if let Some(run) = self.run.as_mut() {
            run.tracker.forget_branch(&owner, &node);
        }
        Ok(node)
    }

    /// Move a block to a new parent or actor
    pub fn move_block(&mut self, id: BlockId, actor: ActorId, parent: Option<BlockId>) -> Result<()> {
        if !self.actors.contains(&actor) {
            return Err(ActorError::NotFound(actor).into());
        }
        let owner = self.owner_of(id)?;
        self.programs.move_block(id, actor, parent)?;

        if owner != actor {
            if let (Some(run), Some(node)) = (self.run.as_mut(), self.programs.find(id)) {
                run.tracker.forget_branch(&owner, node);
            }
        }
        Ok(())
    }

    /// Set a block parameter
    pub fn update_param(&mut self, id: BlockId, name: &str, value: &ParamValue) -> Result<()> {
        Ok(self.programs.update_param(id, name, value)?)
    }

    fn owner_of(&self, id: BlockId) -> Result<ActorId> {
        self.programs
            .locate(id)
            .map(|(owner, _)| owner)
            .ok_or_else(|| ProgramError::BlockNotFound(id).into())
    }

    /// Start a run: seed the execution table and pick the driven actors.
    ///
    /// Every actor present now gets a driver, so an actor that receives a
    /// program through a collision swap is stepped too. Returns the run
    /// generation; an already active run is kept.
    pub fn begin_run(&mut self) -> u64 {
        if let Some(run) = &self.run {
            return run.generation;
        }

        self.generations += 1;
        let mut tracker = ExecutionTracker::new();
        tracker.begin_run(self.programs.forests());
        self.actors.clear_speech();

        let run = RunState {
            generation: self.generations,
            tracker,
            debounce: CollisionDebounce::new(),
            driven: self.actors.ids(),
        };
        tracing::info!(
            generation = run.generation,
            actors = run.driven.len(),
            entries = run.tracker.len(),
            "run started"
        );
        self.run = Some(run);
        self.generations
    }

    /// End the run, discarding execution and debounce state. Positions stay.
    pub fn end_run(&mut self) -> bool {
        match self.run.take() {
            Some(run) => {
                tracing::info!(generation = run.generation, "run stopped");
                true
            }
            None => false,
        }
    }

    /// Restore every actor's baseline pose
    pub fn reset_positions(&mut self) {
        self.actors.reset();
    }

    /// Tick one actor for the given run generation, then sweep collisions
    pub fn tick_actor(&mut self, actor: ActorId, generation: u64) -> TickOutcome {
        match &self.run {
            Some(run) if run.generation == generation => {}
            _ => return TickOutcome::Stale,
        }
        if !self.actors.contains(&actor) {
            return TickOutcome::ActorGone;
        }

        let mut events = self.step(actor);
        events.extend(self.sweep_collisions());
        TickOutcome::Ticked(events)
    }

    /// Tick every driven actor once, then sweep collisions once
    pub fn tick_all(&mut self) -> Vec<StageEvent> {
        let Some(run) = &self.run else {
            return Vec::new();
        };
        let driven = run.driven.clone();

        let mut events = Vec::new();
        for actor in driven {
            if self.actors.contains(&actor) {
                events.extend(self.step(actor));
            }
        }
        events.extend(self.sweep_collisions());
        events
    }

    fn step(&mut self, actor: ActorId) -> Vec<StageEvent> {
        let World {
            actors,
            programs,
            run,
            ..
        } = self;
        let Some(run) = run.as_mut() else {
            return Vec::new();
        };
        step_actor(actor, programs.forest(&actor), actors, &mut run.tracker)
    }

    /// Detect new overlaps; for each, swap the pair's programs and reseed
    /// their execution state so the swapped programs replay from the start
    pub fn sweep_collisions(&mut self) -> Vec<StageEvent> {
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };

        let pairs = {
            let actors: Vec<&Actor> = self.actors.iter().collect();
            overlapping_pairs(&actors, self.collision_radius)
        };

        let mut events = Vec::new();
        for pair in run.debounce.admit(&pairs) {
            let (first, second) = (pair.first(), pair.second());
            let midpoint = match (self.actors.get(&first), self.actors.get(&second)) {
                (Some(a), Some(b)) => ((a.pose.x + b.pose.x) / 2.0, (a.pose.y + b.pose.y) / 2.0),
                _ => continue,
            };

            self.programs.swap_forests(first, second);
            run.tracker.forget_actor(&first);
            run.tracker.forget_actor(&second);
            run.tracker.reset_branch(first, self.programs.forest(&first));
            run.tracker.reset_branch(second, self.programs.forest(&second));

            tracing::info!(%first, %second, "collision: swapped programs");
            events.push(StageEvent::Collision(CollisionEvent {
                first,
                second,
                midpoint,
                at: chrono::Utc::now(),
            }));
        }
        events
    }

    /// Read-only copy of everything a renderer needs
    pub fn snapshot(&self) -> StageSnapshot {
        let actors: Vec<Actor> = self.actors.iter().cloned().collect();
        let programs = actors
            .iter()
            .map(|actor| ActorProgram {
                actor: actor.id,
                blocks: self.programs.forest(&actor.id).to_vec(),
            })
            .collect();
        StageSnapshot {
            running: self.is_running(),
            actors,
            programs,
            total_blocks: self.programs.total_block_count(),
        }
    }
}
