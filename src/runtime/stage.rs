//! Stage facade for the authoring and rendering layers
//!
//! Edits requested by the UI never fail loudly: stale ids, refused moves
//! and malformed drops are logged and reported as `None`/`false`. Run
//! control (run, stop, reset) and event subscription live here too.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::StageConfig;
use super::block::{BlockNode, ParamValue};
use super::error::Result;
use super::events::{EventBus, StageEvent};
use super::ids::{ActorId, BlockId};
use super::payload::{DropRequest, parse_drop};
use super::scheduler::RunSession;
use super::world::{StageSnapshot, World};

/// Interactive stage: shared world, event bus and the active run session
pub struct Stage {
    config: StageConfig,
    world: Arc<Mutex<World>>,
    bus: EventBus,
    session: Option<RunSession>,
}

impl Stage {
    /// A stage with the two default sprites
    pub fn new(config: StageConfig) -> Self {
        let world = World::new(&config);
        Self::from_world(config, world)
    }

    /// A stage around a prepared world
    pub fn from_world(config: StageConfig, world: World) -> Self {
        Self {
            config,
            world: Arc::new(Mutex::new(world)),
            bus: EventBus::new(),
            session: None,
        }
    }

    /// Stage configuration
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Receive collision, speech and run lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.bus.subscribe()
    }

    /// Copy of actors, programs and run status
    pub fn snapshot(&self) -> StageSnapshot {
        self.world.lock().snapshot()
    }

    /// Read access to the world
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(&self.world.lock())
    }

    /// Exact number of placed blocks across all actors
    pub fn total_block_count(&self) -> usize {
        self.world.lock().programs().total_block_count()
    }

    /// Whether a run is active
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Start a run. Returns `false` if one is already active.
    pub fn run(&mut self) -> Result<bool> {
        if self.session.is_some() {
            return Ok(false);
        }
        let session = RunSession::start(
            self.world.clone(),
            self.bus.clone(),
            self.config.tick_interval(),
        )?;
        self.session = Some(session);
        Ok(true)
    }

    /// Stop the active run. Positions are kept. Idempotent.
    pub fn stop(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.cancel();
                self.finish_run();
                true
            }
            None => false,
        }
    }

    /// Stop the active run and wait for every driver to finish
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
            self.finish_run();
        }
    }

    fn finish_run(&self) {
        let mut world = self.world.lock();
        if world.end_run() {
            self.bus.publish([StageEvent::RunStopped]);
        }
    }

    /// Stop any run and return every actor to its baseline pose
    pub fn reset(&mut self) {
        self.stop();
        self.world.lock().reset_positions();
        tracing::info!("actors reset to baseline");
        self.bus.publish([StageEvent::Reset]);
    }

    /// Spawn a new actor
    pub fn add_actor(&self) -> ActorId {
        self.world.lock().add_actor()
    }

    /// Remove an actor; refused for the last one
    pub fn remove_actor(&self, id: &ActorId) -> bool {
        let result = self.world.lock().remove_actor(id);
        ignore_failure("remove_actor", result).is_some()
    }

    /// Rename an actor
    pub fn rename_actor(&self, id: &ActorId, name: impl Into<String>) -> bool {
        let result = self.world.lock().rename_actor(id, name);
        ignore_failure("rename_actor", result).is_some()
    }

    /// Set an actor's position and direction; reset still returns it to its baseline
    pub fn set_actor_pose(&self, id: &ActorId, x: f64, y: f64, heading: f64) -> bool {
        let result = self.world.lock().set_actor_pose(id, x, y, heading);
        ignore_failure("set_actor_pose", result).is_some()
    }

    /// Place a block under `parent` or at the actor's top level
    pub fn insert_block(
        &self,
        node: BlockNode,
        parent: Option<BlockId>,
        actor: ActorId,
    ) -> Option<BlockId> {
        let result = self.world.lock().insert_block(node, parent, actor);
        ignore_failure("insert_block", result)
    }

    /// Delete a block and its subtree
    pub fn remove_block(&self, id: BlockId) -> bool {
        let result = self.world.lock().remove_block(id);
        ignore_failure("remove_block", result).is_some()
    }

    /// Move a block under a new parent or actor
    pub fn move_block(&self, id: BlockId, actor: ActorId, parent: Option<BlockId>) -> bool {
        let result = self.world.lock().move_block(id, actor, parent);
        ignore_failure("move_block", result).is_some()
    }

    /// Set a block parameter
    pub fn update_param(&self, id: BlockId, name: &str, value: impl Into<ParamValue>) -> bool {
        let result = self.world.lock().update_param(id, name, &value.into());
        ignore_failure("update_param", result).is_some()
    }

    /// Apply a drop gesture onto `actor`'s program (under `parent` if set).
    ///
    /// Returns the affected block id, or `None` if the drop was ignored.
    pub fn handle_drop(
        &self,
        payload: &str,
        actor: ActorId,
        parent: Option<BlockId>,
    ) -> Option<BlockId> {
        let request = match parse_drop(payload) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring drop payload");
                return None;
            }
        };

        match request {
            DropRequest::Move(id) => self.move_block(id, actor, parent).then_some(id),
            DropRequest::Create(node) => self.insert_block(node, parent, actor),
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }
}

fn ignore_failure<T>(operation: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(operation, error = %err, "edit ignored");
            None
        }
    }
}
