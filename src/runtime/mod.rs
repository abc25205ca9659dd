//! Stage runtime and public API
//!
//! This module wires the actor registry, program store, execution tracker,
//! tick scheduler and collision engine together, and exposes the `Stage`
//! facade used by the authoring and rendering layers.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Submodules
pub mod actor;
pub mod block;
pub mod collision;
pub mod error;
pub mod events;
pub mod execution;
pub mod ids;
pub mod interpreter;
pub mod payload;
pub mod program;
pub mod scene;
pub mod scheduler;
pub mod stage;
pub mod world;

use error::{Result, StageError};

/// Configuration for a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Milliseconds between ticks of each actor's driver
    pub tick_interval_ms: u64,

    /// Centers closer than this collide
    pub collision_radius: f64,

    /// Width of the square new actors are scattered in, centered on the origin
    pub spawn_spread: f64,

    /// Seed for spawn positions and colors; random when unset
    pub seed: Option<u64>,

    /// Log at debug level in the CLI
    pub debug: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            collision_radius: collision::DEFAULT_COLLISION_RADIUS,
            spawn_spread: 100.0,
            seed: None,
            debug: false,
        }
    }
}

impl StageConfig {
    /// Tick period as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Default log level for binaries built on the stage
    pub fn log_level(&self) -> tracing::Level {
        if self.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.collision_radius.is_finite() || self.collision_radius < 0.0 {
            return Err(StageError::Config(format!(
                "collision_radius must be a non-negative number, got {}",
                self.collision_radius
            )));
        }
        if !self.spawn_spread.is_finite() || self.spawn_spread < 0.0 {
            return Err(StageError::Config(format!(
                "spawn_spread must be a non-negative number, got {}",
                self.spawn_spread
            )));
        }
        Ok(())
    }
}

// Re-export commonly used types
pub use actor::{Actor, Pose};
pub use block::{BlockKind, BlockNode, ParamValue};
pub use events::StageEvent;
pub use ids::{ActorId, BlockId};
pub use stage::Stage;
pub use world::{StageSnapshot, World};
