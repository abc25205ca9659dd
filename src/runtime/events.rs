//! Events published to the rendering layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::ids::ActorId;

/// Buffered events per subscriber before lagging receivers start dropping
pub const EVENT_CAPACITY: usize = 256;

/// Two actors started overlapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Lower actor id of the pair
    pub first: ActorId,
    /// Higher actor id of the pair
    pub second: ActorId,
    /// Scene position between the two centers, for the indicator
    pub midpoint: (f64, f64),
    /// Detection time
    pub at: DateTime<Utc>,
}

/// Notifications emitted by the stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    /// A run began with this many driven actors
    RunStarted {
        /// Actors that received a driver
        actors: usize,
    },
    /// The active run ended
    RunStopped,
    /// Actors returned to their baseline poses
    Reset,
    /// New overlap detected; the pair's programs were swapped
    Collision(CollisionEvent),
    /// A look block produced a speech bubble
    Said {
        /// Speaking actor
        actor: ActorId,
        /// Bubble text
        message: String,
        /// Display duration, if limited
        seconds: Option<f64>,
    },
}

/// Broadcast fan-out for stage events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StageEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Register a new receiver
    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.sender.subscribe()
    }

    /// Publish events; having no subscribers is not an error
    pub fn publish(&self, events: impl IntoIterator<Item = StageEvent>) {
        for event in events {
            let _ = self.sender.send(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
