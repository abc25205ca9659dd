//! Actors (sprites) and the registry that owns them
//!
//! Positions use a y-up scene with the origin at the centre; headings are
//! degrees clockwise from up. Each actor keeps the pose it was created with
//! so a reset can restore it.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::{ActorError, ActorResult};
use super::ids::ActorId;

/// Colors handed out to new actors
pub const PALETTE: [&str; 10] = [
    "#FF5722", "#2196F3", "#4CAF50", "#9C27B0", "#FFC107", "#E91E63", "#00BCD4", "#8BC34A",
    "#3F51B5", "#F44336",
];

/// Position and heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Horizontal position
    pub x: f64,
    /// Vertical position (y-up)
    pub y: f64,
    /// Degrees, 0 = up, clockwise, kept in [0, 360)
    pub heading: f64,
}

impl Pose {
    /// Create a pose, normalizing the heading
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: normalize_heading(heading),
        }
    }
}

/// Wrap degrees into [0, 360)
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Transient speech bubble produced by look blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    /// Bubble text
    pub message: String,
    /// Display duration; `None` shows until replaced
    pub seconds: Option<f64>,
    /// When the bubble was produced
    pub said_at: DateTime<Utc>,
}

/// A positioned, headed entity driven by its own block program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique actor ID
    pub id: ActorId,
    /// Display name
    pub name: String,
    /// Current pose
    pub pose: Pose,
    /// Pose restored by reset
    pub baseline: Pose,
    /// Display color (hex)
    pub color: String,
    /// Latest speech bubble, if any
    pub speech: Option<Speech>,
}

impl Actor {
    /// Create an actor whose baseline is its initial pose
    pub fn new(name: impl Into<String>, pose: Pose, color: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            pose,
            baseline: pose,
            color: color.into(),
            speech: None,
        }
    }
}

/// Ordered list of actors; never empty once seeded
pub struct ActorRegistry {
    actors: Vec<Actor>,
    rng: StdRng,
    spawn_spread: f64,
}

impl ActorRegistry {
    /// Create a registry holding the two default sprites
    pub fn with_defaults(seed: Option<u64>, spawn_spread: f64) -> Self {
        Self::with_actors(default_actors(), seed, spawn_spread)
    }

    /// Create a registry from explicit actors
    pub fn with_actors(actors: Vec<Actor>, seed: Option<u64>, spawn_spread: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            actors,
            rng,
            spawn_spread,
        }
    }

    /// Spawn a new actor with a random offset and an unused palette color
    pub fn add(&mut self) -> ActorId {
        let half = self.spawn_spread / 2.0;
        let (x, y) = if half > 0.0 {
            (
                self.rng.gen_range(-half..half),
                self.rng.gen_range(-half..half),
            )
        } else {
            (0.0, 0.0)
        };

        let color = self.pick_color();
        let actor = Actor::new(
            format!("Sprite {}", self.actors.len() + 1),
            Pose::new(x, y, 90.0),
            color,
        );
        let id = actor.id;
        tracing::debug!(actor = %id, name = %actor.name, "spawned actor");
        self.actors.push(actor);
        id
    }

    /// Insert a fully specified actor
    pub fn insert(&mut self, actor: Actor) -> ActorId {
        let id = actor.id;
        self.actors.push(actor);
        id
    }

    fn pick_color(&mut self) -> String {
        let unused: Vec<&str> = PALETTE
            .iter()
            .copied()
            .filter(|color| !self.actors.iter().any(|actor| actor.color == *color))
            .collect();
        let pool: &[&str] = if unused.is_empty() { &PALETTE } else { &unused };
        pool.choose(&mut self.rng)
            .copied()
            .unwrap_or(PALETTE[0])
            .to_string()
    }

    /// Remove an actor; the last remaining actor is kept
    pub fn remove(&mut self, id: &ActorId) -> ActorResult<Actor> {
        let index = self
            .actors
            .iter()
            .position(|actor| actor.id == *id)
            .ok_or(ActorError::NotFound(*id))?;
        if self.actors.len() == 1 {
            return Err(ActorError::LastActor(*id));
        }
        Ok(self.actors.remove(index))
    }

    /// Look up an actor
    pub fn get(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id == *id)
    }

    /// Mutable lookup
    pub fn get_mut(&mut self, id: &ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.id == *id)
    }

    /// Whether an actor exists
    pub fn contains(&self, id: &ActorId) -> bool {
        self.get(id).is_some()
    }

    /// Write a new pose. The heading is normalized.
    pub fn update_position(&mut self, id: &ActorId, x: f64, y: f64, heading: Option<f64>) -> ActorResult<()> {
        let actor = self.get_mut(id).ok_or(ActorError::NotFound(*id))?;
        actor.pose = Pose::new(x, y, heading.unwrap_or(actor.pose.heading));
        Ok(())
    }

    /// Change an actor's display name
    pub fn rename(&mut self, id: &ActorId, name: impl Into<String>) -> ActorResult<()> {
        let actor = self.get_mut(id).ok_or(ActorError::NotFound(*id))?;
        actor.name = name.into();
        Ok(())
    }

    /// Restore every actor's baseline pose and clear speech
    pub fn reset(&mut self) {
        for actor in &mut self.actors {
            actor.pose = actor.baseline;
            actor.speech = None;
        }
    }

    /// Drop every speech bubble
    pub fn clear_speech(&mut self) {
        for actor in &mut self.actors {
            actor.speech = None;
        }
    }

    /// Actors in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    /// Actor ids in creation order
    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.iter().map(|actor| actor.id).collect()
    }

    /// Number of actors
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Always false for a seeded registry
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

fn default_actors() -> Vec<Actor> {
    vec![
        Actor::new("Sprite 1", Pose::new(0.0, 0.0, 90.0), PALETTE[0]),
        Actor::new("Sprite 2", Pose::new(100.0, 0.0, 270.0), PALETTE[1]),
    ]
}
