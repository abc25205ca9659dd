//! Circular overlap tests and the collision debounce set
//!
//! Actors collide when their centers are strictly closer than the collision
//! radius. A pair only triggers once per continuous overlap: it stays in the
//! debounce set while overlapping and leaves it when the actors separate.

use std::collections::HashSet;

use super::actor::{Actor, Pose};
use super::ids::ActorId;

/// Default collision radius in scene units
pub const DEFAULT_COLLISION_RADIUS: f64 = 24.0;

/// Whether two poses overlap under `radius`
pub fn overlaps(a: &Pose, b: &Pose, radius: f64) -> bool {
    (a.x - b.x).hypot(a.y - b.y) < radius
}

/// Unordered actor pair, stored with the lower id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    first: ActorId,
    second: ActorId,
}

impl PairKey {
    /// Build the canonical key for two actors
    pub fn new(a: ActorId, b: ActorId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Lower id
    pub fn first(&self) -> ActorId {
        self.first
    }

    /// Higher id
    pub fn second(&self) -> ActorId {
        self.second
    }

    /// Whether the pair involves `actor`
    pub fn involves(&self, actor: &ActorId) -> bool {
        self.first == *actor || self.second == *actor
    }
}

/// Every unordered pair of actors currently overlapping
pub fn overlapping_pairs(actors: &[&Actor], radius: f64) -> Vec<PairKey> {
    let mut pairs = Vec::new();
    for (index, a) in actors.iter().enumerate() {
        for b in &actors[index + 1..] {
            if overlaps(&a.pose, &b.pose, radius) {
                pairs.push(PairKey::new(a.id, b.id));
            }
        }
    }
    pairs
}

/// Pairs that already triggered during the current run
#[derive(Debug, Default)]
pub struct CollisionDebounce {
    pairs: HashSet<PairKey>,
}

impl CollisionDebounce {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the pairs overlapping right now and get back the ones that just
    /// started overlapping. Pairs that separated are forgotten.
    pub fn admit(&mut self, overlapping: &[PairKey]) -> Vec<PairKey> {
        let current: HashSet<PairKey> = overlapping.iter().copied().collect();
        self.pairs.retain(|pair| current.contains(pair));

        let mut fresh = Vec::new();
        for pair in overlapping {
            if self.pairs.insert(*pair) {
                fresh.push(*pair);
            }
        }
        fresh
    }

    /// Whether the pair is currently debounced
    pub fn contains(&self, pair: &PairKey) -> bool {
        self.pairs.contains(pair)
    }

    /// Drop every pair involving an actor
    pub fn forget_actor(&mut self, actor: &ActorId) {
        self.pairs.retain(|pair| !pair.involves(actor));
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Number of debounced pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
