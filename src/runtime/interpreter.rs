//! One tick of one actor's program
//!
//! Walks the actor's forest depth-first in sequence order. Fired blocks are
//! skipped, so leaf commands apply once per run. A repeat block runs one
//! iteration of its body per tick; once every child of the body has fired
//! the iteration counts, and the body is reseeded until the count is reached.

use chrono::Utc;

use super::actor::{ActorRegistry, Speech};
use super::block::{BlockKind, BlockNode, LookBlock, MotionBlock};
use super::events::StageEvent;
use super::execution::ExecutionTracker;
use super::ids::ActorId;

/// Displacement of a move along `heading` degrees.
///
/// Heading 90 moves along +x. The y term is negated.
pub fn move_delta(heading: f64, steps: f64) -> (f64, f64) {
    let radians = heading.to_radians();
    (radians.sin() * steps, -radians.cos() * steps)
}

/// Execute one tick of `actor`'s forest and return the events it produced
pub fn step_actor(
    actor: ActorId,
    forest: &[BlockNode],
    registry: &mut ActorRegistry,
    tracker: &mut ExecutionTracker,
) -> Vec<StageEvent> {
    let mut interpreter = Interpreter {
        actor,
        registry,
        tracker,
        events: Vec::new(),
    };
    interpreter.run_sequence(forest);
    interpreter.events
}

struct Interpreter<'a> {
    actor: ActorId,
    registry: &'a mut ActorRegistry,
    tracker: &'a mut ExecutionTracker,
    events: Vec<StageEvent>,
}

impl Interpreter<'_> {
    /// Returns whether every block of the sequence has fired afterwards
    fn run_sequence(&mut self, blocks: &[BlockNode]) -> bool {
        for block in blocks {
            self.run_block(block);
        }
        blocks
            .iter()
            .all(|block| self.tracker.is_fired(&self.actor, &block.id))
    }

    fn run_block(&mut self, block: &BlockNode) {
        if self.tracker.is_fired(&self.actor, &block.id) {
            return;
        }

        match &block.kind {
            BlockKind::Motion(motion) => {
                self.apply_motion(motion);
                self.tracker.mark_fired(self.actor, block);
            }
            BlockKind::Look(look) => {
                self.say(look);
                self.tracker.mark_fired(self.actor, block);
            }
            BlockKind::Control(_) => self.run_repeat(block),
        }
    }

    fn run_repeat(&mut self, block: &BlockNode) {
        let entry = *self.tracker.entry(self.actor, block);
        let target = entry.repeat_count.unwrap_or(1);
        if entry.completed_iterations >= target {
            self.tracker.mark_fired(self.actor, block);
            return;
        }

        if !self.run_sequence(&block.children) {
            return;
        }

        let completed = self.tracker.increment_repeat(self.actor, block);
        if completed >= target {
            self.tracker.mark_fired(self.actor, block);
        } else {
            self.tracker.reset_branch(self.actor, &block.children);
        }
    }

    fn apply_motion(&mut self, motion: &MotionBlock) {
        let Some(pose) = self.registry.get(&self.actor).map(|actor| actor.pose) else {
            return;
        };

        let (x, y, heading) = match motion {
            MotionBlock::Move { steps } => {
                let (dx, dy) = move_delta(pose.heading, *steps);
                (pose.x + dx, pose.y + dy, None)
            }
            MotionBlock::Turn { degrees } => (pose.x, pose.y, Some(pose.heading + degrees)),
            MotionBlock::GoTo { x, y } => (*x, *y, None),
        };

        if let Err(err) = self.registry.update_position(&self.actor, x, y, heading) {
            tracing::debug!(actor = %self.actor, error = %err, "skipping motion");
        }
    }

    fn say(&mut self, look: &LookBlock) {
        let (message, seconds) = match look {
            LookBlock::Say { message } => (message.clone(), None),
            LookBlock::SayForSeconds { message, seconds } => (message.clone(), Some(*seconds)),
        };

        let Some(actor) = self.registry.get_mut(&self.actor) else {
            return;
        };
        actor.speech = Some(Speech {
            message: message.clone(),
            seconds,
            said_at: Utc::now(),
        });
        self.events.push(StageEvent::Said {
            actor: self.actor,
            message,
            seconds,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::actor::{Actor, Pose};

    fn setup(pose: Pose, program: Vec<BlockNode>) -> (ActorId, Vec<BlockNode>, ActorRegistry, ExecutionTracker) {
        let actor = Actor::new("A", pose, "#FF5722");
        let id = actor.id;
        let registry = ActorRegistry::with_actors(vec![actor], Some(1), 100.0);
        let mut forest = program;
        for block in &mut forest {
            block.relabel(id, None);
        }
        let mut tracker = ExecutionTracker::new();
        tracker.begin_run([(&id, forest.as_slice())]);
        (id, forest, registry, tracker)
    }

    fn pose_of(registry: &ActorRegistry, id: ActorId) -> Pose {
        registry.get(&id).unwrap().pose
    }

    #[test]
    fn test_move_then_turn_in_one_tick() {
        let (id, forest, mut registry, mut tracker) = setup(
            Pose::new(0.0, 0.0, 90.0),
            vec![
                BlockNode::new(BlockKind::move_steps(10.0)),
                BlockNode::new(BlockKind::turn(90.0)),
            ],
        );

        step_actor(id, &forest, &mut registry, &mut tracker);

        let pose = pose_of(&registry, id);
        assert!((pose.x - 10.0).abs() < 1e-9);
        assert!(pose.y.abs() < 1e-9);
        assert_eq!(pose.heading, 180.0);
    }

    #[test]
    fn test_leaf_fires_once_per_run() {
        let (id, forest, mut registry, mut tracker) = setup(
            Pose::new(0.0, 0.0, 90.0),
            vec![BlockNode::new(BlockKind::move_steps(5.0))],
        );

        for _ in 0..10 {
            step_actor(id, &forest, &mut registry, &mut tracker);
        }
        assert!((pose_of(&registry, id).x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_zero_moves_along_negative_y() {
        let (id, forest, mut registry, mut tracker) = setup(
            Pose::new(0.0, 0.0, 0.0),
            vec![BlockNode::new(BlockKind::move_steps(10.0))],
        );

        step_actor(id, &forest, &mut registry, &mut tracker);
        let pose = pose_of(&registry, id);
        assert!(pose.x.abs() < 1e-9);
        assert!((pose.y + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeat_runs_one_iteration_per_tick() {
        let repeat = BlockNode::new(BlockKind::repeat(3))
            .with_child(BlockNode::new(BlockKind::move_steps(10.0)));
        let (id, forest, mut registry, mut tracker) =
            setup(Pose::new(0.0, 0.0, 90.0), vec![repeat]);

        step_actor(id, &forest, &mut registry, &mut tracker);
        assert!((pose_of(&registry, id).x - 10.0).abs() < 1e-9);

        for _ in 0..20 {
            step_actor(id, &forest, &mut registry, &mut tracker);
        }
        assert!((pose_of(&registry, id).x - 30.0).abs() < 1e-9);
        assert!(tracker.is_fired(&id, &forest[0].id));
    }

    #[test]
    fn test_nested_repeat_multiplies() {
        let inner = BlockNode::new(BlockKind::repeat(2))
            .with_child(BlockNode::new(BlockKind::move_steps(1.0)));
        let outer = BlockNode::new(BlockKind::repeat(3)).with_child(inner);
        let (id, forest, mut registry, mut tracker) =
            setup(Pose::new(0.0, 0.0, 90.0), vec![outer]);

        for _ in 0..50 {
            step_actor(id, &forest, &mut registry, &mut tracker);
        }
        assert!((pose_of(&registry, id).x - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_repeat_runs_like_one() {
        let run = |count: i64| {
            let repeat = BlockNode::new(BlockKind::repeat(count))
                .with_child(BlockNode::new(BlockKind::move_steps(7.0)));
            let (id, forest, mut registry, mut tracker) =
                setup(Pose::new(0.0, 0.0, 90.0), vec![repeat]);
            for _ in 0..20 {
                step_actor(id, &forest, &mut registry, &mut tracker);
            }
            pose_of(&registry, id)
        };

        let once = run(1);
        assert!((once.x - 7.0).abs() < 1e-9);
        assert_eq!(run(0), once);
        assert_eq!(run(-3), once);
    }

    #[test]
    fn test_say_records_speech_and_event() {
        let (id, forest, mut registry, mut tracker) = setup(
            Pose::new(0.0, 0.0, 90.0),
            vec![
                BlockNode::new(BlockKind::say_for("hello", 2.0)),
                BlockNode::new(BlockKind::go_to(5.0, 6.0)),
            ],
        );

        let events = step_actor(id, &forest, &mut registry, &mut tracker);

        assert_eq!(
            events,
            vec![StageEvent::Said {
                actor: id,
                message: "hello".to_string(),
                seconds: Some(2.0),
            }]
        );
        let actor = registry.get(&id).unwrap();
        assert_eq!(actor.speech.as_ref().unwrap().message, "hello");
        assert_eq!((actor.pose.x, actor.pose.y), (5.0, 6.0));
    }
}
