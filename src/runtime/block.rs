//! Block kinds and block nodes
//!
//! The catalog is closed: motion, control and look families with a
//! variant-specific parameter record each. A `BlockNode` owns its children by
//! value and only refers to its parent by id, so a node can never appear in
//! two places.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ProgramError, ProgramResult};
use super::ids::{ActorId, BlockId};

/// Default steps for a freshly created move block
pub const DEFAULT_STEPS: f64 = 10.0;
/// Default degrees for a freshly created turn block
pub const DEFAULT_DEGREES: f64 = 15.0;
/// Default iteration count for a freshly created repeat block
pub const DEFAULT_REPEAT_COUNT: i64 = 10;
/// Default text for say blocks
pub const DEFAULT_MESSAGE: &str = "Hello!";
/// Default duration for say-for-seconds blocks
pub const DEFAULT_SECONDS: f64 = 2.0;

/// Parameter value as delivered by the authoring layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric input
    Number(f64),
    /// Free text (messages, or numbers typed as text)
    Text(String),
}

impl ParamValue {
    /// Interpret as a finite number, parsing text if needed
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            ParamValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Interpret as display text
    pub fn as_text(&self) -> String {
        match self {
            ParamValue::Number(n) => n.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Motion family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MotionBlock {
    /// Advance along the current heading
    Move {
        /// Distance in scene units
        steps: f64,
    },
    /// Rotate clockwise
    Turn {
        /// Degrees added to the heading
        degrees: f64,
    },
    /// Jump to an absolute position
    GoTo {
        /// Target x
        x: f64,
        /// Target y
        y: f64,
    },
}

/// Control family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlBlock {
    /// Run the children a fixed number of times
    Repeat {
        /// Configured count, kept as entered (may be zero or negative)
        #[serde(rename = "repeatCount")]
        repeat_count: i64,
    },
}

impl ControlBlock {
    /// Iteration count used at run time. Non-positive counts run once.
    pub fn effective_repeat_count(&self) -> u32 {
        match self {
            ControlBlock::Repeat { repeat_count } => {
                (*repeat_count).clamp(1, u32::MAX as i64) as u32
            }
        }
    }
}

/// Look family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LookBlock {
    /// Show a speech bubble until replaced
    Say {
        /// Bubble text
        message: String,
    },
    /// Show a speech bubble for a limited time
    SayForSeconds {
        /// Bubble text
        message: String,
        /// Display duration
        seconds: f64,
    },
}

/// Block kind: a closed sum over the three families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "block", rename_all = "snake_case")]
pub enum BlockKind {
    /// Move, turn, go-to
    Motion(MotionBlock),
    /// Repeat
    Control(ControlBlock),
    /// Say, say-for-seconds
    Look(LookBlock),
}

impl BlockKind {
    /// Move block
    pub fn move_steps(steps: f64) -> Self {
        BlockKind::Motion(MotionBlock::Move { steps })
    }

    /// Turn block
    pub fn turn(degrees: f64) -> Self {
        BlockKind::Motion(MotionBlock::Turn { degrees })
    }

    /// Go-to block
    pub fn go_to(x: f64, y: f64) -> Self {
        BlockKind::Motion(MotionBlock::GoTo { x, y })
    }

    /// Repeat block
    pub fn repeat(repeat_count: i64) -> Self {
        BlockKind::Control(ControlBlock::Repeat { repeat_count })
    }

    /// Say block
    pub fn say(message: impl Into<String>) -> Self {
        BlockKind::Look(LookBlock::Say {
            message: message.into(),
        })
    }

    /// Say-for-seconds block
    pub fn say_for(message: impl Into<String>, seconds: f64) -> Self {
        BlockKind::Look(LookBlock::SayForSeconds {
            message: message.into(),
            seconds,
        })
    }

    /// Look up a palette entry by the authoring layer's family/action tags.
    ///
    /// Tags are matched case-insensitively. New blocks carry palette defaults.
    pub fn from_catalog(family: &str, action: &str) -> Option<Self> {
        let family = family.to_ascii_uppercase();
        let action = action.to_ascii_uppercase();
        let kind = match (family.as_str(), action.as_str()) {
            ("MOTION", "MOVE") => Self::move_steps(DEFAULT_STEPS),
            ("MOTION", "TURN") => Self::turn(DEFAULT_DEGREES),
            ("MOTION", "GOTO") => Self::go_to(0.0, 0.0),
            ("CONTROL", "REPEAT") => Self::repeat(DEFAULT_REPEAT_COUNT),
            ("LOOK", "SAY") => Self::say(DEFAULT_MESSAGE),
            ("LOOK", "SAY_FOR_SECONDS") => Self::say_for(DEFAULT_MESSAGE, DEFAULT_SECONDS),
            _ => return None,
        };
        Some(kind)
    }

    /// Short label for logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Motion(MotionBlock::Move { .. }) => "move",
            BlockKind::Motion(MotionBlock::Turn { .. }) => "turn",
            BlockKind::Motion(MotionBlock::GoTo { .. }) => "goto",
            BlockKind::Control(ControlBlock::Repeat { .. }) => "repeat",
            BlockKind::Look(LookBlock::Say { .. }) => "say",
            BlockKind::Look(LookBlock::SayForSeconds { .. }) => "say_for_seconds",
        }
    }

    /// Whether this kind may hold children
    pub fn is_container(&self) -> bool {
        matches!(self, BlockKind::Control(_))
    }

    /// Set a named parameter.
    ///
    /// Numeric parameters accept numbers or numeric text; anything else falls
    /// back to the parameter's safe default (0 for motion values, 1 for
    /// repeat count and seconds).
    pub fn set_param(&mut self, name: &str, value: &ParamValue) -> ProgramResult<()> {
        let number = value.as_number();
        let label = self.label();
        match (self, name) {
            (BlockKind::Motion(MotionBlock::Move { steps }), "steps") => {
                *steps = number.unwrap_or(0.0);
            }
            (BlockKind::Motion(MotionBlock::Turn { degrees }), "degrees") => {
                *degrees = number.unwrap_or(0.0);
            }
            (BlockKind::Motion(MotionBlock::GoTo { x, .. }), "x") => {
                *x = number.unwrap_or(0.0);
            }
            (BlockKind::Motion(MotionBlock::GoTo { y, .. }), "y") => {
                *y = number.unwrap_or(0.0);
            }
            (BlockKind::Control(ControlBlock::Repeat { repeat_count }), "repeatCount") => {
                *repeat_count = number.map(|n| n.trunc() as i64).unwrap_or(1);
            }
            (BlockKind::Look(LookBlock::Say { message }), "message")
            | (BlockKind::Look(LookBlock::SayForSeconds { message, .. }), "message") => {
                *message = value.as_text();
            }
            (BlockKind::Look(LookBlock::SayForSeconds { seconds, .. }), "seconds") => {
                *seconds = number.filter(|n| *n > 0.0).unwrap_or(1.0);
            }
            (_, other) => {
                return Err(ProgramError::UnknownParam {
                    kind: label,
                    name: other.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One program instruction placed in an actor's forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    /// Stable identity
    pub id: BlockId,
    /// Kind and parameters
    pub kind: BlockKind,
    /// Owning actor
    pub actor: ActorId,
    /// Parent block, `None` at top level
    pub parent: Option<BlockId>,
    /// Ordered children; empty for non-control kinds
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    /// Create an unplaced node with a fresh id.
    ///
    /// The owner and parent are assigned when the node is inserted.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            actor: ActorId::from_uuid(Uuid::nil()),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: BlockId) -> Self {
        self.id = id;
        self
    }

    /// Append a child (builder style)
    pub fn with_child(mut self, child: BlockNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(BlockNode::count).sum::<usize>()
    }

    /// Depth-first search within this subtree
    pub fn find(&self, id: BlockId) -> Option<&BlockNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable depth-first search within this subtree
    pub fn find_mut(&mut self, id: BlockId) -> Option<&mut BlockNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Whether `id` names this node or one of its descendants
    pub fn contains(&self, id: BlockId) -> bool {
        self.find(id).is_some()
    }

    /// Ids of this subtree in depth-first order
    pub fn subtree_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::with_capacity(self.count());
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, out: &mut Vec<BlockId>) {
        out.push(self.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Rewrite owner and parent fields for this subtree
    pub fn relabel(&mut self, actor: ActorId, parent: Option<BlockId>) {
        self.actor = actor;
        self.parent = parent;
        let id = self.id;
        for child in &mut self.children {
            child.relabel(actor, Some(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_count_clamps_non_positive() {
        assert_eq!(ControlBlock::Repeat { repeat_count: 0 }.effective_repeat_count(), 1);
        assert_eq!(ControlBlock::Repeat { repeat_count: -4 }.effective_repeat_count(), 1);
        assert_eq!(ControlBlock::Repeat { repeat_count: 3 }.effective_repeat_count(), 3);
    }

    #[test]
    fn test_set_param_parses_numeric_text() {
        let mut kind = BlockKind::move_steps(10.0);
        kind.set_param("steps", &ParamValue::from("25")).unwrap();
        assert_eq!(kind, BlockKind::move_steps(25.0));
    }

    #[test]
    fn test_set_param_non_numeric_falls_back() {
        let mut kind = BlockKind::repeat(5);
        kind.set_param("repeatCount", &ParamValue::from("lots")).unwrap();
        assert_eq!(kind, BlockKind::repeat(1));

        let mut kind = BlockKind::turn(90.0);
        kind.set_param("degrees", &ParamValue::from("left")).unwrap();
        assert_eq!(kind, BlockKind::turn(0.0));
    }

    #[test]
    fn test_set_param_unknown_name_rejected() {
        let mut kind = BlockKind::say("hi");
        let err = kind.set_param("steps", &ParamValue::from(3.0)).unwrap_err();
        assert_eq!(
            err,
            ProgramError::UnknownParam {
                kind: "say",
                name: "steps".to_string()
            }
        );
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(
            BlockKind::from_catalog("motion", "goto"),
            Some(BlockKind::go_to(0.0, 0.0))
        );
        assert_eq!(
            BlockKind::from_catalog("CONTROL", "REPEAT"),
            Some(BlockKind::repeat(DEFAULT_REPEAT_COUNT))
        );
        assert!(BlockKind::from_catalog("SOUND", "PLAY").is_none());
    }

    #[test]
    fn test_relabel_sets_parent_links() {
        let actor = ActorId::new();
        let mut root = BlockNode::new(BlockKind::repeat(2))
            .with_child(BlockNode::new(BlockKind::move_steps(5.0)));
        root.relabel(actor, None);

        assert_eq!(root.actor, actor);
        assert_eq!(root.children[0].actor, actor);
        assert_eq!(root.children[0].parent, Some(root.id));
        assert_eq!(root.count(), 2);
    }
}
