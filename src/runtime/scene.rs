//! JSON scene descriptions for the command-line driver
//!
//! A scene lists actors with their starting pose and an optional program.
//! An empty actor list yields the default two-sprite stage.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StageConfig;
use super::actor::{Actor, PALETTE, Pose};
use super::block::{BlockKind, BlockNode};
use super::error::Result;
use super::ids::{ActorId, BlockId};
use super::world::World;

/// A whole scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSpec {
    /// Actors in creation order
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
}

/// One actor and its program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSpec {
    /// Display name
    pub name: String,
    /// Starting x
    #[serde(default)]
    pub x: f64,
    /// Starting y
    #[serde(default)]
    pub y: f64,
    /// Starting heading in degrees
    #[serde(default = "default_heading")]
    pub heading: f64,
    /// Display color; assigned from the palette when omitted
    #[serde(default)]
    pub color: Option<String>,
    /// Top-level blocks
    #[serde(default)]
    pub program: Vec<BlockSpec>,
}

/// A block with nested children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Kind and parameters
    pub kind: BlockKind,
    /// Children (control blocks only)
    #[serde(default)]
    pub children: Vec<BlockSpec>,
}

fn default_heading() -> f64 {
    90.0
}

impl SceneSpec {
    /// Parse a scene from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a scene file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Build a world holding this scene's actors and programs
    pub fn build(&self, config: &StageConfig) -> Result<World> {
        if self.actors.is_empty() {
            return Ok(World::new(config));
        }

        let actors: Vec<Actor> = self
            .actors
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let color = spec
                    .color
                    .clone()
                    .unwrap_or_else(|| PALETTE[index % PALETTE.len()].to_string());
                Actor::new(spec.name.clone(), Pose::new(spec.x, spec.y, spec.heading), color)
            })
            .collect();
        let ids: Vec<ActorId> = actors.iter().map(|actor| actor.id).collect();

        let mut world = World::with_actors(actors, config)?;
        for (spec, actor) in self.actors.iter().zip(ids) {
            for block in &spec.program {
                place(&mut world, block, None, actor)?;
            }
        }
        Ok(world)
    }
}

fn place(world: &mut World, spec: &BlockSpec, parent: Option<BlockId>, actor: ActorId) -> Result<()> {
    let id = world.insert_block(BlockNode::new(spec.kind.clone()), parent, actor)?;
    for child in &spec.children {
        place(world, child, Some(id), actor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::{ProgramError, StageError};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENE: &str = r##"{
        "actors": [
            {
                "name": "Cat",
                "x": -60,
                "program": [
                    {
                        "kind": {"family": "control", "block": {"action": "repeat", "repeatCount": 4}},
                        "children": [
                            {"kind": {"family": "motion", "block": {"action": "move", "steps": 15}}}
                        ]
                    }
                ]
            },
            {"name": "Dog", "x": 60, "heading": 270, "color": "#000000"}
        ]
    }"##;

    #[test]
    fn test_load_scene_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCENE.as_bytes()).unwrap();

        let scene = SceneSpec::load(file.path()).unwrap();
        let world = scene.build(&StageConfig::default()).unwrap();

        let snapshot = world.snapshot();
        assert_eq!(snapshot.actors.len(), 2);
        assert_eq!(snapshot.actors[0].pose, Pose::new(-60.0, 0.0, 90.0));
        assert_eq!(snapshot.actors[1].color, "#000000");
        assert_eq!(snapshot.total_blocks, 2);
        assert_eq!(snapshot.programs[0].blocks[0].children.len(), 1);
    }

    #[test]
    fn test_empty_scene_uses_defaults() {
        let world = SceneSpec::default().build(&StageConfig::default()).unwrap();
        assert_eq!(world.actors().len(), 2);
    }

    #[test]
    fn test_children_under_leaf_are_rejected() {
        let scene = SceneSpec {
            actors: vec![ActorSpec {
                name: "A".to_string(),
                x: 0.0,
                y: 0.0,
                heading: 90.0,
                color: None,
                program: vec![BlockSpec {
                    kind: BlockKind::turn(10.0),
                    children: vec![BlockSpec {
                        kind: BlockKind::turn(5.0),
                        children: Vec::new(),
                    }],
                }],
            }],
        };

        assert!(matches!(
            scene.build(&StageConfig::default()),
            Err(StageError::Program(ProgramError::NotAContainer(_)))
        ));
    }
}
