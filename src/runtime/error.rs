//! Error types for the stage runtime
//!
//! Domain errors use thiserror. The `Stage` facade converts structural
//! lookup failures into silent no-ops at the UI boundary; the layers below
//! report them so callers and tests can see why an edit was refused.

use std::io;
use thiserror::Error;

use super::ids::{ActorId, BlockId};

/// Top-level stage error
#[derive(Debug, Error)]
pub enum StageError {
    /// Program store errors
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    /// Actor registry errors
    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),

    /// Drop payload errors
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A run was requested outside of a tokio runtime
    #[error("No tokio runtime available to drive the run")]
    NoAsyncRuntime,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Program store errors
#[derive(Debug, Error, PartialEq)]
pub enum ProgramError {
    /// Block not found in any forest
    #[error("Block {0} not found")]
    BlockNotFound(BlockId),

    /// Target parent not found in the target actor's forest
    #[error("Parent block {parent} not found in forest of actor {actor}")]
    ParentNotFound {
        /// Requested parent
        parent: BlockId,
        /// Actor whose forest was searched
        actor: ActorId,
    },

    /// A block with this id is already placed somewhere
    #[error("Block {0} already exists")]
    DuplicateBlock(BlockId),

    /// Only control blocks hold children
    #[error("Block {0} cannot hold children")]
    NotAContainer(BlockId),

    /// Moving a block beneath itself
    #[error("Cannot move block {block} under its own descendant {parent}")]
    WouldCycle {
        /// Block being moved
        block: BlockId,
        /// Requested parent inside the block's subtree
        parent: BlockId,
    },

    /// Parameter name not understood by the block kind
    #[error("Block kind '{kind}' has no parameter '{name}'")]
    UnknownParam {
        /// Block kind label
        kind: &'static str,
        /// Parameter name
        name: String,
    },
}

/// Convenience result alias for program store operations
pub type ProgramResult<T> = std::result::Result<T, ProgramError>;

/// Actor registry errors
#[derive(Debug, Error, PartialEq)]
pub enum ActorError {
    /// Actor not found
    #[error("Actor {0} not found")]
    NotFound(ActorId),

    /// The last remaining actor cannot be removed
    #[error("Refusing to remove actor {0}: at least one actor must remain")]
    LastActor(ActorId),
}

/// Convenience result alias for actor operations
pub type ActorResult<T> = std::result::Result<T, ActorError>;

/// Errors raised while decoding a drop payload from the authoring layer
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Payload was not valid JSON for any known shape
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Family/action pair is not in the block catalog
    #[error("Unknown block {family}/{action}")]
    UnknownBlock {
        /// Block family tag
        family: String,
        /// Block action tag
        action: String,
    },

    /// Block id was not a UUID
    #[error("Invalid block id '{0}'")]
    InvalidId(String),

    /// Move payload without an id
    #[error("Move payload is missing a block id")]
    MissingId,
}

/// Convenience result alias for payload decoding
pub type PayloadResult<T> = std::result::Result<T, PayloadError>;

/// Result type using StageError
pub type Result<T> = std::result::Result<T, StageError>;
