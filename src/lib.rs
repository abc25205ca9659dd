//! Blockstage – a block-program interpreter for multi-sprite 2D scenes
//!
//! This crate implements the execution core of a visual block-programming
//! environment:
//! - Per-actor forests of nested command blocks with structural editing
//! - A per-run execution table so leaf blocks fire once and repeats count
//! - Fixed-interval tick drivers, one per actor, on the tokio runtime
//! - Pairwise collision detection with a debounce set; a new overlap swaps
//!   the two actors' programs, which then replay from the start

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Stage runtime: actors, programs, interpreter, scheduler, collisions
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{Stage, StageConfig};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
