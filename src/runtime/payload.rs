//! Drop payloads from the authoring layer
//!
//! A drag gesture delivers a small JSON object. Moving an existing block
//! sends `{"isMoving": true, "id": "<uuid>"}`; dragging from the palette
//! sends the family/action tags plus optional parameters.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::block::{BlockKind, BlockNode, ParamValue};
use super::error::{PayloadError, PayloadResult};
use super::ids::BlockId;

/// What a drop asks the stage to do
#[derive(Debug, Clone, PartialEq)]
pub enum DropRequest {
    /// Relocate an existing block
    Move(BlockId),
    /// Place a new block from the palette
    Create(BlockNode),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    #[serde(default)]
    is_moving: bool,
    id: Option<String>,
    #[serde(rename = "type")]
    family: Option<String>,
    action: Option<String>,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
}

/// Decode a drop payload
pub fn parse_drop(raw: &str) -> PayloadResult<DropRequest> {
    let payload: RawPayload = serde_json::from_str(raw)?;

    let id = payload.id.as_deref().map(parse_block_id).transpose()?;

    if payload.is_moving {
        return id.map(DropRequest::Move).ok_or(PayloadError::MissingId);
    }

    let family = payload.family.unwrap_or_default();
    let action = payload.action.unwrap_or_default();
    let mut kind = BlockKind::from_catalog(&family, &action)
        .ok_or_else(|| PayloadError::UnknownBlock { family, action })?;

    for (name, value) in &payload.params {
        if let Err(err) = kind.set_param(name, value) {
            tracing::debug!(error = %err, "ignoring payload parameter");
        }
    }

    let node = BlockNode::new(kind);
    Ok(DropRequest::Create(match id {
        Some(id) => node.with_id(id),
        None => node,
    }))
}

fn parse_block_id(raw: &str) -> PayloadResult<BlockId> {
    raw.parse()
        .map_err(|_| PayloadError::InvalidId(raw.to_string()))
}
