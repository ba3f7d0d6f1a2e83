// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Share payload validator.
//!
//! Validates an untrusted JSON document against the share schema:
//! - `{shareID, data}` envelope, or a bare draft (`placedTiles` at the top
//!   level) which is promoted into a fresh envelope
//! - `data.view` with numeric `x`, `y`, `zoom`
//! - `data.placedTiles`, an ordered array of tiles checked field-by-field
//!
//! Validation is all-or-nothing: the walk stops at the first violation and
//! reports it by JSON path, so the same input always produces the same
//! error. The payload itself stays an opaque `serde_json::Value`; whatever
//! was accepted is what a later load returns, unknown fields included.

use crate::config::ValidationLimits;
use crate::share_id::ShareIdCodec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Validation error types, each addressing the offending field by path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid JSON input")]
    MalformedInput,

    #[error("$.shareID is invalid")]
    InvalidShareId,

    #[error("{path} is missing or not an object")]
    NotAnObject { path: String },

    #[error("{path} must be an array")]
    NotAnArray { path: String },

    #[error("{path} is missing or not numeric")]
    NotNumeric { path: String },

    #[error("{path} is missing or not a string")]
    NotAString { path: String },

    #[error("{path} cannot be longer than {max} chars")]
    TooLong { path: String, max: usize },
}

impl ValidationError {
    /// JSON path of the offending field, if the error is field-addressed.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::MalformedInput => None,
            Self::InvalidShareId => Some("$.shareID"),
            Self::NotAnObject { path }
            | Self::NotAnArray { path }
            | Self::NotNumeric { path }
            | Self::NotAString { path }
            | Self::TooLong { path, .. } => Some(path),
        }
    }
}

/// A validated share record: the id it is stored under plus the opaque
/// payload document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    #[serde(rename = "shareID")]
    pub share_id: String,

    pub data: Value,

    /// In-process creation time; never persisted.
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Share payload validator.
pub struct ShareValidator {
    limits: ValidationLimits,
    codec: ShareIdCodec,
}

impl ShareValidator {
    /// Create a validator with the given limits and id codec.
    pub fn new(limits: ValidationLimits, codec: ShareIdCodec) -> Self {
        Self { limits, codec }
    }

    /// Validate raw request bytes into a [`SaveData`] record.
    pub fn validate(&self, raw: &[u8]) -> Result<SaveData, ValidationError> {
        let document: Value =
            serde_json::from_slice(raw).map_err(|_| ValidationError::MalformedInput)?;
        self.validate_document(document)
    }

    /// Validate an already-parsed document.
    pub fn validate_document(&self, document: Value) -> Result<SaveData, ValidationError> {
        let Value::Object(mut root) = document else {
            return Err(ValidationError::MalformedInput);
        };

        // A document with placedTiles at the top level is a bare draft:
        // promote it into a fresh envelope. An envelope without a shareID
        // likewise gets a fresh id.
        let (share_id, data) = if root.contains_key("placedTiles") {
            (self.codec.generate(), Value::Object(root))
        } else {
            let share_id = match root.remove("shareID") {
                Some(Value::String(id)) => {
                    self.codec
                        .check(&id)
                        .map_err(|_| ValidationError::InvalidShareId)?;
                    id
                }
                Some(_) => return Err(ValidationError::InvalidShareId),
                None => self.codec.generate(),
            };
            let data = root.remove("data").unwrap_or(Value::Null);
            (share_id, data)
        };

        self.validate_data(&data)?;

        debug!(id = %share_id, "share payload valid");
        Ok(SaveData {
            share_id,
            data,
            created_at: Utc::now(),
        })
    }

    fn validate_data(&self, data: &Value) -> Result<(), ValidationError> {
        let data = data.as_object().ok_or_else(|| ValidationError::NotAnObject {
            path: "$.data".to_string(),
        })?;

        let view = data
            .get("view")
            .and_then(Value::as_object)
            .ok_or_else(|| ValidationError::NotAnObject {
                path: "$.data.view".to_string(),
            })?;
        for field in ["x", "y", "zoom"] {
            require_numeric(view.get(field), || format!("$.data.view.{field}"))?;
        }

        let tiles = data
            .get("placedTiles")
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::NotAnArray {
                path: "$.data.placedTiles".to_string(),
            })?;
        for (index, tile) in tiles.iter().enumerate() {
            self.validate_tile(tile, index)?;
        }

        Ok(())
    }

    fn validate_tile(&self, tile: &Value, index: usize) -> Result<(), ValidationError> {
        let path = format!("$.data.placedTiles.{index}");
        let tile = tile.as_object().ok_or_else(|| ValidationError::NotAnObject {
            path: path.clone(),
        })?;

        require_string(tile, "id", &path, self.limits.max_tile_id_len)?;
        require_string(tile, "stampId", &path, self.limits.max_stamp_id_len)?;

        let origin = tile
            .get("origin")
            .and_then(Value::as_object)
            .ok_or_else(|| ValidationError::NotAnObject {
                path: format!("{path}.origin"),
            })?;
        require_numeric(origin.get("x"), || format!("{path}.origin.x"))?;
        require_numeric(origin.get("y"), || format!("{path}.origin.y"))?;

        require_string(tile, "color", &path, self.limits.max_color_len)?;

        if let Some(bbox) = tile.get("bbox") {
            let bbox = bbox.as_object().ok_or_else(|| ValidationError::NotAnObject {
                path: format!("{path}.bbox"),
            })?;
            require_numeric(bbox.get("w"), || format!("{path}.bbox.w"))?;
            require_numeric(bbox.get("h"), || format!("{path}.bbox.h"))?;
        }

        if let Some(range) = tile.get("bannerRange") {
            if !range.is_number() {
                return Err(ValidationError::NotNumeric {
                    path: format!("{path}.bannerRange"),
                });
            }
        }

        Ok(())
    }
}

fn require_numeric(
    value: Option<&Value>,
    path: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.is_number() => Ok(()),
        _ => Err(ValidationError::NotNumeric { path: path() }),
    }
}

fn require_string(
    object: &Map<String, Value>,
    field: &str,
    parent: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let path = format!("{parent}.{field}");
    match object.get(field) {
        Some(Value::String(s)) => {
            if s.len() > max {
                Err(ValidationError::TooLong { path, max })
            } else {
                Ok(())
            }
        }
        _ => Err(ValidationError::NotAString { path }),
    }
}
