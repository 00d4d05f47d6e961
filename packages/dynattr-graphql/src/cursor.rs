//! Opaque connection cursors.
//!
//! A cursor is the hex encoding of a JSON array holding the cursor prefix of
//! the sort that produced it, followed by the row's position in the result.

use serde_json::Value;
use thiserror::Error;

/// Prefix of cursors produced without a `sort` argument.
pub const NATURAL_PREFIX: &str = "natural";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid cursor: {0}")]
    Invalid(String),
    #[error("Cursor was produced by a different sort: expected {expected:?}, received {received:?}")]
    PrefixMismatch {
        expected: Vec<String>,
        received: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub prefix: Vec<String>,
    pub position: u64,
}

impl Cursor {
    pub fn new(prefix: Vec<String>, position: u64) -> Self {
        Self { prefix, position }
    }

    pub fn encode(&self) -> String {
        let mut items = self
            .prefix
            .iter()
            .map(|p| Value::String(p.clone()))
            .collect::<Vec<Value>>();
        items.push(Value::from(self.position));
        hex::encode(Value::Array(items).to_string())
    }

    pub fn decode(cursor: &str) -> Result<Self, CursorError> {
        let bytes = hex::decode(cursor).map_err(|e| CursorError::Invalid(e.to_string()))?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| CursorError::Invalid(e.to_string()))?;

        let mut items = match value {
            Value::Array(items) if !items.is_empty() => items,
            _ => return Err(CursorError::Invalid("expected a non-empty array".to_string())),
        };
        let position = items
            .pop()
            .and_then(|p| p.as_u64())
            .ok_or_else(|| CursorError::Invalid("missing position".to_string()))?;
        let prefix = items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(CursorError::Invalid(format!(
                    "unexpected prefix entry {other}"
                ))),
            })
            .collect::<Result<Vec<String>, CursorError>>()?;

        Ok(Self { prefix, position })
    }

    /// Reject cursors that were not produced by the sort now in effect.
    pub fn check_prefix(&self, expected: &[String]) -> Result<(), CursorError> {
        if self.prefix != expected {
            return Err(CursorError::PrefixMismatch {
                expected: expected.to_vec(),
                received: self.prefix.clone(),
            });
        }
        Ok(())
    }
}
