//! Opaque Pagination Cursors
//!
//! A cursor encodes the position of the last seen row: the row id and its
//! value for the active sort field. Tokens are compact JSON behind
//! URL-safe base64. They are tamper-evident only in the sense that
//! anything that fails to decode is ignored; cursors affect read
//! positioning, never authorization, so no cryptographic integrity is
//! applied.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flowlens_core::{CursorBoundary, FlowlensError, Record, Result, Value};
use serde::{Deserialize, Serialize};

/// Hard cap on cursor token and payload size
pub const MAX_CURSOR_BYTES: usize = 1024;

/// Decoded form of a pagination cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CursorPayload {
    /// Id of the row the cursor points at
    pub id: String,
    /// Sort field the cursor was taken from
    pub field: String,
    /// The row's value for the sort field
    pub value: Value,
}

impl CursorPayload {
    /// Converts into the keyset boundary handed to the data-access layer
    pub fn into_boundary(self) -> CursorBoundary {
        CursorBoundary {
            id: self.id,
            field: self.field,
            value: self.value,
        }
    }
}

/// Encodes a sort position into a cursor token
///
/// Deterministic: identical inputs always produce identical tokens. The
/// sort field `"id"` is served from the record id itself; any other field
/// must be present on the record.
pub fn encode_cursor(record: &Record, sort_field: &str) -> Result<String> {
    let value = if sort_field == "id" {
        Value::String(record.id.clone())
    } else {
        record.get(sort_field).cloned().ok_or_else(|| {
            FlowlensError::Validation(format!(
                "record '{}' has no value for sort field '{}'",
                record.id, sort_field
            ))
        })?
    };

    let payload = CursorPayload {
        id: record.id.clone(),
        field: sort_field.to_string(),
        value,
    };
    let bytes = serde_json::to_vec(&payload)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decodes a cursor token
///
/// Returns `None` on any malformed input: bad base64, oversized tokens,
/// invalid UTF-8/JSON, or an unexpected payload shape. Callers treat
/// `None` as "no cursor" and start from the beginning of the collection.
pub fn decode_cursor(cursor: &str) -> Option<CursorPayload> {
    if cursor.is_empty() || cursor.len() > MAX_CURSOR_BYTES {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(cursor.as_bytes()).ok()?;
    if bytes.len() > MAX_CURSOR_BYTES {
        return None;
    }
    serde_json::from_slice(&bytes).ok()
}
