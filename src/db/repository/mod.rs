//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a plain `&Connection` so callers can pass either a
//! connection or an open `Transaction` (which derefs to one).

mod canonical_result;
mod consistency;
mod order;
mod report;
mod staged_extraction;
mod upload;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::DatabaseError;

// Re-export all public items from sub-modules
pub use canonical_result::*;
pub use consistency::*;
pub use order::*;
pub use report::*;
pub use staged_extraction::*;
pub use upload::*;

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_optional_uuid(raw: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    raw.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn to_json_column<T: Serialize>(column: &str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::InvalidJson {
        column: column.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn from_json_column<T: DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::InvalidJson {
        column: column.into(),
        reason: e.to_string(),
    })
}

/// True when a rusqlite error is a UNIQUE / CHECK / FK constraint failure.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
