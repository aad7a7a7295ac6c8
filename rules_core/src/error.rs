use thiserror::Error;

use crate::RowId;

/// Structural edits that reference something the table doesn't have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("no rule with id {0}")]
    NotFound(RowId),
    #[error("column {0} cannot be used here")]
    InvalidColumn(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("empty filter segment at position {0}")]
    EmptySegment(usize),
    #[error("unknown token kind '{0}' (expected c, o or v)")]
    UnknownKind(String),
    #[error("token kind '{0}' has no text")]
    MissingText(String),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
}
