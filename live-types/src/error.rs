//! Error types for livewatch wire handling.

use thiserror::Error;

/// Errors that can occur while decoding wire types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}
