//! Error types for the evidence engine.
//!
//! Matching, grouping and rendering never fail: they degrade to empty results.
//! Errors only surface at the boundaries (fragment ingestion, configuration,
//! collaborator calls and the CLI).

/// Result type alias for evidence engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur at the engine's boundaries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fragment's geometry could not be normalized into screen space
    #[error("Invalid geometry on page {page}: {reason}")]
    InvalidGeometry {
        /// Page the fragment belongs to
        page: u32,
        /// Why the geometry was rejected
        reason: String,
    },

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A collaborator (sentence, fragment or consumption source) failed
    #[error("Source error: {0}")]
    Source(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
