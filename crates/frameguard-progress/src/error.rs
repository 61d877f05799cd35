//! Error types for progress sources and display surfaces

/// Fetching a progress snapshot failed
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Underlying storage could not be read
    #[error("progress read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored progress is not valid snapshot JSON
    #[error("progress parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Task id cannot be mapped to a storage key
    #[error("task id not usable as storage key: {0}")]
    InvalidTaskId(String),
}

/// A display surface rejected a mutation
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Target element is no longer attached to the surface
    #[error("display element detached: {0}")]
    Detached(String),

    /// Writing to the surface failed
    #[error("display write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Surface refused the frame for another reason
    #[error("display rejected frame: {0}")]
    Rejected(String),
}

impl SurfaceError {
    /// Check if the failure is the detached-element case
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached(_))
    }
}
