use thiserror::Error;

/// Request-level failures surfaced by the origin core.
///
/// The `NotFound` family maps to HTTP 404 with an empty body; `Internal`
/// maps to HTTP 500 and is logged at the HTTP boundary. There is no
/// transient class: generation is synchronous and deterministic given the
/// catalog and the current time, so nothing here is retryable.
#[derive(Debug, Error)]
pub enum OriginError {
    /// Rendition id outside the catalog.
    #[error("unknown rendition {0}")]
    UnknownRendition(usize),

    /// Segment index not present in the rendition's current window.
    #[error("segment {index} not in the current window of rendition {rendition}")]
    SegmentNotFound { rendition: usize, index: u64 },

    /// Media playlist requested before any segment has fully elapsed.
    #[error("rendition {0} has no fully elapsed segments yet")]
    PlaylistNotReady(usize),

    /// Unexpected fault while rendering a response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OriginError {
    /// True for the `NotFound` family, false for `Internal`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
