// Stream catalog: the fixed set of renditions this origin advertises.
//
// Renditions are created once at startup and never added or removed. The
// only mutable state is each rendition's segment history, guarded by a
// per-rendition mutex so requests for different renditions never contend
// and requests for the same rendition serialize their extend-then-render.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use crate::config::RenditionConfig;
use crate::entropy::{EntropySource, JITTER_FRAMES};
use crate::error::OriginError;
use crate::timeline::Timeline;

/// Catalog construction failures. These are startup preconditions, not
/// request-time error paths.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog must contain at least one rendition")]
    Empty,

    /// A zero framerate would fault the frame-duration math.
    #[error("rendition {0}: framerate must be greater than zero")]
    ZeroFramerate(usize),
}

/// Immutable encoding parameters of one rendition.
#[derive(Debug, Clone)]
pub struct RenditionProfile {
    pub width: u32,
    pub height: u32,
    /// Codec identifier string, passed through to the master playlist verbatim.
    pub codecs: String,
    /// Target segment duration in milliseconds.
    pub nominal_duration: i64,
    /// Reserved duration-jitter bound in milliseconds. Carried in the model
    /// but not applied; generated durations jitter by the fixed frame spread.
    pub variance: i64,
    /// Sliding DVR window length in milliseconds.
    pub window: i64,
    /// Frames per second. Non-zero, enforced at catalog construction.
    pub framerate: u32,
    /// Bits per second; sizes the synthetic segment payloads.
    pub bitrate: u64,
}

impl RenditionProfile {
    /// Duration of a single frame in milliseconds, `round(1000 / framerate)`.
    #[must_use]
    pub fn frame_duration(&self) -> i64 {
        (1000.0 / f64::from(self.framerate)).round() as i64
    }

    /// Upper bound on a generated segment's duration.
    #[must_use]
    pub fn max_segment_duration(&self) -> i64 {
        let frame_duration = self.frame_duration();
        let nominal_frames =
            ((self.nominal_duration as f64) / (frame_duration as f64)).round() as i64;
        (nominal_frames + JITTER_FRAMES) * frame_duration
    }
}

impl From<&RenditionConfig> for RenditionProfile {
    fn from(config: &RenditionConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            codecs: config.codecs.clone(),
            nominal_duration: config.nominal_duration,
            variance: config.variance,
            window: config.window,
            framerate: config.framerate,
            bitrate: config.bitrate,
        }
    }
}

/// One live rendition: immutable profile plus its mutable segment history.
pub struct Rendition {
    id: usize,
    profile: RenditionProfile,
    entropy: Arc<dyn EntropySource>,
    timeline: Mutex<Timeline>,
}

impl std::fmt::Debug for Rendition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rendition")
            .field("id", &self.id)
            .field("profile", &self.profile)
            .field("timeline", &self.timeline)
            .finish_non_exhaustive()
    }
}

impl Rendition {
    fn new(id: usize, profile: RenditionProfile, start: i64, entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            id,
            profile,
            entropy,
            timeline: Mutex::new(Timeline::new(start)),
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn profile(&self) -> &RenditionProfile {
        &self.profile
    }

    /// Extend the history up to `now_ms`, evict what fell out of the window,
    /// and hand back the locked timeline.
    ///
    /// Holding the guard keeps extension and rendering atomic with respect
    /// to other requests for the same rendition.
    pub fn advance(&self, now_ms: i64) -> MutexGuard<'_, Timeline> {
        let mut timeline = self.timeline.lock();
        timeline.extend(&self.profile, now_ms, self.entropy.as_ref());
        timeline
    }
}

/// The fixed rendition catalog plus the shared start reference.
pub struct Catalog {
    started_at: i64,
    renditions: Vec<Rendition>,
    entropy: Arc<dyn EntropySource>,
}

impl Catalog {
    /// Build the catalog from rendition configs.
    ///
    /// `started_at` is the shared timeline origin for every rendition and
    /// the master playlist's authoritative timestamp.
    pub fn new(
        configs: &[RenditionConfig],
        started_at: i64,
        entropy: Arc<dyn EntropySource>,
    ) -> Result<Self, CatalogError> {
        if configs.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut renditions = Vec::with_capacity(configs.len());
        for (id, config) in configs.iter().enumerate() {
            if config.framerate == 0 {
                return Err(CatalogError::ZeroFramerate(id));
            }
            renditions.push(Rendition::new(
                id,
                RenditionProfile::from(config),
                started_at,
                Arc::clone(&entropy),
            ));
        }

        Ok(Self {
            started_at,
            renditions,
            entropy,
        })
    }

    /// Shared process start reference in milliseconds.
    #[must_use]
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    #[must_use]
    pub fn renditions(&self) -> &[Rendition] {
        &self.renditions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.renditions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }

    /// Look up a rendition by id.
    pub fn rendition(&self, id: usize) -> Result<&Rendition, OriginError> {
        self.renditions
            .get(id)
            .ok_or(OriginError::UnknownRendition(id))
    }

    #[must_use]
    pub fn entropy(&self) -> &dyn EntropySource {
        self.entropy.as_ref()
    }
}
