// Synthetic segment payloads: bitrate-accurate sizing over random bytes.

use bytes::{Bytes, BytesMut};

use crate::entropy::EntropySource;
use crate::timeline::Segment;

/// Target payload size in bytes for a segment at the given bitrate:
/// `floor(duration / 1000 * bitrate)`.
///
/// A pure function of the stored duration and the rendition's fixed bitrate,
/// so repeated requests for one segment always report the same size.
#[must_use]
pub fn payload_size(duration_ms: i64, bitrate: u64) -> usize {
    (duration_ms.max(0) as u64 * bitrate / 1000) as usize
}

/// Fabricate a segment body: exactly [`payload_size`] pseudo-random bytes.
#[must_use]
pub fn segment_payload(segment: &Segment, bitrate: u64, entropy: &dyn EntropySource) -> Bytes {
    let size = payload_size(segment.duration, bitrate);
    let mut buf = BytesMut::zeroed(size);
    entropy.fill_payload(&mut buf);
    buf.freeze()
}
