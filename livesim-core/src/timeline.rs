// Synthetic live timeline.
//
// Generation is lazy and pull-based: there is no background timer. Each
// request extends the history in duration-quantized steps until its frontier
// covers "now", then trims the leading segments that slid out of the DVR
// window. The first request after an idle gap catches the whole timeline up
// at once, keeping segment boundaries frame-accurate.

use std::collections::VecDeque;

use crate::catalog::RenditionProfile;
use crate::entropy::EntropySource;

/// Contiguous frame-index accounting for one segment.
///
/// Across consecutive segments the ranges are gapless: one segment's `end()`
/// is the next segment's `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    /// Index of the first frame in this segment.
    pub start: u64,
    /// Number of frames this segment spans.
    pub count: u64,
}

impl FrameRange {
    /// First frame index of the following segment.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.count
    }
}

/// One fabricated media segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Absolute start timestamp in milliseconds.
    pub time: i64,
    /// Milliseconds this segment spans.
    pub duration: i64,
    /// Sequence number; the first segment ever generated for a rendition is 1.
    pub index: u64,
    /// Frame bookkeeping.
    pub frames: FrameRange,
}

impl Segment {
    /// Absolute end timestamp (exclusive).
    #[must_use]
    pub fn end(&self) -> i64 {
        self.time + self.duration
    }

    /// Whether the segment has fully elapsed at `now_ms`. A live player is
    /// never offered a segment whose simulated encode has not finished.
    #[must_use]
    pub fn elapsed(&self, now_ms: i64) -> bool {
        self.end() <= now_ms
    }
}

/// A rendition's segment history, mutated only through [`Timeline::extend`].
#[derive(Debug)]
pub struct Timeline {
    /// Shared process start reference; the synthetic zero segment ends here.
    start: i64,
    segments: VecDeque<Segment>,
}

impl Timeline {
    #[must_use]
    pub fn new(start: i64) -> Self {
        Self {
            start,
            segments: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &VecDeque<Segment> {
        &self.segments
    }

    /// Look up a segment by sequence number within the current window.
    #[must_use]
    pub fn segment(&self, index: u64) -> Option<&Segment> {
        // Indices are dense and increasing, so the offset from the front
        // segment addresses the deque directly.
        let front = self.segments.front()?;
        let offset = index.checked_sub(front.index)?;
        self.segments.get(usize::try_from(offset).ok()?)
    }

    /// Extend the history so its frontier covers `now_ms`, then evict
    /// segments that slid out of the window.
    ///
    /// Idempotent with respect to `now_ms`: repeated calls with the same or
    /// increasing time never regress the frontier and never alter segments
    /// that were already generated.
    pub fn extend(&mut self, profile: &RenditionProfile, now_ms: i64, entropy: &dyn EntropySource) {
        let frame_duration = profile.frame_duration();
        let nominal_frames =
            ((profile.nominal_duration as f64) / (frame_duration as f64)).round() as i64;

        let (mut frontier, mut next_index, mut next_frame) = match self.segments.back() {
            Some(last) => (last.end(), last.index + 1, last.frames.end()),
            None => (self.start, 1, 0),
        };

        let mut missing = now_ms - frontier;
        while missing > 0 {
            // At least one frame, so the frontier always advances.
            let frames = (nominal_frames + entropy.frame_jitter()).max(1) as u64;
            let duration = frames as i64 * frame_duration;
            self.segments.push_back(Segment {
                time: frontier,
                duration,
                index: next_index,
                frames: FrameRange {
                    start: next_frame,
                    count: frames,
                },
            });
            frontier += duration;
            next_index += 1;
            next_frame += frames;
            missing -= duration;
        }

        self.evict(profile.window);
    }

    /// Drop the leading segments whose start fell before the window.
    ///
    /// A segment straddling the boundary is kept whole. If no segment starts
    /// inside the window the history is left untouched.
    fn evict(&mut self, window: i64) {
        let Some(last) = self.segments.back() else {
            return;
        };
        let window_start = last.end() - window;
        if let Some(first_kept) = self.segments.iter().position(|s| s.time >= window_start) {
            self.segments.drain(..first_kept);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{FixedEntropy, ThreadRngEntropy, JITTER_FRAMES};

    fn profile_60fps() -> RenditionProfile {
        RenditionProfile {
            width: 1920,
            height: 1080,
            codecs: "avc1.640028,mp4a.40.2".to_string(),
            nominal_duration: 1000,
            variance: 500,
            window: 10_000,
            framerate: 60,
            bitrate: 6_000_000,
        }
    }

    /// Checks the contiguity, index, and frame-accounting invariants.
    fn assert_invariants(timeline: &Timeline) {
        let segments = timeline.segments();
        for pair in segments.iter().zip(segments.iter().skip(1)) {
            let (a, b) = pair;
            assert_eq!(a.end(), b.time, "segments must be contiguous");
            assert_eq!(a.index + 1, b.index, "indices must be dense");
            assert_eq!(a.frames.end(), b.frames.start, "frames must be gapless");
        }
    }

    #[test]
    fn test_extend_covers_now() {
        let profile = profile_60fps();
        let mut timeline = Timeline::new(0);
        timeline.extend(&profile, 2500, &ThreadRngEntropy);

        let last = timeline.segments().back().expect("history must not be empty");
        assert!(last.end() >= 2500);
        assert!(last.end() < 2500 + profile.max_segment_duration());
        assert_invariants(&timeline);
    }

    #[test]
    fn test_first_segment_starts_at_reference() {
        let profile = profile_60fps();
        let mut timeline = Timeline::new(5000);
        timeline.extend(&profile, 7500, &FixedEntropy::new(0, 0));

        let first = timeline.segments().front().expect("history must not be empty");
        assert_eq!(first.time, 5000);
        assert_eq!(first.index, 1);
        assert_eq!(first.frames.start, 0);
    }

    #[test]
    fn test_catch_up_durations_stay_frame_quantized() {
        // 60 fps, 1000 ms nominal: frame duration 17 ms, 59 nominal frames.
        let profile = profile_60fps();
        let frame_duration = profile.frame_duration();
        assert_eq!(frame_duration, 17);
        let nominal_frames =
            ((profile.nominal_duration as f64) / (frame_duration as f64)).round() as i64;

        let mut timeline = Timeline::new(0);
        timeline.extend(&profile, 2500, &ThreadRngEntropy);

        assert!(timeline.segments().len() >= 2);
        for segment in timeline.segments() {
            let min = (nominal_frames - JITTER_FRAMES) * frame_duration;
            let max = (nominal_frames + JITTER_FRAMES) * frame_duration;
            assert!(
                (min..=max).contains(&segment.duration),
                "duration {} outside [{min}, {max}]",
                segment.duration
            );
            assert_eq!(segment.duration % frame_duration, 0);
            assert_eq!(segment.duration, segment.frames.count as i64 * frame_duration);
        }
    }

    #[test]
    fn test_extend_is_idempotent_for_same_now() {
        let profile = profile_60fps();
        let mut timeline = Timeline::new(0);
        timeline.extend(&profile, 4000, &ThreadRngEntropy);
        let before: Vec<Segment> = timeline.segments().iter().cloned().collect();

        timeline.extend(&profile, 4000, &ThreadRngEntropy);
        let after: Vec<Segment> = timeline.segments().iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_generated_segments_are_never_altered() {
        let profile = profile_60fps();
        let mut timeline = Timeline::new(0);
        timeline.extend(&profile, 3000, &ThreadRngEntropy);
        let before: Vec<Segment> = timeline.segments().iter().cloned().collect();

        timeline.extend(&profile, 6000, &ThreadRngEntropy);
        for old in &before {
            let current = timeline
                .segment(old.index)
                .expect("window is wide enough to retain every segment here");
            assert_eq!(current, old);
        }
        assert_invariants(&timeline);
    }

    #[test]
    fn test_eviction_respects_window_bound() {
        let mut profile = profile_60fps();
        profile.window = 5000;
        let mut timeline = Timeline::new(0);

        // Walk forward in steps so eviction runs repeatedly.
        for now in [2000, 10_000, 30_000, 60_000] {
            timeline.extend(&profile, now, &ThreadRngEntropy);
            assert_invariants(&timeline);

            let last_end = timeline.segments().back().expect("non-empty").end();
            let window_start = last_end - profile.window;
            for segment in timeline.segments() {
                assert!(segment.end() >= window_start);
            }
            let first = timeline.segments().front().expect("non-empty");
            assert!(first.time >= window_start);
        }
    }

    #[test]
    fn test_eviction_noop_when_window_smaller_than_segment() {
        // Window shorter than one segment: the last segment itself starts
        // before the window, so nothing qualifies and everything is kept.
        let mut profile = profile_60fps();
        profile.window = 100;
        let mut timeline = Timeline::new(0);
        timeline.extend(&profile, 3000, &FixedEntropy::new(0, 0));

        let count = timeline.segments().len();
        assert!(count >= 3);
        assert_eq!(timeline.segments().front().map(|s| s.index), Some(1));
    }

    #[test]
    fn test_segment_lookup_by_index() {
        let profile = profile_60fps();
        let mut timeline = Timeline::new(0);
        timeline.extend(&profile, 5000, &FixedEntropy::new(0, 0));

        let third = timeline.segment(3).expect("segment 3 must exist");
        assert_eq!(third.index, 3);
        assert!(timeline.segment(0).is_none());
        assert!(timeline.segment(10_000).is_none());
    }

    #[test]
    fn test_no_segments_before_reference_instant() {
        let profile = profile_60fps();
        let mut timeline = Timeline::new(1000);
        timeline.extend(&profile, 1000, &ThreadRngEntropy);
        assert!(timeline.segments().is_empty());
    }
}
