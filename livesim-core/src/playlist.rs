// HLS playlist rendering.
//
// The master playlist is static given the catalog and never touches a
// timeline. A media playlist renders the fully elapsed prefix of a history
// that the caller has just extended. URL construction is injected as a
// closure so the HTTP layer decides the base address.

use std::collections::VecDeque;

use crate::catalog::{Catalog, RenditionProfile};
use crate::timeline::Segment;

/// Media playlist object name for a rendition.
#[must_use]
pub fn media_playlist_name(rendition: usize) -> String {
    format!("stream_{rendition}.m3u8")
}

/// Segment object name; indices are zero-padded to five digits.
#[must_use]
pub fn segment_name(rendition: usize, index: u64) -> String {
    format!("stream_{rendition}_{index:05}.ts")
}

/// Render the master playlist: one stream-info line per catalog entry.
///
/// `media_url` maps a rendition id to the absolute URL of its media playlist.
pub fn master_playlist<F>(catalog: &Catalog, mut media_url: F) -> String
where
    F: FnMut(usize) -> String,
{
    let mut m3u8_content = String::new();
    m3u8_content.push_str("#EXTM3U\n");
    m3u8_content.push_str("#EXT-X-VERSION:3\n");

    for rendition in catalog.renditions() {
        let profile = rendition.profile();
        m3u8_content.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},FRAME-RATE={},RESOLUTION={}x{},CODECS=\"{}\"\n",
            profile.bitrate, profile.framerate, profile.width, profile.height, profile.codecs
        ));
        m3u8_content.push_str(&media_url(rendition.id()));
        m3u8_content.push('\n');
    }

    m3u8_content
}

/// A rendered media playlist plus the timestamp of its authoritative source
/// (the last listed segment's start time, used for `Last-Modified`).
#[derive(Debug)]
pub struct MediaPlaylist {
    pub body: String,
    pub last_modified_ms: i64,
}

/// Render a media playlist from the fully elapsed prefix of `segments`.
///
/// Returns `None` when nothing has fully elapsed yet; no valid live playlist
/// exists at that instant and the caller reports not-found.
///
/// `segment_url` maps a segment index to its absolute URL.
pub fn media_playlist<F>(
    profile: &RenditionProfile,
    segments: &VecDeque<Segment>,
    now_ms: i64,
    mut segment_url: F,
) -> Option<MediaPlaylist>
where
    F: FnMut(u64) -> String,
{
    // History is chronological and contiguous, so the elapsed subsequence is
    // exactly the leading run.
    let elapsed: Vec<&Segment> = segments.iter().take_while(|s| s.elapsed(now_ms)).collect();
    let first = *elapsed.first()?;
    let last = *elapsed.last()?;

    // Target duration is whole seconds, rounded up.
    let target_duration = (profile.nominal_duration + 999) / 1000;

    let mut m3u8_content = String::new();
    m3u8_content.push_str("#EXTM3U\n");
    m3u8_content.push_str("#EXT-X-VERSION:3\n");
    m3u8_content.push_str(&format!("#EXT-X-TARGETDURATION:{target_duration}\n"));
    m3u8_content.push_str(&format!("#EXT-X-MEDIA-SEQUENCE:{}\n", first.index));
    m3u8_content.push_str(&format!(
        "#EXT-X-PROGRAM-DATE-TIME:{}\n",
        program_date_time(first.time)
    ));

    for segment in &elapsed {
        let duration_sec = segment.duration as f64 / 1000.0;
        m3u8_content.push_str(&format!("#EXTINF:{duration_sec:.3},\n"));
        m3u8_content.push_str(&segment_url(segment.index));
        m3u8_content.push('\n');
    }

    Some(MediaPlaylist {
        body: m3u8_content,
        last_modified_ms: last.time,
    })
}

/// UTC ISO-8601 timestamp with millisecond precision.
fn program_date_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
