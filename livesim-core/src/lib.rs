//! Core engine for the synthetic live HLS origin.
//!
//! Fabricates a time-consistent segment timeline per rendition (extended
//! lazily to cover "now", trimmed to a sliding DVR window) and renders it
//! as HLS playlists and bitrate-sized random payloads. No real media is
//! encoded anywhere.

pub mod catalog;
pub mod config;
pub mod entropy;
pub mod error;
pub mod logging;
pub mod payload;
pub mod playlist;
pub mod timeline;

pub use catalog::{Catalog, CatalogError, Rendition, RenditionProfile};
pub use config::Config;
pub use error::OriginError;
pub use timeline::{FrameRange, Segment, Timeline};
