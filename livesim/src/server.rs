// HTTP surface of the origin: a fixed GET router over the catalog.
//
// Every rendition-addressed request extends that rendition's timeline
// before rendering, so responses always reflect a history whose frontier
// covers "now". Playlists are marked always-revalidate; segments get a
// short cache window.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use livesim_core::{catalog::Catalog, config::Config, error::OriginError, payload, playlist};

const PLAYLIST_CONTENT_TYPE: &str = "application/x-mpegURL";
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";
const PLAYLIST_CACHE_CONTROL: &str = "max-age=0, no-cache, no-store";
/// Segments never change once generated; clients may cache them briefly.
const SEGMENT_MAX_AGE_SECS: i64 = 10;

#[derive(Clone)]
struct OriginState {
    catalog: Arc<Catalog>,
    base_url: String,
}

/// Run the HTTP server until ctrl-c.
pub async fn run(config: Config, catalog: Arc<Catalog>) -> anyhow::Result<()> {
    let state = OriginState {
        catalog,
        base_url: config.base_url(),
    };

    let app = Router::new()
        .route("/master.m3u8", get(serve_master))
        .route("/:file", get(serve_media))
        .fallback(fallback_not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.http_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("origin listening on http://{addr}");

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;

    info!("origin shut down gracefully");
    Ok(())
}

/// Serve the master playlist. Static given the catalog; never touches a
/// rendition's history.
async fn serve_master(State(state): State<OriginState>) -> Response {
    let body = playlist::master_playlist(&state.catalog, |id| {
        format!("{}/{}", state.base_url, playlist::media_playlist_name(id))
    });
    playlist_response(body, state.catalog.started_at())
}

/// Dispatch `stream_{N}.m3u8` and `stream_{N}_{index}.ts`; anything else is
/// a 404 with an empty body.
async fn serve_media(Path(file): Path<String>, State(state): State<OriginState>) -> Response {
    let now_ms = chrono::Utc::now().timestamp_millis();

    let result = if let Some(rendition) = parse_playlist_name(&file) {
        media_playlist_response(&state, rendition, now_ms)
    } else if let Some((rendition, index)) = parse_segment_name(&file) {
        segment_response(&state, rendition, index, now_ms)
    } else {
        warn!("unroutable object name: {}", file);
        return StatusCode::NOT_FOUND.into_response();
    };

    result.unwrap_or_else(|e| error_response(&e))
}

async fn fallback_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Extend the rendition and render its media playlist under one lock
/// acquisition, so the rendered view is a consistent snapshot.
fn media_playlist_response(
    state: &OriginState,
    rendition_id: usize,
    now_ms: i64,
) -> Result<Response, OriginError> {
    let rendition = state.catalog.rendition(rendition_id)?;
    let timeline = rendition.advance(now_ms);

    let rendered = playlist::media_playlist(rendition.profile(), timeline.segments(), now_ms, |index| {
        format!("{}/{}", state.base_url, playlist::segment_name(rendition_id, index))
    })
    .ok_or(OriginError::PlaylistNotReady(rendition_id))?;

    Ok(playlist_response(rendered.body, rendered.last_modified_ms))
}

/// Extend the rendition and fabricate the addressed segment's payload.
fn segment_response(
    state: &OriginState,
    rendition_id: usize,
    index: u64,
    now_ms: i64,
) -> Result<Response, OriginError> {
    let rendition = state.catalog.rendition(rendition_id)?;
    let timeline = rendition.advance(now_ms);

    let segment = timeline.segment(index).ok_or(OriginError::SegmentNotFound {
        rendition: rendition_id,
        index,
    })?;
    let body = payload::segment_payload(segment, rendition.profile().bitrate, state.catalog.entropy());
    let last_modified_ms = segment.time;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, SEGMENT_CONTENT_TYPE.to_string()),
            (header::LAST_MODIFIED, http_date(last_modified_ms)),
            (
                header::CACHE_CONTROL,
                format!("max-age={SEGMENT_MAX_AGE_SECS}"),
            ),
            (
                header::EXPIRES,
                http_date(now_ms + SEGMENT_MAX_AGE_SECS * 1000),
            ),
        ],
        body,
    )
        .into_response())
}

fn playlist_response(body: String, last_modified_ms: i64) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE.to_string()),
            (header::LAST_MODIFIED, http_date(last_modified_ms)),
            (header::CACHE_CONTROL, PLAYLIST_CACHE_CONTROL.to_string()),
            (header::PRAGMA, "no-cache".to_string()),
            (header::EXPIRES, "0".to_string()),
        ],
        body,
    )
        .into_response()
}

/// Empty-body status mapping for the core error taxonomy.
fn error_response(err: &OriginError) -> Response {
    if err.is_not_found() {
        warn!("{err}");
        StatusCode::NOT_FOUND.into_response()
    } else {
        error!("{err}");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// HTTP-date (GMT) for `Last-Modified`/`Expires`.
fn http_date(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// `stream_{N}.m3u8` → N
fn parse_playlist_name(file: &str) -> Option<usize> {
    file.strip_suffix(".m3u8")?.strip_prefix("stream_")?.parse().ok()
}

/// `stream_{N}_{index}.ts` → (N, index); the index may be zero-padded.
fn parse_segment_name(file: &str) -> Option<(usize, u64)> {
    let stem = file.strip_suffix(".ts")?.strip_prefix("stream_")?;
    let (rendition, index) = stem.split_once('_')?;
    Some((rendition.parse().ok()?, index.parse().ok()?))
}
