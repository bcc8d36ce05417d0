//! Range-capable media serving.
//!
//! `GET /files/<rest>` resolves the decoded path against each watch root
//! in order; a path without an extension tries the video allow-list.
//! Single-range `Range: bytes=` requests get 206 responses; anything
//! invalid or unsatisfiable falls through to a 200 with the full body.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::Response;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use atci_models::{content_type_for, find_video, AtciConfig};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A parsed single-range request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=a-b`
    FromTo(u64, u64),
    /// `bytes=a-`
    From(u64),
    /// `bytes=-n` (last n bytes)
    Suffix(u64),
}

/// Parse a `Range` header value. `None` means serve the full body.
pub fn parse_range_header(value: &str) -> Option<RangeSpec> {
    let rest = value.strip_prefix("bytes=")?.trim();
    if rest.contains(',') {
        // Multi-range requests fall through to a full response.
        return None;
    }
    if let Some(n) = rest.strip_prefix('-') {
        return n.parse().ok().map(RangeSpec::Suffix);
    }
    let (start, end) = rest.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    if end.is_empty() {
        return Some(RangeSpec::From(start));
    }
    let end: u64 = end.parse().ok()?;
    if end < start {
        return None;
    }
    Some(RangeSpec::FromTo(start, end))
}

/// Resolve a range against the file size.
///
/// `Some((start, end))` is a 206 slice; `None` means 200 full body,
/// which also covers ranges that span the whole file.
pub fn resolve_range(spec: RangeSpec, size: u64) -> Option<(u64, u64)> {
    if size == 0 {
        return None;
    }
    let last = size - 1;
    match spec {
        RangeSpec::FromTo(start, end) => {
            if start > last {
                return None;
            }
            let end = end.min(last);
            if start == 0 && end == last {
                return None;
            }
            Some((start, end))
        }
        RangeSpec::From(start) => {
            if start == 0 || start > last {
                return None;
            }
            Some((start, last))
        }
        RangeSpec::Suffix(n) => {
            if n == 0 || n >= size {
                return None;
            }
            Some((size - n, last))
        }
    }
}

/// Resolve the decoded request path against the watch roots.
fn resolve_media_path(cfg: &AtciConfig, rest: &str) -> Option<PathBuf> {
    let rel = Path::new(rest);
    // Only plain relative components; no escaping the roots.
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    for root in &cfg.watch_directories {
        if rel.extension().is_some() {
            let candidate = root.join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        } else if let Some(found) = find_video(root, rest) {
            return Some(found);
        }
    }
    None
}

/// `GET /files/*path`
pub async fn serve_file(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let cfg = state.config()?;
    // Decode the raw request path exactly once.
    let raw = uri
        .path()
        .strip_prefix("/files/")
        .unwrap_or_else(|| uri.path());
    let decoded = urlencoding::decode(raw)
        .map_err(|_| ApiError::bad_request("invalid path encoding"))?;
    let decoded = decoded.trim_start_matches('/');

    let path = resolve_media_path(&cfg, decoded)
        .ok_or_else(|| ApiError::not_found(format!("no such file: {decoded}")))?;

    let mut file = tokio::fs::File::open(&path).await?;
    let size = file.metadata().await?.len();
    let content_type = content_type_for(&path);

    let range = headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header)
        .and_then(|spec| resolve_range(spec, size));

    let response = match range {
        Some((start, end)) => {
            let len = end - start + 1;
            file.seek(std::io::SeekFrom::Start(start)).await?;
            let stream = ReaderStream::new(file.take(len));
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_TYPE, content_type)
                .header(ACCEPT_RANGES, "bytes")
                .header(CONTENT_LENGTH, len)
                .header(CONTENT_RANGE, format!("bytes {start}-{end}/{size}"))
                .body(Body::from_stream(stream))
        }
        None => {
            let stream = ReaderStream::new(file);
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, content_type)
                .header(ACCEPT_RANGES, "bytes")
                .header(CONTENT_LENGTH, size)
                .body(Body::from_stream(stream))
        }
    };

    response.map_err(|e| ApiError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_header() {
        assert_eq!(
            parse_range_header("bytes=100-199"),
            Some(RangeSpec::FromTo(100, 199))
        );
        assert_eq!(parse_range_header("bytes=100-"), Some(RangeSpec::From(100)));
        assert_eq!(parse_range_header("bytes=-500"), Some(RangeSpec::Suffix(500)));
        assert_eq!(parse_range_header("bytes=199-100"), None);
        assert_eq!(parse_range_header("bytes=1-2,4-5"), None);
        assert_eq!(parse_range_header("items=1-2"), None);
        assert_eq!(parse_range_header("bytes=abc-"), None);
    }

    #[test]
    fn test_resolve_range_bounded() {
        // a-b clamps to the end of the file.
        assert_eq!(
            resolve_range(RangeSpec::FromTo(100, 199), 1000),
            Some((100, 199))
        );
        assert_eq!(
            resolve_range(RangeSpec::FromTo(900, 5000), 1000),
            Some((900, 999))
        );
        // Start past the end is unsatisfiable: full body.
        assert_eq!(resolve_range(RangeSpec::FromTo(1000, 1100), 1000), None);
    }

    #[test]
    fn test_resolve_range_whole_file_is_full_response() {
        assert_eq!(resolve_range(RangeSpec::FromTo(0, 999), 1000), None);
        assert_eq!(resolve_range(RangeSpec::From(0), 1000), None);
    }

    #[test]
    fn test_resolve_range_open_ended() {
        assert_eq!(resolve_range(RangeSpec::From(400), 1000), Some((400, 999)));
    }

    #[test]
    fn test_resolve_range_suffix() {
        assert_eq!(resolve_range(RangeSpec::Suffix(100), 1000), Some((900, 999)));
        // Suffix longer than the file: full body.
        assert_eq!(resolve_range(RangeSpec::Suffix(5000), 1000), None);
        assert_eq!(resolve_range(RangeSpec::Suffix(0), 1000), None);
    }

    #[test]
    fn test_resolve_media_path_direct_and_extension_probe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"v").unwrap();
        std::fs::write(dir.path().join("clip.txt"), b"t").unwrap();
        let cfg = AtciConfig {
            watch_directories: vec![dir.path().to_path_buf()],
            ..Default::default()
        };

        assert!(resolve_media_path(&cfg, "clip.mp4").is_some());
        assert!(resolve_media_path(&cfg, "clip.txt").is_some());
        // No extension: allow-list probe finds the video.
        let found = resolve_media_path(&cfg, "clip").unwrap();
        assert_eq!(found.file_name().unwrap(), "clip.mp4");
        assert!(resolve_media_path(&cfg, "absent.mp4").is_none());
    }

    #[test]
    fn test_resolve_media_path_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AtciConfig {
            watch_directories: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        assert!(resolve_media_path(&cfg, "../etc/passwd").is_none());
        assert!(resolve_media_path(&cfg, "a/../../b.mp4").is_none());
    }
}
