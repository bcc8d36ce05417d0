//! Video file identity and sidecar paths.

use std::path::{Path, PathBuf};

/// Extensions recognized as videos, in lookup-preference order.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "ts"];

/// Whether a path carries one of the recognized video extensions.
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Derive a sidecar path by replacing the video extension.
pub fn sidecar(video_path: &Path, suffix: &str) -> PathBuf {
    video_path.with_extension(suffix)
}

/// Logical name of a video: its path relative to the watch root, minus
/// the extension. Returns `None` when the video is not under the root.
pub fn logical_name(root: &Path, video: &Path) -> Option<String> {
    let rel = video.strip_prefix(root).ok()?;
    let stem = rel.with_extension("");
    Some(stem.to_string_lossy().replace('\\', "/"))
}

/// Locate a video for a logical name under a watch root.
///
/// Matching is case-insensitive; extensions are tried in allow-list order.
pub fn find_video(root: &Path, logical: &str) -> Option<PathBuf> {
    let rel = Path::new(logical);
    let dir = match rel.parent() {
        Some(p) if p != Path::new("") => root.join(p),
        _ => root.to_path_buf(),
    };
    let stem = rel.file_name()?.to_str()?;

    let names: Vec<String> = std::fs::read_dir(&dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .collect();

    for ext in VIDEO_EXTENSIONS {
        let wanted = format!("{stem}.{ext}");
        if let Some(name) = names.iter().find(|n| n.eq_ignore_ascii_case(&wanted)) {
            return Some(dir.join(name));
        }
    }
    None
}

/// Content type for a served file, derived from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("ts") => "video/mp2t",
        Some("mp3") => "audio/mpeg",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_path() {
        assert!(is_video_path(Path::new("/v/a.mp4")));
        assert!(is_video_path(Path::new("/v/a.MKV")));
        assert!(!is_video_path(Path::new("/v/a.txt")));
        assert!(!is_video_path(Path::new("/v/noext")));
    }

    #[test]
    fn test_sidecar() {
        assert_eq!(
            sidecar(Path::new("/v/show.mkv"), "txt"),
            PathBuf::from("/v/show.txt")
        );
        assert_eq!(
            sidecar(Path::new("/v/show.part1.mkv"), "meta"),
            PathBuf::from("/v/show.part1.meta")
        );
    }

    #[test]
    fn test_logical_name() {
        assert_eq!(
            logical_name(Path::new("/videos"), Path::new("/videos/tv/ep1.mp4")),
            Some("tv/ep1".to_string())
        );
        assert_eq!(
            logical_name(Path::new("/videos"), Path::new("/other/ep1.mp4")),
            None
        );
    }

    #[test]
    fn test_find_video_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Movie.MP4"), b"x").unwrap();
        let found = find_video(dir.path(), "Movie").unwrap();
        assert_eq!(found.file_name().unwrap(), "Movie.MP4");
    }

    #[test]
    fn test_find_video_prefers_allow_list_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mkv"), b"x").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        let found = find_video(dir.path(), "a").unwrap();
        assert_eq!(found.file_name().unwrap(), "a.mp4");
    }

    #[test]
    fn test_find_video_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tv")).unwrap();
        std::fs::write(dir.path().join("tv/ep.ts"), b"x").unwrap();
        assert!(find_video(dir.path(), "tv/ep").is_some());
        assert!(find_video(dir.path(), "tv/missing").is_none());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(content_type_for(Path::new("a.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
