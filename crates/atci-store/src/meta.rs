//! `.meta` sidecar files.
//!
//! One `key: value` per line, keys unique, sorted on write. The sidecar
//! is the authoritative per-video store; the database index only mirrors
//! it.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StoreResult;

/// Read a meta file into a map.
///
/// Missing files yield an empty map; malformed lines are skipped.
pub fn read_meta(path: &Path) -> StoreResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_meta(&content))
}

/// Parse meta content into a map, skipping malformed lines.
pub fn parse_meta(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Serialize a map to meta form: sorted `key: value` lines.
pub fn render_meta(map: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Write a whole meta map, atomically (temp sibling + rename).
pub fn write_meta(path: &Path, map: &BTreeMap<String, String>) -> StoreResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "meta".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&tmp, render_meta(map))?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Read-merge-write a single field.
pub fn update_field(path: &Path, key: &str, value: &str) -> StoreResult<()> {
    let mut map = read_meta(path)?;
    map.insert(key.to_string(), value.to_string());
    write_meta(path, &map)
}

/// Fetch a single field.
pub fn get_field(path: &Path, key: &str) -> StoreResult<Option<String>> {
    Ok(read_meta(path)?.remove(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.meta");
        let mut map = BTreeMap::new();
        map.insert("source".to_string(), "subtitles".to_string());
        map.insert("length".to_string(), "01:02:03".to_string());
        write_meta(&path, &map).unwrap();
        assert_eq!(read_meta(&path).unwrap(), map);
    }

    #[test]
    fn test_sorted_output() {
        let mut map = BTreeMap::new();
        map.insert("source".to_string(), "ggml-base".to_string());
        map.insert("length".to_string(), "00:10:00".to_string());
        map.insert("prompt".to_string(), "names: Ada, Linus".to_string());
        assert_eq!(
            render_meta(&map),
            "length: 00:10:00\nprompt: names: Ada, Linus\nsource: ggml-base\n"
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_meta(&dir.path().join("none.meta")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let map = parse_meta("length: 00:01:00\ngarbage line\n: empty key\nsource: subtitles\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map["length"], "00:01:00");
        assert_eq!(map["source"], "subtitles");
    }

    #[test]
    fn test_value_may_contain_colons() {
        let map = parse_meta("length: 00:01:00\n");
        assert_eq!(map["length"], "00:01:00");
    }

    #[test]
    fn test_update_field_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.meta");
        update_field(&path, "source", "subtitles").unwrap();
        update_field(&path, "length", "00:05:00").unwrap();
        update_field(&path, "source", "ggml-base").unwrap();
        let map = read_meta(&path).unwrap();
        assert_eq!(map["source"], "ggml-base");
        assert_eq!(map["length"], "00:05:00");
        assert_eq!(get_field(&path, "length").unwrap().as_deref(), Some("00:05:00"));
        assert_eq!(get_field(&path, "prompt").unwrap(), None);
    }
}
