//! Multi-part video file name grammar.
//!
//! A part is named `<base>.part<N>.<ext>` with N >= 1 and a non-empty
//! base. The grammar anchors at the end of the file name, so with nested
//! occurrences only the last `.partN.` counts.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

fn part_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<base>.+)\.part(?P<n>\d+)\.(?P<ext>[^.]+)$").unwrap())
}

/// Parsed `<base>.part<N>.<ext>` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartName {
    pub base: String,
    pub number: u32,
    pub extension: String,
}

/// Master artifact paths for a part series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPaths {
    pub video: PathBuf,
    pub transcript: PathBuf,
    pub meta: PathBuf,
}

/// Parse a path as a multi-part video name.
///
/// Returns `None` for non-parts: a stem that is exactly `partN` (no
/// base), `part0`, or anything not matching the grammar.
pub fn parse_part(path: &Path) -> Option<PartName> {
    let name = path.file_name()?.to_str()?;
    let caps = part_regex().captures(name)?;
    let number: u32 = caps["n"].parse().ok()?;
    if number == 0 {
        return None;
    }
    Some(PartName {
        base: caps["base"].to_string(),
        number,
        extension: caps["ext"].to_string(),
    })
}

impl PartName {
    /// Render the file name this part parses from.
    pub fn file_name(&self) -> String {
        format!("{}.part{}.{}", self.base, self.number, self.extension)
    }

    /// File name of the next part in the series.
    pub fn next_file_name(&self) -> String {
        format!("{}.part{}.{}", self.base, self.number + 1, self.extension)
    }

    /// Master video/transcript/meta paths in `dir`.
    pub fn master_paths(&self, dir: &Path) -> MasterPaths {
        MasterPaths {
            video: dir.join(format!("{}.{}", self.base, self.extension)),
            transcript: dir.join(format!("{}.txt", self.base)),
            meta: dir.join(format!("{}.meta", self.base)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_part_valid() {
        let part = parse_part(Path::new("/v/episode01.part1.mkv")).unwrap();
        assert_eq!(part.base, "episode01");
        assert_eq!(part.number, 1);
        assert_eq!(part.extension, "mkv");
    }

    #[test]
    fn test_parse_part_complex_base() {
        let part = parse_part(Path::new("/v/show_s01e05_720p.part3.mp4")).unwrap();
        assert_eq!(part.base, "show_s01e05_720p");
        assert_eq!(part.number, 3);
    }

    #[test]
    fn test_parse_part_rejects_plain_video() {
        assert!(parse_part(Path::new("/v/regular.mkv")).is_none());
    }

    #[test]
    fn test_parse_part_rejects_bare_part_stem() {
        // No base before ".partN" means this is not a part.
        assert!(parse_part(Path::new("/v/part3.mkv")).is_none());
    }

    #[test]
    fn test_parse_part_rejects_part_zero() {
        assert!(parse_part(Path::new("/v/a.part0.mkv")).is_none());
    }

    #[test]
    fn test_parse_part_last_occurrence_wins() {
        let part = parse_part(Path::new("/v/a.part1.part2.mkv")).unwrap();
        assert_eq!(part.base, "a.part1");
        assert_eq!(part.number, 2);
    }

    #[test]
    fn test_round_trip() {
        for (base, n, ext) in [("a", 1u32, "mkv"), ("b.c", 12, "mp4"), ("x y", 3, "ts")] {
            let name = PartName {
                base: base.to_string(),
                number: n,
                extension: ext.to_string(),
            };
            let parsed = parse_part(Path::new(&name.file_name())).unwrap();
            assert_eq!(parsed, name);
        }
    }

    #[test]
    fn test_master_paths() {
        let part = parse_part(Path::new("/videos/episode01.part1.mkv")).unwrap();
        let master = part.master_paths(Path::new("/videos"));
        assert_eq!(master.video, PathBuf::from("/videos/episode01.mkv"));
        assert_eq!(master.transcript, PathBuf::from("/videos/episode01.txt"));
        assert_eq!(master.meta, PathBuf::from("/videos/episode01.meta"));
    }

    #[test]
    fn test_next_file_name() {
        let part = parse_part(Path::new("/v/s.part2.mkv")).unwrap();
        assert_eq!(part.next_file_name(), "s.part3.mkv");
    }
}
