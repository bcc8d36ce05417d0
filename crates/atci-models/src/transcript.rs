//! Transcript grammar and conversions.
//!
//! A transcript is zero or more blocks separated by blank lines; each
//! block is one `HH:MM:SS.mmm --> HH:MM:SS.mmm` line followed by text
//! lines. Master transcripts additionally carry `>>> Part N <<<` headers
//! emitted by the parts assembler.

use std::sync::OnceLock;

use regex::Regex;

use crate::timestamp::{format_seconds_millis, parse_timestamp};

fn timestamp_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2}:\d{2}:\d{2}[.,]\d{3}) --> (\d{2}:\d{2}:\d{2}[.,]\d{3})").unwrap()
    })
}

fn srt_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2}:\d{2}:\d{2}),(\d{3}) --> (\d{2}:\d{2}:\d{2}),(\d{3})").unwrap()
    })
}

fn html_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Whether a line opens a transcript block.
pub fn is_timestamp_line(line: &str) -> bool {
    timestamp_line_regex().is_match(line)
}

/// Number of lines in a transcript.
pub fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Strip inline markup tags from subtitle text.
pub fn strip_html_tags(text: &str) -> String {
    html_tag_regex().replace_all(text, "").to_string()
}

/// Convert SRT content to transcript form.
///
/// Blocks split on blank lines; each needs an index line, a
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` line and at least one text line.
/// Commas become periods, multi-line text joins with single spaces and
/// markup tags are dropped. Unparseable blocks are skipped; zero valid
/// blocks yield an empty transcript.
pub fn convert_srt(content: &str) -> String {
    let cleaned = content.trim().replace('\r', "");
    let blocks: Vec<String> = cleaned
        .split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .filter_map(|block| {
            let lines: Vec<&str> = block.split('\n').collect();
            if lines.len() < 3 {
                return None;
            }
            let caps = srt_timestamp_regex().captures(lines[1])?;
            let text = strip_html_tags(&lines[2..].join(" "));
            Some(format!(
                "{}.{} --> {}.{}\n{}",
                &caps[1], &caps[2], &caps[3], &caps[4], text
            ))
        })
        .collect();

    if blocks.is_empty() {
        String::new()
    } else {
        format!("{}\n", blocks.join("\n\n"))
    }
}

/// Strip the `WEBVTT` header and file-scope metadata lines from VTT
/// output, up to and including the first blank line. Cue blocks pass
/// through untouched.
pub fn strip_vtt_header(content: &str) -> String {
    if !content.trim_start().starts_with("WEBVTT") {
        return content.to_string();
    }
    let mut lines = content.lines();
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }
    let rest: Vec<&str> = lines.collect();
    let mut out = rest.join("\n");
    if !out.is_empty() && content.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Shift every timestamp line in a transcript by `offset` seconds,
/// formatting with millisecond precision.
pub fn shift_timestamps(text: &str, offset: f64) -> String {
    let shifted: Vec<String> = text
        .lines()
        .map(|line| {
            let Some(caps) = timestamp_line_regex().captures(line) else {
                return line.to_string();
            };
            let start = parse_timestamp(&caps[1].replace(',', "."));
            let end = parse_timestamp(&caps[2].replace(',', "."));
            match (start, end) {
                (Ok(s), Ok(e)) => format!(
                    "{} --> {}",
                    format_seconds_millis(s + offset),
                    format_seconds_millis(e + offset)
                ),
                _ => line.to_string(),
            }
        })
        .collect();

    let mut out = shifted.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Truncate a transcript immediately before the first block whose
/// timestamp line contains `needle`. When no block matches, the full
/// content is returned unchanged.
pub fn truncate_before_time(text: &str, needle: &str) -> String {
    let mut cut = None;
    for (offset, line) in line_offsets(text) {
        if is_timestamp_line(line) && line.contains(needle) {
            cut = Some(offset);
            break;
        }
    }
    match cut {
        Some(offset) => text[..offset].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn line_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_inclusive('\n').scan(0usize, |pos, raw| {
        let start = *pos;
        *pos += raw.len();
        Some((start, raw.trim_end_matches(['\n', '\r'])))
    })
}

/// Header line introducing a part's blocks in the master transcript.
pub fn part_header(n: u32) -> String {
    format!(">>> Part {n} <<<")
}

/// Header line recording a failed master-video concatenation.
pub fn part_failed_line(n: u32, base: &str, detail: &str) -> String {
    format!(">>> Part {n} FAILED: {base} <<< {detail}")
}

/// Placeholder line for a part processed before its predecessors.
pub fn missing_parts_line(n: u32, missing: &[u32]) -> String {
    let csv = missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        ">>> Part {n} of video, missing part(s): {csv} <<< Processing paused until missing parts are available."
    )
}

/// Drop placeholder lines previously written for part `n`, collapsing
/// any blank runs they leave behind.
pub fn remove_placeholder_lines(text: &str, n: u32) -> String {
    let prefix = format!(">>> Part {n} of video, missing part(s):");
    let kept: Vec<&str> = text.lines().filter(|l| !l.starts_with(&prefix)).collect();
    let mut out = Vec::with_capacity(kept.len());
    let mut last_blank = true;
    for line in kept {
        let blank = line.trim().is_empty();
        if blank && last_blank {
            continue;
        }
        out.push(line);
        last_blank = blank;
    }
    let mut joined = out.join("\n");
    if !joined.is_empty() {
        joined.push('\n');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:03,500\nHello <i>there</i>\nsecond line\n\n2\n00:00:04,000 --> 00:00:06,000\nWorld\n";

    #[test]
    fn test_convert_srt() {
        let out = convert_srt(SRT);
        assert_eq!(
            out,
            "00:00:01.000 --> 00:00:03.500\nHello there second line\n\n00:00:04.000 --> 00:00:06.000\nWorld\n"
        );
    }

    #[test]
    fn test_convert_srt_skips_malformed_blocks() {
        let out = convert_srt("garbage\n\n1\n00:00:01,000 --> 00:00:02,000\nok\n");
        assert_eq!(out, "00:00:01.000 --> 00:00:02.000\nok\n");
    }

    #[test]
    fn test_convert_srt_empty_when_nothing_parses() {
        assert_eq!(convert_srt("not\nan srt\nat all"), "");
    }

    #[test]
    fn test_strip_vtt_header() {
        let vtt = "WEBVTT\nKind: captions\n\n00:00:00.000 --> 00:00:02.000\nhi\n";
        assert_eq!(
            strip_vtt_header(vtt),
            "00:00:00.000 --> 00:00:02.000\nhi\n"
        );
    }

    #[test]
    fn test_strip_vtt_header_passes_through_plain_text() {
        let plain = "00:00:00.000 --> 00:00:02.000\nhi\n";
        assert_eq!(strip_vtt_header(plain), plain);
    }

    #[test]
    fn test_shift_timestamps() {
        let text = "00:00:00.000 --> 00:00:02.000\nhi\n\n00:09:58.000 --> 00:10:00.000\nbye\n";
        let shifted = shift_timestamps(text, 600.0);
        assert_eq!(
            shifted,
            "00:10:00.000 --> 00:10:02.000\nhi\n\n00:19:58.000 --> 00:20:00.000\nbye\n"
        );
    }

    #[test]
    fn test_shift_keeps_headers_untouched() {
        let text = ">>> Part 2 <<<\n00:00:01.000 --> 00:00:02.000\nhi\n";
        let shifted = shift_timestamps(text, 1.0);
        assert!(shifted.starts_with(">>> Part 2 <<<\n"));
        assert!(shifted.contains("00:00:02.000 --> 00:00:03.000"));
    }

    #[test]
    fn test_truncate_before_time() {
        let text = "00:00:01.000 --> 00:00:02.000\na\n\n00:00:05.000 --> 00:00:06.000\nb\n";
        let out = truncate_before_time(text, "00:00:05");
        assert_eq!(out, "00:00:01.000 --> 00:00:02.000\na");
    }

    #[test]
    fn test_truncate_before_time_no_match_is_noop() {
        let text = "00:00:01.000 --> 00:00:02.000\na\n";
        assert_eq!(truncate_before_time(text, "99:00:00"), text);
    }

    #[test]
    fn test_part_header_lines() {
        assert_eq!(part_header(2), ">>> Part 2 <<<");
        assert_eq!(
            missing_parts_line(3, &[1, 2]),
            ">>> Part 3 of video, missing part(s): 1, 2 <<< Processing paused until missing parts are available."
        );
        assert_eq!(
            part_failed_line(2, "s", "concat exited 1"),
            ">>> Part 2 FAILED: s <<< concat exited 1"
        );
    }

    #[test]
    fn test_remove_placeholder_lines() {
        let text = ">>> Part 1 <<<\n00:00:00.000 --> 00:00:01.000\na\n\n>>> Part 2 of video, missing part(s): 1 <<< Processing paused until missing parts are available.\n";
        let out = remove_placeholder_lines(text, 2);
        assert!(!out.contains("missing part(s)"));
        assert!(out.contains(">>> Part 1 <<<"));
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn test_is_timestamp_line() {
        assert!(is_timestamp_line("00:00:01.000 --> 00:00:02.000"));
        assert!(is_timestamp_line("00:00:01,000 --> 00:00:02,000"));
        assert!(!is_timestamp_line(">>> Part 1 <<<"));
    }
}
