//! Multi-part assembly.
//!
//! Parts of a base process strictly ascending. Each successful part is
//! transcribed, its timestamps shifted by the duration of everything
//! already merged, appended to the master transcript under a
//! `>>> Part N <<<` header and stream-copy concatenated onto the master
//! video. The part source is deleted only once all of that landed.

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use atci_media::command::resolve_tool;
use atci_media::{concat_videos, ToolRunner};
use atci_models::transcript::{
    line_count, missing_parts_line, part_failed_line, part_header, remove_placeholder_lines,
    shift_timestamps,
};
use atci_models::{sidecar, AtciConfig, Job, PartName};
use atci_queue::Queue;
use atci_store::{Db, PartRecord};

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::{self, write_transcript_atomic};

/// Process one `basename.partN.ext` job.
pub async fn process_part(
    cfg: &AtciConfig,
    db: &Db,
    queue: &Queue,
    video: &Path,
    part: &PartName,
    runner: &ToolRunner,
) -> WorkerResult<()> {
    let dir = video
        .parent()
        .ok_or_else(|| WorkerError::internal("part file has no parent directory"))?;
    let master = part.master_paths(dir);

    // A part may only proceed once every predecessor is recorded.
    if part.number > 1 {
        let missing = db.missing_parts(&part.base, part.number - 1)?;
        if !missing.is_empty() {
            warn!(
                "part {} of {} arrived before part(s) {:?}",
                part.number, part.base, missing
            );
            write_placeholder(&master.transcript, part.number, &missing)?;
            return Err(WorkerError::PartOutOfOrder {
                base: part.base.clone(),
                part: part.number,
                missing,
            });
        }
    }

    // Transcribe the part like any standalone video.
    pipeline::create_transcript(cfg, video, runner).await?;

    // Everything already merged tells us how far to shift this part.
    let ffprobe = resolve_tool("ffprobe", &cfg.ffprobe_path)?;
    let offset = if master.video.is_file() {
        atci_media::probe::probe_duration(&ffprobe, &master.video).await?
    } else {
        0.0
    };

    let part_txt = sidecar(video, "txt");
    let raw = std::fs::read_to_string(&part_txt)?;
    let shifted = shift_timestamps(&raw, offset);
    write_transcript_atomic(&part_txt, &shifted)?;

    append_to_master(&master.transcript, part.number, &shifted)?;

    // Stream-copy the part onto the master video. A failed concat is
    // still recorded so the part is never retried in a loop; the source
    // file stays behind for diagnosis.
    let ffmpeg = resolve_tool("ffmpeg", &cfg.ffmpeg_path)?;
    let inputs: Vec<&Path> = if master.video.is_file() {
        vec![master.video.as_path(), video]
    } else {
        vec![video]
    };
    if let Err(e) = concat_videos(&ffmpeg, &inputs, &master.video, runner).await {
        append_line(&master.transcript, &part_failed_line(part.number, &part.base, &e.to_string()))?;
        db.record_part(&record_for(part, video, &shifted))?;
        return Err(WorkerError::ConcatFailed {
            part: part.number,
            source: e,
        });
    }

    db.record_part(&record_for(part, video, &shifted))?;

    // Master video, master transcript and the part row all landed.
    std::fs::remove_file(video)?;
    for leftover in [part_txt, sidecar(video, "meta")] {
        if leftover.exists() {
            let _ = std::fs::remove_file(&leftover);
        }
    }
    info!("merged part {} into {}", part.number, master.video.display());

    if let Err(e) = pipeline::capture_length(cfg, &master.video).await {
        warn!("failed to refresh master length: {e}");
    }

    // Retroactive fill: a successor may already be waiting on disk.
    let next = dir.join(part.next_file_name());
    if next.is_file() {
        info!("found next part {}", next.display());
        queue.enqueue(&Job::all(next))?;
    }

    Ok(())
}

fn record_for(part: &PartName, video: &Path, transcript: &str) -> PartRecord {
    PartRecord {
        base_name: part.base.clone(),
        part_number: part.number,
        source_path: video.to_path_buf(),
        processed_at: Utc::now(),
        transcript_length: line_count(transcript) as i64,
    }
}

/// Append a part's shifted blocks to the master transcript under its
/// header, dropping any placeholder previously written for this part.
fn append_to_master(master_txt: &Path, n: u32, shifted: &str) -> WorkerResult<()> {
    let existing = if master_txt.is_file() {
        std::fs::read_to_string(master_txt)?
    } else {
        String::new()
    };
    let mut content = remove_placeholder_lines(&existing, n);

    if !content.trim().is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push('\n');
    } else {
        content.clear();
    }
    content.push_str(&part_header(n));
    content.push('\n');
    content.push_str(shifted.trim_start_matches('\n'));
    if !content.ends_with('\n') {
        content.push('\n');
    }

    write_transcript_atomic(master_txt, &content)?;
    Ok(())
}

/// Append one header line to the master transcript.
fn append_line(master_txt: &Path, line: &str) -> WorkerResult<()> {
    let existing = if master_txt.is_file() {
        std::fs::read_to_string(master_txt)?
    } else {
        String::new()
    };
    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    if !content.trim().is_empty() {
        content.push('\n');
    }
    content.push_str(line);
    content.push('\n');
    write_transcript_atomic(master_txt, &content)?;
    Ok(())
}

/// Write the out-of-order placeholder, once.
///
/// Discovery re-finds an unprocessed part every pass, so this must be
/// idempotent: the same placeholder line is never appended twice.
fn write_placeholder(master_txt: &Path, n: u32, missing: &[u32]) -> WorkerResult<()> {
    let line = missing_parts_line(n, missing);
    if master_txt.is_file() {
        let existing = std::fs::read_to_string(master_txt)?;
        if existing.lines().any(|l| l == line) {
            return Ok(());
        }
    }
    append_line(master_txt, &line)
}
