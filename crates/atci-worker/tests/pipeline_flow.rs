//! Cross-crate flows that need only the store and the filesystem: queue
//! lifecycle over a real database file, discovery ordering against a
//! fixture tree, and the out-of-order part placeholder.

use std::sync::Arc;

use atci_models::{AtciConfig, Job};
use atci_queue::{CancelRegistry, Queue};
use atci_store::Db;
use atci_worker::scan_watch_roots;

fn disk_queue(dir: &std::path::Path) -> (Arc<Db>, Queue) {
    let db = Arc::new(Db::open(&dir.join("atci.db")).unwrap());
    let queue = Queue::new(Arc::clone(&db));
    (db, queue)
}

fn cfg_with_root(root: &std::path::Path) -> AtciConfig {
    AtciConfig {
        watch_directories: vec![root.to_path_buf()],
        ffmpeg_path: "ffmpeg".into(),
        ffprobe_path: "ffprobe".into(),
        ..Default::default()
    }
}

#[test]
fn queue_state_survives_reopen_and_clears_current() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("atci.db");

    {
        let db = Arc::new(Db::open(&db_path).unwrap());
        let queue = Queue::new(db);
        queue.enqueue(&Job::all("/v/a.mp4")).unwrap();
        queue.enqueue(&Job::all("/v/b.mp4")).unwrap();
        queue.promote_head().unwrap();
        // Process "crashes" here with a job in flight.
    }

    let db = Arc::new(Db::open(&db_path).unwrap());
    let queue = Queue::new(db);
    queue.recover_startup().unwrap();

    // The interrupted job is gone from the slot and not re-enqueued.
    assert!(queue.peek_current().unwrap().is_none());
    let pending = queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].path, std::path::PathBuf::from("/v/b.mp4"));
}

#[test]
fn discovery_fills_queue_in_order_and_promotes_once() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("shows")).unwrap();
    std::fs::write(dir.path().join("shows/z.mp4"), b"v").unwrap();
    std::fs::write(dir.path().join("shows/a.mp4"), b"v").unwrap();
    std::fs::write(dir.path().join("movie.mkv"), b"v").unwrap();

    let (_db, queue) = disk_queue(dir.path());
    let cfg = cfg_with_root(dir.path());

    scan_watch_roots(&cfg, &queue).unwrap();
    queue.promote_head().unwrap();

    let current = queue.peek_current().unwrap().unwrap();
    // Lexicographic order puts the root-level movie first.
    assert_eq!(current.job.path, dir.path().join("movie.mkv"));

    // Repeat scans add nothing and never double-promote.
    scan_watch_roots(&cfg, &queue).unwrap();
    assert!(queue.promote_head().unwrap().is_none());
    assert_eq!(queue.pending().unwrap().len(), 2);
}

#[tokio::test]
async fn out_of_order_part_writes_placeholder_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let part3 = dir.path().join("s.part3.mkv");
    std::fs::write(&part3, b"v").unwrap();

    let (db, queue) = disk_queue(dir.path());
    let cfg = cfg_with_root(dir.path());
    let job = Job::all(&part3);

    let err = atci_worker::processor::process_one(&cfg, &db, &queue, &job)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        atci_worker::WorkerError::PartOutOfOrder { part: 3, .. }
    ));

    // Exactly the placeholder line, nothing else.
    let master_txt = std::fs::read_to_string(dir.path().join("s.txt")).unwrap();
    assert_eq!(
        master_txt,
        ">>> Part 3 of video, missing part(s): 1, 2 <<< Processing paused until missing parts are available.\n"
    );
    // No master video, source retained, no part rows.
    assert!(!dir.path().join("s.mkv").exists());
    assert!(part3.exists());
    assert_eq!(db.part_count("s").unwrap(), 0);

    // A second attempt stays idempotent.
    let _ = atci_worker::processor::process_one(&cfg, &db, &queue, &job).await;
    let again = std::fs::read_to_string(dir.path().join("s.txt")).unwrap();
    assert_eq!(again, master_txt);
}

#[test]
fn cancel_current_keeps_pending_intact() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, queue) = disk_queue(dir.path());
    let cancel = CancelRegistry::new();

    queue.enqueue(&Job::all("/v/c.mp4")).unwrap();
    queue.enqueue(&Job::all("/v/d.mp4")).unwrap();
    queue.promote_head().unwrap();

    let rx = cancel.register();
    assert!(queue.cancel_current(&cancel).unwrap());
    assert!(*rx.borrow());
    assert!(queue.peek_current().unwrap().is_none());

    // The next pending entry was not consumed by the cancel.
    let promoted = queue.promote_head().unwrap().unwrap();
    assert_eq!(promoted.path, std::path::PathBuf::from("/v/d.mp4"));
}
