mod common;

use common::ScriptedListings;
use remfs::{
    download_tree, RemoteEntry, upload_tree, CancelToken, ConflictChoice, ConflictPrompt, FixedChoice,
    MemoryClient, Protocol, ProgressUpdate, TransferContext, TransferDirection, TransferStatus,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn build_local_tree(root: &std::path::Path, files: usize) {
    for i in 0..files {
        let sub = root.join(format!("dir{}", i % 3));
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join(format!("f{:02}.bin", i)), vec![i as u8; i + 1]).unwrap();
    }
}

/// Answers Skip All and counts how often it was asked.
struct CountingPrompt(AtomicUsize);

#[async_trait]
impl ConflictPrompt for CountingPrompt {
    async fn ask(&self, _destination: &str) -> Option<ConflictChoice> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Some(ConflictChoice::SkipAll)
    }
}

#[tokio::test]
async fn test_progress_reaches_exactly_100_and_never_decreases() {
    let src = tempfile::tempdir().unwrap();
    build_local_tree(src.path(), 7);
    let client = MemoryClient::new(Protocol::Legacy);

    let updates = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
    let sink = {
        let updates = updates.clone();
        move |u: ProgressUpdate| updates.lock().unwrap().push(u)
    };
    let ctx = TransferContext::new(Arc::new(FixedChoice(ConflictChoice::Overwrite)))
        .with_progress(Arc::new(sink));

    let report = upload_tree(&client, src.path(), "/remote/tree", &ctx).await.unwrap();
    assert_eq!(report.direction, TransferDirection::Upload);
    assert_eq!(report.total_files, 7);

    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 7);
    assert!(updates.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(updates.last().unwrap().percent, 100);
    assert!(updates.iter().all(|u| u.job_id == report.job_id));
    assert!(updates[0].message.starts_with("Uploading "));
}

#[tokio::test]
async fn test_skip_all_asks_once_and_leaves_remote_untouched() {
    let src = tempfile::tempdir().unwrap();
    build_local_tree(src.path(), 6);
    let client = MemoryClient::new(Protocol::Secure)
        .with_file("/t/dir0/f00.bin", "remote")
        .with_file("/t/dir1/f01.bin", "remote")
        .with_file("/t/dir2/f05.bin", "remote");

    let prompt = Arc::new(CountingPrompt(AtomicUsize::new(0)));
    let ctx = TransferContext::new(prompt.clone());
    let report = upload_tree(&client, src.path(), "/t", &ctx).await.unwrap();

    assert_eq!(prompt.0.load(Ordering::SeqCst), 1);
    assert_eq!(report.skipped_files, 3);
    assert_eq!(report.completed_files, 3);
    assert_eq!(client.file_contents("/t/dir2/f05.bin").unwrap(), b"remote");
    assert_eq!(client.put_count(), 3);
}

#[tokio::test]
async fn test_resolver_state_does_not_leak_between_jobs() {
    let src = tempfile::tempdir().unwrap();
    build_local_tree(src.path(), 3);
    let client = MemoryClient::new(Protocol::Secure);

    let prompt = Arc::new(CountingPrompt(AtomicUsize::new(0)));
    let ctx = TransferContext::new(prompt.clone());
    upload_tree(&client, src.path(), "/t", &ctx).await.unwrap();
    assert_eq!(prompt.0.load(Ordering::SeqCst), 0);

    // Second and third jobs each hit conflicts and each asks once.
    upload_tree(&client, src.path(), "/t", &ctx).await.unwrap();
    upload_tree(&client, src.path(), "/t", &ctx).await.unwrap();
    assert_eq!(prompt.0.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_download_cancellation_between_files() {
    let client = MemoryClient::new(Protocol::Legacy)
        .with_file("/data/a.txt", "a")
        .with_file("/data/b.txt", "b")
        .with_file("/data/c.txt", "c");
    let dst = tempfile::tempdir().unwrap();

    let cancel = CancelToken::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = {
        let cancel = cancel.clone();
        let seen = seen.clone();
        move |_u: ProgressUpdate| {
            if seen.fetch_add(1, Ordering::SeqCst) == 1 {
                cancel.cancel();
            }
        }
    };
    let ctx = TransferContext::new(Arc::new(FixedChoice(ConflictChoice::Overwrite)))
        .with_cancel(cancel)
        .with_progress(Arc::new(sink));

    let report = download_tree(&client, "/data", dst.path(), &ctx).await.unwrap();
    assert_eq!(report.status, TransferStatus::Cancelled);
    assert_eq!(report.completed_files, 2);
    assert!(dst.path().join("b.txt").exists());
    assert!(!dst.path().join("c.txt").exists());
}

#[tokio::test]
async fn test_download_ignores_names_that_escape_the_target() {
    let client = ScriptedListings::new(
        MemoryClient::new(Protocol::Legacy).with_file("/srv/ok.txt", "ok"),
    )
    .listing(
        "/srv",
        vec![
            RemoteEntry::file("../escape.txt", 1),
            RemoteEntry::file("/tmp/abs.txt", 1),
            RemoteEntry::directory(".."),
            RemoteEntry::file("ok.txt", 2),
        ],
    );
    let tmp = tempfile::tempdir().unwrap();
    let dst = tmp.path().join("dst");

    let ctx = TransferContext::new(Arc::new(FixedChoice(ConflictChoice::Overwrite)));
    let report = download_tree(&client, "/srv", &dst, &ctx).await.unwrap();

    assert_eq!(report.total_files, 1);
    assert_eq!(report.completed_files, 1);
    assert_eq!(std::fs::read(dst.join("ok.txt")).unwrap(), b"ok");
    assert!(!tmp.path().join("escape.txt").exists());
    let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}
