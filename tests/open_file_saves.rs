use async_trait::async_trait;
use remfs::{
    MemoryClient, OpenFileTracker, Protocol, ProtocolClient, RemoteEntry, RemoteResult,
    SaveOutcome,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;

/// Wraps a `MemoryClient` so that `put` parks until the test releases it.
struct GatedClient {
    inner: MemoryClient,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ProtocolClient for GatedClient {
    fn protocol(&self) -> Protocol {
        self.inner.protocol()
    }
    async fn list(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        self.inner.list(path).await
    }
    async fn get(&self, remote: &str, local: &Path) -> RemoteResult<u64> {
        self.inner.get(remote, local).await
    }
    async fn put(&self, local: &Path, remote: &str) -> RemoteResult<u64> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.put(local, remote).await
    }
    async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.inner.delete(path).await
    }
    async fn mkdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        self.inner.mkdir(path, recursive).await
    }
    async fn rmdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        self.inner.rmdir(path, recursive).await
    }
    async fn rename(&self, from: &str, to: &str) -> RemoteResult<()> {
        self.inner.rename(from, to).await
    }
    async fn chmod(&self, path: &str, mode: u32) -> RemoteResult<()> {
        self.inner.chmod(path, mode).await
    }
    async fn probe(&self) -> RemoteResult<()> {
        self.inner.probe().await
    }
    async fn close(&self) -> RemoteResult<()> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn test_overlapping_saves_upload_once() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = Arc::new(OpenFileTracker::new(dir.path()));
    let client = Arc::new(GatedClient {
        inner: MemoryClient::new(Protocol::Secure).with_file("/srv/page.html", "<p>v1</p>"),
        entered: Notify::new(),
        release: Notify::new(),
    });

    let local = tracker
        .open("web", "/srv/page.html", client.clone())
        .await
        .unwrap();
    std::fs::write(&local, "<p>v2</p>").unwrap();

    let first = {
        let tracker = tracker.clone();
        let local = local.clone();
        tokio::spawn(async move { tracker.save(&local).await })
    };
    client.entered.notified().await;

    // The first upload is parked inside `put`.
    assert_eq!(tracker.save(&local).await.unwrap(), SaveOutcome::Dropped);

    client.release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Uploaded(9));
    assert_eq!(client.inner.put_count(), 1);
    assert_eq!(client.inner.file_contents("/srv/page.html").unwrap(), b"<p>v2</p>");

    // Once the first upload is done, saving works again.
    let again = {
        let tracker = tracker.clone();
        let local = local.clone();
        tokio::spawn(async move { tracker.save(&local).await })
    };
    client.entered.notified().await;
    client.release.notify_one();
    assert_eq!(again.await.unwrap().unwrap(), SaveOutcome::Uploaded(9));
    assert_eq!(client.inner.put_count(), 2);
}

#[tokio::test]
async fn test_untracked_save_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = OpenFileTracker::new(dir.path());
    let stray = dir.path().join("stray.txt");
    std::fs::write(&stray, "x").unwrap();
    assert_eq!(tracker.save(&stray).await.unwrap(), SaveOutcome::NotTracked);
}
