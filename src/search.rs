//! Recursive file-name search over one connection.

use futures::future::BoxFuture;
use futures::FutureExt;
use remfs_core::{path, ProtocolClient};

/// Full paths of every file under `root` whose name contains `keyword`,
/// ignoring case. Directories are walked but never returned. A directory
/// that cannot be listed contributes nothing and is logged.
pub async fn search(client: &dyn ProtocolClient, root: &str, keyword: &str) -> Vec<String> {
    let needle = keyword.to_lowercase();
    let mut hits = Vec::new();
    walk(client, root.to_string(), &needle, &mut hits).await;
    tracing::debug!(root, keyword, hits = hits.len(), "search finished");
    hits
}

fn walk<'a>(
    client: &'a dyn ProtocolClient,
    dir: String,
    needle: &'a str,
    hits: &'a mut Vec<String>,
) -> BoxFuture<'a, ()> {
    async move {
        let entries = match client.list(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir, error = %e, "search could not list directory");
                return;
            }
        };

        for entry in entries {
            let full = path::join(&dir, &entry.name);
            if entry.is_directory() {
                walk(client, full, needle, hits).await;
            } else if entry.name.to_lowercase().contains(needle) {
                hits.push(full);
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use remfs_core::{MemoryClient, Protocol};

    fn tree() -> MemoryClient {
        MemoryClient::new(Protocol::Secure)
            .with_file("/srv/Report.TXT", "")
            .with_file("/srv/notes.md", "")
            .with_file("/srv/reports/q1-report.csv", "")
            .with_file("/srv/reports/summary.txt", "")
    }

    #[tokio::test]
    async fn matches_case_insensitively_and_skips_directories() {
        let client = tree();
        let hits = search(&client, "/srv", "REPORT").await;
        assert_eq!(hits, vec!["/srv/Report.TXT", "/srv/reports/q1-report.csv"]);
    }

    #[tokio::test]
    async fn unlistable_root_yields_nothing() {
        let client = tree();
        assert!(search(&client, "/missing", "x").await.is_empty());
    }

    #[tokio::test]
    async fn empty_keyword_matches_every_file() {
        let client = tree();
        assert_eq!(search(&client, "/srv", "").await.len(), 4);
    }
}
