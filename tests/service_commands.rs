mod common;

use common::{legacy, secure, MemoryFactory};
use remfs::{
    ConflictChoice, FixedChoice, ListOptions, MemoryClient, MemoryStore, Protocol, RemoteAddress,
    RemoteErrorKind, RemoteFsService, SaveOutcome, Settings, SortMode, TransferStatus,
};
use std::path::Path;
use std::sync::Arc;

fn seeded_tree(protocol: Protocol) -> MemoryClient {
    MemoryClient::new(protocol)
        .with_file("/home/alice/notes.txt", "notes")
        .with_file("/home/alice/.profile", "export X=1")
        .with_file("/home/alice/logs/app.log", "boot")
        .with_file("/home/alice/logs/Error.LOG", "oops")
        .with_dir("/home/alice/projects")
}

async fn service(edit_dir: &Path) -> (RemoteFsService, Arc<MemoryFactory>) {
    let settings = Settings {
        edit_dir: edit_dir.to_path_buf(),
        ..Settings::default()
    };
    let factory = Arc::new(MemoryFactory::seeded(|c| seeded_tree(c.protocol)));
    let svc = RemoteFsService::new(settings, factory.clone(), Arc::new(MemoryStore::new()));
    svc.add_connection(secure("s")).await.unwrap();
    svc.add_connection(legacy("f")).await.unwrap();
    (svc, factory)
}

fn at(addr: &str) -> RemoteAddress {
    addr.parse().unwrap()
}

#[tokio::test]
async fn test_listing_sorts_filters_and_hides() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, _) = service(dir.path()).await;

    let all = svc.list(&at("s:/home/alice"), &ListOptions::default()).await.unwrap();
    let names: Vec<&str> = all.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["logs", "projects", ".profile", "notes.txt"]);

    let visible = ListOptions {
        show_hidden: false,
        sort: SortMode::Type,
        ..ListOptions::default()
    };
    let names: Vec<String> = svc
        .list(&at("s:/home/alice"), &visible)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["logs", "projects", "notes.txt"]);

    let logs_only = ListOptions {
        filter: Some("*.log".into()),
        ..ListOptions::default()
    };
    let names: Vec<String> = svc
        .list(&at("s:/home/alice/logs"), &logs_only)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["app.log"]);
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_returns_files_only() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, _) = service(dir.path()).await;

    let hits = svc.search(&at("f:/home/alice"), "LOG").await.unwrap();
    assert_eq!(hits, vec!["/home/alice/logs/Error.LOG", "/home/alice/logs/app.log"]);

    let err = svc.search(&at("f:/home/alice"), "  ").await.unwrap_err();
    assert!(err.is(RemoteErrorKind::InvalidInput));
}

#[tokio::test]
async fn test_chmod_over_legacy_is_unsupported_but_works_over_secure() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, factory) = service(dir.path()).await;

    let err = svc.chmod(&at("f:/home/alice/notes.txt"), "600").await.unwrap_err();
    assert!(err.is(RemoteErrorKind::Unsupported));

    svc.chmod(&at("s:/home/alice/notes.txt"), "600").await.unwrap();
    let secure_client = &factory.made()[0];
    assert_eq!(secure_client.mode("/home/alice/notes.txt"), Some(0o600));

    let info = svc.file_info(&at("s:/home/alice/notes.txt")).await.unwrap();
    assert_eq!(info.octal, "600");
    assert_eq!(info.size, 5);

    let err = svc.chmod(&at("s:/home/alice/notes.txt"), "9x9").await.unwrap_err();
    assert!(err.is(RemoteErrorKind::InvalidInput));
}

#[tokio::test]
async fn test_file_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, factory) = service(dir.path()).await;
    let remote = factory.made()[0].clone();

    let created = svc.create_file(&at("s:/home/alice"), "empty.txt").await.unwrap();
    assert_eq!(created, "/home/alice/empty.txt");
    assert_eq!(remote.file_contents(&created).unwrap(), b"");
    let err = svc.create_file(&at("s:/home/alice"), "empty.txt").await.unwrap_err();
    assert!(err.is(RemoteErrorKind::AlreadyExists));

    let first = svc.duplicate_file(&at("s:/home/alice/notes.txt")).await.unwrap();
    let second = svc.duplicate_file(&at("s:/home/alice/notes.txt")).await.unwrap();
    assert_eq!(first, "/home/alice/notes-copy.txt");
    assert_eq!(second, "/home/alice/notes-copy-1.txt");
    assert_eq!(remote.file_contents(&second).unwrap(), b"notes");
    let err = svc.duplicate_file(&at("s:/home/alice/logs")).await.unwrap_err();
    assert!(err.is(RemoteErrorKind::InvalidInput));

    let renamed = svc.rename(&at("s:/home/alice/notes-copy.txt"), "draft.txt").await.unwrap();
    assert_eq!(renamed, "/home/alice/draft.txt");
    let moved = svc.move_entry(&at("s:/home/alice/draft.txt"), "/home/alice/projects/").await.unwrap();
    assert_eq!(moved, "/home/alice/projects/draft.txt");
    assert!(remote.exists("/home/alice/projects/draft.txt"));

    svc.delete(&at("s:/home/alice/logs")).await.unwrap();
    assert!(!remote.exists("/home/alice/logs/app.log"));
    svc.delete(&at("s:/home/alice/projects/draft.txt")).await.unwrap();
    let err = svc.delete(&at("s:/home/alice/projects/draft.txt")).await.unwrap_err();
    assert!(err.is(RemoteErrorKind::NotFound));

    svc.mkdir(&at("s:/home/alice/a/b/c"), true).await.unwrap();
    let err = svc.mkdir(&at("s:/home/alice/a"), false).await.unwrap_err();
    assert!(err.is(RemoteErrorKind::AlreadyExists));
}

#[tokio::test]
async fn test_upload_files_picks_unique_names() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, factory) = service(dir.path()).await;
    let remote = factory.made()[1].clone();

    let local_dir = tempfile::tempdir().unwrap();
    let notes = local_dir.path().join("notes.txt");
    let fresh = local_dir.path().join("fresh.md");
    std::fs::write(&notes, "local notes").unwrap();
    std::fs::write(&fresh, "fresh").unwrap();

    let names = svc
        .upload_files(&[notes.clone(), fresh, notes], &at("f:/home/alice"))
        .await
        .unwrap();
    assert_eq!(names, vec!["notes-copy.txt", "fresh.md", "notes-copy-2.txt"]);
    assert_eq!(remote.file_contents("/home/alice/notes.txt").unwrap(), b"notes");
    assert_eq!(remote.file_contents("/home/alice/notes-copy-2.txt").unwrap(), b"local notes");
}

#[tokio::test]
async fn test_single_file_transfers() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, _) = service(dir.path()).await;

    let local = dir.path().join("down").join("notes.txt");
    assert_eq!(svc.download_file(&at("f:/home/alice/notes.txt"), &local).await.unwrap(), 5);
    std::fs::write(&local, "changed!").unwrap();
    assert_eq!(svc.upload_file(&local, &at("f:/home/alice/notes.txt")).await.unwrap(), 8);
}

#[tokio::test]
async fn test_tree_round_trip_through_service() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, factory) = service(dir.path()).await;
    let ctx = svc.transfer_context(Arc::new(FixedChoice(ConflictChoice::Overwrite)));

    let local = dir.path().join("mirror");
    let report = svc.download_tree(&at("s:/home/alice"), &local, &ctx).await.unwrap();
    assert_eq!(report.status, TransferStatus::Completed);
    assert_eq!(report.completed_files, 4);
    assert!(local.join("projects").is_dir());

    let report = svc.upload_tree(&local, &at("f:/backup/alice"), &ctx).await.unwrap();
    assert_eq!(report.completed_files, 4);
    let ftp = factory.made()[1].clone();
    assert_eq!(ftp.file_contents("/backup/alice/logs/Error.LOG").unwrap(), b"oops");
    assert!(ftp.is_dir("/backup/alice/projects"));
}

#[tokio::test]
async fn test_edit_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, factory) = service(dir.path()).await;

    let local = svc.open_for_edit(&at("s:/home/alice/notes.txt")).await.unwrap();
    assert_eq!(local, dir.path().join("s__notes.txt"));
    assert_eq!(svc.open_files().await.len(), 1);

    std::fs::write(&local, "edited").unwrap();
    assert_eq!(svc.save_edit(&local).await.unwrap(), SaveOutcome::Uploaded(6));
    assert_eq!(
        factory.made()[0].file_contents("/home/alice/notes.txt").unwrap(),
        b"edited"
    );

    assert!(svc.close_edit(&local).await);
    assert_eq!(svc.save_edit(&local).await.unwrap(), SaveOutcome::NotTracked);
}

#[tokio::test]
async fn test_commands_on_unknown_connection_fail() {
    let dir = tempfile::tempdir().unwrap();
    let (svc, _) = service(dir.path()).await;
    let err = svc
        .list(&at("nope:/"), &ListOptions::default())
        .await
        .unwrap_err();
    assert!(err.is(RemoteErrorKind::NotFound));

    svc.remove_connection("f").await.unwrap();
    let ids: Vec<String> = svc
        .list_connections()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["s"]);
    svc.shutdown().await;
}
