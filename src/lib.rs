//! # remfs
//!
//! Browse, edit and transfer files on remote hosts over SFTP ("secure") or
//! plain FTP ("legacy") through one uniform set of operations.
//!
//! - **registry** — one live client per saved connection, probe-and-reconnect
//! - **transfer** — recursive upload/download with progress and cancellation
//! - **conflict** — per-job overwrite/skip decisions
//! - **search** — recursive, case-insensitive file-name search
//! - **open_files** — remote files opened for local editing
//! - **store** — persisted connection configs
//! - **service** — `RemoteFsService`, the command surface for front ends
//! - **settings** / **logging** — runtime configuration and tracing setup
//!
//! The protocol clients live in `remfs-sftp` and `remfs-ftp`; the shared
//! model and the `ProtocolClient` trait in `remfs-core`.

pub mod conflict;
pub mod logging;
pub mod open_files;
pub mod progress;
pub mod registry;
pub mod search;
pub mod service;
pub mod settings;
pub mod store;
pub mod transfer;

pub use conflict::{ConflictChoice, ConflictMode, ConflictPrompt, ConflictResolver, FixedChoice, Resolution};
pub use open_files::{OpenFileInfo, OpenFileTracker, SaveOutcome};
pub use progress::{CancelToken, NoProgress, ProgressSink, ProgressUpdate};
pub use registry::{ClientFactory, ConnectionRegistry, NativeClientFactory};
pub use service::{FileInfo, ListOptions, RemoteFsService, RemoteFsServiceState};
pub use settings::{LogSettings, Settings};
pub use store::{JsonFileStore, MemoryStore, SecretStore};
pub use transfer::{
    download_tree, upload_tree, TransferContext, TransferDirection, TransferReport,
    TransferStatus,
};

pub use remfs_core::{
    ConnectionConfig, Credential, EntryKind, MemoryClient, Protocol, ProtocolClient,
    RemoteAddress, RemoteEntry, RemoteError, RemoteErrorKind, RemoteResult, SortMode,
};
pub use remfs_ftp::LegacyClient;
pub use remfs_sftp::SecureClient;
