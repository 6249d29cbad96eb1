//! # remfs-core
//!
//! Shared building blocks for the remfs remote-file clients:
//!
//! - **config** — `ConnectionConfig`, `Protocol`, `Credential`
//! - **entry** — normalized `RemoteEntry` listings and sort helpers
//! - **error** — `RemoteError` / `RemoteErrorKind`
//! - **client** — the `ProtocolClient` trait both variants implement
//! - **path** — POSIX path helpers and `connection:/path` addresses
//! - **memory** — an in-memory `ProtocolClient`

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod memory;
pub mod path;

pub use client::ProtocolClient;
pub use config::{ConnectionConfig, Credential, PermissionHints, Protocol};
pub use entry::{
    mode_to_permissions, permissions_to_octal, sort_entries, EntryKind, RemoteEntry, SortMode,
};
pub use error::{RemoteError, RemoteErrorKind, RemoteResult};
pub use memory::MemoryClient;
pub use path::RemoteAddress;
