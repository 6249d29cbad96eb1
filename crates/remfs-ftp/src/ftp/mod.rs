//! Plaintext FTP client.
//!
//! Module layout:
//! - **types** — settings, replies, server features, raw listing entries
//! - **error** — reply-code → `RemoteError` classification
//! - **protocol** — control-channel codec (commands, multi-line replies)
//! - **connection** — TCP connect + banner
//! - **transfer** — PASV / PORT data channels
//! - **client** — login, FEAT probing, listing, SIZE, NOOP, QUIT
//! - **directory** — MKD / RMD / RNFR+RNTO / DELE / SITE CHMOD
//! - **file_ops** — RETR / STOR streaming
//! - **parser** — LIST / MLSD output parsing
//! - **remote** — `LegacyClient`, the `ProtocolClient` implementation

pub mod client;
pub mod connection;
pub mod directory;
pub mod error;
pub mod file_ops;
pub mod parser;
pub mod protocol;
pub mod remote;
pub mod transfer;
pub mod types;

pub use remote::LegacyClient;
pub use types::*;
