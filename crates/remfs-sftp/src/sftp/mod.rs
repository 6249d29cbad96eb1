// ── remfs-sftp / sftp module ──────────────────────────────────────────────────
//
// SFTP variant of the remfs ProtocolClient:
//   • Session setup (TCP connect, SSH handshake, key / password / agent auth)
//   • Listing with entry normalization
//   • Namespace operations (mkdir, rmdir, rename, unlink, chmod)
//   • Chunked uploads / downloads
//
// libssh2 is blocking; `remote::SecureClient` runs every call on the blocking
// pool while holding the session lock.

pub mod types;
pub mod error;
pub mod session;
pub mod file_ops;
pub mod dir_ops;
pub mod transfer;
pub mod remote;

pub use types::*;
pub use remote::SecureClient;
