// ── libssh2 error → RemoteError ──────────────────────────────────────────────

use remfs_core::{RemoteError, RemoteErrorKind};
use ssh2::ErrorCode;

// SFTP status codes (draft-ietf-secsh-filexfer-02 + libssh2 extensions).
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_OP_UNSUPPORTED: i32 = 8;
const FX_NO_SUCH_PATH: i32 = 10;
const FX_FILE_ALREADY_EXISTS: i32 = 11;
const FX_WRITE_PROTECT: i32 = 12;
const FX_NO_CONNECTION: i32 = 6;
const FX_CONNECTION_LOST: i32 = 7;

pub(crate) fn kind_of(e: &ssh2::Error) -> RemoteErrorKind {
    match e.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH) => {
            RemoteErrorKind::NotFound
        }
        ErrorCode::SFTP(FX_PERMISSION_DENIED) | ErrorCode::SFTP(FX_WRITE_PROTECT) => {
            RemoteErrorKind::PermissionDenied
        }
        ErrorCode::SFTP(FX_FILE_ALREADY_EXISTS) => RemoteErrorKind::AlreadyExists,
        ErrorCode::SFTP(FX_OP_UNSUPPORTED) => RemoteErrorKind::Unsupported,
        ErrorCode::SFTP(FX_NO_CONNECTION) | ErrorCode::SFTP(FX_CONNECTION_LOST) => {
            RemoteErrorKind::Connection
        }
        ErrorCode::SFTP(_) => RemoteErrorKind::Protocol,
        // Negative libssh2 session codes: socket, timeout, channel failures.
        ErrorCode::Session(_) => RemoteErrorKind::Connection,
    }
}

pub(crate) fn from_ssh(e: ssh2::Error) -> RemoteError {
    RemoteError::new(kind_of(&e), e.message().to_string())
}
