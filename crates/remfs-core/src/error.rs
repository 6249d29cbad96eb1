//! Error type shared by every remote-file client and the layers above them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised remote-file error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// Operation that failed (`list`, `put`, `mkdir`, …), if known.
    pub operation: Option<String>,
    /// Remote or local path the operation was acting on.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Connect, authentication or reconnect failure; also use of a closed client.
    Connection,
    /// Path does not exist on the remote (or local) side.
    NotFound,
    /// Target already exists (e.g. non-recursive mkdir).
    AlreadyExists,
    /// Server refused the operation.
    PermissionDenied,
    /// The protocol variant has no way to perform the operation.
    Unsupported,
    /// An opt-in emulation (e.g. `SITE CHMOD`) was attempted and failed.
    EmulationFailed,
    /// Stopped at a cancellation checkpoint.
    Cancelled,
    /// Liveness probe failure; the connection should be rebuilt.
    Transient,
    /// Server sent something we could not interpret, or rejected a command.
    Protocol,
    /// Local I/O failure.
    Io,
    /// Caller supplied an invalid argument or configuration.
    InvalidInput,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            operation: None,
            path: None,
        }
    }

    pub fn with_operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach operation and path only where they are still missing, so the
    /// innermost context wins.
    pub fn context(mut self, op: &str, path: &str) -> Self {
        if self.operation.is_none() {
            self.operation = Some(op.to_string());
        }
        if self.path.is_none() {
            self.path = Some(path.to_string());
        }
        self
    }

    pub fn is(&self, kind: RemoteErrorKind) -> bool {
        self.kind == kind
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Connection, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, msg)
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::AlreadyExists, msg)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::PermissionDenied, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unsupported, msg)
    }

    pub fn emulation_failed(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::EmulationFailed, msg)
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Cancelled, msg)
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, msg)
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Protocol, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Io, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidInput, msg)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}]", self.kind)?;
        if let Some(op) = &self.operation {
            write!(f, " {}", op)?;
        }
        if let Some(path) = &self.path {
            write!(f, " '{}'", path)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for RemoteError {}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let kind = match e.kind() {
            ErrorKind::NotFound => RemoteErrorKind::NotFound,
            ErrorKind::AlreadyExists => RemoteErrorKind::AlreadyExists,
            ErrorKind::PermissionDenied => RemoteErrorKind::PermissionDenied,
            ErrorKind::TimedOut
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => RemoteErrorKind::Connection,
            _ => RemoteErrorKind::Io,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<RemoteError> for String {
    fn from(e: RemoteError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = RemoteError::not_found("no such file")
            .with_operation("get")
            .with_path("/a/b.txt");
        assert_eq!(err.to_string(), "[NotFound] get '/a/b.txt': no such file");
    }

    #[test]
    fn context_keeps_innermost() {
        let err = RemoteError::io("disk full")
            .context("put", "/inner")
            .context("upload_tree", "/outer");
        assert_eq!(err.operation.as_deref(), Some("put"));
        assert_eq!(err.path.as_deref(), Some("/inner"));
    }

    #[test]
    fn io_errors_are_classified() {
        let err: RemoteError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.is(RemoteErrorKind::NotFound));
        let err: RemoteError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(err.is(RemoteErrorKind::Connection));
        let err: RemoteError = std::io::Error::new(std::io::ErrorKind::Other, "x").into();
        assert!(err.is(RemoteErrorKind::Io));
    }
}
