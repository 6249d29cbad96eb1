//! Mapping FTP replies onto `RemoteError`.

use remfs_core::{RemoteError, RemoteErrorKind};

/// Classify a negative FTP reply into the most appropriate error kind.
pub fn from_reply(code: u16, text: &str) -> RemoteError {
    let kind = match code {
        421 => RemoteErrorKind::Connection,
        430 | 530 => RemoteErrorKind::Connection,
        450 | 550 | 553 => classify_file_reply(text),
        502 | 504 => RemoteErrorKind::Unsupported,
        _ => RemoteErrorKind::Protocol,
    };
    RemoteError::new(kind, text.to_string())
}

fn classify_file_reply(text: &str) -> RemoteErrorKind {
    let lower = text.to_lowercase();
    if lower.contains("not found")
        || lower.contains("no such")
        || lower.contains("does not exist")
        || lower.contains("doesn't exist")
    {
        RemoteErrorKind::NotFound
    } else if lower.contains("exist") {
        RemoteErrorKind::AlreadyExists
    } else if lower.contains("permission") || lower.contains("denied") {
        RemoteErrorKind::PermissionDenied
    } else {
        RemoteErrorKind::Protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_file_replies() {
        assert!(from_reply(550, "550 /x: File exists").is(RemoteErrorKind::AlreadyExists));
        assert!(from_reply(550, "550 /x: No such file or directory").is(RemoteErrorKind::NotFound));
        assert!(from_reply(550, "550 Directory does not exist").is(RemoteErrorKind::NotFound));
        assert!(from_reply(550, "550 Permission denied").is(RemoteErrorKind::PermissionDenied));
        assert!(from_reply(550, "550 Failed").is(RemoteErrorKind::Protocol));
    }

    #[test]
    fn classifies_session_and_command_replies() {
        assert!(from_reply(421, "421 Timeout").is(RemoteErrorKind::Connection));
        assert!(from_reply(530, "530 Login incorrect").is(RemoteErrorKind::Connection));
        assert!(from_reply(502, "502 Command not implemented").is(RemoteErrorKind::Unsupported));
        assert!(from_reply(501, "501 Syntax error").is(RemoteErrorKind::Protocol));
    }
}
