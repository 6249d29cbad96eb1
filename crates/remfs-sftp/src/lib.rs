pub mod sftp;

pub use sftp::{SecureClient, SftpSettings};
