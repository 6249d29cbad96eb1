pub mod ftp;

pub use ftp::{FtpSettings, LegacyClient};
