//! Binary-to-parts conversion.

mod mail;

pub use mail::{extract_mail_timestamp, MailConverter, BODY_FILE_NAME};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur converting a staged message binary.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read message '{path}': {source}")]
    ReadBinary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Failed to write extracted file '{path}': {source}")]
    WriteExtracted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns one staged message binary into a directory of extracted files.
pub trait Converter: Send + Sync {
    /// Populates `out_dir` with the message body text and attachments.
    /// Produces zero or more files, or fails without touching the store.
    fn convert(&self, binary_path: &Path, out_dir: &Path) -> Result<(), ConvertError>;
}
