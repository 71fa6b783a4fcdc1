//! Append-only per-category failure ledger.
//!
//! Each run writes one file per failure category under its log directory,
//! one line per failed document. The ledger is write-only during a run;
//! operators inspect the files afterwards.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;

/// Categories of failure recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Document excluded from selection: no retrievable binary version.
    MissingBinary,
    /// Binary download failed.
    Fetch,
    /// Extraction of the staged binary failed.
    Convert,
    /// Uploading an extracted file failed.
    Upload,
    /// Copying the parent's sharing entries failed.
    Link,
    /// The source document's metadata update failed.
    Finalize,
    /// Derived documents could not be deleted after a failed saga.
    Compensation,
    /// A reversal step failed for one document.
    Reversal,
}

impl FailureCategory {
    /// Stable file name for this category's ledger file.
    pub fn file_name(self) -> &'static str {
        match self {
            FailureCategory::MissingBinary => "missing_binary.log",
            FailureCategory::Fetch => "fetch_errors.log",
            FailureCategory::Convert => "convert_errors.log",
            FailureCategory::Upload => "upload_errors.log",
            FailureCategory::Link => "link_errors.log",
            FailureCategory::Finalize => "finalize_errors.log",
            FailureCategory::Compensation => "compensation_errors.log",
            FailureCategory::Reversal => "reversal_errors.log",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureCategory::MissingBinary => "missingBinary",
            FailureCategory::Fetch => "fetch",
            FailureCategory::Convert => "convert",
            FailureCategory::Upload => "upload",
            FailureCategory::Link => "link",
            FailureCategory::Finalize => "finalize",
            FailureCategory::Compensation => "compensationFailure",
            FailureCategory::Reversal => "reversalFailure",
        };
        f.write_str(name)
    }
}

/// Per-run failure ledger rooted at the run's log directory.
pub struct RunLedger {
    dir: PathBuf,
}

impl RunLedger {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Appends one line for a failed document. A ledger write failure is
    /// itself only logged; the ledger must never fail a run.
    pub fn record(&self, category: FailureCategory, document_id: &str, detail: &str) {
        // Keep one entry per line even when the error detail spans lines.
        let detail = detail.replace(['\n', '\r'], " ");
        let path = self.path_for(category);

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{}: {}", document_id, detail));

        if let Err(e) = result {
            warn!(
                "Failed to append to ledger file '{}': {}",
                path.display(),
                e
            );
        }
    }

    /// Path of one category's ledger file.
    pub fn path_for(&self, category: FailureCategory) -> PathBuf {
        self.dir.join(category.file_name())
    }
}
