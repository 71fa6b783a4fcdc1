//! Local staging tree for downloaded binaries and their extractions.
//!
//! Layout under the staging root: `<id>.<ext>` for the downloaded binary and
//! `<id>/` for the files the converter extracts from it. One document's
//! subtree is only ever touched by the saga currently processing it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

pub struct Staging {
    root: PathBuf,
}

impl Staging {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resets the staging root to an empty directory.
    pub fn prepare(&self) -> io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)
    }

    /// Path the source binary is downloaded to.
    pub fn binary_path(&self, document_id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", document_id, extension))
    }

    /// Directory the converter extracts into.
    pub fn extraction_dir(&self, document_id: &str) -> PathBuf {
        self.root.join(document_id)
    }

    /// Enumerates the extracted files for a document. Sorted by file name so
    /// the order is stable for the rest of the run.
    pub fn extracted_files(&self, document_id: &str) -> io::Result<Vec<PathBuf>> {
        let dir = self.extraction_dir(document_id);
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Best-effort removal of one document's staging artifacts. Leftover
    /// files are only logged; the document's outcome is already decided by
    /// the time this runs.
    pub fn cleanup_document(&self, document_id: &str, extension: &str) {
        let binary = self.binary_path(document_id, extension);
        if let Err(e) = fs::remove_file(&binary) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove staged binary '{}': {}", binary.display(), e);
            }
        }

        let dir = self.extraction_dir(document_id);
        if let Err(e) = fs::remove_dir_all(&dir) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove extraction directory '{}': {}",
                    dir.display(),
                    e
                );
            }
        }
    }
}
