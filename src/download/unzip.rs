//! Extraction of downloaded ZIP archives.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Folder, inside the item folder, archives are extracted to.
pub const UNZIP_DIR: &str = "unzipped";

#[derive(Debug, Error)]
pub enum UnzipError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl UnzipError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extracts `archive` into `dest`, returning the number of files written.
///
/// Entries whose names would escape `dest` are skipped. Blocking.
///
/// # Errors
///
/// Returns [`UnzipError`] when the archive is unreadable or a file cannot be written.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, UnzipError> {
    let file = File::open(archive).map_err(|e| UnzipError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| UnzipError::Archive {
        path: archive.to_path_buf(),
        source,
    })?;
    std::fs::create_dir_all(dest).map_err(|e| UnzipError::io(dest, e))?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|source| UnzipError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(archive = %archive.display(), name = entry.name(), "skipping unsafe entry");
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| UnzipError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| UnzipError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| UnzipError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| UnzipError::io(&target, e))?;
        written += 1;
    }
    debug!(archive = %archive.display(), files = written, "archive extracted");
    Ok(written)
}
