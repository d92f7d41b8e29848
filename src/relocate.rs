//! Post-processing relocation: every processed file is moved into a success
//! or failure area so nothing eligible is ever left behind in the input.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Moves processed files into the success or failure directory.
pub struct Relocator {
    success_dir: PathBuf,
    failure_dir: PathBuf,
}

impl Relocator {
    pub fn new(success_dir: impl Into<PathBuf>, failure_dir: impl Into<PathBuf>) -> Self {
        Self {
            success_dir: success_dir.into(),
            failure_dir: failure_dir.into(),
        }
    }

    /// Moves `path` into the directory selected by `succeeded`, creating the
    /// destination directory if it does not exist yet. Returns the final
    /// location. Errors are for the caller to log; they are never fatal to
    /// the run.
    pub fn relocate(&self, path: &Path, succeeded: bool) -> io::Result<PathBuf> {
        let dest_dir = if succeeded {
            &self.success_dir
        } else {
            &self.failure_dir
        };
        fs::create_dir_all(dest_dir)?;

        let file_name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
        })?;
        let dest = dest_dir.join(file_name);

        // Rename first; fall back to copy+remove for cross-device moves.
        if fs::rename(path, &dest).is_err() {
            debug!(src = %path.display(), dest = %dest.display(), "Rename failed, copying");
            fs::copy(path, &dest)?;
            fs::remove_file(path)?;
        }

        info!(
            src = %path.display(),
            dest = %dest.display(),
            succeeded,
            "Relocated file"
        );
        Ok(dest)
    }
}
