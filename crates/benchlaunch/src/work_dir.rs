use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Switches the process into a directory and switches back when dropped.
///
/// The original directory is restored on every exit path, including early
/// returns and unwinding, so callers never restore it by hand.
pub struct WorkDir {
    pub path: PathBuf,
    original: PathBuf,
}

impl WorkDir {
    pub fn enter<P: AsRef<Path>>(path: P) -> io::Result<WorkDir> {
        let original = env::current_dir()?;
        env::set_current_dir(path.as_ref())?;
        tracing::debug!(
            "changed directory from {} to {}",
            original.display(),
            path.as_ref().display()
        );
        Ok(WorkDir {
            path: path.as_ref().to_path_buf(),
            original,
        })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.original) {
            tracing::error!(
                "failed to restore working directory {}: {}",
                self.original.display(),
                e
            );
        }
    }
}
