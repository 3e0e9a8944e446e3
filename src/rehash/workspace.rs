// Per-job scratch directory. Removed on drop, so every exit path cleans up.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::constants::JOB_DIR_PREFIX;
use crate::error::{Result, VidshiftError};

#[derive(Debug)]
pub struct JobWorkspace {
    id: String,
    dir: PathBuf,
    removed: bool,
}

impl JobWorkspace {
    /// Create `{root}/job_{uuid}`.
    pub fn create(root: &Path) -> Result<Self> {
        let id = format!("{}{}", JOB_DIR_PREFIX, Uuid::new_v4().simple());
        let dir = root.join(&id);
        std::fs::create_dir_all(&dir)?;
        log::debug!("Created workspace {}", dir.display());
        Ok(Self { id, dir, removed: false })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove now and report failure. Drop only logs.
    pub fn cleanup(mut self) -> Result<()> {
        self.removed = true;
        remove(&self.dir)
    }
}

fn remove(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(dir)
        .map_err(|e| VidshiftError::Cleanup(format!("Failed to remove {}: {}", dir.display(), e)))
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove(&self.dir) {
            log::warn!("{}", e);
        }
    }
}
