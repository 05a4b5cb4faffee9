/*!
 * Run-scoped storage: the verified backup and the temporary workspace.
 */

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use tempfile::TempDir;

use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::pipeline::report::BackupRecord;

/// Copy `input` to `<backup_dir>/<stem>_<timestamp>.<ext>` and verify the copy by digest
pub fn create_backup(input: &Path, backup_dir: &Path, now: DateTime<Local>) -> Result<BackupRecord, PipelineError> {
    let timestamp = FileManager::timestamp(now);
    let backup_path = FileManager::unique_path(FileManager::timestamped_path(input, backup_dir, &timestamp));

    let original = FileManager::sha256_file(input).map_err(|e| PipelineError::Backup(format!("{:#}", e)))?;
    FileManager::copy_file(input, &backup_path).map_err(|e| PipelineError::Backup(format!("{:#}", e)))?;
    let copy = FileManager::sha256_file(&backup_path).map_err(|e| PipelineError::Backup(format!("{:#}", e)))?;

    if original != copy {
        return Err(PipelineError::Backup(format!(
            "digest of {:?} does not match the original",
            backup_path
        )));
    }

    info!("Backup written to {:?}", backup_path);
    Ok(BackupRecord {
        original_path: input.to_path_buf(),
        backup_path,
        timestamp: now,
        sha256: original,
    })
}

/// Temporary directory holding everything extracted during one run.
/// Removed on drop, so every exit path cleans up.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create `temp_<stem>_<timestamp>_<random>` under `work_root`
    pub fn create(work_root: &Path, archive: &Path, timestamp: &str) -> Result<Self, PipelineError> {
        FileManager::ensure_dir(work_root).map_err(|e| PipelineError::Storage(format!("{:#}", e)))?;

        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "campaign".to_string());
        let dir = tempfile::Builder::new()
            .prefix(&format!("temp_{}_{}_", stem, timestamp))
            .tempdir_in(work_root)
            .map_err(|e| PipelineError::Storage(format!("cannot create workspace in {:?}: {}", work_root, e)))?;

        debug!("Workspace created at {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Extracted campaign contents
    pub fn campaign_dir(&self) -> PathBuf {
        self.path().join("campaign")
    }

    /// Extracted contents of the `index`-th map
    pub fn map_dir(&self, index: usize, map: &Path) -> PathBuf {
        let stem = map
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.path().join("maps").join(format!("{:03}_{}", index, stem))
    }

    /// Repacked archives before they replace their originals
    pub fn output_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    /// Remove the workspace now, reporting failures instead of ignoring them
    pub fn cleanup(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Workspace {:?} removed", path),
            Err(e) => warn!("Failed to remove workspace {:?}: {}", path, e),
        }
    }
}
