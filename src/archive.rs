/*!
 * External archive tool boundary.
 *
 * The container format is never read here. `ArchiveTool` exposes the two
 * capabilities the pipeline needs, and `MpqCli` provides them by running the
 * `mpqcli` executable as a timeout-bounded subprocess and mapping its exit
 * status and output to `ArchiveError`.
 */

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

use crate::errors::ArchiveError;
use crate::file_utils::FileManager;

/// Extract/repack capability over an opaque archive container
#[async_trait]
pub trait ArchiveTool: Send + Sync {
    /// Extract `archive` into `dest_dir` and return the extracted files relative to it
    async fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<BTreeSet<PathBuf>, ArchiveError>;

    /// Pack `files` (relative to `src_dir`) into `out_archive`
    async fn repack(
        &self,
        src_dir: &Path,
        files: &[PathBuf],
        out_archive: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, ArchiveError>;
}

/// Which side of the boundary a command belongs to, for error mapping
#[derive(Debug, Clone, Copy)]
enum Operation {
    Extract,
    Repack,
}

/// Result of one tool invocation
enum Outcome {
    Success,
    Failed { status: String, output: String },
    TimedOut,
}

/// `mpqcli` subprocess implementation
#[derive(Debug, Clone)]
pub struct MpqCli {
    tool_path: PathBuf,
    listfile_path: Option<PathBuf>,
}

impl MpqCli {
    pub fn new(tool_path: impl Into<PathBuf>, listfile_path: Option<PathBuf>) -> Self {
        Self {
            tool_path: tool_path.into(),
            listfile_path,
        }
    }

    // A bare program name is resolved through PATH at spawn time
    fn check_tool(&self) -> Result<(), ArchiveError> {
        let has_dir = self.tool_path.components().count() > 1;
        if has_dir && !self.tool_path.is_file() {
            return Err(ArchiveError::ToolUnavailable(format!(
                "{:?} not found",
                self.tool_path
            )));
        }
        Ok(())
    }

    fn listfile_args(&self) -> Result<Vec<String>, ArchiveError> {
        match &self.listfile_path {
            Some(listfile) if !listfile.is_file() => {
                Err(ArchiveError::MissingListfile(listfile.clone()))
            }
            Some(listfile) => Ok(vec!["-f".to_string(), listfile.to_string_lossy().to_string()]),
            None => Ok(Vec::new()),
        }
    }

    async fn run(&self, args: &[String], timeout: Duration, op: Operation) -> Result<Outcome, ArchiveError> {
        self.check_tool()?;
        debug!("Running {:?} {}", self.tool_path, args.join(" "));

        let child = Command::new(&self.tool_path)
            .args(args)
            .kill_on_drop(true)
            .output();

        // Dropping the losing future kills the child
        let output = tokio::select! {
            result = child => match result {
                Ok(output) => output,
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                    return Err(ArchiveError::ToolUnavailable(format!("{:?}: {}", self.tool_path, e)));
                }
                Err(e) => return Err(ArchiveError::Io(format!("{:?} {:?}: {}", self.tool_path, op, e))),
            },
            _ = tokio::time::sleep(timeout) => {
                error!("{:?} {:?} timed out after {:?}", self.tool_path, op, timeout);
                return Ok(Outcome::TimedOut);
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if output.status.success() {
            if !combined.is_empty() {
                debug!("Tool output: {}", combined);
            }
            Ok(Outcome::Success)
        } else {
            Ok(Outcome::Failed {
                status: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                output: combined,
            })
        }
    }
}

#[async_trait]
impl ArchiveTool for MpqCli {
    async fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<BTreeSet<PathBuf>, ArchiveError> {
        FileManager::ensure_dir(dest_dir).map_err(|e| ArchiveError::Io(e.to_string()))?;

        let mut args = vec![
            "extract".to_string(),
            archive.to_string_lossy().to_string(),
            "-o".to_string(),
            dest_dir.to_string_lossy().to_string(),
        ];
        args.extend(self.listfile_args()?);

        match self.run(&args, timeout, Operation::Extract).await? {
            Outcome::Success => {}
            Outcome::TimedOut => {
                return Err(ArchiveError::ExtractionTimeout {
                    archive: archive.to_path_buf(),
                    timeout,
                });
            }
            Outcome::Failed { status, output } => {
                return Err(ArchiveError::ExtractionFailed {
                    archive: archive.to_path_buf(),
                    status,
                    output,
                });
            }
        }

        FileManager::list_relative_files(dest_dir).map_err(|e| ArchiveError::Io(e.to_string()))
    }

    async fn repack(
        &self,
        src_dir: &Path,
        files: &[PathBuf],
        out_archive: &Path,
        timeout: Duration,
    ) -> Result<PathBuf, ArchiveError> {
        if let Some(missing) = files.iter().find(|f| !src_dir.join(f).is_file()) {
            return Err(ArchiveError::RepackFailed {
                archive: out_archive.to_path_buf(),
                status: "not started".to_string(),
                output: format!("{:?} is missing from {:?}", missing, src_dir),
            });
        }
        if let Some(parent) = out_archive.parent() {
            FileManager::ensure_dir(parent).map_err(|e| ArchiveError::Io(e.to_string()))?;
        }

        let mut args = vec![
            "create".to_string(),
            out_archive.to_string_lossy().to_string(),
            src_dir.to_string_lossy().to_string(),
        ];
        args.extend(self.listfile_args()?);

        match self.run(&args, timeout, Operation::Repack).await? {
            Outcome::Success if out_archive.is_file() => Ok(out_archive.to_path_buf()),
            Outcome::Success => Err(ArchiveError::RepackFailed {
                archive: out_archive.to_path_buf(),
                status: "0".to_string(),
                output: "tool reported success but wrote no archive".to_string(),
            }),
            Outcome::TimedOut => Err(ArchiveError::RepackTimeout {
                archive: out_archive.to_path_buf(),
                timeout,
            }),
            Outcome::Failed { status, output } => Err(ArchiveError::RepackFailed {
                archive: out_archive.to_path_buf(),
                status,
                output,
            }),
        }
    }
}
