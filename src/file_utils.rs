use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Timestamp format shared by backups and workspaces
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @formats: Local time as used in output names
    pub fn timestamp(now: DateTime<Local>) -> String {
        now.format(TIMESTAMP_FORMAT).to_string()
    }

    // @generates: `<dir>/<stem>_<timestamp>.<ext>`
    pub fn timestamped_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        timestamp: &str,
    ) -> PathBuf {
        let input_file = input_file.as_ref();

        let mut output_filename = input_file
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        output_filename.push('_');
        output_filename.push_str(timestamp);
        if let Some(ext) = input_file.extension() {
            output_filename.push('.');
            output_filename.push_str(&ext.to_string_lossy());
        }

        output_dir.as_ref().join(output_filename)
    }

    // @returns: First free path, appending `_1`, `_2`... to the stem when taken
    pub fn unique_path(path: PathBuf) -> PathBuf {
        if !path.exists() {
            return path;
        }

        let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let ext = path.extension().map(|e| e.to_string_lossy().to_string());
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut n = 1;
        loop {
            let name = match &ext {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            let candidate = parent.join(name);
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// SHA-256 of a file's contents, as lowercase hex
    pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let mut file = fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?;

        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }

        Ok(hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect())
    }

    /// All files under `dir`, as paths relative to it
    pub fn list_relative_files<P: AsRef<Path>>(dir: P) -> Result<BTreeSet<PathBuf>> {
        let dir = dir.as_ref();
        let mut result = BTreeSet::new();

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            if entry.file_type().is_file() {
                if let Ok(relative) = entry.path().strip_prefix(dir) {
                    result.insert(relative.to_path_buf());
                }
            }
        }

        Ok(result)
    }

    /// Find files with one of the given extensions (case-insensitive) in a file set
    pub fn filter_by_extension<'a>(
        files: impl IntoIterator<Item = &'a PathBuf>,
        extensions: &[&str],
    ) -> Vec<PathBuf> {
        files
            .into_iter()
            .filter(|p| {
                p.extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy();
                        extensions.iter().any(|e| ext.eq_ignore_ascii_case(e))
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Locate a file in a relative set by name, ignoring case and directory
    pub fn find_by_name<'a>(files: &'a BTreeSet<PathBuf>, name: &str) -> Option<&'a PathBuf> {
        // exact relative path wins over a nested match
        files
            .iter()
            .find(|p| p.to_string_lossy().eq_ignore_ascii_case(name))
            .or_else(|| {
                files.iter().find(|p| {
                    p.file_name()
                        .map(|f| f.to_string_lossy().eq_ignore_ascii_case(name))
                        .unwrap_or(false)
                })
            })
    }
}
