use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::file_utils::FileManager;

/// Script sources that make a map fully editable, in lookup order
pub const SCRIPT_CANDIDATES: [&str; 3] = ["war3map.j", "scripts/war3map.j", "war3map.lua"];

/// Whether a map exposes its script source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionState {
    Clean,
    Protected,
}

impl fmt::Display for ProtectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Protected => write!(f, "protected"),
        }
    }
}

/// Classification of one extracted map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: ProtectionState,
    /// Relative path of the script source, when present
    pub script_path: Option<PathBuf>,
}

impl Classification {
    pub fn is_protected(&self) -> bool {
        self.state == ProtectionState::Protected
    }
}

/// Classify a map from its extracted file set.
/// Protected maps have had their script stripped or obfuscated away.
pub fn classify(files: &BTreeSet<PathBuf>) -> Classification {
    let script_path = SCRIPT_CANDIDATES
        .iter()
        .find_map(|candidate| {
            files
                .iter()
                .find(|f| normalize(f).eq_ignore_ascii_case(candidate))
        })
        .cloned();

    Classification {
        state: if script_path.is_some() {
            ProtectionState::Clean
        } else {
            ProtectionState::Protected
        },
        script_path,
    }
}

/// Classify an already extracted map directory
pub fn classify_dir(dir: &Path) -> Result<Classification> {
    Ok(classify(&FileManager::list_relative_files(dir)?))
}

// Extracted names may use either separator
fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
