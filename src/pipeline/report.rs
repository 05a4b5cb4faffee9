use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::protection::ProtectionState;
use crate::translation::SyncReport;

/// Steps of a campaign run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Init,
    Backup,
    ExtractCampaign,
    TranslateCampaignTable,
    ExtractMap,
    DetectProtection,
    TranslateMapTable,
    RepackMap,
    RepackCampaign,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Backup => "backup",
            Self::ExtractCampaign => "extract campaign",
            Self::TranslateCampaignTable => "translate campaign strings",
            Self::ExtractMap => "extract map",
            Self::DetectProtection => "detect protection",
            Self::TranslateMapTable => "translate map strings",
            Self::RepackMap => "repack map",
            Self::RepackCampaign => "repack campaign",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Progress notification sent to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct RunProgress {
    pub stage: PipelineStage,
    /// Map being processed, if the stage is map-scoped
    pub map: Option<String>,
    pub maps_done: usize,
    pub maps_total: usize,
}

/// One stage transition
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    pub stage: PipelineStage,
    pub map: Option<String>,
}

/// A map (or the campaign table) that was left untranslated
#[derive(Debug, Clone, PartialEq)]
pub struct MapWarning {
    pub map: String,
    pub stage: PipelineStage,
    pub reason: String,
}

/// Verified copy of the input taken before anything else
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: DateTime<Local>,
    /// SHA-256 of the original, matched by the copy
    pub sha256: String,
}

/// What happened to a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStatus {
    Translated,
    /// Nothing to translate, the map is kept as is
    Unchanged,
    /// A map-scoped error kept the original map
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSummary {
    pub name: String,
    /// Unknown when the map could not be extracted
    pub protection: Option<ProtectionState>,
    pub status: MapStatus,
    pub sync: Option<SyncReport>,
}

/// Trace and results of one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stages: Vec<StageEvent>,
    pub warnings: Vec<MapWarning>,
    pub backup: Option<BackupRecord>,
    pub campaign_table: Option<SyncReport>,
    pub maps: Vec<MapSummary>,
    /// Identifiers resolved over the whole run
    pub identifiers: usize,
}

impl RunReport {
    pub fn record(&mut self, stage: PipelineStage, map: Option<&str>) {
        self.stages.push(StageEvent {
            stage,
            map: map.map(str::to_string),
        });
    }

    pub fn warn(&mut self, map: impl Into<String>, stage: PipelineStage, reason: impl Into<String>) {
        self.warnings.push(MapWarning {
            map: map.into(),
            stage,
            reason: reason.into(),
        });
    }

    /// Distinct stages in the order they were first entered
    pub fn stage_trace(&self) -> Vec<PipelineStage> {
        let mut trace: Vec<PipelineStage> = Vec::new();
        for event in &self.stages {
            if !trace.contains(&event.stage) {
                trace.push(event.stage);
            }
        }
        trace
    }

    pub fn degraded_maps(&self) -> Vec<&str> {
        self.maps
            .iter()
            .filter(|m| m.status == MapStatus::Skipped)
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Entries left untranslated across all tables
    pub fn failed_entries(&self) -> usize {
        self.campaign_table
            .iter()
            .chain(self.maps.iter().filter_map(|m| m.sync.as_ref()))
            .map(|r| r.failures.len())
            .sum()
    }

    /// Human-readable summary listing degraded maps and why
    pub fn summary(&self) -> String {
        let count = |status: MapStatus| self.maps.iter().filter(|m| m.status == status).count();
        let protected = self
            .maps
            .iter()
            .filter(|m| m.protection == Some(ProtectionState::Protected))
            .count();

        let mut out = format!(
            "{} map(s): {} translated, {} unchanged, {} skipped, {} protected; {} identifier(s), {} entr{} left untranslated",
            self.maps.len(),
            count(MapStatus::Translated),
            count(MapStatus::Unchanged),
            count(MapStatus::Skipped),
            protected,
            self.identifiers,
            self.failed_entries(),
            if self.failed_entries() == 1 { "y" } else { "ies" }
        );
        for warning in &self.warnings {
            out.push_str(&format!(
                "\n  {} kept original ({}): {}",
                warning.map, warning.stage, warning.reason
            ));
        }
        out
    }
}

/// Paths produced by a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub backup_path: PathBuf,
    pub translated_path: PathBuf,
    pub protected_map_paths: Vec<PathBuf>,
    pub report: RunReport,
}
