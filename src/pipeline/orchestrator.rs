/*!
 * Campaign run orchestration.
 *
 * A run takes a verified backup, extracts the campaign into a temporary
 * workspace, translates the campaign string table and then each embedded map
 * in turn, and repacks the result into the translated output root. One
 * identifier mapping spans the whole run, so an identifier shared between
 * maps translates the same everywhere.
 *
 * Maps are unpacked right after the campaign, before any translation, so
 * the campaign table is checked against every map script.
 *
 * Map-scoped failures leave that map verbatim and are reported; a missing
 * archive tool, storage failures and campaign-level archive failures end the
 * run.
 */

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, error, info, warn};

use crate::app_config::{Config, SyncMode};
use crate::archive::{ArchiveTool, MpqCli};
use crate::errors::{ArchiveError, PipelineError};
use crate::file_utils::FileManager;
use crate::language_utils::Language;
use crate::pipeline::report::{
    MapStatus, MapSummary, PipelineStage, RunOutcome, RunProgress, RunReport,
};
use crate::pipeline::workspace::{Workspace, create_backup};
use crate::protection::{self, Classification, ProtectionState};
use crate::providers;
use crate::string_table::{StringTable, encoding};
use crate::translation::synchronizer::{self, IdentifierSynchronizer, SyncReport};
use crate::translation::{IdentifierDictionary, IdentifierMapping, ScriptKind, ScriptSource, TranslationEngine};

const CAMPAIGN_TABLE: &str = "war3campaign.wts";
const MAP_TABLE: &str = "war3map.wts";
const MAP_EXTENSIONS: [&str; 2] = ["w3x", "w3m"];
/// Sibling text files rewritten with the identifier mapping
const TEXT_EXTENSIONS: [&str; 1] = ["txt"];

/// Callback receiving progress notifications
pub type ProgressCallback = dyn Fn(RunProgress) + Send + Sync;

/// One map of the campaign after processing
#[derive(Debug, Clone)]
pub struct MapUnit {
    /// Path inside the campaign
    pub path: PathBuf,
    pub protection: ProtectionState,
    pub table: Option<StringTable>,
    pub script: Option<ScriptSource>,
    pub sync: Option<SyncReport>,
    /// Whether the map archive was rebuilt
    pub modified: bool,
}

/// The extracted campaign and the maps processed so far
#[derive(Debug, Clone)]
pub struct Campaign {
    pub archive_path: PathBuf,
    pub table: Option<StringTable>,
    pub maps: Vec<MapUnit>,
}

impl Campaign {
    pub fn protected_maps(&self) -> impl Iterator<Item = &MapUnit> {
        self.maps
            .iter()
            .filter(|m| m.protection == ProtectionState::Protected)
    }
}

/// A map unpacked into the workspace, waiting for its turn
struct PreparedMap {
    dir: PathBuf,
    files: BTreeSet<PathBuf>,
    classification: Classification,
    script: Option<(ScriptSource, encoding::Decoded)>,
}

/// Why a map was left untranslated
enum MapFailure {
    Skipped { stage: PipelineStage, reason: String },
    Fatal(PipelineError),
}

impl MapFailure {
    fn skipped(stage: PipelineStage, reason: impl ToString) -> Self {
        Self::Skipped {
            stage,
            reason: reason.to_string(),
        }
    }

    fn archive(stage: PipelineStage, error: ArchiveError) -> Self {
        if error.is_fatal() {
            Self::Fatal(PipelineError::Archive(error))
        } else {
            Self::skipped(stage, error)
        }
    }
}

/// Report plus progress forwarding for one run
struct RunState<'p> {
    report: RunReport,
    progress: Option<&'p ProgressCallback>,
    maps_done: usize,
    maps_total: usize,
}

impl RunState<'_> {
    fn enter(&mut self, stage: PipelineStage, map: Option<&str>) {
        debug!("Stage: {}{}", stage, map.map(|m| format!(" ({})", m)).unwrap_or_default());
        self.report.record(stage, map);
        if let Some(progress) = self.progress {
            progress(RunProgress {
                stage,
                map: map.map(str::to_string),
                maps_done: self.maps_done,
                maps_total: self.maps_total,
            });
        }
    }
}

/// Drives a whole campaign run
pub struct CampaignTranslator {
    config: Config,
    archive: Arc<dyn ArchiveTool>,
    engine: TranslationEngine,
    dictionary: IdentifierDictionary,
}

impl CampaignTranslator {
    pub fn new(
        config: Config,
        archive: Arc<dyn ArchiveTool>,
        engine: TranslationEngine,
        dictionary: IdentifierDictionary,
    ) -> Self {
        Self {
            config,
            archive,
            engine,
            dictionary,
        }
    }

    /// Build the translator the configuration describes: `mpqcli`, the
    /// configured backend and the identifier dictionary
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let archive = Arc::new(MpqCli::new(
            config.archive.tool_path.clone(),
            config.archive.listfile_path.clone(),
        ));
        let backend = providers::create_backend(&config.translation)?;
        let engine = TranslationEngine::from_config(backend, &config.translation.common);

        let dictionary = match &config.identifiers.dictionary_path {
            Some(path) => IdentifierDictionary::load(path)
                .with_context(|| format!("Failed to load identifier dictionary {:?}", path))?,
            None => IdentifierDictionary::builtin(),
        }
        .with_blacklist(config.identifiers.blacklist.iter().cloned());

        Ok(Self::new(config, archive, engine, dictionary))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    pub async fn translate_campaign(
        &self,
        archive: &Path,
        source: Language,
        target: Language,
        mode: SyncMode,
    ) -> Result<RunOutcome, PipelineError> {
        self.translate_campaign_with_progress(archive, source, target, mode, None)
            .await
    }

    /// Translate `archive`, reporting stage transitions to `progress`
    pub async fn translate_campaign_with_progress(
        &self,
        archive: &Path,
        source: Language,
        target: Language,
        mode: SyncMode,
        progress: Option<&ProgressCallback>,
    ) -> Result<RunOutcome, PipelineError> {
        let mut state = RunState {
            report: RunReport::default(),
            progress,
            maps_done: 0,
            maps_total: 0,
        };
        state.enter(PipelineStage::Init, None);

        if !FileManager::file_exists(archive) {
            state.enter(PipelineStage::Failed, None);
            return Err(PipelineError::InputNotFound(archive.to_path_buf()));
        }

        let now = Local::now();
        state.enter(PipelineStage::Backup, None);
        let backup = match create_backup(archive, &self.config.output.backup_dir, now) {
            Ok(backup) => backup,
            Err(e) => {
                error!("Backup failed, nothing was changed: {}", e);
                state.enter(PipelineStage::Failed, None);
                return Err(e);
            }
        };
        let backup_path = backup.backup_path.clone();
        state.report.backup = Some(backup);

        let workspace = match Workspace::create(
            &self.config.output.work_root,
            archive,
            &FileManager::timestamp(now),
        ) {
            Ok(workspace) => workspace,
            Err(e) => {
                state.enter(PipelineStage::Failed, None);
                return Err(e);
            }
        };

        let sync = IdentifierSynchronizer::new(&self.engine, &self.dictionary, mode, source, target);
        let mut mapping = IdentifierMapping::new();
        let result = self
            .run_in_workspace(archive, &workspace, &sync, &mut mapping, &mut state)
            .await;
        state.report.identifiers = mapping.len();

        state.enter(PipelineStage::Cleanup, None);
        workspace.cleanup();

        match result {
            Ok((translated_path, protected_map_paths)) => {
                state.enter(PipelineStage::Done, None);
                info!("Translated campaign written to {:?}", translated_path);
                Ok(RunOutcome {
                    backup_path,
                    translated_path,
                    protected_map_paths,
                    report: state.report,
                })
            }
            Err(e) => {
                error!("Run aborted: {}", e);
                state.enter(PipelineStage::Failed, None);
                Err(e)
            }
        }
    }

    async fn run_in_workspace(
        &self,
        archive: &Path,
        workspace: &Workspace,
        sync: &IdentifierSynchronizer<'_>,
        mapping: &mut IdentifierMapping,
        state: &mut RunState<'_>,
    ) -> Result<(PathBuf, Vec<PathBuf>), PipelineError> {
        let campaign_name = file_name(archive);
        let campaign_dir = workspace.campaign_dir();
        FileManager::ensure_dir(&campaign_dir).map_err(storage)?;

        state.enter(PipelineStage::ExtractCampaign, None);
        let files = self
            .archive
            .extract(archive, &campaign_dir, self.timeout())
            .await?;
        info!("Extracted {} file(s) from {}", files.len(), campaign_name);

        let mut campaign = Campaign {
            archive_path: archive.to_path_buf(),
            table: None,
            maps: Vec::new(),
        };

        let maps = FileManager::filter_by_extension(&files, &MAP_EXTENSIONS);
        state.maps_total = maps.len();
        info!("Campaign contains {} map(s)", maps.len());

        let mut prepared = Vec::with_capacity(maps.len());
        for (index, relative) in maps.iter().enumerate() {
            match self
                .prepare_map(&campaign_dir, relative, index + 1, workspace, sync.source())
                .await
            {
                Err(MapFailure::Fatal(e)) => return Err(e),
                outcome => prepared.push(outcome),
            }
        }
        let scripts: Vec<&ScriptSource> = prepared
            .iter()
            .filter_map(|p| p.as_ref().ok())
            .filter_map(|p| p.script.as_ref().map(|(source, _)| source))
            .collect();

        state.enter(PipelineStage::TranslateCampaignTable, None);
        if let Some(relative) = FileManager::find_by_name(&files, CAMPAIGN_TABLE) {
            let path = campaign_dir.join(relative);
            match read_table(&path, sync.source()) {
                Ok(mut table) => {
                    let report = sync.synchronize_with_scripts(&mut table, &scripts, mapping).await;
                    fs::write(&path, table.serialize())
                        .map_err(|e| PipelineError::Storage(format!("cannot write {:?}: {}", path, e)))?;
                    state.report.campaign_table = Some(report);
                    campaign.table = Some(table);
                }
                Err(reason) => {
                    warn!("Campaign string table left untranslated: {}", reason);
                    state
                        .report
                        .warn(&campaign_name, PipelineStage::TranslateCampaignTable, reason);
                }
            }
        } else {
            debug!("{} has no {}", campaign_name, CAMPAIGN_TABLE);
        }

        for ((index, relative), map) in maps.iter().enumerate().zip(prepared) {
            let name = file_name(relative);
            match self
                .process_map(&campaign_dir, relative, index + 1, map, workspace, sync, mapping, state)
                .await
            {
                Ok(unit) => {
                    state.report.maps.push(MapSummary {
                        name,
                        protection: Some(unit.protection),
                        status: if unit.modified {
                            MapStatus::Translated
                        } else {
                            MapStatus::Unchanged
                        },
                        sync: unit.sync.clone(),
                    });
                    campaign.maps.push(unit);
                }
                Err(MapFailure::Skipped { stage, reason }) => {
                    warn!("Keeping {} untranslated ({}): {}", name, stage, reason);
                    state.report.warn(&name, stage, reason);
                    state.report.maps.push(MapSummary {
                        name,
                        protection: None,
                        status: MapStatus::Skipped,
                        sync: None,
                    });
                }
                Err(MapFailure::Fatal(e)) => return Err(e),
            }
            state.maps_done += 1;
        }

        let protected_map_paths = self.copy_protected_maps(&campaign, &campaign_dir)?;

        state.enter(PipelineStage::RepackCampaign, None);
        FileManager::ensure_dir(&self.config.output.translated_dir).map_err(storage)?;
        let out = FileManager::unique_path(self.config.output.translated_dir.join(&campaign_name));
        let contents: Vec<PathBuf> = FileManager::list_relative_files(&campaign_dir)
            .map_err(storage)?
            .into_iter()
            .collect();
        let translated_path = self
            .archive
            .repack(&campaign_dir, &contents, &out, self.timeout())
            .await?;

        Ok((translated_path, protected_map_paths))
    }

    /// Unpack a map and read its script; translation waits for `process_map`
    async fn prepare_map(
        &self,
        campaign_dir: &Path,
        relative: &Path,
        index: usize,
        workspace: &Workspace,
        source: Language,
    ) -> Result<PreparedMap, MapFailure> {
        let map_path = campaign_dir.join(relative);
        let dir = workspace.map_dir(index, relative);
        FileManager::ensure_dir(&dir).map_err(|e| MapFailure::Fatal(storage(e)))?;

        let files = self
            .archive
            .extract(&map_path, &dir, self.timeout())
            .await
            .map_err(|e| MapFailure::archive(PipelineStage::ExtractMap, e))?;

        let classification = protection::classify(&files);
        let script = match &classification.script_path {
            Some(script_relative) => Some(
                read_script(&dir.join(script_relative), source)
                    .map_err(|e| MapFailure::skipped(PipelineStage::DetectProtection, format!("{:#}", e)))?,
            ),
            None => None,
        };

        Ok(PreparedMap {
            dir,
            files,
            classification,
            script,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_map(
        &self,
        campaign_dir: &Path,
        relative: &Path,
        index: usize,
        prepared: Result<PreparedMap, MapFailure>,
        workspace: &Workspace,
        sync: &IdentifierSynchronizer<'_>,
        mapping: &mut IdentifierMapping,
        state: &mut RunState<'_>,
    ) -> Result<MapUnit, MapFailure> {
        let name = file_name(relative);
        let map_path = campaign_dir.join(relative);

        state.enter(PipelineStage::ExtractMap, Some(&name));
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(MapFailure::Skipped {
                stage: PipelineStage::DetectProtection,
                reason,
            }) => {
                state.enter(PipelineStage::DetectProtection, Some(&name));
                return Err(MapFailure::skipped(PipelineStage::DetectProtection, reason));
            }
            Err(failure) => return Err(failure),
        };
        let PreparedMap {
            dir: map_dir,
            files,
            classification,
            script,
        } = prepared;

        state.enter(PipelineStage::DetectProtection, Some(&name));
        info!("{} is {}", name, classification.state);

        state.enter(PipelineStage::TranslateMapTable, Some(&name));
        let mut unit = MapUnit {
            path: relative.to_path_buf(),
            protection: classification.state,
            table: None,
            script: None,
            sync: None,
            modified: false,
        };

        // a map without its own table still rewrites script literals the campaign table resolved
        let table_path = FileManager::find_by_name(&files, MAP_TABLE).map(|p| map_dir.join(p));
        let mut report = SyncReport::default();
        let mut table = None;
        match &table_path {
            Some(table_path) => {
                let mut parsed = read_table(table_path, sync.source())
                    .map_err(|reason| MapFailure::skipped(PipelineStage::TranslateMapTable, reason))?;
                report = sync
                    .synchronize(&mut parsed, script.as_ref().map(|(source, _)| source), mapping)
                    .await;
                fs::write(table_path, parsed.serialize())
                    .map_err(|e| MapFailure::skipped(PipelineStage::TranslateMapTable, e))?;
                table = Some(parsed);
            }
            None => info!("{} has no {}", name, MAP_TABLE),
        }

        let mut text_replacements = 0;
        if let (Some((source, decoded)), Some(script_relative)) = (&script, &classification.script_path) {
            let (rewritten, replaced) = synchronizer::rewrite_script(&source.text, source.kind, mapping);
            if replaced > 0 {
                let bytes = encoding::encode(&rewritten, decoded.encoding, decoded.bom);
                fs::write(map_dir.join(script_relative), bytes)
                    .map_err(|e| MapFailure::skipped(PipelineStage::TranslateMapTable, e))?;
                report.script_replacements = replaced;
            }
            text_replacements = self
                .rewrite_text_files(&map_dir, &files, mapping, sync.source())
                .map_err(|e| MapFailure::skipped(PipelineStage::TranslateMapTable, format!("{:#}", e)))?;
        }

        if table.is_none() && report.script_replacements == 0 && text_replacements == 0 {
            info!("Nothing to translate in {}, keeping it as is", name);
            unit.script = script.map(|(source, _)| source);
            return Ok(unit);
        }

        state.enter(PipelineStage::RepackMap, Some(&name));
        let contents: Vec<PathBuf> = files.iter().cloned().collect();
        let repacked = workspace.output_dir().join(format!("{:03}_{}", index, name));
        FileManager::ensure_dir(workspace.output_dir()).map_err(|e| MapFailure::Fatal(storage(e)))?;
        self.archive
            .repack(&map_dir, &contents, &repacked, self.timeout())
            .await
            .map_err(|e| MapFailure::archive(PipelineStage::RepackMap, e))?;

        // same filesystem, so the original is replaced atomically or not at all
        fs::rename(&repacked, &map_path).map_err(|e| MapFailure::skipped(PipelineStage::RepackMap, e))?;

        unit.table = table;
        unit.script = script.map(|(source, _)| source);
        unit.sync = Some(report);
        unit.modified = true;
        Ok(unit)
    }

    fn rewrite_text_files(
        &self,
        map_dir: &Path,
        files: &BTreeSet<PathBuf>,
        mapping: &IdentifierMapping,
        source: Language,
    ) -> Result<usize> {
        let mut total = 0;
        for relative in FileManager::filter_by_extension(files, &TEXT_EXTENSIONS) {
            let path = map_dir.join(&relative);
            let bytes = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
            let decoded = encoding::decode_for(&bytes, Some(source));
            let (text, replaced) = synchronizer::apply_to_text(&decoded.text, mapping);
            if replaced > 0 {
                debug!("{} identifier(s) replaced in {:?}", replaced, relative);
                fs::write(&path, encoding::encode(&text, decoded.encoding, decoded.bom))
                    .with_context(|| format!("Failed to write {:?}", path))?;
                total += replaced;
            }
        }
        Ok(total)
    }

    fn copy_protected_maps(&self, campaign: &Campaign, campaign_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let mut paths = Vec::new();
        for unit in campaign.protected_maps() {
            let target = FileManager::unique_path(self.config.output.protected_dir.join(file_name(&unit.path)));
            FileManager::copy_file(campaign_dir.join(&unit.path), &target).map_err(storage)?;
            info!("Protected map copied to {:?}", target);
            paths.push(target);
        }
        Ok(paths)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.archive.timeout_secs)
    }
}

fn read_table(path: &Path, source: Language) -> Result<StringTable, String> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {:?}: {}", path, e))?;
    StringTable::parse_for(&bytes, source).map_err(|e| format!("{:?}: {}", path.file_name().unwrap_or_default(), e))
}

fn read_script(path: &Path, source: Language) -> Result<(ScriptSource, encoding::Decoded)> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read script {:?}", path))?;
    let decoded = encoding::decode_for(&bytes, Some(source));
    let source = ScriptSource::new(ScriptKind::from_path(path), decoded.text.clone());
    Ok((source, decoded))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn storage(error: anyhow::Error) -> PipelineError {
    PipelineError::Storage(format!("{:#}", error))
}
