/*!
 * Campaign translation pipeline.
 *
 * - `orchestrator`: the run itself, stage by stage
 * - `workspace`: verified backup and the temporary working directory
 * - `report`: stage trace, warnings and the run summary
 */

pub mod orchestrator;
pub mod report;
pub mod workspace;

pub use orchestrator::{Campaign, CampaignTranslator, MapUnit, ProgressCallback};
pub use report::{
    BackupRecord, MapStatus, MapSummary, MapWarning, PipelineStage, RunOutcome, RunProgress, RunReport,
    StageEvent,
};
pub use workspace::{Workspace, create_backup};
