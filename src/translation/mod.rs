/*!
 * Translation of string tables.
 *
 * - `engine`: backend calls with retry and pacing
 * - `retry`: the backoff policy and the clock it sleeps on
 * - `identifiers`: the identifier dictionary and the run-scoped mapping
 * - `script_scan`: string literal scanning of map scripts
 * - `synchronizer`: consistent translation of identifiers shared with scripts
 */

pub mod engine;
pub mod identifiers;
pub mod retry;
pub mod script_scan;
pub mod synchronizer;

pub use crate::app_config::SyncMode;
pub use engine::{JobOutcome, Pacing, TranslationEngine, TranslationFailure, TranslationJob};
pub use identifiers::{IdentifierDictionary, IdentifierMapping};
pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use script_scan::{ScriptKind, ScriptSource};
pub use synchronizer::{EntryFailure, IdentifierSynchronizer, SyncReport};
