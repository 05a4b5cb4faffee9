/*!
 * # w3translate - Warcraft III campaign translator
 *
 * A Rust library for translating the text of Warcraft III campaigns and
 * their embedded maps while keeping script-dependent strings consistent.
 *
 * ## Features
 *
 * - Byte-exact `.wts` string table codec with legacy codepage detection
 * - Archive extraction and repacking through the `mpqcli` tool
 * - Protected map detection
 * - Translation through various providers:
 *   - Google Translate
 *   - OpenAI-compatible APIs
 *   - Anthropic API
 * - Identifier synchronization between string tables and map scripts
 * - Verified backups and per-map failure isolation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `string_table`: String table parsing and serialization
 * - `archive`: External archive tool boundary
 * - `protection`: Protected map detection
 * - `translation`: Translation engine and identifier synchronization:
 *   - `translation::engine`: Batching, retries and pacing
 *   - `translation::synchronizer`: Consistent identifier translation
 *   - `translation::script_scan`: Script string literal scanning
 * - `pipeline`: Campaign run orchestration
 * - `providers`: Client implementations for the translation backends
 * - `file_utils`: File system operations
 * - `language_utils`: Supported languages
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod archive;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod pipeline;
pub mod protection;
pub mod providers;
pub mod string_table;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, SyncMode};
pub use archive::{ArchiveTool, MpqCli};
pub use errors::{ArchiveError, FormatError, PipelineError, ProviderError, TranslationError};
pub use language_utils::{Language, get_language_name};
pub use pipeline::{CampaignTranslator, RunOutcome, RunReport};
pub use string_table::{StringEntry, StringTable};
pub use translation::{IdentifierDictionary, IdentifierMapping, TranslationEngine};
