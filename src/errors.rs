/*!
 * Error types for the w3translate library.
 *
 * This module contains custom error types for the different stages of a
 * campaign translation run, using the thiserror crate for ergonomic error
 * definitions. Each enum maps to one failure scope: a single string table,
 * a single archive-tool invocation, a translation backend call, or the
 * whole run.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while parsing or mutating a string table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A `STRING` line without a numeric id
    #[error("line {line}: STRING block has no numeric id")]
    MissingId {
        /// 1-based line number
        line: usize,
    },

    /// Missing opening brace, nested opening brace or unterminated body
    #[error("line {line}: unbalanced braces ({reason})")]
    UnbalancedBraces {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// A closing delimiter followed by other characters inside a body
    #[error("line {line}: stray closing delimiter inside string body")]
    StrayDelimiter {
        /// 1-based line number
        line: usize,
    },

    /// The same id appears twice in one table
    #[error("duplicate string id {id}")]
    DuplicateId {
        /// The repeated id
        id: u32,
    },

    /// A line that belongs to no block
    #[error("line {line}: unexpected content outside of a STRING block")]
    UnexpectedLine {
        /// 1-based line number
        line: usize,
    },

    /// New text would break the block structure when serialized
    #[error("text for string {id} contains a block delimiter line")]
    DelimiterInText {
        /// Id of the entry being updated
        id: u32,
    },

    /// Update targeted an id that is not in the table
    #[error("string id {id} not found")]
    UnknownId {
        /// The missing id
        id: u32,
    },
}

/// Errors that can occur at the external archive tool boundary
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Extraction did not finish in time
    #[error("extraction of {archive:?} timed out after {timeout:?}")]
    ExtractionTimeout {
        archive: PathBuf,
        timeout: Duration,
    },

    /// The tool exited with a failure status during extraction
    #[error("extraction of {archive:?} failed (exit status {status}): {output}")]
    ExtractionFailed {
        archive: PathBuf,
        status: String,
        output: String,
    },

    /// Repacking did not finish in time
    #[error("repack into {archive:?} timed out after {timeout:?}")]
    RepackTimeout {
        archive: PathBuf,
        timeout: Duration,
    },

    /// The tool exited with a failure status, or produced nothing, during repack
    #[error("repack into {archive:?} failed (exit status {status}): {output}")]
    RepackFailed {
        archive: PathBuf,
        status: String,
        output: String,
    },

    /// A configured listfile is missing on disk
    #[error("listfile not found: {0:?}")]
    MissingListfile(PathBuf),

    /// The archive tool itself cannot be executed
    #[error("archive tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Local filesystem failure around a tool invocation
    #[error("archive I/O error: {0}")]
    Io(String),
}

impl ArchiveError {
    /// Whether this error must abort the whole run instead of a single map
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolUnavailable(_))
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend answered with a different number of texts than it was given
    #[error("expected {expected} translations, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl ProviderError {
    /// Whether another attempt could succeed; bad credentials never will
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::AuthenticationError(_))
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Every retry attempt for a text failed
    #[error("translation of item {index} failed after {attempts} attempts: {source}")]
    Failure {
        /// Position of the offending text in the submitted batch
        index: usize,
        /// The offending source text
        text: String,
        /// Attempts made before giving up
        attempts: u32,
        /// Last backend error
        #[source]
        source: ProviderError,
    },
}

/// Errors that end a campaign run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input archive does not exist
    #[error("input archive not found: {0:?}")]
    InputNotFound(PathBuf),

    /// The backup could not be created or verified
    #[error("backup failed: {0}")]
    Backup(String),

    /// Output or workspace storage failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Campaign-level or fatal archive tool failure
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}
