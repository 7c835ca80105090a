//! Output types for pcrex commands
//!
//! Every command result serializes to JSON; the text formatter reads the same structs.

use serde::{Deserialize, Serialize};

/// A single capture group within a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    /// Group number, starting at 1
    pub group: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub text: String,
    /// Start byte position
    pub start: usize,
    /// End byte position (exclusive)
    pub end: usize,
}

/// A single match result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Participating capture groups only
    pub captures: Vec<Capture>,
}

/// Result of `pcrex test`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub pattern: String,
    /// Whether the pattern carried a study plan
    pub studied: bool,
    pub groups: usize,
    /// Length of input in bytes
    pub input_length: usize,
    pub matched: bool,
    pub match_count: usize,
    pub matches: Vec<Match>,
    /// Elapsed time in microseconds
    pub elapsed_us: u64,
}

/// Result of `pcrex exec`: one matcher run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    pub pattern: String,
    /// `matched`, `partial` or `no_match`
    pub state: String,
    /// Raw result code
    pub code: i32,
    /// Whole match, or the partial span
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub captures: Vec<Capture>,
}

/// Result of `pcrex replace`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceResult {
    pub pattern: String,
    pub replacement: String,
    /// Whether `$n` references were expanded
    pub template: bool,
    pub original: String,
    pub result: String,
    pub replacements_made: usize,
}

/// Compile error details for `pcrex validate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: String,
    /// Byte offset in the pattern
    pub position: usize,
    pub message: String,
}

/// Result of `pcrex validate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResult {
    pub pattern: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Literal text every match starts with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
}

/// Structured error written to stderr
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always true for errors
    pub error: bool,
    pub code: String,
    pub message: String,
    /// Position in pattern (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            code: code.into(),
            message: message.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// Error codes used throughout pcrex
pub mod error_codes {
    pub const INVALID_PATTERN: &str = "INVALID_PATTERN";
    pub const EXEC_ERROR: &str = "EXEC_ERROR";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const COMMAND_ERROR: &str = "COMMAND_ERROR";
    pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
}
