//! Error types for compiling, studying and executing patterns

use thiserror::Error;

/// Why a pattern failed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    NulByteInPattern,
    TrailingEscape,
    UnterminatedGroup,
    UnmatchedParenthesis,
    UnterminatedClass,
    RangeOutOfOrder,
    InvalidClassRange,
    NothingToRepeat,
    QuantifierTooBig,
    QuantifierOutOfOrder,
    UnknownGroupReference,
    DuplicateGroupName,
    InvalidGroupName,
    LookbehindNotFixedLength,
    InvalidUtf8,
    UnknownEscape,
    InvalidEscape,
    UnknownPosixClass,
    UnknownProperty,
    UnrecognizedGroupSyntax,
    Unsupported,
    PatternTooLarge,
    NestingTooDeep,
    InconsistentOptions,
}

/// A compile failure: message plus the byte offset in the pattern where it was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{pattern} ({offset}): {message}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub offset: usize,
    pub pattern: String,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind, offset: usize) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            offset,
            pattern: String::new(),
        }
    }

    pub(crate) fn with_message(
        kind: CompileErrorKind,
        message: impl Into<String>,
        offset: usize,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            offset,
            pattern: String::new(),
        }
    }

    pub(crate) fn in_pattern(mut self, pattern: &[u8]) -> Self {
        self.pattern = String::from_utf8_lossy(pattern).into_owned();
        self
    }
}

impl CompileErrorKind {
    fn default_message(self) -> &'static str {
        match self {
            CompileErrorKind::NulByteInPattern => "NUL byte in pattern",
            CompileErrorKind::TrailingEscape => "\\ at end of pattern",
            CompileErrorKind::UnterminatedGroup => "missing )",
            CompileErrorKind::UnmatchedParenthesis => "unmatched parentheses",
            CompileErrorKind::UnterminatedClass => "missing terminating ] for character class",
            CompileErrorKind::RangeOutOfOrder => "range out of order in character class",
            CompileErrorKind::InvalidClassRange => "invalid range in character class",
            CompileErrorKind::NothingToRepeat => "nothing to repeat",
            CompileErrorKind::QuantifierTooBig => "number too big in {} quantifier",
            CompileErrorKind::QuantifierOutOfOrder => "numbers out of order in {} quantifier",
            CompileErrorKind::UnknownGroupReference => "reference to non-existent subpattern",
            CompileErrorKind::DuplicateGroupName => "two named subpatterns have the same name",
            CompileErrorKind::InvalidGroupName => "syntax error in subpattern name (missing terminator)",
            CompileErrorKind::LookbehindNotFixedLength => "lookbehind assertion is not fixed length",
            CompileErrorKind::InvalidUtf8 => "invalid UTF-8 string",
            CompileErrorKind::UnknownEscape => "unrecognized character follows \\",
            CompileErrorKind::InvalidEscape => "malformed escape sequence",
            CompileErrorKind::UnknownPosixClass => "unknown POSIX class name",
            CompileErrorKind::UnknownProperty => "unknown property name after \\P or \\p",
            CompileErrorKind::UnrecognizedGroupSyntax => "unrecognized character after (? or (?-",
            CompileErrorKind::Unsupported => "construct is not supported",
            CompileErrorKind::PatternTooLarge => "regular expression is too large",
            CompileErrorKind::NestingTooDeep => "parentheses are too deeply nested",
            CompileErrorKind::InconsistentOptions => "inconsistent NEWLINE options",
        }
    }
}

/// Errors reported by an execution, a named lookup, or a released pattern.
///
/// `code()` gives the classic negative result code for each kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("pattern has been released")]
    Null,

    #[error("bad option combination")]
    BadOption,

    #[error("compiled pattern data is corrupted")]
    BadMagic,

    #[error("unknown instruction in compiled pattern")]
    UnknownOpcode,

    #[error("capture slot {0} is out of range")]
    UnknownNode(usize),

    #[error("out of memory")]
    NoMemory,

    #[error("no such named group: {0}")]
    UnknownGroupName(String),

    #[error("match limit exceeded")]
    MatchLimit,

    #[error("callout failed")]
    Callout,

    #[error("invalid UTF-8 in subject at offset {offset}")]
    BadUtf8 { offset: usize },

    #[error("start offset {offset} is not at a UTF-8 character boundary")]
    BadUtf8Offset { offset: usize },

    #[error("partial match found where partial matching is not allowed")]
    Partial,

    #[error("partial matching is not supported for this pattern")]
    BadPartial,

    #[error("recursion limit exceeded")]
    RecursionLimit,

    #[error("internal engine error")]
    Internal,

    #[error("bad capture count")]
    BadCount,

    #[error("JIT stack limit exceeded")]
    JitStackLimit,
}

/// Result code for an execution that found nothing.
pub const CODE_NO_MATCH: i32 = -1;

/// Result code for a partial match.
pub const CODE_PARTIAL: i32 = -12;

impl ExecError {
    pub fn code(&self) -> i32 {
        match self {
            ExecError::Null => -2,
            ExecError::BadOption => -3,
            ExecError::BadMagic => -4,
            ExecError::UnknownOpcode => -5,
            ExecError::UnknownNode(_) => -5,
            ExecError::NoMemory => -6,
            ExecError::UnknownGroupName(_) => -7,
            ExecError::MatchLimit => -8,
            ExecError::Callout => -9,
            ExecError::BadUtf8 { .. } => -10,
            ExecError::BadUtf8Offset { .. } => -11,
            ExecError::Partial => CODE_PARTIAL,
            ExecError::BadPartial => -13,
            ExecError::Internal => -14,
            ExecError::BadCount => -15,
            ExecError::RecursionLimit => -21,
            ExecError::JitStackLimit => -27,
        }
    }
}

/// Study failures. The pattern keeps its previous study data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudyError {
    #[error("pattern has been released")]
    Released,

    #[error("more than one partial mode requested")]
    ConflictingModes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::new(CompileErrorKind::UnterminatedGroup, 1).in_pattern(b"(");
        assert_eq!(err.to_string(), "( (1): missing )");
        assert_eq!(err.message, "missing )");
    }

    #[test]
    fn test_exec_error_codes() {
        assert_eq!(ExecError::MatchLimit.code(), -8);
        assert_eq!(ExecError::RecursionLimit.code(), -21);
        assert_eq!(ExecError::UnknownGroupName("x".into()).code(), -7);
    }
}
