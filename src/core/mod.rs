//! Core regex engine
//!
//! Parsing, compilation, study, execution, match state and scan/replace.

mod ast;
mod class;
mod exec;
mod parse;
mod program;
mod study;
mod text;

pub mod error;
pub mod matcher;
pub mod options;
pub mod regex;
pub mod replace;

pub use error::{
    CompileError, CompileErrorKind, ExecError, StudyError, CODE_NO_MATCH, CODE_PARTIAL,
};
pub use matcher::{Matcher, MatcherState};
pub use options::{
    Bsr, CompileOptions, ExecLimits, MatchOptions, Newline, PartialMode, StudyOptions,
};
pub use regex::{ExecResult, Regex};
pub use replace::MatchRecord;
pub use study::StudyData;
