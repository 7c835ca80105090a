//! pcrex - Perl-compatible regular expressions
//!
//! Compile a pattern into a [`Regex`], optionally study it, then execute it
//! directly, through a reusable [`Matcher`], or with the scan and replace
//! helpers.
//!
//! ```
//! use pcrex::{MatchOptions, Regex};
//!
//! let re = Regex::new(r"(?<word>\w+)@(\w+)").unwrap();
//! let mut m = re.new_matcher();
//! assert!(m.execute_str("mail bob@example", MatchOptions::empty()));
//! assert_eq!(m.named_str("word").unwrap(), "bob");
//! ```

pub mod core;
pub mod output;

pub use crate::core::{
    Bsr, CompileError, CompileErrorKind, CompileOptions, ExecError, ExecLimits, ExecResult,
    MatchOptions, MatchRecord, Matcher, MatcherState, Newline, PartialMode, Regex, StudyData,
    StudyError, StudyOptions, CODE_NO_MATCH, CODE_PARTIAL,
};
