//! Option flags for compiling, studying and matching
//!
//! Each category is a single `bitflags` type. Newline and `\R` conventions
//! are encoded in compile flags and decoded into [`Newline`] and [`Bsr`].

use bitflags::bitflags;

bitflags! {
    /// Compile-time options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompileOptions: u32 {
        /// Letters match both upper and lower case.
        const CASELESS = 1 << 0;
        /// `^` and `$` also match at internal newlines.
        const MULTILINE = 1 << 1;
        /// `.` also matches newlines.
        const DOTALL = 1 << 2;
        /// Ignore unescaped whitespace and `#` comments in the pattern.
        const EXTENDED = 1 << 3;
        /// Every match must start at the start offset.
        const ANCHORED = 1 << 4;
        /// `$` only matches at the very end of the subject.
        const DOLLAR_ENDONLY = 1 << 5;
        /// Unknown escapes of letters are errors.
        const EXTRA = 1 << 6;
        /// Quantifiers are lazy by default; a trailing `?` makes them greedy.
        const UNGREEDY = 1 << 9;
        /// Pattern and subjects are UTF-8; offsets stay byte offsets.
        const UTF8 = 1 << 11;
        /// Plain `(` groups do not capture; named groups still do.
        const NO_AUTO_CAPTURE = 1 << 12;
        /// Skip UTF-8 validation of the pattern.
        const NO_UTF8_CHECK = 1 << 13;
        /// Forbid `(*UTF)` and `(*UTF8)` pattern verbs.
        const NEVER_UTF = 1 << 16;
        /// A match must start before or at the first newline.
        const FIRSTLINE = 1 << 18;
        /// Several groups may share a name.
        const DUPNAMES = 1 << 19;
        const NEWLINE_CR = 1 << 20;
        const NEWLINE_LF = 1 << 21;
        const NEWLINE_CRLF = Self::NEWLINE_CR.bits() | Self::NEWLINE_LF.bits();
        const NEWLINE_ANY = 1 << 22;
        const NEWLINE_ANYCRLF = Self::NEWLINE_CR.bits() | Self::NEWLINE_ANY.bits();
        /// `\R` matches CR, LF and CRLF only.
        const BSR_ANYCRLF = 1 << 23;
        /// `\R` matches any Unicode line break.
        const BSR_UNICODE = 1 << 24;
        /// A backreference to an unset group matches the empty string.
        const JAVASCRIPT_COMPAT = 1 << 25;
        /// Disable start-of-match optimizations from study.
        const NO_START_OPTIMIZE = 1 << 26;
        /// `\d`, `\w`, `\s` and `\b` use Unicode properties.
        const UCP = 1 << 29;
    }
}

bitflags! {
    /// Match-time options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MatchOptions: u32 {
        /// Only try a match at the start offset.
        const ANCHORED = 1 << 4;
        /// The subject start is not the beginning of a line.
        const NOTBOL = 1 << 7;
        /// The subject end is not the end of a line.
        const NOTEOL = 1 << 8;
        /// An empty match is not a valid result.
        const NOTEMPTY = 1 << 10;
        /// Skip UTF-8 validation of the subject.
        const NO_UTF8_CHECK = 1 << 13;
        /// Report a partial match only when no full match exists.
        const PARTIAL_SOFT = 1 << 15;
        /// Report a partial match as soon as one is found.
        const PARTIAL_HARD = 1 << 27;
        /// An empty match exactly at the start offset is not a valid result.
        const NOTEMPTY_ATSTART = 1 << 28;
        /// Ignore any study plan for this execution.
        const NO_START_OPTIMIZE = 1 << 26;
    }
}

bitflags! {
    /// Study options. At most one partial variant may be selected.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StudyOptions: u32 {
        const JIT_COMPILE = 1 << 0;
        const JIT_PARTIAL_SOFT_COMPILE = 1 << 1;
        const JIT_PARTIAL_HARD_COMPILE = 1 << 2;
    }
}

/// Which partial matching behaviour an execution or a study plan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartialMode {
    #[default]
    None,
    Soft,
    Hard,
}

impl MatchOptions {
    /// Hard partial matching wins when both partial flags are set.
    pub fn partial_mode(self) -> PartialMode {
        if self.contains(MatchOptions::PARTIAL_HARD) {
            PartialMode::Hard
        } else if self.contains(MatchOptions::PARTIAL_SOFT) {
            PartialMode::Soft
        } else {
            PartialMode::None
        }
    }
}

/// What counts as a newline for `^`, `$`, `.` and `\N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Newline {
    Cr,
    #[default]
    Lf,
    CrLf,
    Any,
    AnyCrLf,
}

/// What `\R` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bsr {
    AnyCrLf,
    #[default]
    Unicode,
}

const NEWLINE_BITS: CompileOptions = CompileOptions::NEWLINE_CR
    .union(CompileOptions::NEWLINE_LF)
    .union(CompileOptions::NEWLINE_ANY);

impl CompileOptions {
    /// Decode the newline convention. `None` means the bits are inconsistent.
    pub fn newline(self) -> Option<Newline> {
        let bits = self.intersection(NEWLINE_BITS);
        if bits.is_empty() {
            Some(Newline::default())
        } else if bits == CompileOptions::NEWLINE_CR {
            Some(Newline::Cr)
        } else if bits == CompileOptions::NEWLINE_LF {
            Some(Newline::Lf)
        } else if bits == CompileOptions::NEWLINE_CRLF {
            Some(Newline::CrLf)
        } else if bits == CompileOptions::NEWLINE_ANY {
            Some(Newline::Any)
        } else if bits == CompileOptions::NEWLINE_ANYCRLF {
            Some(Newline::AnyCrLf)
        } else {
            None
        }
    }

    /// Replace the newline bits with the given convention.
    pub fn with_newline(self, newline: Newline) -> Self {
        let cleared = self.difference(NEWLINE_BITS);
        cleared
            | match newline {
                Newline::Cr => CompileOptions::NEWLINE_CR,
                Newline::Lf => CompileOptions::NEWLINE_LF,
                Newline::CrLf => CompileOptions::NEWLINE_CRLF,
                Newline::Any => CompileOptions::NEWLINE_ANY,
                Newline::AnyCrLf => CompileOptions::NEWLINE_ANYCRLF,
            }
    }

    /// Decode the `\R` convention. `None` means both bits are set.
    pub fn bsr(self) -> Option<Bsr> {
        match (
            self.contains(CompileOptions::BSR_ANYCRLF),
            self.contains(CompileOptions::BSR_UNICODE),
        ) {
            (true, true) => None,
            (true, false) => Some(Bsr::AnyCrLf),
            _ => Some(Bsr::Unicode),
        }
    }

    pub fn utf8(self) -> bool {
        self.contains(CompileOptions::UTF8)
    }
}

impl StudyOptions {
    /// The partial mode the plan is built for, or `None` if several were requested.
    pub fn partial_mode(self) -> Option<PartialMode> {
        let soft = self.contains(StudyOptions::JIT_PARTIAL_SOFT_COMPILE);
        let hard = self.contains(StudyOptions::JIT_PARTIAL_HARD_COMPILE);
        match (soft, hard) {
            (true, true) => None,
            (true, false) => Some(PartialMode::Soft),
            (false, true) => Some(PartialMode::Hard),
            (false, false) => Some(PartialMode::None),
        }
    }
}

/// Resource budgets applied to every execution of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    /// Maximum number of instructions executed in one call.
    pub match_limit: u64,
    /// Maximum number of backtrack frames held at once.
    pub depth_limit: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            match_limit: 10_000_000,
            depth_limit: 1_000_000,
        }
    }
}
