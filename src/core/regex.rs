//! Compiled patterns
//!
//! [`Regex`] owns an immutable compiled program and, optionally, a study
//! plan. Clones share both, so a pattern can be handed to any number of
//! matchers and threads without copying.

use std::sync::Arc;

use super::error::{CompileError, ExecError, StudyError, CODE_NO_MATCH, CODE_PARTIAL};
use super::exec::{execute, Cache, Outcome};
use super::matcher::Matcher;
use super::options::{CompileOptions, ExecLimits, MatchOptions, StudyOptions};
use super::program::{compile, Program};
use super::study::StudyData;
use super::text::encode_utf8;

/// Result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    NoMatch,
    /// One entry per group, group 0 first; `None` for groups that did not participate.
    Matched(Vec<Option<(usize, usize)>>),
    Partial { start: usize, end: usize },
}

impl ExecResult {
    /// The classic result code: the number of leading capture pairs set on a
    /// match, `-1` for no match and `-12` for a partial match.
    pub fn code(&self) -> i32 {
        match self {
            ExecResult::NoMatch => CODE_NO_MATCH,
            ExecResult::Partial { .. } => CODE_PARTIAL,
            ExecResult::Matched(spans) => {
                let used = spans.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
                i32::try_from(used).unwrap_or(i32::MAX)
            }
        }
    }
}

/// A compiled Perl-compatible regular expression.
#[derive(Debug, Clone)]
pub struct Regex {
    program: Option<Arc<Program>>,
    study: Option<Arc<StudyData>>,
    limits: ExecLimits,
}

impl Regex {
    /// Compile with default options.
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        Self::compile(pattern, CompileOptions::empty())
    }

    pub fn compile(pattern: &str, options: CompileOptions) -> Result<Self, CompileError> {
        Self::compile_bytes(pattern.as_bytes(), options)
    }

    /// Compile a pattern given as raw bytes. Without `UTF8` every byte is one character.
    pub fn compile_bytes(pattern: &[u8], options: CompileOptions) -> Result<Self, CompileError> {
        let program = compile(pattern, options)?;
        log::debug!(
            "compiled pattern {:?} with {} groups",
            program.source,
            program.captures
        );
        Ok(Self {
            program: Some(Arc::new(program)),
            study: None,
            limits: ExecLimits::default(),
        })
    }

    /// Compile and then study. A study failure leaves the pattern unstudied,
    /// which only costs speed.
    pub fn compile_and_study(
        pattern: &str,
        options: CompileOptions,
        study: StudyOptions,
    ) -> Result<Self, CompileError> {
        let mut regex = Self::compile(pattern, options)?;
        if let Err(e) = regex.study(study) {
            log::debug!("study of {pattern:?} skipped: {e}");
        }
        Ok(regex)
    }

    /// Compile a pattern that is known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if the pattern fails to compile.
    pub fn must_compile(pattern: &str, options: CompileOptions) -> Self {
        match Self::compile(pattern, options) {
            Ok(regex) => regex,
            Err(e) => panic!("pcrex: {e}"),
        }
    }

    /// [`Regex::must_compile`] followed by a study.
    ///
    /// # Panics
    ///
    /// Panics if the pattern fails to compile.
    pub fn must_compile_and_study(
        pattern: &str,
        options: CompileOptions,
        study: StudyOptions,
    ) -> Self {
        match Self::compile_and_study(pattern, options, study) {
            Ok(regex) => regex,
            Err(e) => panic!("pcrex: {e}"),
        }
    }

    /// Build a study plan, replacing any previous one.
    ///
    /// On failure the previous plan stays in place.
    pub fn study(&mut self, options: StudyOptions) -> Result<(), StudyError> {
        let program = self.program.as_ref().ok_or(StudyError::Released)?;
        let mode = options
            .partial_mode()
            .ok_or(StudyError::ConflictingModes)?;
        let plan = StudyData::build(&program.analysis, mode);
        self.study = Some(Arc::new(plan));
        Ok(())
    }

    pub fn study_data(&self) -> Option<&StudyData> {
        self.study.as_deref()
    }

    /// Drop this handle's program and study plan. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.program.take().is_some() {
            log::trace!("released compiled pattern");
        }
        self.study = None;
    }

    pub fn is_released(&self) -> bool {
        self.program.is_none()
    }

    pub fn limits(&self) -> ExecLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: ExecLimits) {
        self.limits = limits;
    }

    pub(crate) fn program(&self) -> Option<&Program> {
        self.program.as_deref()
    }

    /// The pattern text; empty once released.
    pub fn as_str(&self) -> &str {
        self.program.as_ref().map_or("", |p| p.source.as_str())
    }

    /// Compile options in effect, including any set by leading `(*VERB)`s.
    pub fn options(&self) -> CompileOptions {
        self.program
            .as_ref()
            .map_or(CompileOptions::empty(), |p| p.options)
    }

    /// Number of capture groups, not counting group 0.
    pub fn groups(&self) -> usize {
        self.program.as_ref().map_or(0, |p| p.captures)
    }

    /// Name of each group by number; unnamed groups and group 0 are empty.
    pub fn group_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.groups() + 1];
        if let Some(program) = &self.program {
            for (name, index) in &program.names {
                if names[*index].is_empty() {
                    names[*index] = name.clone();
                }
            }
        }
        names
    }

    /// Every group number carrying `name`, in order.
    pub fn group_numbers(&self, name: &str) -> Result<Vec<usize>, ExecError> {
        let program = self.program.as_ref().ok_or(ExecError::Null)?;
        let numbers: Vec<usize> = program
            .names
            .iter()
            .filter(|(n, _)| n == name)
            .map(|&(_, index)| index)
            .collect();
        if numbers.is_empty() {
            return Err(ExecError::UnknownGroupName(name.to_string()));
        }
        Ok(numbers)
    }

    /// The lowest group number carrying `name`.
    pub fn group_index(&self, name: &str) -> Result<usize, ExecError> {
        self.group_numbers(name)
            .map(|numbers| numbers.into_iter().min().unwrap_or(0))
    }

    /// Literal text every match must begin with, and whether it is the whole pattern.
    pub fn literal_prefix(&self) -> (String, bool) {
        let Some(program) = &self.program else {
            return (String::new(), false);
        };
        let mut bytes = Vec::new();
        for &c in &program.prefix {
            if program.utf {
                encode_utf8(c, &mut bytes);
            } else {
                bytes.push(c as u8);
            }
        }
        (
            String::from_utf8_lossy(&bytes).into_owned(),
            program.prefix_complete,
        )
    }

    pub fn exec(&self, subject: &[u8], options: MatchOptions) -> Result<ExecResult, ExecError> {
        self.exec_at(subject, 0, options)
    }

    /// Execute from `start_offset`. Lookbehinds and `\b` still see the text before it.
    ///
    /// # Panics
    ///
    /// Panics if `start_offset > subject.len()`.
    pub fn exec_at(
        &self,
        subject: &[u8],
        start_offset: usize,
        options: MatchOptions,
    ) -> Result<ExecResult, ExecError> {
        let mut cache = Cache::default();
        let outcome = self.run(&mut cache, subject, start_offset, options)?;
        Ok(match outcome {
            Outcome::NoMatch => ExecResult::NoMatch,
            Outcome::Match => ExecResult::Matched(cache.spans()),
            Outcome::Partial { start, end } => ExecResult::Partial { start, end },
        })
    }

    pub(crate) fn run(
        &self,
        cache: &mut Cache,
        subject: &[u8],
        start_offset: usize,
        options: MatchOptions,
    ) -> Result<Outcome, ExecError> {
        let program = self.program.as_ref().ok_or(ExecError::Null)?;
        execute(
            program,
            self.study.as_deref(),
            self.limits,
            subject,
            start_offset,
            options,
            cache,
        )
    }

    /// Whether the pattern matches anywhere. Engine errors count as no match;
    /// use [`Regex::exec`] to tell them apart.
    pub fn is_match(&self, subject: &str) -> bool {
        matches!(
            self.exec(subject.as_bytes(), MatchOptions::empty()),
            Ok(ExecResult::Matched(_))
        )
    }

    /// Span of the first match.
    pub fn find_index(&self, subject: &[u8], options: MatchOptions) -> Option<(usize, usize)> {
        match self.exec(subject, options) {
            Ok(ExecResult::Matched(spans)) => spans.first().copied().flatten(),
            _ => None,
        }
    }

    /// Text of the first match.
    pub fn find<'s>(&self, subject: &'s str) -> Option<&'s str> {
        let (start, end) = self.find_index(subject.as_bytes(), MatchOptions::empty())?;
        subject.get(start..end)
    }

    /// Text of every group of the first match.
    pub fn captures<'s>(&self, subject: &'s str) -> Option<Vec<Option<&'s str>>> {
        match self.exec(subject.as_bytes(), MatchOptions::empty()) {
            Ok(ExecResult::Matched(spans)) => Some(
                spans
                    .into_iter()
                    .map(|span| span.and_then(|(s, e)| subject.get(s..e)))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// A matcher bound to this pattern, not yet executed.
    pub fn new_matcher<'s>(&self) -> Matcher<'s> {
        let mut matcher = Matcher::new();
        matcher.bind(self);
        matcher
    }

    /// A matcher that has already run against `subject`.
    pub fn matcher<'s>(&self, subject: &'s [u8], options: MatchOptions) -> Matcher<'s> {
        let mut matcher = Matcher::new();
        matcher.reset(self, subject, options);
        matcher
    }

    /// Escape every character that has a meaning in pattern syntax.
    pub fn quote_meta(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c == '\0' {
                out.push_str("\\x00");
                continue;
            }
            if c.is_ascii() && !c.is_ascii_alphanumeric() && c != '_' {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
}
