//! Reusable match state
//!
//! A [`Matcher`] is bound to one pattern at a time and keeps the outcome of
//! its last execution. Rebinding or re-executing reuses its scratch
//! buffers. Accessors never fail on a missing result: absent groups read as
//! empty, absent spans as `None`.

use super::error::{ExecError, CODE_NO_MATCH, CODE_PARTIAL};
use super::exec::{Cache, Outcome};
use super::options::MatchOptions;
use super::regex::Regex;

/// Lifecycle of a [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherState {
    Unbound,
    /// Bound to a pattern, nothing executed yet.
    Bound,
    Matched,
    Partial,
    NoMatch,
    /// The last execution stopped with an engine error.
    Error,
}

#[derive(Debug)]
pub struct Matcher<'s> {
    regex: Option<Regex>,
    subject: &'s [u8],
    cache: Cache,
    spans: Vec<Option<(usize, usize)>>,
    state: MatcherState,
    code: i32,
    err: Option<ExecError>,
}

impl Default for Matcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> Matcher<'s> {
    pub fn new() -> Self {
        Self {
            regex: None,
            subject: &[],
            cache: Cache::default(),
            spans: Vec::new(),
            state: MatcherState::Unbound,
            code: CODE_NO_MATCH,
            err: None,
        }
    }

    /// Attach to `regex` without executing. Previous results are dropped.
    pub fn bind(&mut self, regex: &Regex) {
        self.regex = Some(regex.clone());
        self.subject = &[];
        self.spans.clear();
        self.state = MatcherState::Bound;
        self.code = CODE_NO_MATCH;
        self.err = None;
    }

    /// Run the bound pattern over `subject` from offset 0 and return the raw result code.
    pub fn exec(&mut self, subject: &'s [u8], options: MatchOptions) -> i32 {
        self.subject = subject;
        self.spans.clear();
        let Some(regex) = &self.regex else {
            return self.fail(ExecError::Null);
        };
        match regex.run(&mut self.cache, subject, 0, options) {
            Ok(Outcome::Match) => {
                self.spans.extend(self.cache.spans());
                let used = self
                    .spans
                    .iter()
                    .rposition(Option::is_some)
                    .map_or(0, |i| i + 1);
                self.finish(MatcherState::Matched, i32::try_from(used).unwrap_or(i32::MAX))
            }
            Ok(Outcome::Partial { start, end }) => {
                self.spans.push(Some((start, end)));
                self.finish(MatcherState::Partial, CODE_PARTIAL)
            }
            Ok(Outcome::NoMatch) => self.finish(MatcherState::NoMatch, CODE_NO_MATCH),
            Err(e) => self.fail(e),
        }
    }

    fn finish(&mut self, state: MatcherState, code: i32) -> i32 {
        self.state = state;
        self.code = code;
        self.err = None;
        code
    }

    fn fail(&mut self, e: ExecError) -> i32 {
        log::debug!("execution failed: {e}");
        self.state = MatcherState::Error;
        self.code = e.code();
        self.spans.clear();
        self.err.get_or_insert(e);
        self.code
    }

    /// Execute and report whether a full or partial match was found.
    pub fn execute(&mut self, subject: &'s [u8], options: MatchOptions) -> bool {
        self.exec(subject, options);
        matches!(self.state, MatcherState::Matched | MatcherState::Partial)
    }

    pub fn execute_str(&mut self, subject: &'s str, options: MatchOptions) -> bool {
        self.execute(subject.as_bytes(), options)
    }

    /// Bind to `regex` and execute against `subject`.
    pub fn reset(&mut self, regex: &Regex, subject: &'s [u8], options: MatchOptions) -> bool {
        self.bind(regex);
        self.execute(subject, options)
    }

    pub fn reset_str(&mut self, regex: &Regex, subject: &'s str, options: MatchOptions) -> bool {
        self.reset(regex, subject.as_bytes(), options)
    }

    pub fn state(&self) -> MatcherState {
        self.state
    }

    /// Raw code of the last execution.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Whether the last execution found a full or partial match.
    pub fn matches(&self) -> bool {
        matches!(self.state, MatcherState::Matched | MatcherState::Partial)
    }

    /// Whether the last match was partial. Implies [`Matcher::matches`].
    pub fn partial(&self) -> bool {
        self.state == MatcherState::Partial
    }

    /// First engine error since the last clean execution.
    pub fn err(&self) -> Option<&ExecError> {
        self.err.as_ref()
    }

    /// Group count of the bound pattern.
    pub fn groups(&self) -> usize {
        self.regex.as_ref().map_or(0, Regex::groups)
    }

    pub fn group_indices(&self, group: usize) -> Option<(usize, usize)> {
        self.spans.get(group).copied().flatten()
    }

    pub fn present(&self, group: usize) -> bool {
        self.group_indices(group).is_some()
    }

    /// Span of the whole match, or of the partial match.
    pub fn index(&self) -> Option<(usize, usize)> {
        self.group_indices(0)
    }

    /// Bytes of `group`; empty when it did not participate.
    pub fn group(&self, group: usize) -> &'s [u8] {
        let subject: &'s [u8] = self.subject;
        self.group_indices(group)
            .map_or(&[][..], |(start, end)| &subject[start..end])
    }

    /// Text of `group`; empty when absent or not valid UTF-8.
    pub fn group_str(&self, group: usize) -> &'s str {
        std::str::from_utf8(self.group(group)).unwrap_or("")
    }

    /// Every group's bytes, group 0 first; empty without a match. After a
    /// partial match group 0 is the partial span and the others are empty.
    pub fn extract(&self) -> Vec<&'s [u8]> {
        if !self.matches() {
            return Vec::new();
        }
        (0..=self.groups()).map(|g| self.group(g)).collect()
    }

    pub fn extract_strings(&self) -> Vec<&'s str> {
        if !self.matches() {
            return Vec::new();
        }
        (0..=self.groups()).map(|g| self.group_str(g)).collect()
    }

    /// The first participating group carrying `name`, or the lowest-numbered one.
    fn named_group(&self, name: &str) -> Result<usize, ExecError> {
        let regex = self.regex.as_ref().ok_or(ExecError::Null)?;
        let numbers = regex.group_numbers(name)?;
        Ok(numbers
            .iter()
            .copied()
            .find(|&g| self.present(g))
            .or_else(|| numbers.first().copied())
            .unwrap_or(0))
    }

    pub fn named(&self, name: &str) -> Result<&'s [u8], ExecError> {
        self.named_group(name).map(|g| self.group(g))
    }

    pub fn named_str(&self, name: &str) -> Result<&'s str, ExecError> {
        self.named_group(name).map(|g| self.group_str(g))
    }

    pub fn named_present(&self, name: &str) -> Result<bool, ExecError> {
        self.named_group(name).map(|g| self.present(g))
    }
}
