//! Global scanning and substitution
//!
//! Every function here walks the subject with repeated executions. After an
//! empty match the next search starts one character later, so a pattern
//! that can match the empty string still makes progress.

use serde::Serialize;

use super::error::ExecError;
use super::exec::{Cache, Outcome};
use super::options::MatchOptions;
use super::regex::Regex;
use super::text::decode_utf8;

/// One match found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

type Spans = [Option<(usize, usize)>];

impl Regex {
    /// Call `each` with the capture spans of every non-overlapping match.
    fn scan(
        &self,
        subject: &[u8],
        options: MatchOptions,
        mut each: impl FnMut(&Spans) -> bool,
    ) -> Result<(), ExecError> {
        let utf = self.program().is_some_and(|p| p.utf);
        let mut cache = Cache::default();
        let mut offset = 0;
        while offset < subject.len() {
            if self.run(&mut cache, subject, offset, options)? != Outcome::Match {
                break;
            }
            let spans = cache.spans();
            let Some((start, end)) = spans.first().copied().flatten() else {
                break;
            };
            if !each(&spans) {
                break;
            }
            offset = if start == end {
                let step = if utf {
                    decode_utf8(&subject[end..]).map_or(1, |(_, n)| n)
                } else {
                    1
                };
                end + step
            } else {
                end
            };
        }
        Ok(())
    }

    /// Every non-overlapping match as text plus byte offsets.
    pub fn find_all(
        &self,
        subject: &str,
        options: MatchOptions,
    ) -> Result<Vec<MatchRecord>, ExecError> {
        let bytes = subject.as_bytes();
        let mut records = Vec::new();
        self.scan(bytes, options, |spans| {
            if let Some((start, end)) = spans[0] {
                records.push(MatchRecord {
                    text: String::from_utf8_lossy(&bytes[start..end]).into_owned(),
                    start,
                    end,
                });
            }
            true
        })?;
        Ok(records)
    }

    pub fn find_all_bytes(
        &self,
        subject: &[u8],
        options: MatchOptions,
    ) -> Result<Vec<(usize, usize)>, ExecError> {
        let mut found = Vec::new();
        self.scan(subject, options, |spans| {
            found.extend(spans[0]);
            true
        })?;
        Ok(found)
    }

    /// Capture spans of every match, group 0 first.
    pub fn captures_all(
        &self,
        subject: &[u8],
        options: MatchOptions,
    ) -> Result<Vec<Vec<Option<(usize, usize)>>>, ExecError> {
        let mut all = Vec::new();
        self.scan(subject, options, |spans| {
            all.push(spans.to_vec());
            true
        })?;
        Ok(all)
    }

    /// Rebuild `subject`, letting `write` produce the text for each match.
    /// Also returns the number of matches replaced.
    fn rebuild(
        &self,
        subject: &[u8],
        options: MatchOptions,
        mut write: impl FnMut(&Spans, &mut Vec<u8>),
    ) -> Result<(Vec<u8>, usize), ExecError> {
        let mut out = Vec::with_capacity(subject.len());
        let mut copied = 0;
        let mut count = 0;
        self.scan(subject, options, |spans| {
            if let Some((start, end)) = spans[0] {
                out.extend_from_slice(&subject[copied..start]);
                write(spans, &mut out);
                copied = end;
                count += 1;
            }
            true
        })?;
        out.extend_from_slice(&subject[copied..]);
        Ok((out, count))
    }

    /// Replace every match with `replacement`, taken literally.
    pub fn replace_all_bytes(
        &self,
        subject: &[u8],
        replacement: &[u8],
        options: MatchOptions,
    ) -> Result<Vec<u8>, ExecError> {
        self.rebuild(subject, options, |_, out| out.extend_from_slice(replacement))
            .map(|(out, _)| out)
    }

    pub fn replace_all(
        &self,
        subject: &str,
        replacement: &str,
        options: MatchOptions,
    ) -> Result<String, ExecError> {
        let out = self.replace_all_bytes(subject.as_bytes(), replacement.as_bytes(), options)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Replace every match with `template` after expanding `$n`, `${n}`,
    /// `$name`, `${name}` and `$$`.
    pub fn replace_all_template(
        &self,
        subject: &str,
        template: &str,
        options: MatchOptions,
    ) -> Result<String, ExecError> {
        self.replace_all_counted(subject, template, true, options)
            .map(|(out, _)| out)
    }

    /// One pass of [`Regex::replace_all`], or of [`Regex::replace_all_template`]
    /// when `template` is set, that also counts the matches replaced.
    pub fn replace_all_counted(
        &self,
        subject: &str,
        replacement: &str,
        template: bool,
        options: MatchOptions,
    ) -> Result<(String, usize), ExecError> {
        let bytes = subject.as_bytes();
        let (out, count) = self.rebuild(bytes, options, |spans, out| {
            if template {
                self.expand(replacement.as_bytes(), bytes, spans, out);
            } else {
                out.extend_from_slice(replacement.as_bytes());
            }
        })?;
        Ok((String::from_utf8_lossy(&out).into_owned(), count))
    }

    /// Replace every match with whatever `f` returns for the matched text.
    pub fn replace_all_func(
        &self,
        subject: &str,
        options: MatchOptions,
        mut f: impl FnMut(&str) -> String,
    ) -> Result<String, ExecError> {
        let bytes = subject.as_bytes();
        let (out, _) = self.rebuild(bytes, options, |spans, out| {
            if let Some((start, end)) = spans[0] {
                let text = String::from_utf8_lossy(&bytes[start..end]);
                out.extend_from_slice(f(&text).as_bytes());
            }
        })?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Split around matches. `limit > 0` yields at most `limit` pieces with the
    /// rest unsplit in the last one, `0` yields nothing and `< 0` yields all.
    /// An empty match right after the previous match does not split.
    pub fn split(
        &self,
        subject: &str,
        limit: isize,
        options: MatchOptions,
    ) -> Result<Vec<String>, ExecError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if !self.as_str().is_empty() && subject.is_empty() {
            return Ok(vec![String::new()]);
        }
        let bytes = subject.as_bytes();
        let piece = |from: usize, to: usize| String::from_utf8_lossy(&bytes[from..to]).into_owned();
        let mut pieces = Vec::new();
        let (mut begin, mut end) = (0, 0);
        let mut last_end = None;
        let max = usize::try_from(limit).ok();
        self.scan(bytes, options, |spans| {
            let Some((start, stop)) = spans[0] else {
                return true;
            };
            if start == stop && last_end == Some(start) {
                return true;
            }
            if max.is_some_and(|max| pieces.len() + 1 == max) {
                return false;
            }
            end = start;
            if stop != 0 {
                pieces.push(piece(begin, end));
            }
            begin = stop;
            last_end = Some(stop);
            true
        })?;
        if end != bytes.len() {
            pieces.push(piece(begin, bytes.len()));
        }
        Ok(pieces)
    }

    /// Append `template` to `out` with group references expanded.
    ///
    /// A name runs as long as it can (`$1x` names group `1x`). Unknown or
    /// unset groups expand to nothing; a `$` that starts no valid reference
    /// is copied as is.
    pub(crate) fn expand(&self, template: &[u8], subject: &[u8], spans: &Spans, out: &mut Vec<u8>) {
        let mut rest = template;
        while let Some(dollar) = rest.iter().position(|&b| b == b'$') {
            out.extend_from_slice(&rest[..dollar]);
            rest = &rest[dollar + 1..];
            if rest.first() == Some(&b'$') {
                out.push(b'$');
                rest = &rest[1..];
                continue;
            }
            let Some((name, after)) = template_name(rest) else {
                out.push(b'$');
                continue;
            };
            rest = after;
            if let Some((start, end)) = self.lookup(name, spans) {
                out.extend_from_slice(&subject[start..end]);
            }
        }
        out.extend_from_slice(rest);
    }

    fn lookup(&self, name: &str, spans: &Spans) -> Option<(usize, usize)> {
        if let Ok(n) = name.parse::<usize>() {
            return spans.get(n).copied().flatten();
        }
        self.group_numbers(name)
            .ok()?
            .into_iter()
            .find_map(|g| spans.get(g).copied().flatten())
    }
}

/// Parse the reference after a `$`: `name` or `{name}`.
fn template_name(text: &[u8]) -> Option<(&str, &[u8])> {
    let is_name_byte = |b: &u8| b.is_ascii_alphanumeric() || *b == b'_';
    let (inner, after) = if text.first() == Some(&b'{') {
        let close = text.iter().position(|&b| b == b'}')?;
        (&text[1..close], &text[close + 1..])
    } else {
        let len = text.iter().take_while(|b| is_name_byte(b)).count();
        (&text[..len], &text[len..])
    };
    if inner.is_empty() || !inner.iter().all(is_name_byte) {
        return None;
    }
    std::str::from_utf8(inner).ok().map(|name| (name, after))
}
