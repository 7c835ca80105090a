//! Backtracking executor
//!
//! Runs a [`Program`] over a subject with an explicit backtrack stack.
//! Lookarounds and atomic groups run their body as a nested sub-run that
//! shares the stack above a recorded base; when a sub-run succeeds only the
//! capture restores it pushed are kept.

use super::ast::Assertion;
use super::class::{fold, is_word};
use super::error::ExecError;
use super::options::{CompileOptions, ExecLimits, MatchOptions, PartialMode};
use super::program::{Inst, Program};
use super::study::{StartKind, StudyData};
use super::text::{decode_utf8, decode_utf8_before, is_char_boundary};

#[derive(Debug, Clone, Copy)]
enum Frame {
    Step { pc: usize, pos: usize },
    RestoreSlot { slot: usize, old: Option<usize> },
    RestoreMark { reg: usize, old: usize },
}

/// Scratch storage reused across executions.
#[derive(Debug, Default)]
pub(crate) struct Cache {
    stack: Vec<Frame>,
    pub slots: Vec<Option<usize>>,
    marks: Vec<usize>,
}

impl Cache {
    fn prepare(&mut self, program: &Program) {
        self.slots.clear();
        self.slots.resize(program.slots(), None);
        self.marks.clear();
        self.marks.resize(program.registers, 0);
        self.stack.clear();
    }

    fn reset_attempt(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.stack.clear();
    }

    /// Capture spans as `(start, end)` pairs, group 0 first.
    pub fn spans(&self) -> Vec<Option<(usize, usize)>> {
        self.slots
            .chunks(2)
            .map(|pair| match pair {
                [Some(s), Some(e)] => Some((*s, *e)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    NoMatch,
    /// Capture offsets are left in the cache.
    Match,
    Partial { start: usize, end: usize },
}

enum Run {
    Matched(usize),
    Failed,
    Partial,
}

/// Execute `program` against `subject` starting at `start_offset`.
///
/// Panics if `start_offset` is past the end of the subject.
pub(crate) fn execute(
    program: &Program,
    study: Option<&StudyData>,
    limits: ExecLimits,
    subject: &[u8],
    start_offset: usize,
    options: MatchOptions,
    cache: &mut Cache,
) -> Result<Outcome, ExecError> {
    assert!(
        start_offset <= subject.len(),
        "start offset {start_offset} is beyond subject length {}",
        subject.len()
    );
    cache.prepare(program);
    if program.utf && !options.contains(MatchOptions::NO_UTF8_CHECK) {
        if let Err(e) = std::str::from_utf8(subject) {
            return Err(ExecError::BadUtf8 {
                offset: e.valid_up_to(),
            });
        }
        if !is_char_boundary(subject, start_offset) {
            return Err(ExecError::BadUtf8Offset {
                offset: start_offset,
            });
        }
    }

    let mode = options.partial_mode();
    let plan = study.filter(|plan| {
        let usable = plan.mode == mode
            && !program.options.contains(CompileOptions::NO_START_OPTIMIZE)
            && !options.contains(MatchOptions::NO_START_OPTIMIZE);
        if !usable {
            log::debug!("study plan for {:?} not used for a {:?} execution", plan.mode, mode);
        }
        usable
    });

    let mut vm = Vm {
        program,
        subject,
        start_offset,
        options,
        mode,
        limits,
        cache,
        steps: 0,
        attempt_start: start_offset,
        partial: None,
        hard_stop: false,
    };
    let outcome = vm.search(plan);
    log::trace!(
        "exec at {start_offset} over {} bytes: {:?} after {} steps",
        subject.len(),
        outcome,
        vm.steps
    );
    outcome
}

struct Vm<'a> {
    program: &'a Program,
    subject: &'a [u8],
    start_offset: usize,
    options: MatchOptions,
    mode: PartialMode,
    limits: ExecLimits,
    cache: &'a mut Cache,
    steps: u64,
    attempt_start: usize,
    /// First soft partial seen.
    partial: Option<(usize, usize)>,
    /// Set when a hard partial match ends the search.
    hard_stop: bool,
}

impl Vm<'_> {
    fn search(&mut self, plan: Option<&StudyData>) -> Result<Outcome, ExecError> {
        let len = self.subject.len();
        let anchored = self.options.contains(MatchOptions::ANCHORED)
            || self.program.options.contains(CompileOptions::ANCHORED);
        let last_start = if self.program.options.contains(CompileOptions::FIRSTLINE) {
            (self.start_offset..len)
                .find(|&p| self.program.lines.newline_at(self.subject, p).is_some())
                .unwrap_or(len)
        } else {
            len
        };

        let mut start = self.start_offset;
        while start <= last_start {
            if let Some(plan) = plan {
                if len - start < plan.min_len {
                    break;
                }
            }
            if plan.map_or(true, |plan| self.may_start(plan, start)) {
                match self.attempt(start)? {
                    Run::Matched(end) => {
                        self.cache.slots[0] = Some(start);
                        self.cache.slots[1] = Some(end);
                        return Ok(Outcome::Match);
                    }
                    Run::Partial => {
                        return Ok(Outcome::Partial {
                            start: self.attempt_start,
                            end: len,
                        })
                    }
                    Run::Failed => {}
                }
            }
            if anchored || start >= len {
                break;
            }
            if plan.is_some_and(|plan| plan.start == StartKind::StartOffset) {
                break;
            }
            start += 1;
            while self.program.utf && !is_char_boundary(self.subject, start) {
                start += 1;
            }
        }
        Ok(match self.partial {
            Some((start, end)) => Outcome::Partial { start, end },
            None => Outcome::NoMatch,
        })
    }

    fn may_start(&self, plan: &StudyData, start: usize) -> bool {
        let start_ok = match plan.start {
            StartKind::Anywhere => true,
            StartKind::StartOffset => start == self.start_offset,
            StartKind::LineStart => {
                start == self.start_offset
                    || self.program.lines.newline_before(self.subject, start)
            }
        };
        start_ok
            && plan.first_bytes.as_ref().map_or(true, |set| {
                self.subject
                    .get(start)
                    .is_some_and(|&b| set[usize::from(b)])
            })
    }

    fn attempt(&mut self, start: usize) -> Result<Run, ExecError> {
        self.attempt_start = start;
        self.cache.reset_attempt();
        self.run(0, start, 0)
    }

    fn char_at(&self, pos: usize) -> Option<(u32, usize)> {
        let rest = self.subject.get(pos..)?;
        if self.program.utf {
            decode_utf8(rest)
        } else {
            rest.first().map(|&b| (u32::from(b), 1))
        }
    }

    fn char_before(&self, pos: usize) -> Option<u32> {
        if self.program.utf {
            decode_utf8_before(self.subject, pos).map(|(c, _)| c)
        } else {
            pos.checked_sub(1).map(|p| u32::from(self.subject[p]))
        }
    }

    /// Step back `count` characters from `pos`.
    fn back(&self, mut pos: usize, count: usize) -> Option<usize> {
        if !self.program.utf {
            return pos.checked_sub(count);
        }
        for _ in 0..count {
            let (_, len) = decode_utf8_before(self.subject, pos)?;
            pos -= len;
        }
        Some(pos)
    }

    /// The subject ran out at `pos` while the match still wanted more.
    fn hit_end(&mut self, pos: usize) {
        if self.mode == PartialMode::None || pos <= self.attempt_start {
            return;
        }
        if self.mode == PartialMode::Hard {
            self.hard_stop = true;
        } else {
            self.partial
                .get_or_insert((self.attempt_start, self.subject.len()));
        }
    }

    fn consume(&mut self, pos: &mut usize, pred: impl Fn(u32) -> bool) -> bool {
        match self.char_at(*pos) {
            Some((c, n)) if pred(c) => {
                *pos += n;
                true
            }
            Some(_) => false,
            None => {
                self.hit_end(*pos);
                false
            }
        }
    }

    fn assertion(&self, a: Assertion, pos: usize) -> bool {
        let s = self.subject;
        let len = s.len();
        let lines = &self.program.lines;
        let notbol = self.options.contains(MatchOptions::NOTBOL);
        let noteol = self.options.contains(MatchOptions::NOTEOL);
        let final_newline = || lines.newline_at(s, pos).is_some_and(|n| pos + n == len);
        match a {
            Assertion::StartText => pos == 0,
            Assertion::EndText => pos == len,
            Assertion::EndTextOptNewline => pos == len || final_newline(),
            Assertion::StartOffset => pos == self.start_offset,
            Assertion::LineStart { multiline: false } => pos == 0 && !notbol,
            Assertion::LineStart { multiline: true } => {
                if pos == 0 {
                    !notbol
                } else {
                    pos < len && lines.newline_before(s, pos)
                }
            }
            Assertion::LineEnd {
                multiline: true, ..
            } => {
                if pos == len {
                    !noteol
                } else {
                    lines.newline_at(s, pos).is_some()
                }
            }
            Assertion::LineEnd {
                multiline: false,
                end_only,
            } => !noteol && (pos == len || (!end_only && final_newline())),
            Assertion::WordBoundary | Assertion::NotWordBoundary => {
                let ucp = self.program.ucp;
                let before = self.char_before(pos).is_some_and(|c| is_word(c, ucp));
                let after = self.char_at(pos).is_some_and(|(c, _)| is_word(c, ucp));
                (before != after) == (a == Assertion::WordBoundary)
            }
        }
    }

    /// Match a backreference at `pos`. `Err(true)` means the subject ended
    /// while the text still agreed.
    fn backref(&self, groups: &[usize], caseless: bool, pos: usize) -> Result<usize, bool> {
        let slots = &self.cache.slots;
        let span = groups
            .iter()
            .find_map(|&g| match (slots[g * 2], slots[g * 2 + 1]) {
                (Some(s), Some(e)) => Some((s, e)),
                _ => None,
            });
        let Some((start, end)) = span else {
            return if self
                .program
                .options
                .contains(CompileOptions::JAVASCRIPT_COMPAT)
            {
                Ok(pos)
            } else {
                Err(false)
            };
        };
        let Some(group) = self.subject.get(start..end) else {
            return Err(false);
        };
        if !caseless {
            let avail = &self.subject[pos..];
            return if avail.starts_with(group) {
                Ok(pos + group.len())
            } else {
                Err(group.starts_with(avail))
            };
        }
        let utf = self.program.utf;
        let (mut i, mut p) = (start, pos);
        while i < end {
            let Some((gc, gl)) = self.char_at(i) else {
                return Err(false);
            };
            let Some((sc, sl)) = self.char_at(p) else {
                return Err(true);
            };
            if fold(gc, utf) != fold(sc, utf) {
                return Err(false);
            }
            i += gl;
            p += sl;
        }
        Ok(p)
    }

    fn push(&mut self, frame: Frame) -> Result<(), ExecError> {
        if self.cache.stack.len() >= self.limits.depth_limit {
            log::debug!("depth limit {} reached", self.limits.depth_limit);
            return Err(ExecError::RecursionLimit);
        }
        self.cache.stack.push(frame);
        Ok(())
    }

    fn save(&mut self, slot: usize, pos: usize) -> Result<(), ExecError> {
        let old = self.cache.slots[slot];
        self.push(Frame::RestoreSlot { slot, old })?;
        self.cache.slots[slot] = Some(pos);
        Ok(())
    }

    fn mark(&mut self, reg: usize, pos: usize) -> Result<(), ExecError> {
        let old = self.cache.marks[reg];
        self.push(Frame::RestoreMark { reg, old })?;
        self.cache.marks[reg] = pos;
        Ok(())
    }

    /// Pop to the most recent choice point above `base`, undoing state on the way.
    fn backtrack(&mut self, base: usize) -> Option<(usize, usize)> {
        while self.cache.stack.len() > base {
            match self.cache.stack.pop()? {
                Frame::Step { pc, pos } => return Some((pc, pos)),
                Frame::RestoreSlot { slot, old } => self.cache.slots[slot] = old,
                Frame::RestoreMark { reg, old } => self.cache.marks[reg] = old,
            }
        }
        None
    }

    /// Drop choice points above `base`, keeping the restores.
    fn commit(&mut self, base: usize) {
        let stack = &mut self.cache.stack;
        let mut keep = base;
        for i in base..stack.len() {
            if !matches!(stack[i], Frame::Step { .. }) {
                stack.swap(keep, i);
                keep += 1;
            }
        }
        stack.truncate(keep);
    }

    /// Undo everything above `base`.
    fn unwind(&mut self, base: usize) {
        while self.backtrack(base).is_some() {}
    }

    fn run(&mut self, mut pc: usize, mut pos: usize, base: usize) -> Result<Run, ExecError> {
        let program = self.program;
        let len = self.subject.len();
        loop {
            self.steps += 1;
            if self.steps > self.limits.match_limit {
                log::debug!("match limit {} reached", self.limits.match_limit);
                return Err(ExecError::MatchLimit);
            }
            let ok = match &program.insts[pc] {
                Inst::Match => {
                    let rejected = pos == self.attempt_start
                        && (self.options.contains(MatchOptions::NOTEMPTY)
                            || (self.options.contains(MatchOptions::NOTEMPTY_ATSTART)
                                && pos == self.start_offset));
                    if !rejected {
                        return Ok(Run::Matched(pos));
                    }
                    false
                }
                Inst::SubMatch => return Ok(Run::Matched(pos)),
                Inst::Char(c) => self.consume(&mut pos, |ch| ch == *c),
                Inst::CharAny(variants) => self.consume(&mut pos, |ch| variants.contains(&ch)),
                Inst::Any => self.consume(&mut pos, |_| true),
                Inst::NotNewline => {
                    program.lines.newline_at(self.subject, pos).is_none()
                        && self.consume(&mut pos, |_| true)
                }
                Inst::Class(set) => {
                    let ucp = program.ucp;
                    self.consume(&mut pos, |ch| set.matches(ch, ucp))
                }
                Inst::LineBreak => match program.lines.line_break_at(self.subject, pos) {
                    Some(n) => {
                        pos += n;
                        true
                    }
                    None => {
                        if pos >= len {
                            self.hit_end(pos);
                        }
                        false
                    }
                },
                Inst::Assert(a) => {
                    if pos == len && checks_end(*a, self.options) {
                        self.hit_end(pos);
                    }
                    self.assertion(*a, pos)
                }
                Inst::Split { first, second } => {
                    self.push(Frame::Step { pc: *second, pos })?;
                    pc = *first;
                    continue;
                }
                Inst::Jmp(target) => {
                    pc = *target;
                    continue;
                }
                Inst::Open { reg } => {
                    self.mark(*reg, pos)?;
                    true
                }
                Inst::Close { group, reg } => {
                    // The previous iteration's span stays visible until this one completes.
                    let start = self.cache.marks[*reg];
                    self.save(group * 2, start)?;
                    self.save(group * 2 + 1, pos)?;
                    true
                }
                Inst::Backref { groups, caseless } => match self.backref(groups, *caseless, pos) {
                    Ok(end) => {
                        pos = end;
                        true
                    }
                    Err(ran_out) => {
                        if ran_out {
                            self.hit_end(len);
                        }
                        false
                    }
                },
                Inst::Look {
                    behind,
                    negate,
                    next,
                } => {
                    let from = match behind {
                        None => Some(pos),
                        Some(width) => self.back(pos, *width),
                    };
                    let sub_base = self.cache.stack.len();
                    let hit = match from {
                        Some(from) => match self.run(pc + 1, from, sub_base)? {
                            Run::Matched(_) => true,
                            Run::Failed => false,
                            Run::Partial => return Ok(Run::Partial),
                        },
                        None => false,
                    };
                    if hit && *negate {
                        self.unwind(sub_base);
                    } else if hit {
                        self.commit(sub_base);
                    }
                    if hit != *negate {
                        pc = *next;
                        continue;
                    }
                    false
                }
                Inst::Atomic { next } => {
                    let sub_base = self.cache.stack.len();
                    match self.run(pc + 1, pos, sub_base)? {
                        Run::Matched(end) => {
                            self.commit(sub_base);
                            pos = end;
                            pc = *next;
                            continue;
                        }
                        Run::Failed => false,
                        Run::Partial => return Ok(Run::Partial),
                    }
                }
                Inst::RepeatStart { reg } => {
                    self.mark(*reg, pos)?;
                    true
                }
                Inst::RepeatCheck { reg, exit, head } => {
                    if self.cache.marks[*reg] == pos {
                        pc = *exit;
                    } else {
                        self.mark(*reg, pos)?;
                        pc = *head;
                    }
                    continue;
                }
            };
            if self.hard_stop {
                return Ok(Run::Partial);
            }
            if ok {
                pc += 1;
                continue;
            }
            match self.backtrack(base) {
                Some((next_pc, next_pos)) => {
                    pc = next_pc;
                    pos = next_pos;
                }
                None => return Ok(Run::Failed),
            }
        }
    }
}

/// Assertions that look past the end of the subject and so can ask for more input.
fn checks_end(a: Assertion, options: MatchOptions) -> bool {
    match a {
        Assertion::EndText
        | Assertion::EndTextOptNewline
        | Assertion::WordBoundary
        | Assertion::NotWordBoundary => true,
        Assertion::LineEnd { .. } => !options.contains(MatchOptions::NOTEOL),
        _ => false,
    }
}
