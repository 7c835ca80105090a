//! Start-position analysis and study plans
//!
//! Compilation records what every match must look like at its start
//! ([`Analysis`]). Studying turns that into a [`StudyData`] plan that the
//! executor uses to skip start positions which cannot begin a match. A plan
//! only ever skips positions where an attempt would fail without consuming
//! anything, so studied and unstudied runs report the same results.

use super::ast::{Assertion, Node};
use super::class::{case_variants, ClassSet};
use super::options::{CompileOptions, PartialMode};
use super::text::encode_utf8;

/// Where a match may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartKind {
    Anywhere,
    /// Only at the start offset (`\A`, `\G`, `^` without multiline, or ANCHORED).
    StartOffset,
    /// At the start offset or just after a newline.
    LineStart,
}

#[derive(Debug, Clone)]
pub(crate) struct Analysis {
    pub start: StartKind,
    /// Bytes a match can start with; `None` when unrestricted or the pattern can match empty.
    pub first_bytes: Option<Box<[bool; 256]>>,
    pub min_len: usize,
}

/// An acceleration plan built by [`crate::Regex::study`].
#[derive(Debug, Clone)]
pub struct StudyData {
    pub(crate) mode: PartialMode,
    pub(crate) start: StartKind,
    pub(crate) first_bytes: Option<Box<[bool; 256]>>,
    pub(crate) min_len: usize,
}

impl StudyData {
    pub(crate) fn build(analysis: &Analysis, mode: PartialMode) -> Self {
        // A partial match can come from a shorter tail, or from a leading
        // lookaround that reads to the end before any first byte is seen.
        let plan = if mode == PartialMode::None {
            Self {
                mode,
                start: analysis.start,
                first_bytes: analysis.first_bytes.clone(),
                min_len: analysis.min_len,
            }
        } else {
            Self {
                mode,
                start: analysis.start,
                first_bytes: None,
                min_len: 0,
            }
        };
        log::debug!(
            "study plan for {:?}: start={:?} first_bytes={} min_len={}",
            mode,
            plan.start,
            plan.first_bytes.is_some(),
            plan.min_len
        );
        plan
    }

    /// The partial mode this plan was built for.
    pub fn mode(&self) -> PartialMode {
        self.mode
    }

    /// Whether the plan can skip any start positions at all.
    pub fn accelerates(&self) -> bool {
        self.start != StartKind::Anywhere || self.first_bytes.is_some() || self.min_len > 0
    }
}

pub(crate) fn analyze(node: &Node, options: CompileOptions) -> Analysis {
    let utf = options.utf8();
    let start = if options.contains(CompileOptions::ANCHORED) {
        StartKind::StartOffset
    } else {
        start_kind(node)
    };
    let mut set = [false; 256];
    let first_bytes = match first_bytes(node, utf, &mut set) {
        Some(false) => Some(Box::new(set)),
        _ => None,
    };
    Analysis {
        start,
        first_bytes,
        min_len: node.min_bytes(utf),
    }
}

fn start_kind(node: &Node) -> StartKind {
    match node {
        Node::Assert(
            Assertion::StartText | Assertion::StartOffset | Assertion::LineStart { multiline: false },
        ) => StartKind::StartOffset,
        Node::Assert(Assertion::LineStart { multiline: true }) => StartKind::LineStart,
        Node::Capture { node, .. } | Node::Atomic(node) => start_kind(node),
        Node::Concat(nodes) => nodes.first().map_or(StartKind::Anywhere, start_kind),
        Node::Alternate(branches) => {
            let mut kinds = branches.iter().map(start_kind);
            let Some(first) = kinds.next() else {
                return StartKind::Anywhere;
            };
            kinds.fold(first, |acc, k| match (acc, k) {
                (StartKind::StartOffset, StartKind::StartOffset) => StartKind::StartOffset,
                (StartKind::Anywhere, _) | (_, StartKind::Anywhere) => StartKind::Anywhere,
                _ => StartKind::LineStart,
            })
        }
        _ => StartKind::Anywhere,
    }
}

fn mark_char(c: u32, utf: bool, set: &mut [bool; 256]) {
    if utf {
        let mut buf = Vec::with_capacity(4);
        encode_utf8(c, &mut buf);
        if let Some(&b) = buf.first() {
            set[usize::from(b)] = true;
        }
        // Unchecked invalid input decodes a stray byte as itself.
        if (0x80..=0xff).contains(&c) {
            set[c as usize] = true;
        }
    } else if c <= 0xff {
        set[c as usize] = true;
    }
}

fn mark_class(class: &ClassSet, utf: bool, ucp: bool, set: &mut [bool; 256]) {
    let top = if utf { 0x80 } else { 0x100 };
    for b in 0..top {
        if class.matches(b, ucp) {
            set[b as usize] = true;
        }
    }
    if utf && !class.ascii_only() {
        for slot in set.iter_mut().skip(0x80) {
            *slot = true;
        }
    }
}

/// Collect possible first bytes. Returns whether the node can match empty,
/// or `None` when its first byte is unconstrained.
fn first_bytes(node: &Node, utf: bool, set: &mut [bool; 256]) -> Option<bool> {
    match node {
        Node::Empty | Node::Assert(_) | Node::Look { .. } => Some(true),
        Node::Literal { c, caseless } => {
            mark_char(*c, utf, set);
            if *caseless {
                for alt in case_variants(*c) {
                    mark_char(alt, utf, set);
                }
            }
            Some(false)
        }
        Node::LineBreak => {
            for b in [b'\n', 0x0b, 0x0c, b'\r'] {
                set[usize::from(b)] = true;
            }
            if utf {
                set[0xc2] = true;
                set[0xe2] = true;
            } else {
                set[0x85] = true;
            }
            Some(false)
        }
        Node::Class(class) => {
            // The widest predicate reading still has to be a superset, so treat UCP as on.
            mark_class(class, utf, true, set);
            mark_class(class, utf, false, set);
            Some(false)
        }
        Node::Dot { .. } | Node::NotNewline | Node::Backref { .. } | Node::NamedBackref { .. } => {
            None
        }
        Node::Capture { node, .. } | Node::Atomic(node) => first_bytes(node, utf, set),
        Node::Concat(nodes) => {
            for n in nodes {
                if !first_bytes(n, utf, set)? {
                    return Some(false);
                }
            }
            Some(true)
        }
        Node::Alternate(branches) => {
            let mut nullable = false;
            for b in branches {
                nullable |= first_bytes(b, utf, set)?;
            }
            Some(nullable)
        }
        Node::Repeat { node, min, .. } => {
            let nullable = first_bytes(node, utf, set)?;
            Some(nullable || *min == 0)
        }
    }
}
