//! Parsed pattern tree
//!
//! Inline flags are resolved during parsing, so every node carries the
//! flags that apply to it and later passes never track flag state.

use super::class::ClassSet;

/// Zero-width assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assertion {
    /// `\A`
    StartText,
    /// `\z`
    EndText,
    /// `\Z`
    EndTextOptNewline,
    /// `^`
    LineStart { multiline: bool },
    /// `$`
    LineEnd { multiline: bool, end_only: bool },
    /// `\G`
    StartOffset,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookKind {
    Ahead,
    /// Lookbehind over a body of this many characters.
    Behind(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Empty,
    Literal {
        c: u32,
        caseless: bool,
    },
    /// `.`; `dotall` lets it match newlines.
    Dot {
        dotall: bool,
    },
    /// `\N`
    NotNewline,
    /// `\R`
    LineBreak,
    Class(Box<ClassSet>),
    Assert(Assertion),
    Capture {
        index: usize,
        node: Box<Node>,
    },
    Concat(Vec<Node>),
    Alternate(Vec<Node>),
    Repeat {
        node: Box<Node>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        possessive: bool,
    },
    /// Groups sharing a name are listed in order; the first set one is used.
    Backref {
        groups: Vec<usize>,
        caseless: bool,
    },
    /// Named reference awaiting resolution once all groups are known.
    NamedBackref {
        name: String,
        caseless: bool,
        offset: usize,
    },
    Look {
        kind: LookKind,
        negate: bool,
        node: Box<Node>,
    },
    Atomic(Box<Node>),
}

impl Node {
    /// Length in characters when every path through the node has the same length.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Node::Empty | Node::Assert(_) | Node::Look { .. } => Some(0),
            Node::Literal { .. } | Node::Dot { .. } | Node::NotNewline | Node::Class(_) => {
                Some(1)
            }
            Node::LineBreak | Node::Backref { .. } | Node::NamedBackref { .. } => None,
            Node::Capture { node, .. } | Node::Atomic(node) => node.fixed_width(),
            Node::Concat(nodes) => nodes
                .iter()
                .try_fold(0usize, |acc, n| Some(acc.checked_add(n.fixed_width()?)?)),
            Node::Alternate(nodes) => {
                let mut widths = nodes.iter().map(Node::fixed_width);
                let first = widths.next()??;
                widths.all(|w| w == Some(first)).then_some(first)
            }
            Node::Repeat { node, min, max, .. } => {
                if *max != Some(*min) {
                    return None;
                }
                node.fixed_width()?.checked_mul(*min as usize)
            }
        }
    }

    /// Lower bound on the number of subject bytes a match of this node consumes.
    pub fn min_bytes(&self, utf: bool) -> usize {
        match self {
            Node::Empty
            | Node::Assert(_)
            | Node::Look { .. }
            | Node::Backref { .. }
            | Node::NamedBackref { .. } => 0,
            Node::Literal { c, caseless } => {
                if utf && !*caseless {
                    char::from_u32(*c).map_or(1, char::len_utf8)
                } else {
                    1
                }
            }
            Node::Dot { .. } | Node::NotNewline | Node::LineBreak | Node::Class(_) => 1,
            Node::Capture { node, .. } | Node::Atomic(node) => node.min_bytes(utf),
            Node::Concat(nodes) => nodes
                .iter()
                .fold(0usize, |acc, n| acc.saturating_add(n.min_bytes(utf))),
            Node::Alternate(nodes) => nodes.iter().map(|n| n.min_bytes(utf)).min().unwrap_or(0),
            Node::Repeat { node, min, .. } => node.min_bytes(utf).saturating_mul(*min as usize),
        }
    }

    /// Leading literal characters that every match starts with, case-sensitive only.
    pub fn literal_prefix(&self, out: &mut Vec<u32>) -> bool {
        match self {
            Node::Literal { c, caseless: false } => {
                out.push(*c);
                true
            }
            Node::Empty => true,
            Node::Capture { node, .. } => node.literal_prefix(out),
            Node::Concat(nodes) => {
                for n in nodes {
                    if !n.literal_prefix(out) {
                        return false;
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Visit every node, children after parents.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        f(self);
        match self {
            Node::Capture { node, .. }
            | Node::Atomic(node)
            | Node::Look { node, .. }
            | Node::Repeat { node, .. } => node.walk_mut(f),
            Node::Concat(nodes) | Node::Alternate(nodes) => {
                for n in nodes {
                    n.walk_mut(f);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(c: char) -> Node {
        Node::Literal {
            c: c as u32,
            caseless: false,
        }
    }

    #[test]
    fn test_fixed_width() {
        let node = Node::Concat(vec![lit('a'), lit('b')]);
        assert_eq!(node.fixed_width(), Some(2));
        let alt = Node::Alternate(vec![lit('a'), Node::Concat(vec![lit('b'), lit('c')])]);
        assert_eq!(alt.fixed_width(), None);
        let rep = Node::Repeat {
            node: Box::new(lit('a')),
            min: 3,
            max: Some(3),
            greedy: true,
            possessive: false,
        };
        assert_eq!(rep.fixed_width(), Some(3));
    }

    #[test]
    fn test_min_bytes_utf() {
        assert_eq!(lit('é').min_bytes(true), 2);
        assert_eq!(lit('é').min_bytes(false), 1);
        let alt = Node::Alternate(vec![lit('a'), Node::Empty]);
        assert_eq!(alt.min_bytes(false), 0);
    }

    #[test]
    fn test_literal_prefix_stops_at_class() {
        let node = Node::Concat(vec![lit('a'), lit('b'), Node::Dot { dotall: false }, lit('c')]);
        let mut out = Vec::new();
        assert!(!node.literal_prefix(&mut out));
        assert_eq!(out, vec!['a' as u32, 'b' as u32]);
    }
}
