//! Pattern parser
//!
//! Turns pattern bytes plus compile options into a [`Node`] tree, the
//! capture-group count and the group-name table. Every error carries the
//! byte offset into the pattern where it was detected.

use super::ast::{Assertion, LookKind, Node};
use super::class::{posix_by_name, property_by_name, ClassItem, ClassSet, PerlClass};
use super::error::{CompileError, CompileErrorKind as Kind};
use super::options::{Bsr, CompileOptions, Newline};
use super::text::decode_utf8;

const MAX_REPEAT: u32 = 65535;
const MAX_NAME_LEN: usize = 32;
/// Deepest group nesting accepted.
const MAX_NESTING: usize = 250;

/// Inline-changeable flags.
#[derive(Debug, Clone, Copy)]
struct Flags {
    caseless: bool,
    multiline: bool,
    dotall: bool,
    extended: bool,
    ungreedy: bool,
    dupnames: bool,
}

/// Output of a successful parse.
#[derive(Debug)]
pub(crate) struct Parsed {
    pub node: Node,
    pub captures: usize,
    /// Group names in definition order.
    pub names: Vec<(String, usize)>,
    /// Options after leading `(*VERB)` overrides.
    pub options: CompileOptions,
    pub newline: Newline,
    pub bsr: Bsr,
}

pub(crate) fn parse(pattern: &[u8], options: CompileOptions) -> Result<Parsed, CompileError> {
    if let Some(k) = pattern.iter().position(|&b| b == 0) {
        return Err(CompileError::new(Kind::NulByteInPattern, k));
    }
    let (start, options) = parse_verbs(pattern, options)?;
    if options.utf8() && options.contains(CompileOptions::NEVER_UTF) {
        return Err(CompileError::with_message(
            Kind::InconsistentOptions,
            "setting UTF is disabled by the application",
            0,
        ));
    }
    let newline = options
        .newline()
        .ok_or_else(|| CompileError::new(Kind::InconsistentOptions, 0))?;
    let bsr = options.bsr().ok_or_else(|| {
        CompileError::with_message(Kind::InconsistentOptions, "inconsistent BSR options", 0)
    })?;
    if options.utf8() && !options.contains(CompileOptions::NO_UTF8_CHECK) {
        if let Err(e) = std::str::from_utf8(pattern) {
            return Err(CompileError::new(Kind::InvalidUtf8, e.valid_up_to()));
        }
    }

    let mut parser = Parser {
        pattern,
        pos: start,
        flags: Flags {
            caseless: options.contains(CompileOptions::CASELESS),
            multiline: options.contains(CompileOptions::MULTILINE),
            dotall: options.contains(CompileOptions::DOTALL),
            extended: options.contains(CompileOptions::EXTENDED),
            ungreedy: options.contains(CompileOptions::UNGREEDY),
            dupnames: options.contains(CompileOptions::DUPNAMES),
        },
        utf: options.utf8(),
        dollar_endonly: options.contains(CompileOptions::DOLLAR_ENDONLY),
        no_auto_capture: options.contains(CompileOptions::NO_AUTO_CAPTURE),
        extra: options.contains(CompileOptions::EXTRA),
        class_quote: false,
        captures: 0,
        names: Vec::new(),
        backrefs: Vec::new(),
        depth: 0,
    };
    let mut node = parser.parse_alternation(None)?;
    parser.resolve_backrefs(&mut node)?;

    Ok(Parsed {
        node,
        captures: parser.captures,
        names: parser.names,
        options,
        newline,
        bsr,
    })
}

/// Apply leading `(*UTF8)`-style verbs. Unknown verbs are left for the parser.
fn parse_verbs(
    pattern: &[u8],
    mut options: CompileOptions,
) -> Result<(usize, CompileOptions), CompileError> {
    let mut pos = 0;
    while pattern[pos..].starts_with(b"(*") {
        let Some(len) = pattern[pos + 2..].iter().position(|&b| b == b')') else {
            break;
        };
        let name = &pattern[pos + 2..pos + 2 + len];
        match name {
            b"UTF8" | b"UTF" => {
                if options.contains(CompileOptions::NEVER_UTF) {
                    return Err(CompileError::with_message(
                        Kind::InconsistentOptions,
                        "setting UTF is disabled by the application",
                        pos,
                    ));
                }
                options |= CompileOptions::UTF8;
            }
            b"UCP" => options |= CompileOptions::UCP,
            b"CR" => options = options.with_newline(Newline::Cr),
            b"LF" => options = options.with_newline(Newline::Lf),
            b"CRLF" => options = options.with_newline(Newline::CrLf),
            b"ANY" => options = options.with_newline(Newline::Any),
            b"ANYCRLF" => options = options.with_newline(Newline::AnyCrLf),
            b"BSR_ANYCRLF" => {
                options.remove(CompileOptions::BSR_UNICODE);
                options |= CompileOptions::BSR_ANYCRLF;
            }
            b"BSR_UNICODE" => {
                options.remove(CompileOptions::BSR_ANYCRLF);
                options |= CompileOptions::BSR_UNICODE;
            }
            b"NO_START_OPT" => options |= CompileOptions::NO_START_OPTIMIZE,
            _ => break,
        }
        pos += len + 3;
    }
    Ok((pos, options))
}

enum ClassAtom {
    Char(u32),
    Item(ClassItem),
    Skip,
}

struct Parser<'p> {
    pattern: &'p [u8],
    pos: usize,
    flags: Flags,
    utf: bool,
    dollar_endonly: bool,
    no_auto_capture: bool,
    extra: bool,
    class_quote: bool,
    captures: usize,
    names: Vec<(String, usize)>,
    /// Numeric backreferences and where they appeared, checked once all groups are known.
    backrefs: Vec<(usize, usize)>,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.pattern.get(self.pos + n).copied()
    }

    fn err(&self, kind: Kind) -> CompileError {
        CompileError::new(kind, self.pos)
    }

    fn next_char(&mut self) -> u32 {
        let b = self.pattern[self.pos];
        if !self.utf || b < 0x80 {
            self.pos += 1;
            return u32::from(b);
        }
        match decode_utf8(&self.pattern[self.pos..]) {
            Some((c, len)) => {
                self.pos += len;
                c
            }
            None => {
                self.pos += 1;
                u32::from(b)
            }
        }
    }

    fn skip_extended(&mut self) {
        if !self.flags.extended {
            return;
        }
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'#' => {
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_alternation(&mut self, open: Option<usize>) -> Result<Node, CompileError> {
        let mut branches = Vec::new();
        loop {
            branches.push(self.parse_concat()?);
            match self.peek() {
                Some(b'|') => self.pos += 1,
                Some(b')') => {
                    if open.is_none() {
                        return Err(self.err(Kind::UnmatchedParenthesis));
                    }
                    break;
                }
                _ => {
                    if let Some(open) = open {
                        return Err(CompileError::new(Kind::UnterminatedGroup, open + 1));
                    }
                    break;
                }
            }
        }
        Ok(if branches.len() == 1 {
            branches.pop().unwrap_or(Node::Empty)
        } else {
            Node::Alternate(branches)
        })
    }

    fn parse_concat(&mut self) -> Result<Node, CompileError> {
        let mut items = Vec::new();
        loop {
            self.skip_extended();
            let Some(b) = self.peek() else {
                break;
            };
            match b {
                b'|' | b')' => break,
                b'*' | b'+' | b'?' => return Err(self.err(Kind::NothingToRepeat)),
                b'{' if self.brace_quantifier_ahead() => {
                    return Err(self.err(Kind::NothingToRepeat))
                }
                _ => {}
            }
            let Some(atom) = self.parse_atom(&mut items)? else {
                continue;
            };
            let atom = self.parse_quantifier(atom)?;
            items.push(atom);
        }
        Ok(match items.len() {
            0 => Node::Empty,
            1 => items.pop().unwrap_or(Node::Empty),
            _ => Node::Concat(items),
        })
    }

    fn parse_atom(&mut self, items: &mut Vec<Node>) -> Result<Option<Node>, CompileError> {
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let node = match b {
            b'(' => return self.parse_group(),
            b'[' => self.parse_class()?,
            b'\\' => return self.parse_escape(items),
            b'.' => {
                self.pos += 1;
                Node::Dot {
                    dotall: self.flags.dotall,
                }
            }
            b'^' => {
                self.pos += 1;
                Node::Assert(Assertion::LineStart {
                    multiline: self.flags.multiline,
                })
            }
            b'$' => {
                self.pos += 1;
                Node::Assert(Assertion::LineEnd {
                    multiline: self.flags.multiline,
                    end_only: self.dollar_endonly,
                })
            }
            _ => {
                let c = self.next_char();
                self.literal(c)
            }
        };
        Ok(Some(node))
    }

    fn literal(&self, c: u32) -> Node {
        Node::Literal {
            c,
            caseless: self.flags.caseless,
        }
    }

    fn parse_quantifier(&mut self, atom: Node) -> Result<Node, CompileError> {
        self.skip_extended();
        let (min, max) = match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                (0, None)
            }
            Some(b'+') => {
                self.pos += 1;
                (1, None)
            }
            Some(b'?') => {
                self.pos += 1;
                (0, Some(1))
            }
            Some(b'{') => match self.parse_brace()? {
                Some(range) => range,
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };
        let mut greedy = !self.flags.ungreedy;
        let mut possessive = false;
        match self.peek() {
            Some(b'?') => {
                greedy = !greedy;
                self.pos += 1;
            }
            Some(b'+') => {
                possessive = true;
                greedy = true;
                self.pos += 1;
            }
            _ => {}
        }
        self.skip_extended();
        match self.peek() {
            Some(b'*' | b'+' | b'?') => return Err(self.err(Kind::NothingToRepeat)),
            Some(b'{') if self.brace_quantifier_ahead() => {
                return Err(self.err(Kind::NothingToRepeat))
            }
            _ => {}
        }
        let repeat = Node::Repeat {
            node: Box::new(atom),
            min,
            max,
            greedy,
            possessive,
        };
        Ok(if possessive {
            Node::Atomic(Box::new(repeat))
        } else {
            repeat
        })
    }

    /// Scan `{n}`, `{n,}` or `{n,m}` without consuming it.
    fn scan_brace(&self) -> Option<(usize, usize, Option<(usize, usize)>)> {
        let rest = &self.pattern[self.pos..];
        if rest.first() != Some(&b'{') {
            return None;
        }
        let digits = |from: usize| rest[from..].iter().take_while(|b| b.is_ascii_digit()).count();
        let n = digits(1);
        if n == 0 {
            return None;
        }
        match rest.get(1 + n)? {
            b'}' => Some((1, 1 + n, None)),
            b',' => {
                let i = 2 + n;
                let m = digits(i);
                (rest.get(i + m) == Some(&b'}')).then_some((1, 1 + n, Some((i, i + m))))
            }
            _ => None,
        }
    }

    fn brace_quantifier_ahead(&self) -> bool {
        self.scan_brace().is_some()
    }

    fn parse_brace(&mut self) -> Result<Option<(u32, Option<u32>)>, CompileError> {
        let Some((lo_start, lo_end, upper)) = self.scan_brace() else {
            return Ok(None);
        };
        let base = self.pos;
        let number = |start: usize, end: usize| -> Result<u32, CompileError> {
            let text = &self.pattern[base + start..base + end];
            let mut value: u32 = 0;
            for &d in text {
                value = value * 10 + u32::from(d - b'0');
                if value > MAX_REPEAT {
                    return Err(CompileError::new(Kind::QuantifierTooBig, base + end));
                }
            }
            Ok(value)
        };
        let min = number(lo_start, lo_end)?;
        let (max, close) = match upper {
            None => (Some(min), lo_end),
            Some((s, e)) if s == e => (None, e),
            Some((s, e)) => (Some(number(s, e)?), e),
        };
        if let Some(max) = max {
            if max < min {
                return Err(CompileError::new(Kind::QuantifierOutOfOrder, base + close));
            }
        }
        self.pos = base + close + 1;
        Ok(Some((min, max)))
    }

    fn parse_group(&mut self) -> Result<Option<Node>, CompileError> {
        let open = self.pos;
        self.pos += 1;
        if self.peek() == Some(b'*') && self.peek_at(1).is_some_and(|b| b.is_ascii_uppercase()) {
            return Err(CompileError::with_message(
                Kind::Unsupported,
                "(*VERB) not recognized or malformed",
                self.pos,
            ));
        }
        if self.peek() != Some(b'?') {
            if self.no_auto_capture {
                return self.group_body(open).map(Some);
            }
            return self.capture_group(open).map(Some);
        }
        self.pos += 1;
        let Some(b) = self.peek() else {
            return Err(CompileError::new(Kind::UnterminatedGroup, open + 1));
        };
        match b {
            b'#' => {
                let Some(len) = self.pattern[self.pos..].iter().position(|&b| b == b')') else {
                    return Err(CompileError::with_message(
                        Kind::UnterminatedGroup,
                        "missing ) after comment",
                        self.pattern.len(),
                    ));
                };
                self.pos += len + 1;
                Ok(None)
            }
            b':' => {
                self.pos += 1;
                self.group_body(open).map(Some)
            }
            b'>' => {
                self.pos += 1;
                let body = self.group_body(open)?;
                Ok(Some(Node::Atomic(Box::new(body))))
            }
            b'=' | b'!' => {
                self.pos += 1;
                let body = self.group_body(open)?;
                Ok(Some(Node::Look {
                    kind: LookKind::Ahead,
                    negate: b == b'!',
                    node: Box::new(body),
                }))
            }
            b'<' if matches!(self.peek_at(1), Some(b'=' | b'!')) => {
                let negate = self.peek_at(1) == Some(b'!');
                self.pos += 2;
                let body = self.group_body(open)?;
                self.lookbehind(open, negate, body).map(Some)
            }
            b'<' => {
                self.pos += 1;
                self.named_group(open, b'>').map(Some)
            }
            b'\'' => {
                self.pos += 1;
                self.named_group(open, b'\'').map(Some)
            }
            b'P' => match self.peek_at(1) {
                Some(b'<') => {
                    self.pos += 2;
                    self.named_group(open, b'>').map(Some)
                }
                Some(b'=') => {
                    self.pos += 2;
                    let name = self.read_name(b')')?;
                    Ok(Some(Node::NamedBackref {
                        name,
                        caseless: self.flags.caseless,
                        offset: open,
                    }))
                }
                Some(b'>') => Err(self.unsupported("recursion and subroutine calls")),
                _ => Err(self.err(Kind::UnrecognizedGroupSyntax)),
            },
            b'|' => Err(self.unsupported("branch reset groups")),
            b'(' => Err(self.unsupported("conditional groups")),
            b'C' => Err(self.unsupported("callouts")),
            b'R' | b'&' | b'+' | b'0'..=b'9' => {
                Err(self.unsupported("recursion and subroutine calls"))
            }
            b'-' if self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) => {
                Err(self.unsupported("recursion and subroutine calls"))
            }
            _ => self.inline_flags(open),
        }
    }

    fn unsupported(&self, what: &str) -> CompileError {
        CompileError::with_message(Kind::Unsupported, format!("{what} are not supported"), self.pos)
    }

    fn inline_flags(&mut self, open: usize) -> Result<Option<Node>, CompileError> {
        let mut flags = self.flags;
        let mut on = true;
        loop {
            let Some(b) = self.peek() else {
                return Err(CompileError::new(Kind::UnterminatedGroup, open + 1));
            };
            self.pos += 1;
            match b {
                b'-' if on => on = false,
                b'i' => flags.caseless = on,
                b'm' => flags.multiline = on,
                b's' => flags.dotall = on,
                b'x' => flags.extended = on,
                b'U' => flags.ungreedy = on,
                b'J' => flags.dupnames = on,
                b')' => {
                    self.flags = flags;
                    return Ok(None);
                }
                b':' => {
                    let outer = self.flags;
                    self.flags = flags;
                    let body = self.group_body(open);
                    self.flags = outer;
                    return body.map(Some);
                }
                _ => {
                    self.pos -= 1;
                    return Err(self.err(Kind::UnrecognizedGroupSyntax));
                }
            }
        }
    }

    /// Parse up to the matching `)`. Flags set inside do not leak out.
    fn group_body(&mut self, open: usize) -> Result<Node, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::new(Kind::NestingTooDeep, open));
        }
        let saved = self.flags;
        self.depth += 1;
        let node = self.parse_alternation(Some(open));
        self.depth -= 1;
        let node = node?;
        // parse_alternation only returns at `)` when a group is open.
        self.pos += 1;
        self.flags = saved;
        Ok(node)
    }

    fn capture_group(&mut self, open: usize) -> Result<Node, CompileError> {
        self.captures += 1;
        let index = self.captures;
        let body = self.group_body(open)?;
        Ok(Node::Capture {
            index,
            node: Box::new(body),
        })
    }

    fn named_group(&mut self, open: usize, terminator: u8) -> Result<Node, CompileError> {
        let name = self.read_name(terminator)?;
        if !self.flags.dupnames && self.names.iter().any(|(n, _)| *n == name) {
            return Err(self.err(Kind::DuplicateGroupName));
        }
        self.captures += 1;
        let index = self.captures;
        self.names.push((name, index));
        let body = self.group_body(open)?;
        Ok(Node::Capture {
            index,
            node: Box::new(body),
        })
    }

    fn read_name(&mut self, terminator: u8) -> Result<String, CompileError> {
        let start = self.pos;
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            return Err(CompileError::with_message(
                Kind::InvalidGroupName,
                "group name must start with a non-digit",
                self.pos,
            ));
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        if self.pos == start || self.peek() != Some(terminator) {
            return Err(self.err(Kind::InvalidGroupName));
        }
        if self.pos - start > MAX_NAME_LEN {
            return Err(CompileError::with_message(
                Kind::InvalidGroupName,
                "subpattern name is too long (maximum 32 characters)",
                self.pos,
            ));
        }
        let name = String::from_utf8_lossy(&self.pattern[start..self.pos]).into_owned();
        self.pos += 1;
        Ok(name)
    }

    /// Each top-level branch of a lookbehind gets its own fixed-length assertion.
    fn lookbehind(&self, open: usize, negate: bool, body: Node) -> Result<Node, CompileError> {
        let branches = match body {
            Node::Alternate(branches) => branches,
            other => vec![other],
        };
        let mut looks = Vec::with_capacity(branches.len());
        for branch in branches {
            let width = branch
                .fixed_width()
                .ok_or_else(|| CompileError::new(Kind::LookbehindNotFixedLength, open))?;
            looks.push(Node::Look {
                kind: LookKind::Behind(width),
                negate,
                node: Box::new(branch),
            });
        }
        Ok(match looks.len() {
            1 => looks.pop().unwrap_or(Node::Empty),
            _ if negate => Node::Concat(looks),
            _ => Node::Atomic(Box::new(Node::Alternate(looks))),
        })
    }

    fn parse_escape(&mut self, items: &mut Vec<Node>) -> Result<Option<Node>, CompileError> {
        let start = self.pos;
        self.pos += 1;
        let Some(b) = self.peek() else {
            return Err(CompileError::new(Kind::TrailingEscape, self.pattern.len()));
        };
        let perl = |class, neg| {
            Node::Class(Box::new(ClassSet::single(ClassItem::Perl(class, neg))))
        };
        let assertion = |a| Some(Node::Assert(a));
        let node = match b {
            b'Q' => {
                self.pos += 1;
                return Ok(self.quoted_literals(items));
            }
            b'E' => {
                self.pos += 1;
                return Ok(None);
            }
            b'd' | b'D' | b'w' | b'W' | b's' | b'S' | b'h' | b'H' | b'v' | b'V' => {
                self.pos += 1;
                let (class, neg) = perl_class(b);
                return Ok(Some(perl(class, neg)));
            }
            b'p' | b'P' => {
                self.pos += 1;
                let item = self.parse_property(b == b'P')?;
                return Ok(Some(Node::Class(Box::new(ClassSet::single(item)))));
            }
            b'N' if self.peek_at(1) != Some(b'{') => {
                self.pos += 1;
                return Ok(Some(Node::NotNewline));
            }
            b'R' => {
                self.pos += 1;
                return Ok(Some(Node::LineBreak));
            }
            b'A' => assertion(Assertion::StartText),
            b'z' => assertion(Assertion::EndText),
            b'Z' => assertion(Assertion::EndTextOptNewline),
            b'G' => assertion(Assertion::StartOffset),
            b'b' => assertion(Assertion::WordBoundary),
            b'B' => assertion(Assertion::NotWordBoundary),
            b'g' => return self.parse_g_reference(start).map(Some),
            b'k' => return self.parse_k_reference(start).map(Some),
            b'1'..=b'9' => return self.parse_numeric_reference(start).map(Some),
            b'X' | b'C' | b'K' | b'L' | b'l' | b'U' | b'u' | b'N' => {
                return Err(CompileError::with_message(
                    Kind::Unsupported,
                    format!("\\{} is not supported", b as char),
                    start + 1,
                ));
            }
            _ => {
                let c = self.parse_char_escape()?;
                return Ok(Some(self.literal(c)));
            }
        };
        self.pos += 1;
        Ok(node)
    }

    /// `\Q...\E`: every literal but the last goes straight into the sequence
    /// so that a following quantifier binds to the last character only.
    fn quoted_literals(&mut self, items: &mut Vec<Node>) -> Option<Node> {
        let mut last = None;
        while self.pos < self.pattern.len() {
            if self.pattern[self.pos..].starts_with(b"\\E") {
                self.pos += 2;
                break;
            }
            let c = self.next_char();
            if let Some(prev) = last.replace(self.literal(c)) {
                items.push(prev);
            }
        }
        last
    }

    fn parse_property(&mut self, mut negated: bool) -> Result<ClassItem, CompileError> {
        let name = match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                if self.peek() == Some(b'^') {
                    negated = !negated;
                    self.pos += 1;
                }
                let start = self.pos;
                let Some(len) = self.pattern[start..].iter().position(|&b| b == b'}') else {
                    return Err(CompileError::with_message(
                        Kind::UnknownProperty,
                        "malformed \\P or \\p sequence",
                        self.pattern.len(),
                    ));
                };
                self.pos += len + 1;
                String::from_utf8_lossy(&self.pattern[start..start + len]).into_owned()
            }
            Some(b) if b.is_ascii_alphabetic() => {
                self.pos += 1;
                (b as char).to_string()
            }
            _ => {
                return Err(CompileError::with_message(
                    Kind::UnknownProperty,
                    "malformed \\P or \\p sequence",
                    self.pos,
                ))
            }
        };
        let prop = property_by_name(&name).ok_or_else(|| self.err(Kind::UnknownProperty))?;
        Ok(ClassItem::Property(prop, negated))
    }

    fn reference(&mut self, group: usize, offset: usize) -> Node {
        self.backrefs.push((group, offset));
        Node::Backref {
            groups: vec![group],
            caseless: self.flags.caseless,
        }
    }

    fn named_reference(&self, name: String, offset: usize) -> Node {
        Node::NamedBackref {
            name,
            caseless: self.flags.caseless,
            offset,
        }
    }

    fn parse_numeric_reference(&mut self, start: usize) -> Result<Node, CompileError> {
        let digits_start = self.pos;
        let mut n: usize = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            n = n.saturating_mul(10).saturating_add(usize::from(d - b'0'));
            self.pos += 1;
        }
        let first = self.pattern[digits_start];
        if n >= 10 && n > self.captures && first < b'8' {
            // Not a plausible reference: read as an octal character instead.
            self.pos = digits_start;
            let c = self.octal_digits(3);
            return self.checked_char(c, start).map(|c| self.literal(c));
        }
        Ok(self.reference(n, start))
    }

    fn parse_g_reference(&mut self, start: usize) -> Result<Node, CompileError> {
        self.pos += 1;
        let (text, braced) = match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                let from = self.pos;
                let Some(len) = self.pattern[from..].iter().position(|&b| b == b'}') else {
                    return Err(self.g_error());
                };
                self.pos += len + 1;
                (&self.pattern[from..from + len], true)
            }
            Some(b'<' | b'\'') => return Err(self.unsupported("subroutine calls")),
            _ => {
                let from = self.pos;
                if matches!(self.peek(), Some(b'-' | b'+')) {
                    self.pos += 1;
                }
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
                (&self.pattern[from..self.pos], false)
            }
        };
        let (sign, digits) = match text.first() {
            Some(b'-') => (-1, &text[1..]),
            Some(b'+') => (1, &text[1..]),
            _ => (0, text),
        };
        if !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) {
            let n = digits
                .iter()
                .fold(0usize, |acc, d| acc.saturating_mul(10).saturating_add(usize::from(d - b'0')));
            let group = match sign {
                -1 => (self.captures + 1)
                    .checked_sub(n)
                    .filter(|&g| g > 0 && n > 0)
                    .ok_or_else(|| CompileError::new(Kind::UnknownGroupReference, start))?,
                1 => self.captures + n,
                _ => n,
            };
            if group == 0 {
                return Err(CompileError::new(Kind::UnknownGroupReference, start));
            }
            return Ok(self.reference(group, start));
        }
        if braced && sign == 0 && is_name(digits) {
            let name = String::from_utf8_lossy(digits).into_owned();
            return Ok(self.named_reference(name, start));
        }
        Err(self.g_error())
    }

    fn g_error(&self) -> CompileError {
        CompileError::with_message(
            Kind::InvalidEscape,
            "a numbered reference must not be zero",
            self.pos,
        )
    }

    fn parse_k_reference(&mut self, start: usize) -> Result<Node, CompileError> {
        self.pos += 1;
        let terminator = match self.peek() {
            Some(b'<') => b'>',
            Some(b'\'') => b'\'',
            Some(b'{') => b'}',
            _ => {
                return Err(CompileError::with_message(
                    Kind::InvalidEscape,
                    "\\k is not followed by a braced, angle-bracketed, or quoted name",
                    self.pos,
                ))
            }
        };
        self.pos += 1;
        let name = self.read_name(terminator)?;
        Ok(self.named_reference(name, start))
    }

    fn octal_digits(&mut self, max: usize) -> u32 {
        let mut c = 0u32;
        for _ in 0..max {
            match self.peek() {
                Some(d @ b'0'..=b'7') => {
                    c = c * 8 + u32::from(d - b'0');
                    self.pos += 1;
                }
                _ => break,
            }
        }
        c
    }

    fn checked_char(&self, c: u32, at: usize) -> Result<u32, CompileError> {
        let limit = if self.utf { 0x10ffff } else { 0xff };
        if c > limit {
            return Err(CompileError::with_message(
                Kind::InvalidEscape,
                "character value in \\x{} or \\o{} is too large",
                at,
            ));
        }
        if self.utf && (0xd800..=0xdfff).contains(&c) {
            return Err(CompileError::with_message(
                Kind::InvalidEscape,
                "disallowed Unicode code point (>= 0xd800 && <= 0xdfff)",
                at,
            ));
        }
        Ok(c)
    }

    /// A single-character escape; `self.pos` is on the character after `\`.
    fn parse_char_escape(&mut self) -> Result<u32, CompileError> {
        let at = self.pos;
        let b = self.pattern[self.pos];
        let simple = match b {
            b'a' => Some(0x07),
            b'e' => Some(0x1b),
            b'f' => Some(0x0c),
            b'n' => Some(0x0a),
            b'r' => Some(0x0d),
            b't' => Some(0x09),
            _ => None,
        };
        if let Some(c) = simple {
            self.pos += 1;
            return Ok(c);
        }
        match b {
            b'0' => {
                self.pos += 1;
                Ok(self.octal_digits(2))
            }
            b'o' => {
                self.pos += 1;
                let digits = self.braced_digits(8)?;
                self.checked_char(digits, at)
            }
            b'x' => {
                self.pos += 1;
                if self.peek() == Some(b'{') {
                    let value = self.braced_digits(16)?;
                    return self.checked_char(value, at);
                }
                let mut c = 0u32;
                for _ in 0..2 {
                    match self.peek().and_then(|d| (d as char).to_digit(16)) {
                        Some(d) => {
                            c = c * 16 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                Ok(c)
            }
            b'c' => {
                self.pos += 1;
                match self.peek() {
                    None => Err(CompileError::with_message(
                        Kind::TrailingEscape,
                        "\\c at end of pattern",
                        self.pattern.len(),
                    )),
                    Some(c) if c.is_ascii() && !c.is_ascii_control() => {
                        self.pos += 1;
                        Ok(u32::from(c.to_ascii_uppercase() ^ 0x40))
                    }
                    Some(_) => Err(CompileError::with_message(
                        Kind::InvalidEscape,
                        "\\c must be followed by an ASCII character",
                        self.pos,
                    )),
                }
            }
            b if b.is_ascii_alphanumeric() => {
                if self.extra {
                    return Err(CompileError::new(Kind::UnknownEscape, at + 1));
                }
                self.pos += 1;
                Ok(u32::from(b))
            }
            _ => Ok(self.next_char()),
        }
    }

    fn braced_digits(&mut self, radix: u32) -> Result<u32, CompileError> {
        if self.peek() != Some(b'{') {
            return Err(self.err(Kind::InvalidEscape));
        }
        self.pos += 1;
        let mut value: u32 = 0;
        let mut any = false;
        while let Some(d) = self.peek().and_then(|d| (d as char).to_digit(radix)) {
            value = value.saturating_mul(radix).saturating_add(d);
            any = true;
            self.pos += 1;
        }
        if !any || self.peek() != Some(b'}') {
            return Err(self.err(Kind::InvalidEscape));
        }
        self.pos += 1;
        Ok(value)
    }

    fn parse_class(&mut self) -> Result<Node, CompileError> {
        self.pos += 1;
        let mut set = ClassSet::new(false, self.flags.caseless);
        if self.peek() == Some(b'^') {
            set.negated = true;
            self.pos += 1;
        }
        let mut first = true;
        loop {
            let Some(b) = self.peek() else {
                return Err(CompileError::new(Kind::UnterminatedClass, self.pattern.len()));
            };
            if b == b']' && !first && !self.class_quote {
                self.pos += 1;
                break;
            }
            first = false;
            let lo = match self.class_atom()? {
                ClassAtom::Skip => continue,
                ClassAtom::Item(item) => {
                    set.items.push(item);
                    continue;
                }
                ClassAtom::Char(c) => c,
            };
            let range_ahead = self.peek() == Some(b'-')
                && !self.class_quote
                && self.peek_at(1).is_some_and(|b| b != b']');
            if !range_ahead {
                set.items.push(ClassItem::Range(lo, lo));
                continue;
            }
            self.pos += 1;
            match self.class_atom()? {
                ClassAtom::Char(hi) => {
                    if hi < lo {
                        return Err(self.err(Kind::RangeOutOfOrder));
                    }
                    set.items.push(ClassItem::Range(lo, hi));
                }
                other => {
                    set.items.push(ClassItem::Range(lo, lo));
                    set.items.push(ClassItem::Range(u32::from(b'-'), u32::from(b'-')));
                    if let ClassAtom::Item(item) = other {
                        set.items.push(item);
                    }
                }
            }
        }
        Ok(Node::Class(Box::new(set)))
    }

    fn class_atom(&mut self) -> Result<ClassAtom, CompileError> {
        let Some(b) = self.peek() else {
            return Err(CompileError::new(Kind::UnterminatedClass, self.pattern.len()));
        };
        if self.class_quote {
            if self.pattern[self.pos..].starts_with(b"\\E") {
                self.pos += 2;
                self.class_quote = false;
                return Ok(ClassAtom::Skip);
            }
            return Ok(ClassAtom::Char(self.next_char()));
        }
        match b {
            b'[' => self.posix_class(),
            b'\\' => self.class_escape(),
            _ => Ok(ClassAtom::Char(self.next_char())),
        }
    }

    fn posix_class(&mut self) -> Result<ClassAtom, CompileError> {
        let rest = &self.pattern[self.pos..];
        let delim = match rest.get(1) {
            Some(&d @ (b':' | b'.' | b'=')) => d,
            _ => {
                self.pos += 1;
                return Ok(ClassAtom::Char(u32::from(b'[')));
            }
        };
        let close = rest[2..]
            .windows(2)
            .position(|w| w[0] == delim && w[1] == b']');
        let Some(close) = close else {
            self.pos += 1;
            return Ok(ClassAtom::Char(u32::from(b'[')));
        };
        if delim != b':' {
            return Err(CompileError::with_message(
                Kind::Unsupported,
                "POSIX collating elements are not supported",
                self.pos,
            ));
        }
        let mut name = &rest[2..2 + close];
        let negated = name.first() == Some(&b'^');
        if negated {
            name = &name[1..];
        }
        let class = posix_by_name(name).ok_or_else(|| self.err(Kind::UnknownPosixClass))?;
        self.pos += close + 4;
        Ok(ClassAtom::Item(ClassItem::Posix(class, negated)))
    }

    fn class_escape(&mut self) -> Result<ClassAtom, CompileError> {
        self.pos += 1;
        let Some(b) = self.peek() else {
            return Err(CompileError::new(Kind::TrailingEscape, self.pattern.len()));
        };
        match b {
            b'd' | b'D' | b'w' | b'W' | b's' | b'S' | b'h' | b'H' | b'v' | b'V' => {
                self.pos += 1;
                let (class, neg) = perl_class(b);
                Ok(ClassAtom::Item(ClassItem::Perl(class, neg)))
            }
            b'p' | b'P' => {
                self.pos += 1;
                self.parse_property(b == b'P').map(ClassAtom::Item)
            }
            b'b' => {
                self.pos += 1;
                Ok(ClassAtom::Char(0x08))
            }
            b'Q' => {
                self.pos += 1;
                self.class_quote = true;
                Ok(ClassAtom::Skip)
            }
            b'E' => {
                self.pos += 1;
                Ok(ClassAtom::Skip)
            }
            b'1'..=b'7' => {
                let at = self.pos;
                let c = self.octal_digits(3);
                self.checked_char(c, at).map(ClassAtom::Char)
            }
            b'8' | b'9' => {
                self.pos += 1;
                Ok(ClassAtom::Char(u32::from(b)))
            }
            b'N' | b'R' | b'X' | b'B' | b'A' | b'z' | b'Z' | b'G' | b'g' | b'k' => {
                Err(CompileError::with_message(
                    Kind::InvalidEscape,
                    "escape sequence is invalid in character class",
                    self.pos,
                ))
            }
            _ => self.parse_char_escape().map(ClassAtom::Char),
        }
    }

    /// Turn named references into group numbers and check numeric ones.
    fn resolve_backrefs(&self, node: &mut Node) -> Result<(), CompileError> {
        if let Some(&(_, offset)) = self.backrefs.iter().find(|(g, _)| *g > self.captures) {
            return Err(CompileError::new(Kind::UnknownGroupReference, offset));
        }
        let mut failure = None;
        node.walk_mut(&mut |n| {
            if let Node::NamedBackref {
                name,
                caseless,
                offset,
            } = n
            {
                let groups: Vec<usize> = self
                    .names
                    .iter()
                    .filter(|(candidate, _)| candidate == name)
                    .map(|&(_, index)| index)
                    .collect();
                if groups.is_empty() {
                    failure.get_or_insert(*offset);
                    return;
                }
                let caseless = *caseless;
                *n = Node::Backref { groups, caseless };
            }
        });
        match failure {
            Some(offset) => Err(CompileError::new(Kind::UnknownGroupReference, offset)),
            None => Ok(()),
        }
    }
}

fn perl_class(b: u8) -> (PerlClass, bool) {
    let class = match b.to_ascii_lowercase() {
        b'd' => PerlClass::Digit,
        b'w' => PerlClass::Word,
        b's' => PerlClass::Space,
        b'h' => PerlClass::HSpace,
        _ => PerlClass::VSpace,
    };
    (class, b.is_ascii_uppercase())
}

fn is_name(text: &[u8]) -> bool {
    text.first().is_some_and(|b| !b.is_ascii_digit())
        && text.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(pattern: &str) -> Parsed {
        parse(pattern.as_bytes(), CompileOptions::empty()).unwrap()
    }

    fn parse_err(pattern: &str) -> CompileError {
        parse(pattern.as_bytes(), CompileOptions::empty()).unwrap_err()
    }

    #[test]
    fn test_group_counts() {
        assert_eq!(parse_ok("").captures, 0);
        assert_eq!(parse_ok("()").captures, 1);
        assert_eq!(parse_ok("(())").captures, 2);
        assert_eq!(parse_ok("((?:))").captures, 1);
        assert_eq!(parse_ok("(a)*(?<n>b)+").captures, 2);
    }

    #[test]
    fn test_error_offsets() {
        let err = parse_err("(");
        assert_eq!((err.kind, err.offset), (Kind::UnterminatedGroup, 1));
        let err = parse_err("a(b(c)");
        assert_eq!((err.kind, err.offset), (Kind::UnterminatedGroup, 2));
        let err = parse_err("abc\\");
        assert_eq!((err.kind, err.offset), (Kind::TrailingEscape, 4));
        let err = parse_err("a\0bc");
        assert_eq!((err.kind, err.offset), (Kind::NulByteInPattern, 1));
        let err = parse_err("a)");
        assert_eq!((err.kind, err.offset), (Kind::UnmatchedParenthesis, 1));
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}a{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse_ok(&ok).captures, MAX_NESTING);
        let deep = format!("{}{}", "(?:".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = parse_err(&deep);
        assert_eq!((err.kind, err.offset), (Kind::NestingTooDeep, MAX_NESTING * 3));
    }

    #[test]
    fn test_quantifier_errors() {
        assert_eq!(parse_err("*a").kind, Kind::NothingToRepeat);
        assert_eq!(parse_err("a**").kind, Kind::NothingToRepeat);
        assert_eq!(parse_err("a{3,2}").kind, Kind::QuantifierOutOfOrder);
        assert_eq!(parse_err("a{70000}").kind, Kind::QuantifierTooBig);
    }

    #[test]
    fn test_brace_literal_when_not_quantifier() {
        let parsed = parse_ok("a{,3}");
        assert!(matches!(parsed.node, Node::Concat(ref items) if items.len() == 5));
    }

    #[test]
    fn test_brace_forms() {
        let parsed = parse_ok("a{2,}");
        assert!(matches!(
            parsed.node,
            Node::Repeat { min: 2, max: None, .. }
        ));
        let parsed = parse_ok("a{2,4}?");
        assert!(matches!(
            parsed.node,
            Node::Repeat { min: 2, max: Some(4), greedy: false, .. }
        ));
    }

    #[test]
    fn test_named_groups_and_duplicates() {
        let parsed = parse_ok("(?<year>\\d+)-(?'month'\\d+)-(?P<day>\\d+)");
        let names: Vec<_> = parsed.names.iter().map(|(n, i)| (n.as_str(), *i)).collect();
        assert_eq!(names, vec![("year", 1), ("month", 2), ("day", 3)]);
        assert_eq!(parse_err("(?<a>x)(?<a>y)").kind, Kind::DuplicateGroupName);
        assert!(parse(b"(?<a>x)(?<a>y)", CompileOptions::DUPNAMES).is_ok());
        assert!(parse(b"(?J)(?<a>x)(?<a>y)", CompileOptions::empty()).is_ok());
    }

    #[test]
    fn test_backreference_resolution() {
        assert_eq!(parse_err("(a)\\2").kind, Kind::UnknownGroupReference);
        assert_eq!(parse_err("\\k<nope>(a)").kind, Kind::UnknownGroupReference);
        let parsed = parse_ok("\\k<x>(?<x>a)");
        assert!(matches!(
            parsed.node,
            Node::Concat(ref items) if matches!(items[0], Node::Backref { ref groups, .. } if groups == &[1])
        ));
    }

    #[test]
    fn test_lookbehind_must_be_fixed() {
        assert!(parse(b"(?<=ab|c)d", CompileOptions::empty()).is_ok());
        assert_eq!(parse_err("(?<=a+)b").kind, Kind::LookbehindNotFixedLength);
    }

    #[test]
    fn test_class_parsing() {
        assert_eq!(parse_err("[z-a]").kind, Kind::RangeOutOfOrder);
        let err = parse_err("[abc");
        assert_eq!((err.kind, err.offset), (Kind::UnterminatedClass, 4));
        assert!(parse(b"[]a]", CompileOptions::empty()).is_ok());
        assert!(parse(b"[[:alpha:][:^digit:]]", CompileOptions::empty()).is_ok());
        assert_eq!(parse_err("[[:bogus:]]").kind, Kind::UnknownPosixClass);
    }

    #[test]
    fn test_verbs() {
        let parsed = parse(b"(*UTF8)(*CRLF)a", CompileOptions::empty()).unwrap();
        assert!(parsed.options.utf8());
        assert_eq!(parsed.newline, Newline::CrLf);
        let err = parse(b"(*UTF)a", CompileOptions::NEVER_UTF).unwrap_err();
        assert_eq!(err.kind, Kind::InconsistentOptions);
    }

    #[test]
    fn test_invalid_utf8_pattern() {
        let err = parse(b"ab\xffc", CompileOptions::UTF8).unwrap_err();
        assert_eq!((err.kind, err.offset), (Kind::InvalidUtf8, 2));
        assert!(parse(b"ab\xffc", CompileOptions::empty()).is_ok());
    }

    #[test]
    fn test_extra_rejects_unknown_escape() {
        assert!(parse(b"\\y", CompileOptions::empty()).is_ok());
        let err = parse(b"\\y", CompileOptions::EXTRA).unwrap_err();
        assert_eq!(err.kind, Kind::UnknownEscape);
    }

    #[test]
    fn test_unsupported_constructs() {
        assert_eq!(parse_err("(?R)").kind, Kind::Unsupported);
        assert_eq!(parse_err("(?(1)a|b)").kind, Kind::Unsupported);
        assert_eq!(parse_err("(*ACCEPT)").kind, Kind::Unsupported);
    }

    #[test]
    fn test_extended_mode_skips_whitespace() {
        let parsed = parse(b"a b # comment\n c", CompileOptions::EXTENDED).unwrap();
        assert!(matches!(parsed.node, Node::Concat(ref items) if items.len() == 3));
    }

    #[test]
    fn test_octal_and_hex_escapes() {
        let parsed = parse_ok("\\x41\\x{42}\\101\\0");
        let Node::Concat(items) = parsed.node else {
            panic!("expected a sequence");
        };
        let chars: Vec<u32> = items
            .iter()
            .map(|n| match n {
                Node::Literal { c, .. } => *c,
                _ => panic!("expected literal"),
            })
            .collect();
        assert_eq!(chars, vec![0x41, 0x42, 0x41, 0]);
        assert_eq!(parse_err("\\x{100}").kind, Kind::InvalidEscape);
    }
}
