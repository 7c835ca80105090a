//! Instruction compiler
//!
//! Lowers a parsed [`Node`] tree into a flat instruction list executed by
//! the backtracking VM in [`super::exec`].

use super::ast::{Assertion, LookKind, Node};
use super::class::{case_variants, ClassSet};
use super::error::{CompileError, CompileErrorKind};
use super::options::CompileOptions;
use super::parse::{parse, Parsed};
use super::study::{analyze, Analysis};
use super::text::Lines;

/// Upper bound on program length; counted repeats are unrolled.
const MAX_PROGRAM: usize = 1 << 20;

#[derive(Debug, Clone)]
pub(crate) enum Inst {
    Match,
    /// End of a lookaround or atomic body.
    SubMatch,
    Char(u32),
    /// Any of a set of case variants.
    CharAny(Box<[u32]>),
    /// Any character, newlines included.
    Any,
    /// Any character that does not start a newline.
    NotNewline,
    LineBreak,
    Class(Box<ClassSet>),
    Assert(Assertion),
    /// Try `first`, backtrack into `second`.
    Split { first: usize, second: usize },
    Jmp(usize),
    /// Remember where a capture group began.
    Open { reg: usize },
    /// Commit a group's span; the start comes from the register set by `Open`.
    Close { group: usize, reg: usize },
    Backref { groups: Box<[usize]>, caseless: bool },
    /// Body starts at the next instruction; `next` follows the body.
    Look { behind: Option<usize>, negate: bool, next: usize },
    Atomic { next: usize },
    /// Remember where an iteration of a possibly-empty loop began.
    RepeatStart { reg: usize },
    /// Loop back unless the iteration matched nothing, then leave via `exit`.
    RepeatCheck { reg: usize, exit: usize, head: usize },
}

/// A compiled pattern's executable form.
#[derive(Debug)]
pub(crate) struct Program {
    pub insts: Vec<Inst>,
    pub source: String,
    pub options: CompileOptions,
    pub captures: usize,
    pub names: Vec<(String, usize)>,
    pub lines: Lines,
    pub utf: bool,
    pub ucp: bool,
    pub registers: usize,
    pub prefix: Vec<u32>,
    pub prefix_complete: bool,
    pub analysis: Analysis,
}

impl Program {
    pub fn slots(&self) -> usize {
        (self.captures + 1) * 2
    }
}

pub(crate) fn compile(pattern: &[u8], options: CompileOptions) -> Result<Program, CompileError> {
    let parsed = parse(pattern, options).map_err(|e| e.in_pattern(pattern))?;
    let Parsed {
        node,
        captures,
        names,
        options,
        newline,
        bsr,
    } = parsed;
    let utf = options.utf8();

    let mut compiler = Compiler {
        insts: Vec::new(),
        registers: 0,
        utf,
    };
    compiler
        .node(&node)
        .and_then(|()| compiler.emit(Inst::Match))
        .map_err(|e| e.in_pattern(pattern))?;

    let mut prefix = Vec::new();
    let prefix_complete = node.literal_prefix(&mut prefix);
    let analysis = analyze(&node, options);
    log::trace!(
        "compiled {} instructions, {} groups",
        compiler.insts.len(),
        captures
    );

    Ok(Program {
        insts: compiler.insts,
        source: String::from_utf8_lossy(pattern).into_owned(),
        options,
        captures,
        names,
        lines: Lines { newline, bsr, utf },
        utf,
        ucp: options.contains(CompileOptions::UCP),
        registers: compiler.registers,
        prefix,
        prefix_complete,
        analysis,
    })
}

struct Compiler {
    insts: Vec<Inst>,
    registers: usize,
    utf: bool,
}

impl Compiler {
    fn emit(&mut self, inst: Inst) -> Result<usize, CompileError> {
        if self.insts.len() >= MAX_PROGRAM {
            return Err(CompileError::new(CompileErrorKind::PatternTooLarge, 0));
        }
        self.insts.push(inst);
        Ok(self.insts.len() - 1)
    }

    fn pc(&self) -> usize {
        self.insts.len()
    }

    fn register(&mut self) -> usize {
        self.registers += 1;
        self.registers - 1
    }

    fn patch(&mut self, at: usize, inst: Inst) {
        self.insts[at] = inst;
    }

    fn node(&mut self, node: &Node) -> Result<(), CompileError> {
        match node {
            Node::Empty => {}
            Node::Literal { c, caseless } => {
                self.literal(*c, *caseless)?;
            }
            Node::Dot { dotall: true } => {
                self.emit(Inst::Any)?;
            }
            Node::Dot { dotall: false } | Node::NotNewline => {
                self.emit(Inst::NotNewline)?;
            }
            Node::LineBreak => {
                self.emit(Inst::LineBreak)?;
            }
            Node::Class(set) => {
                self.emit(Inst::Class(set.clone()))?;
            }
            Node::Assert(a) => {
                self.emit(Inst::Assert(*a))?;
            }
            Node::Capture { index, node } => {
                let reg = self.register();
                self.emit(Inst::Open { reg })?;
                self.node(node)?;
                self.emit(Inst::Close { group: *index, reg })?;
            }
            Node::Concat(nodes) => {
                for n in nodes {
                    self.node(n)?;
                }
            }
            Node::Alternate(branches) => self.alternate(branches)?,
            Node::Repeat {
                node,
                min,
                max,
                greedy,
                ..
            } => self.repeat(node, *min, *max, *greedy)?,
            Node::Backref { groups, caseless } => {
                self.emit(Inst::Backref {
                    groups: groups.clone().into_boxed_slice(),
                    caseless: *caseless,
                })?;
            }
            Node::NamedBackref { offset, .. } => {
                return Err(CompileError::new(
                    CompileErrorKind::UnknownGroupReference,
                    *offset,
                ));
            }
            Node::Look { kind, negate, node } => {
                let behind = match kind {
                    LookKind::Ahead => None,
                    LookKind::Behind(width) => Some(*width),
                };
                let at = self.emit(Inst::Look {
                    behind,
                    negate: *negate,
                    next: 0,
                })?;
                self.node(node)?;
                self.emit(Inst::SubMatch)?;
                let next = self.pc();
                self.patch(
                    at,
                    Inst::Look {
                        behind,
                        negate: *negate,
                        next,
                    },
                );
            }
            Node::Atomic(node) => {
                let at = self.emit(Inst::Atomic { next: 0 })?;
                self.node(node)?;
                self.emit(Inst::SubMatch)?;
                let next = self.pc();
                self.patch(at, Inst::Atomic { next });
            }
        }
        Ok(())
    }

    fn literal(&mut self, c: u32, caseless: bool) -> Result<usize, CompileError> {
        if !caseless {
            return self.emit(Inst::Char(c));
        }
        // Byte mode folds ASCII letters only.
        let variants: Vec<u32> = case_variants(c)
            .into_iter()
            .filter(|&alt| alt == c || self.utf || (c < 0x80 && alt < 0x80))
            .collect();
        if variants.len() == 1 {
            self.emit(Inst::Char(c))
        } else {
            self.emit(Inst::CharAny(variants.into_boxed_slice()))
        }
    }

    fn alternate(&mut self, branches: &[Node]) -> Result<(), CompileError> {
        let mut exits = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            if i + 1 == branches.len() {
                self.node(branch)?;
                break;
            }
            let split = self.emit(Inst::Split { first: 0, second: 0 })?;
            self.node(branch)?;
            exits.push(self.emit(Inst::Jmp(0))?);
            let second = self.pc();
            self.patch(
                split,
                Inst::Split {
                    first: split + 1,
                    second,
                },
            );
        }
        let end = self.pc();
        for at in exits {
            self.patch(at, Inst::Jmp(end));
        }
        Ok(())
    }

    /// Split preferring `body` when greedy, `skip` otherwise.
    fn choice(greedy: bool, body: usize, skip: usize) -> Inst {
        if greedy {
            Inst::Split {
                first: body,
                second: skip,
            }
        } else {
            Inst::Split {
                first: skip,
                second: body,
            }
        }
    }

    fn repeat(
        &mut self,
        node: &Node,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<(), CompileError> {
        for _ in 0..min {
            self.node(node)?;
        }
        match max {
            Some(max) => {
                // Optional copies nest: once one is skipped, all later ones are.
                let mut splits = Vec::new();
                for _ in min..max {
                    splits.push(self.emit(Inst::Split { first: 0, second: 0 })?);
                    self.node(node)?;
                }
                let end = self.pc();
                for at in splits {
                    self.patch(at, Self::choice(greedy, at + 1, end));
                }
            }
            None if node.min_bytes(self.utf) > 0 => {
                let head = self.emit(Inst::Split { first: 0, second: 0 })?;
                self.node(node)?;
                self.emit(Inst::Jmp(head))?;
                let end = self.pc();
                self.patch(head, Self::choice(greedy, head + 1, end));
            }
            None => {
                let reg = self.register();
                self.emit(Inst::RepeatStart { reg })?;
                let head = self.emit(Inst::Split { first: 0, second: 0 })?;
                self.node(node)?;
                let check = self.emit(Inst::RepeatCheck {
                    reg,
                    exit: 0,
                    head,
                })?;
                let end = self.pc();
                self.patch(check, Inst::RepeatCheck { reg, exit: end, head });
                self.patch(head, Self::choice(greedy, head + 1, end));
            }
        }
        Ok(())
    }
}
