//! Abstract syntax tree of a regex pattern, as produced by the parser and
//! consumed by the compiler.

use crate::api::Flags;
use crate::codepointset::CodePointSet;
use crate::error::{syntax_error, too_large, Error};
use crate::types::MAX_CAPTURE_GROUPS;
use core::fmt;
use std::collections::HashSet;

/// Quantifier bound meaning "no upper limit".
pub const UNBOUNDED: u32 = u32::MAX;

/// The contents of a character class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassContents {
    pub invert: bool,
    pub cps: CodePointSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Matches the empty string.
    Empty,

    /// A literal. A code point in unicode mode, a UTF-16 code unit otherwise.
    Char(u32),

    /// A bracket or a class escape like \d.
    Class(ClassContents),

    /// `.`
    Any,

    Cat(Vec<Node>),

    /// Two or more alternatives.
    Alt(Vec<Node>),

    /// A parenthesized group, capturing or not.
    Group {
        contents: Box<Node>,
        capture: bool,
        name: Option<String>,
    },

    /// A quantified atom. `max` is `UNBOUNDED` for `*`, `+` and `{n,}`.
    Quantified {
        body: Box<Node>,
        min: u32,
        max: u32,
        greedy: bool,
    },

    /// `^`
    LineStart,

    /// `$`
    LineEnd,

    /// `\b` or `\B`.
    WordBoundary { invert: bool },

    /// A backreference to a 1-based group number.
    BackRef(u32),

    Lookaround {
        contents: Box<Node>,
        negate: bool,
        behind: bool,
    },
}

impl Node {
    /// Call \p func on this node and every descendant, in source order.
    pub fn visit<F: FnMut(&Node)>(&self, func: &mut F) {
        func(self);
        match self {
            Node::Cat(nodes) | Node::Alt(nodes) => nodes.iter().for_each(|n| n.visit(func)),
            Node::Group { contents, .. } | Node::Lookaround { contents, .. } => {
                contents.visit(func)
            }
            Node::Quantified { body, .. } => body.visit(func),
            _ => {}
        }
    }
}

/// A parsed regex: its tree and the flags it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    pub node: Node,
    pub flags: Flags,
}

impl Regex {
    /// \return the number of capturing groups.
    pub fn capture_count(&self) -> usize {
        let mut count = 0;
        self.node.visit(&mut |n| {
            if let Node::Group { capture: true, .. } = n {
                count += 1
            }
        });
        count
    }

    /// Check the tree is well formed, so that it may be compiled.
    pub fn validate(&self) -> Result<(), Error> {
        let group_count = self.capture_count();
        if group_count > MAX_CAPTURE_GROUPS {
            return too_large("Capture group count limit exceeded");
        }
        let mut names = HashSet::new();
        let mut result = Ok(());
        self.node.visit(&mut |n| {
            if result.is_err() {
                return;
            }
            result = match n {
                Node::BackRef(idx) if *idx == 0 || *idx as usize > group_count => {
                    syntax_error(format!(
                        "Backreference \\{} exceeds number of capture groups",
                        idx
                    ))
                }
                Node::Quantified { min, max, .. } if min > max => {
                    syntax_error("Numbers out of order in quantifier")
                }
                Node::Alt(alts) if alts.len() < 2 => syntax_error("Alternation needs two branches"),
                Node::Group {
                    capture: false,
                    name: Some(_),
                    ..
                } => syntax_error("Only capturing groups may be named"),
                Node::Group {
                    name: Some(name), ..
                } if !names.insert(name.clone()) => {
                    syntax_error(format!("Duplicate capture group name '{}'", name))
                }
                _ => Ok(()),
            };
        });
        result
    }
}

fn display_node(node: &Node, depth: usize, f: &mut fmt::Formatter) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "..")?;
    }
    match node {
        Node::Empty => writeln!(f, "Empty")?,
        Node::Char(c) => match char::from_u32(*c) {
            Some(ch) if !ch.is_control() => writeln!(f, "Char '{}'", ch)?,
            _ => writeln!(f, "Char 0x{:x}", c)?,
        },
        Node::Class(cc) => {
            let sense = if cc.invert { "^" } else { "" };
            writeln!(f, "Class {}{:?}", sense, cc.cps.intervals())?
        }
        Node::Any => writeln!(f, "Any")?,
        Node::Cat(..) => writeln!(f, "Cat")?,
        Node::Alt(..) => writeln!(f, "Alt")?,
        Node::Group { capture, name, .. } => match (capture, name) {
            (true, Some(name)) => writeln!(f, "Group <{}>", name)?,
            (true, None) => writeln!(f, "Group")?,
            (false, _) => writeln!(f, "NonCapturingGroup")?,
        },
        Node::Quantified {
            min, max, greedy, ..
        } => {
            let lazy = if *greedy { "" } else { "?" };
            if *max == UNBOUNDED {
                writeln!(f, "Quantified {{{},}}{}", min, lazy)?
            } else {
                writeln!(f, "Quantified {{{},{}}}{}", min, max, lazy)?
            }
        }
        Node::LineStart => writeln!(f, "LineStart")?,
        Node::LineEnd => writeln!(f, "LineEnd")?,
        Node::WordBoundary { invert } => {
            writeln!(f, "WordBoundary {}", if *invert { "\\B" } else { "\\b" })?
        }
        Node::BackRef(idx) => writeln!(f, "BackRef {}", idx)?,
        Node::Lookaround { negate, behind, .. } => {
            let kind = match (behind, negate) {
                (false, false) => "?=",
                (false, true) => "?!",
                (true, false) => "?<=",
                (true, true) => "?<!",
            };
            writeln!(f, "Lookaround {}", kind)?
        }
    }
    match node {
        Node::Cat(nodes) | Node::Alt(nodes) => {
            for n in nodes {
                display_node(n, depth + 1, f)?;
            }
        }
        Node::Group { contents, .. } | Node::Lookaround { contents, .. } => {
            display_node(contents, depth + 1, f)?
        }
        Node::Quantified { body, .. } => display_node(body, depth + 1, f)?,
        _ => {}
    }
    Ok(())
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        display_node(&self.node, 0, f)
    }
}
