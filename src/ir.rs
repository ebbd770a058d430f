//! Intermediate representation for a regex

use crate::api;
use crate::ast;
use crate::charclasses;
use crate::codepointset::CodePointSet;
use crate::error::{too_large, Error};
use crate::folds;
use crate::types::CaptureGroupID;
use core::fmt;
use std::convert::TryFrom;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnchorType {
    StartOfLine, // ^
    EndOfLine,   // $
}

/// A Quantifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quantifier {
    /// Minimum number of iterations of the loop, inclusive.
    pub min: u32,

    /// Maximum number of iterations of the loop, inclusive.
    /// `ast::UNBOUNDED` means no limit.
    pub max: u32,

    /// Whether the loop is greedy.
    pub greedy: bool,
}

impl Quantifier {
    pub fn is_unbounded(&self) -> bool {
        self.max == ast::UNBOUNDED
    }
}

/// The node types of our IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Matches the empty string.
    Empty,

    /// Reaching this node terminates the match successfully.
    Goal,

    /// Match a literal character.
    /// If icase is true, then `c` MUST be already canonicalized.
    Char { c: u32, icase: bool },

    /// Match the catenation of multiple nodes.
    Cat(Vec<Node>),

    /// Match an alternation like a|b.
    Alt(Box<Node>, Box<Node>),

    /// Match anything including newlines.
    MatchAny,

    /// Match anything except a newline.
    MatchAnyExceptLineTerminator,

    /// Match an anchor like ^ or $
    Anchor(AnchorType),

    /// Word boundary (\b or \B).
    WordBoundary { invert: bool },

    /// A capturing group.
    CaptureGroup(Box<Node>, CaptureGroupID),

    /// A backreference to a 0-based group.
    BackRef(CaptureGroupID),

    /// A bracket, with case folding and inversion already applied.
    Bracket(CodePointSet),

    /// A lookaround assertions like (?=) or (?<!).
    LookaroundAssertion {
        negate: bool,
        backwards: bool,
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        contents: Box<Node>,
    },

    /// A loop like /.*/ or /x{3, 5}?/
    Loop {
        loopee: Box<Node>,
        quant: Quantifier,
        enclosed_groups: core::ops::Range<CaptureGroupID>,
    },
}

impl Node {
    /// \return whether this node is known to match exactly one code unit.
    /// In unicode mode `.` and astral literals may consume a pair, so they
    /// are excluded.
    pub fn matches_exactly_one_unit(&self, unicode: bool) -> bool {
        match *self {
            Node::Char { c, .. } => {
                c <= 0xFFFF && !(unicode && crate::util::is_surrogate(c))
            }
            Node::Bracket(ref cps) => !(unicode && needs_u16_bracket(cps)),
            Node::MatchAny | Node::MatchAnyExceptLineTerminator => !unicode,
            _ => false,
        }
    }
}

/// \return whether a unicode-mode bracket must match whole code points.
pub fn needs_u16_bracket(cps: &CodePointSet) -> bool {
    cps.max_cp().map_or(false, |m| m > 0xFFFF) || cps.has_surrogates()
}

/// Call \p func on \p node and then on each of its descendants, in source
/// order. \p func also receives the nesting depth, starting from \p depth.
pub fn visit<'a, F>(node: &'a Node, depth: usize, func: &mut F)
where
    F: FnMut(&'a Node, usize),
{
    func(node, depth);
    match node {
        Node::Cat(nodes) => {
            for child in nodes {
                visit(child, depth + 1, func);
            }
        }
        Node::Alt(left, right) => {
            visit(left, depth + 1, func);
            visit(right, depth + 1, func);
        }
        Node::CaptureGroup(contents, ..)
        | Node::Loop {
            loopee: contents, ..
        }
        | Node::LookaroundAssertion { contents, .. } => visit(contents, depth + 1, func),
        Node::Empty
        | Node::Goal
        | Node::Char { .. }
        | Node::MatchAny
        | Node::MatchAnyExceptLineTerminator
        | Node::Anchor(..)
        | Node::WordBoundary { .. }
        | Node::BackRef(..)
        | Node::Bracket(..) => {}
    }
}

/// Reverse every Cat which runs inside a lookbehind, so the matcher can walk
/// it from its end. Lookaheads nested in a lookbehind run forwards again.
fn reverse_lookbehind_cats(node: &mut Node, in_lookbehind: bool) {
    match node {
        Node::Cat(nodes) => {
            if in_lookbehind {
                nodes.reverse();
            }
            for child in nodes.iter_mut() {
                reverse_lookbehind_cats(child, in_lookbehind);
            }
        }
        Node::Alt(left, right) => {
            reverse_lookbehind_cats(left, in_lookbehind);
            reverse_lookbehind_cats(right, in_lookbehind);
        }
        Node::CaptureGroup(contents, ..)
        | Node::Loop {
            loopee: contents, ..
        } => reverse_lookbehind_cats(contents, in_lookbehind),
        Node::LookaroundAssertion {
            backwards,
            contents,
            ..
        } => {
            let backwards = *backwards;
            reverse_lookbehind_cats(contents, backwards)
        }
        _ => {}
    }
}

/// A regex in IR form.
#[derive(Debug, Clone)]
pub struct Regex {
    pub node: Node,
    pub flags: api::Flags,

    /// Number of capture groups.
    pub group_count: CaptureGroupID,

    /// The name of each capture group, if any.
    pub group_names: Vec<Option<Box<str>>>,
}

/// Lowers an AST into IR.
struct Lowering {
    flags: api::Flags,
    group_names: Vec<Option<Box<str>>>,
}

impl Lowering {
    fn next_group(&self) -> Result<CaptureGroupID, Error> {
        match CaptureGroupID::try_from(self.group_names.len()) {
            Ok(id) => Ok(id),
            Err(_) => too_large("Capture group count limit exceeded"),
        }
    }

    fn make_char(&self, c: u32) -> Node {
        let unicode = self.flags.unicode;
        if self.flags.icase && folds::has_case_variants(c, unicode) {
            Node::Char {
                c: folds::canonicalize(c, unicode),
                icase: true,
            }
        } else {
            Node::Char { c, icase: false }
        }
    }

    fn make_bracket(&self, cc: &ast::ClassContents) -> Node {
        let unicode = self.flags.unicode;
        let max = charclasses::code_space_max(unicode);
        let mut cps = if self.flags.icase {
            folds::close_over_case(&cc.cps, unicode)
        } else {
            cc.cps.clone()
        };
        if !unicode {
            cps = cps.clamped(max);
        }
        if cc.invert {
            cps = cps.inverted_within(max);
        }
        Node::Bracket(cps)
    }

    fn make_cat(&mut self, nodes: &[ast::Node]) -> Result<Node, Error> {
        let mut result = Vec::with_capacity(nodes.len());
        for n in nodes {
            match self.lower(n)? {
                Node::Empty => {}
                Node::Cat(inner) => result.extend(inner),
                other => result.push(other),
            }
        }
        Ok(match result.len() {
            0 => Node::Empty,
            1 => result.pop().unwrap_or(Node::Empty),
            _ => Node::Cat(result),
        })
    }

    fn lower(&mut self, node: &ast::Node) -> Result<Node, Error> {
        Ok(match node {
            ast::Node::Empty => Node::Empty,
            &ast::Node::Char(c) => self.make_char(c),
            ast::Node::Class(cc) => self.make_bracket(cc),
            ast::Node::Any => {
                if self.flags.dot_all {
                    Node::MatchAny
                } else {
                    Node::MatchAnyExceptLineTerminator
                }
            }
            ast::Node::Cat(nodes) => self.make_cat(nodes)?,
            ast::Node::Alt(alts) => {
                // Right fold: a|b|c becomes a|(b|c).
                let mut lowered = Vec::with_capacity(alts.len());
                for alt in alts {
                    lowered.push(self.lower(alt)?);
                }
                let mut result = lowered.pop().unwrap_or(Node::Empty);
                while let Some(left) = lowered.pop() {
                    result = Node::Alt(Box::new(left), Box::new(result));
                }
                result
            }
            ast::Node::Group {
                contents,
                capture: false,
                ..
            } => self.lower(contents)?,
            ast::Node::Group {
                contents, name, ..
            } => {
                let id = self.next_group()?;
                self.group_names
                    .push(name.as_ref().map(|s| s.as_str().into()));
                let contents = self.lower(contents)?;
                Node::CaptureGroup(Box::new(contents), id)
            }
            &ast::Node::Quantified {
                ref body,
                min,
                max,
                greedy,
            } => {
                let start = self.next_group()?;
                let loopee = self.lower(body)?;
                let end = self.next_group()?;
                Node::Loop {
                    loopee: Box::new(loopee),
                    quant: Quantifier { min, max, greedy },
                    enclosed_groups: start..end,
                }
            }
            ast::Node::LineStart => Node::Anchor(AnchorType::StartOfLine),
            ast::Node::LineEnd => Node::Anchor(AnchorType::EndOfLine),
            &ast::Node::WordBoundary { invert } => Node::WordBoundary { invert },
            &ast::Node::BackRef(idx) => match CaptureGroupID::try_from(idx - 1) {
                Ok(id) => Node::BackRef(id),
                Err(_) => return too_large("Backreference out of range"),
            },
            &ast::Node::Lookaround {
                ref contents,
                negate,
                behind,
            } => {
                let start_group = self.next_group()?;
                let contents = self.lower(contents)?;
                let end_group = self.next_group()?;
                Node::LookaroundAssertion {
                    negate,
                    backwards: behind,
                    start_group,
                    end_group,
                    contents: Box::new(contents),
                }
            }
        })
    }
}

/// Lower a validated AST into IR.
/// Capture groups are numbered in source order, lookbehind bodies are
/// reversed, and a final Goal is appended.
pub fn lower(re: &ast::Regex) -> Result<Regex, Error> {
    re.validate()?;
    let mut lowering = Lowering {
        flags: re.flags,
        group_names: Vec::new(),
    };
    let node = lowering.lower(&re.node)?;
    let group_count = lowering.next_group()?;

    let mut nodes = match node {
        Node::Cat(nodes) => nodes,
        Node::Empty => Vec::new(),
        other => vec![other],
    };
    nodes.push(Node::Goal);
    let mut node = Node::Cat(nodes);
    reverse_lookbehind_cats(&mut node, false);

    Ok(Regex {
        node,
        flags: re.flags,
        group_count,
        group_names: lowering.group_names,
    })
}

fn display_node(node: &Node, depth: usize, f: &mut fmt::Formatter) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "..")?;
    }
    match node {
        Node::Empty => {
            writeln!(f, "Empty")?;
        }
        Node::Goal => {
            writeln!(f, "Goal")?;
        }
        &Node::Char { c, icase } => {
            let kind = if icase { "CharICase" } else { "Char" };
            writeln!(f, "{} 0x{:x}", kind, c)?;
        }
        Node::Cat(..) => {
            writeln!(f, "Cat")?;
        }
        Node::Alt(..) => {
            writeln!(f, "Alt")?;
        }
        Node::MatchAny => {
            writeln!(f, "MatchAny")?;
        }
        Node::MatchAnyExceptLineTerminator => {
            writeln!(f, "MatchAnyExceptLineTerminator")?;
        }
        Node::Anchor(anchor_type) => {
            writeln!(f, "Anchor {:?}", anchor_type)?;
        }
        Node::Loop {
            quant,
            enclosed_groups,
            ..
        } => {
            writeln!(f, "Loop (groups {:?}) {:?}", enclosed_groups, quant)?;
        }
        Node::CaptureGroup(_node, idx) => {
            writeln!(f, "CaptureGroup {:?}", idx)?;
        }
        &Node::WordBoundary { invert } => {
            let kind = if invert { "\\B" } else { "\\b" };
            writeln!(f, "WordBoundary {:?} ", kind)?;
        }
        &Node::BackRef(group) => {
            writeln!(f, "BackRef {:?} ", group)?;
        }
        Node::Bracket(cps) => {
            writeln!(f, "Bracket {:?}", cps.intervals())?;
        }
        &Node::LookaroundAssertion {
            negate,
            backwards,
            start_group,
            end_group,
            ..
        } => {
            let sense = if negate { "negative" } else { "positive" };
            let direction = if backwards { "backwards" } else { "forwards" };
            writeln!(
                f,
                "LookaroundAssertion {} {} {:?} {:?}",
                sense, direction, start_group, end_group
            )?;
        }
    }
    Ok(())
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = Ok(());
        visit(&self.node, 0, &mut |node, depth| {
            if result.is_ok() {
                result = display_node(node, depth, f)
            }
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::try_parse;

    fn lowered(pattern: &str, flags: &str) -> Regex {
        let ast = try_parse(pattern, api::Flags::from(flags)).expect("Pattern should parse");
        lower(&ast).expect("Pattern should lower")
    }

    fn top_nodes(re: &Regex) -> &[Node] {
        match &re.node {
            Node::Cat(nodes) => nodes,
            _ => panic!("Lowered regex should be a Cat"),
        }
    }

    #[test]
    fn groups_numbered_in_source_order() {
        let re = lowered("(a(?<x>b))(c)", "");
        assert_eq!(re.group_count, 3);
        assert_eq!(
            re.group_names,
            vec![None, Some("x".into()), None]
        );
        let mut ids = Vec::new();
        visit(&re.node, 0, &mut |n, _| {
            if let Node::CaptureGroup(_, id) = n {
                ids.push(*id)
            }
        });
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn flattening() {
        let re = lowered("(?:ab(?:c))d", "");
        assert_eq!(
            top_nodes(&re),
            &[
                Node::Char { c: 'a' as u32, icase: false },
                Node::Char { c: 'b' as u32, icase: false },
                Node::Char { c: 'c' as u32, icase: false },
                Node::Char { c: 'd' as u32, icase: false },
                Node::Goal,
            ]
        );
    }

    #[test]
    fn lookbehind_is_reversed() {
        let re = lowered("(?<=ab(?=cd))", "");
        let contents = match &top_nodes(&re)[0] {
            Node::LookaroundAssertion { contents, .. } => contents,
            n => panic!("Unexpected node {:?}", n),
        };
        match contents.as_ref() {
            Node::Cat(nodes) => {
                assert!(matches!(nodes[0], Node::LookaroundAssertion { backwards: false, .. }));
                assert_eq!(nodes[1], Node::Char { c: 'b' as u32, icase: false });
                assert_eq!(nodes[2], Node::Char { c: 'a' as u32, icase: false });
                // The nested lookahead keeps its order.
                if let Node::LookaroundAssertion { contents, .. } = &nodes[0] {
                    assert_eq!(
                        contents.as_ref(),
                        &Node::Cat(vec![
                            Node::Char { c: 'c' as u32, icase: false },
                            Node::Char { c: 'd' as u32, icase: false },
                        ])
                    );
                }
            }
            n => panic!("Unexpected node {:?}", n),
        }
    }

    #[test]
    fn enclosed_groups() {
        let re = lowered("(a)((b)(c))*(?=(d))", "");
        let nodes = top_nodes(&re);
        assert!(
            matches!(&nodes[1], Node::Loop { enclosed_groups, .. } if *enclosed_groups == (1..4))
        );
        assert!(matches!(
            nodes[2],
            Node::LookaroundAssertion {
                start_group: 4,
                end_group: 5,
                ..
            }
        ));
    }

    #[test]
    fn icase_literals() {
        let re = lowered("a\\x01\u{017F}", "i");
        assert_eq!(
            &top_nodes(&re)[..3],
            &[
                Node::Char { c: 'A' as u32, icase: true },
                Node::Char { c: 1, icase: false },
                Node::Char { c: 0x017F, icase: false },
            ]
        );
        let re = lowered("\u{017F}", "iu");
        assert_eq!(top_nodes(&re)[0], Node::Char { c: 's' as u32, icase: true });
    }

    #[test]
    fn brackets_fold_and_invert() {
        let re = lowered("[^a]", "i");
        match &top_nodes(&re)[0] {
            Node::Bracket(cps) => {
                assert!(!cps.contains('a' as u32));
                assert!(!cps.contains('A' as u32));
                assert!(cps.contains('b' as u32));
                assert!(cps.contains(0xFFFF));
                assert!(!cps.contains(0x10000));
            }
            n => panic!("Unexpected node {:?}", n),
        }
    }

    #[test]
    fn alternation_folds_right() {
        let re = lowered("a|b|c", "");
        match &top_nodes(&re)[0] {
            Node::Alt(left, right) => {
                assert_eq!(left.as_ref(), &Node::Char { c: 'a' as u32, icase: false });
                assert!(matches!(right.as_ref(), Node::Alt(..)));
            }
            n => panic!("Unexpected node {:?}", n),
        }
    }
}
