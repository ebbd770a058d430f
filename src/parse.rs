//! Parser from regex patterns to an AST

use crate::api::Flags;
use crate::ast::{ClassContents, Node, Regex, UNBOUNDED};
use crate::charclasses::ClassEscape;
use crate::codepointset::{CodePointSet, Interval};
use crate::error::{syntax_error, too_large, Error};
use crate::util::{combine_surrogates, is_lead_surrogate, is_trail_surrogate, to_char_sat};

/// Groups and lookarounds may nest at most this deep.
pub const MAX_NESTING: usize = 500;

enum ClassAtom {
    CodePoint(u32),
    Escape(ClassEscape),
}

struct Quantifier {
    min: u32,
    max: u32,
    greedy: bool,
}

fn make_cat(mut nodes: Vec<Node>) -> Node {
    match nodes.len() {
        0 => Node::Empty,
        1 => nodes.pop().unwrap_or(Node::Empty),
        _ => Node::Cat(nodes),
    }
}

fn is_syntax_char(c: char) -> bool {
    matches!(
        c,
        '^' | '$' | '\\' | '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '/'
    )
}

fn is_group_name_char(c: char, first: bool) -> bool {
    c == '$' || c == '_' || c.is_alphabetic() || (!first && c.is_numeric())
}

/// The capturing groups of a pattern, found before parsing so that forward
/// references can be resolved.
struct GroupScan {
    count: u32,
    // (name, 1-based group number)
    names: Vec<(String, u32)>,
}

fn scan_groups(input: &[u32]) -> GroupScan {
    let mut scan = GroupScan {
        count: 0,
        names: Vec::new(),
    };
    let at = |i: usize| input.get(i).map(|&c| to_char_sat(c));
    let mut in_class = false;
    let mut i = 0;
    while let Some(c) = at(i) {
        match c {
            '\\' => i += 1,
            ']' if in_class => in_class = false,
            _ if in_class => {}
            '[' => in_class = true,
            '(' if at(i + 1) != Some('?') => scan.count += 1,
            '(' if at(i + 2) == Some('<') && !matches!(at(i + 3), Some('=') | Some('!')) => {
                scan.count += 1;
                let name: String = input[i + 3..]
                    .iter()
                    .map(|&c| to_char_sat(c))
                    .take_while(|&c| c != '>')
                    .collect();
                scan.names.push((name, scan.count));
            }
            _ => {}
        }
        i += 1;
    }
    scan
}

/// Represents the state used to parse a regex.
struct Parser {
    /// Code points in unicode mode, UTF-16 code units otherwise.
    input: Vec<u32>,
    pos: usize,
    flags: Flags,
    groups: GroupScan,
    depth: usize,
}

impl Parser {
    /// Peek at the next element, as a char suitable for matching against
    /// syntax characters.
    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).map(|&c| to_char_sat(c))
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).map(|&c| to_char_sat(c))
    }

    fn next_cp(&mut self) -> Option<u32> {
        let c = self.input.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Consume a character, returning it.
    fn consume(&mut self, c: char) -> u32 {
        debug_assert!(self.peek() == Some(c), "char was not next");
        self.pos += 1;
        c as u32
    }

    /// If our contents begin with the char c, consume it from our contents
    /// and return true. Otherwise return false.
    fn try_consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// If our contents begin with the string \p s, consume it from our contents
    /// and return true. Otherwise return false.
    fn try_consume_str(&mut self, s: &str) -> bool {
        let matches = s
            .chars()
            .enumerate()
            .all(|(idx, c)| self.peek_at(idx) == Some(c));
        if matches {
            self.pos += s.chars().count();
        }
        matches
    }

    fn try_parse(mut self) -> Result<Regex, Error> {
        // Parse a disjunction. If we consume everything, it's success. If there's
        // something left, it's an error (for example, an excess closing paren).
        let node = self.consume_disjunction()?;
        match self.peek() {
            Some(')') => syntax_error("Unbalanced parenthesis"),
            Some(c) => syntax_error(format!("Unexpected char: {}", c)),
            None => {
                let re = Regex {
                    node,
                    flags: self.flags,
                };
                re.validate()?;
                Ok(re)
            }
        }
    }

    /// ES6 21.2.2.3 Disjunction.
    fn consume_disjunction(&mut self) -> Result<Node, Error> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return too_large("Pattern nesting too deep");
        }
        let mut alts = vec![self.consume_term()?];
        while self.try_consume('|') {
            alts.push(self.consume_term()?)
        }
        self.depth -= 1;
        Ok(if alts.len() == 1 {
            make_cat(alts)
        } else {
            Node::Alt(alts)
        })
    }

    /// ES6 21.2.2.5 Term.
    fn consume_term(&mut self) -> Result<Node, Error> {
        let mut result: Vec<Node> = Vec::new();
        loop {
            let c = match self.peek() {
                // A concatenation is terminated by closing parens or vertical bar (alternations).
                None | Some(')') | Some('|') => break,
                Some(c) => c,
            };
            let (atom, quantifier_allowed) = match c {
                '^' => {
                    self.consume('^');
                    (Node::LineStart, false)
                }
                '$' => {
                    self.consume('$');
                    (Node::LineEnd, false)
                }
                '\\' => {
                    self.consume('\\');
                    match self.peek() {
                        Some(b @ 'b') | Some(b @ 'B') => {
                            self.consume(b);
                            (Node::WordBoundary { invert: b == 'B' }, false)
                        }
                        _ => (self.consume_atom_escape()?, true),
                    }
                }
                '.' => {
                    self.consume('.');
                    (Node::Any, true)
                }
                '(' => self.consume_group()?,
                '[' => (self.consume_bracket()?, true),
                '*' | '+' | '?' => return syntax_error("Nothing to repeat"),
                '{' => {
                    // It's an error if this parses successfully as a quantifier.
                    let saved = self.pos;
                    if self.try_consume_quantifier()?.is_some() {
                        return syntax_error("Nothing to repeat");
                    }
                    self.pos = saved;
                    if self.flags.unicode {
                        return syntax_error("Lone quantifier brackets");
                    }
                    (Node::Char(self.consume('{')), true)
                }
                ']' | '}' if self.flags.unicode => {
                    return syntax_error("Lone quantifier brackets");
                }
                _ => match self.next_cp() {
                    Some(cp) => (Node::Char(cp), true),
                    None => break,
                },
            };

            // We just parsed an atom; try parsing a quantifier.
            match self.try_consume_quantifier()? {
                Some(quant) => {
                    if !quantifier_allowed {
                        return syntax_error("Quantifier not allowed here");
                    }
                    result.push(Node::Quantified {
                        body: Box::new(atom),
                        min: quant.min,
                        max: quant.max,
                        greedy: quant.greedy,
                    })
                }
                None => result.push(atom),
            }
        }
        Ok(make_cat(result))
    }

    /// Parse a parenthesized construct, returning it and whether it may be
    /// quantified.
    fn consume_group(&mut self) -> Result<(Node, bool), Error> {
        // (negate, behind)
        let look = if self.try_consume_str("(?=") {
            Some((false, false))
        } else if self.try_consume_str("(?!") {
            Some((true, false))
        } else if self.try_consume_str("(?<=") {
            Some((false, true))
        } else if self.try_consume_str("(?<!") {
            Some((true, true))
        } else {
            None
        };

        let (node, quantifier_allowed) = if let Some((negate, behind)) = look {
            let contents = Box::new(self.consume_disjunction()?);
            // Annex B permits quantified lookaheads outside unicode mode.
            let allowed = !behind && !self.flags.unicode;
            (
                Node::Lookaround {
                    contents,
                    negate,
                    behind,
                },
                allowed,
            )
        } else if self.try_consume_str("(?:") {
            let contents = Box::new(self.consume_disjunction()?);
            let node = Node::Group {
                contents,
                capture: false,
                name: None,
            };
            (node, true)
        } else if self.try_consume_str("(?<") {
            let name = self.consume_group_name()?;
            let contents = Box::new(self.consume_disjunction()?);
            let node = Node::Group {
                contents,
                capture: true,
                name: Some(name),
            };
            (node, true)
        } else if self.try_consume_str("(?") {
            return syntax_error("Invalid group");
        } else {
            self.consume('(');
            let contents = Box::new(self.consume_disjunction()?);
            let node = Node::Group {
                contents,
                capture: true,
                name: None,
            };
            (node, true)
        };
        if !self.try_consume(')') {
            return syntax_error("Unbalanced parenthesis");
        }
        Ok((node, quantifier_allowed))
    }

    /// Parse a group name through its closing '>'.
    fn consume_group_name(&mut self) -> Result<String, Error> {
        let mut name = String::new();
        loop {
            match self.peek() {
                Some('>') => {
                    self.consume('>');
                    break;
                }
                Some(c) if is_group_name_char(c, name.is_empty()) => {
                    self.pos += 1;
                    name.push(c);
                }
                _ => return syntax_error("Invalid capture group name"),
            }
        }
        if name.is_empty() {
            return syntax_error("Empty capture group name");
        }
        Ok(name)
    }

    /// ES6 21.2.2.13 CharacterClass.
    fn consume_bracket(&mut self) -> Result<Node, Error> {
        self.consume('[');
        let mut result = ClassContents {
            invert: self.try_consume('^'),
            cps: CodePointSet::new(),
        };
        loop {
            match self.peek() {
                None => return syntax_error("Unbalanced bracket"),
                Some(']') => {
                    self.consume(']');
                    return Ok(Node::Class(result));
                }
                _ => {}
            }

            let first = self.consume_class_atom()?;

            // Check for a dash; we may have a range. A trailing dash like [a-] is literal.
            if self.peek() != Some('-') || matches!(self.peek_at(1), Some(']') | None) {
                self.add_class_atom(&mut result.cps, first);
                continue;
            }
            self.consume('-');
            let second = self.consume_class_atom()?;

            // Ranges must be in order: z-a is invalid.
            // ES6 21.2.2.15.1 "If i > j, throw a SyntaxError exception"
            match (first, second) {
                (ClassAtom::CodePoint(c1), ClassAtom::CodePoint(c2)) => {
                    if c1 > c2 {
                        return syntax_error("Range out of order in character class");
                    }
                    result.cps.add(Interval::new(c1, c2));
                }
                (first, second) => {
                    // Ranges can't contain class escapes: [\d-z] is invalid in unicode mode.
                    // Annex B reads it as the union with a literal dash.
                    if self.flags.unicode {
                        return syntax_error("Invalid character class range");
                    }
                    self.add_class_atom(&mut result.cps, first);
                    self.add_class_atom(&mut result.cps, ClassAtom::CodePoint('-' as u32));
                    self.add_class_atom(&mut result.cps, second);
                }
            }
        }
    }

    fn add_class_atom(&self, cps: &mut CodePointSet, atom: ClassAtom) {
        match atom {
            ClassAtom::CodePoint(c) => cps.add_one(c),
            ClassAtom::Escape(esc) => {
                cps.add_set(&esc.code_points(self.flags.unicode, self.flags.icase))
            }
        }
    }

    fn consume_class_atom(&mut self) -> Result<ClassAtom, Error> {
        if !self.try_consume('\\') {
            return match self.next_cp() {
                Some(c) => Ok(ClassAtom::CodePoint(c)),
                None => syntax_error("Unbalanced bracket"),
            };
        }
        match self.peek() {
            None => syntax_error("Incomplete escape"),
            Some(c) => {
                if let Some(esc) = ClassEscape::from_letter(c) {
                    self.consume(c);
                    return Ok(ClassAtom::Escape(esc));
                }
                match c {
                    // "Return the CharSet containing the single character <BS> U+0008"
                    'b' => {
                        self.consume('b');
                        Ok(ClassAtom::CodePoint(0x08))
                    }
                    'p' | 'P' if self.flags.unicode => {
                        syntax_error("Unicode property escapes are not supported")
                    }
                    _ => Ok(ClassAtom::CodePoint(self.consume_character_escape(true)?)),
                }
            }
        }
    }

    fn try_consume_quantifier(&mut self) -> Result<Option<Quantifier>, Error> {
        let (min, max) = match self.peek() {
            Some('+') => {
                self.consume('+');
                (1, UNBOUNDED)
            }
            Some('*') => {
                self.consume('*');
                (0, UNBOUNDED)
            }
            Some('?') => {
                self.consume('?');
                (0, 1)
            }
            Some('{') => match self.try_consume_braced_quantifier() {
                Some(bounds) => bounds,
                None if self.flags.unicode => return syntax_error("Incomplete quantifier"),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let greedy = !self.try_consume('?');
        Ok(Some(Quantifier { min, max, greedy }))
    }

    /// Parse `{n}`, `{n,}` or `{n,m}`. On failure nothing is consumed.
    fn try_consume_braced_quantifier(&mut self) -> Option<(u32, u32)> {
        let saved = self.pos;
        self.consume('{');
        let result = self.try_consume_decimal_integer_literal().and_then(|min| {
            let max = if self.try_consume(',') {
                self.try_consume_decimal_integer_literal()
                    .unwrap_or(UNBOUNDED)
            } else {
                min
            };
            if self.try_consume('}') {
                Some((min, max))
            } else {
                None
            }
        });
        if result.is_none() {
            self.pos = saved;
        }
        result
    }

    /// ES6 11.8.3 DecimalIntegerLiteral.
    /// If the value would overflow, UNBOUNDED - 1 is returned.
    /// All decimal digits are consumed regardless.
    fn try_consume_decimal_integer_literal(&mut self) -> Option<u32> {
        let mut result: u32 = 0;
        let mut char_count = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.pos += 1;
            char_count += 1;
            result = result
                .saturating_mul(10)
                .saturating_add(digit)
                .min(UNBOUNDED - 1);
        }
        if char_count > 0 {
            Some(result)
        } else {
            None
        }
    }

    /// Annex B LegacyOctalEscapeSequence: up to three octal digits, at most 0o377.
    fn consume_legacy_octal(&mut self) -> u32 {
        let mut value = 0;
        for _ in 0..3 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) if value * 8 + d <= 0o377 => {
                    self.pos += 1;
                    value = value * 8 + d;
                }
                _ => break,
            }
        }
        value
    }

    fn consume_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut value = 0;
        for idx in 0..count {
            value = value * 16 + self.peek_at(idx)?.to_digit(16)?;
        }
        self.pos += count;
        Some(value)
    }

    /// Parse the part of a \u escape after the 'u'.
    fn try_consume_unicode_escape(&mut self) -> Option<u32> {
        if self.flags.unicode && self.peek() == Some('{') {
            let saved = self.pos;
            self.consume('{');
            let mut value: u32 = 0;
            let mut digits = 0;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                self.pos += 1;
                digits += 1;
                value = value.saturating_mul(16).saturating_add(d);
            }
            if digits == 0 || value > 0x10FFFF || !self.try_consume('}') {
                self.pos = saved;
                return None;
            }
            return Some(value);
        }
        let value = self.consume_hex_digits(4)?;
        // In unicode mode an escaped surrogate pair is one code point.
        if self.flags.unicode && is_lead_surrogate(value) {
            let saved = self.pos;
            if self.try_consume_str("\\u") {
                match self.consume_hex_digits(4) {
                    Some(trail) if is_trail_surrogate(trail) => {
                        return Some(combine_surrogates(value, trail))
                    }
                    _ => self.pos = saved,
                }
            }
        }
        Some(value)
    }

    fn consume_character_escape(&mut self, in_class: bool) -> Result<u32, Error> {
        let unicode = self.flags.unicode;
        let c = match self.peek() {
            Some(c) => c,
            None => return syntax_error("Incomplete escape"),
        };
        match c {
            'f' | 'n' | 'r' | 't' | 'v' => {
                self.consume(c);
                Ok(match c {
                    'f' => 0xC,
                    'n' => 0xA,
                    'r' => 0xD,
                    't' => 0x9,
                    _ => 0xB,
                })
            }
            'c' => {
                // Control escape.
                let control = match self.peek_at(1) {
                    Some(nc) if nc.is_ascii_alphabetic() => Some(nc),
                    Some(nc) if in_class && !unicode && (nc.is_ascii_digit() || nc == '_') => {
                        Some(nc)
                    }
                    _ => None,
                };
                match control {
                    Some(nc) => {
                        self.pos += 2;
                        Ok(nc as u32 % 32)
                    }
                    // Annex B: the backslash is literal, and 'c' is parsed next.
                    None if !unicode => Ok('\\' as u32),
                    None => syntax_error("Invalid unicode escape"),
                }
            }
            '0' if !matches!(self.peek_at(1), Some('0'..='9')) => {
                self.consume('0');
                Ok(0)
            }
            '0'..='7' if !unicode => Ok(self.consume_legacy_octal()),
            '8' | '9' if !unicode => Ok(self.consume(c)),
            'x' => {
                // HexEscapeSequence :: x HexDigit HexDigit
                self.consume('x');
                match self.consume_hex_digits(2) {
                    Some(v) => Ok(v),
                    None if !unicode => Ok('x' as u32),
                    None => syntax_error("Invalid escape"),
                }
            }
            'u' => {
                self.consume('u');
                match self.try_consume_unicode_escape() {
                    Some(v) => Ok(v),
                    None if !unicode => Ok('u' as u32),
                    None => syntax_error("Invalid unicode escape"),
                }
            }
            '-' if in_class => Ok(self.consume('-')),
            c if is_syntax_char(c) => Ok(self.consume(c)),
            _ if unicode => syntax_error("Invalid escape"),
            // Annex B IdentityEscape: any other character stands for itself.
            _ => match self.next_cp() {
                Some(cp) => Ok(cp),
                None => syntax_error("Incomplete escape"),
            },
        }
    }

    fn consume_atom_escape(&mut self) -> Result<Node, Error> {
        let c = match self.peek() {
            Some(c) => c,
            None => return syntax_error("Incomplete escape"),
        };
        if let Some(esc) = ClassEscape::from_letter(c) {
            self.consume(c);
            return Ok(Node::Class(ClassContents {
                invert: false,
                cps: esc.code_points(self.flags.unicode, self.flags.icase),
            }));
        }
        match c {
            '1'..='9' => {
                // This is a backreference, unless it exceeds the group count
                // outside unicode mode, where Annex B reads it as an octal escape.
                let saved = self.pos;
                let val = self.try_consume_decimal_integer_literal().unwrap_or(0);
                if val <= self.groups.count || self.flags.unicode {
                    return Ok(Node::BackRef(val));
                }
                self.pos = saved;
                Ok(Node::Char(self.consume_character_escape(false)?))
            }
            'k' if self.flags.unicode || !self.groups.names.is_empty() => {
                self.consume('k');
                if !self.try_consume('<') {
                    return syntax_error("Invalid named reference");
                }
                let name = self.consume_group_name()?;
                match self.groups.names.iter().find(|(n, _)| *n == name) {
                    Some(&(_, group)) => Ok(Node::BackRef(group)),
                    None => syntax_error(format!("Invalid named capture referenced: {}", name)),
                }
            }
            'p' | 'P' if self.flags.unicode => {
                syntax_error("Unicode property escapes are not supported")
            }
            _ => Ok(Node::Char(self.consume_character_escape(false)?)),
        }
    }
}

/// Try parsing a given pattern.
/// Return the resulting AST, or an error.
pub fn try_parse(pattern: &str, flags: Flags) -> Result<Regex, Error> {
    // Without the unicode flag a pattern is a sequence of UTF-16 code units.
    let input: Vec<u32> = if flags.unicode {
        pattern.chars().map(u32::from).collect()
    } else {
        pattern.encode_utf16().map(u32::from).collect()
    };
    let groups = scan_groups(&input);
    let parser = Parser {
        input,
        pos: 0,
        flags,
        groups,
        depth: 0,
    };
    parser.try_parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str, flags: &str) -> Node {
        match try_parse(pattern, Flags::from(flags)) {
            Ok(re) => re.node,
            Err(err) => panic!("Failed to parse {}: {}", pattern, err),
        }
    }

    fn quant(body: Node, min: u32, max: u32, greedy: bool) -> Node {
        Node::Quantified {
            body: Box::new(body),
            min,
            max,
            greedy,
        }
    }

    #[test]
    fn quantifiers() {
        assert_eq!(
            parse("a{1,3}?b*", ""),
            Node::Cat(vec![
                quant(Node::Char('a' as u32), 1, 3, false),
                quant(Node::Char('b' as u32), 0, UNBOUNDED, true),
            ])
        );
        assert_eq!(
            parse("a{99999999999,}", ""),
            quant(Node::Char('a' as u32), UNBOUNDED - 1, UNBOUNDED, true)
        );
        // Not a quantifier outside unicode mode.
        assert_eq!(
            parse("a{,3}", ""),
            Node::Cat("a{,3}".chars().map(|c| Node::Char(c as u32)).collect())
        );
    }

    #[test]
    fn astral_literals() {
        // Outside unicode mode the quantifier binds to the trail surrogate.
        assert_eq!(
            parse("\u{1F600}+", ""),
            Node::Cat(vec![
                Node::Char(0xD83D),
                quant(Node::Char(0xDE00), 1, UNBOUNDED, true)
            ])
        );
        assert_eq!(
            parse("\u{1F600}+", "u"),
            quant(Node::Char(0x1F600), 1, UNBOUNDED, true)
        );
        assert_eq!(parse("\\uD83D\\uDE00", "u"), Node::Char(0x1F600));
        assert_eq!(parse("\\u{1F600}", "u"), Node::Char(0x1F600));
    }

    #[test]
    fn annex_b_escapes() {
        assert_eq!(parse("\\8", ""), Node::Char('8' as u32));
        assert_eq!(parse("\\101", ""), Node::Char('A' as u32));
        assert_eq!(
            parse("(a)\\1", ""),
            Node::Cat(vec![
                Node::Group {
                    contents: Box::new(Node::Char('a' as u32)),
                    capture: true,
                    name: None,
                },
                Node::BackRef(1)
            ])
        );
        assert_eq!(parse("\\q", ""), Node::Char('q' as u32));
        assert_eq!(
            parse("\\xZ", ""),
            Node::Cat(vec![Node::Char('x' as u32), Node::Char('Z' as u32)])
        );
    }

    #[test]
    fn named_references() {
        // A forward reference resolves to the group's number.
        let node = parse("\\k<year>(?<year>\\d{4})", "");
        match node {
            Node::Cat(nodes) => assert_eq!(nodes[0], Node::BackRef(1)),
            other => panic!("Unexpected node {:?}", other),
        }
        // Without named groups \k is an identity escape.
        assert_eq!(parse("\\k", ""), Node::Char('k' as u32));
    }

    #[test]
    fn brackets() {
        match parse("[^a-c\\d-]", "") {
            Node::Class(cc) => {
                assert!(cc.invert);
                assert!(cc.cps.contains('b' as u32));
                assert!(cc.cps.contains('5' as u32));
                assert!(cc.cps.contains('-' as u32));
                assert!(!cc.cps.contains('d' as u32));
            }
            other => panic!("Unexpected node {:?}", other),
        }
        match parse("[\\d-z]", "") {
            Node::Class(cc) => {
                assert!(cc.cps.contains('-' as u32));
                assert!(cc.cps.contains('z' as u32));
                assert!(!cc.cps.contains('y' as u32));
            }
            other => panic!("Unexpected node {:?}", other),
        }
    }
}
