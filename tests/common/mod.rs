#![allow(dead_code)]

use regvm::{Flags, Match, Range, Regex};

/// Encode a string as UTF-16.
pub fn to_utf16(input: &str) -> Vec<u16> {
    input.encode_utf16().collect()
}

/// For each UTF-16 unit offset of \p input (plus the end), the byte offset
/// of the character containing it.
fn utf16_to_byte_offsets(input: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(input.len() + 1);
    for (byte_idx, c) in input.char_indices() {
        offsets.extend(std::iter::repeat(byte_idx).take(c.len_utf16()));
    }
    offsets.push(input.len());
    offsets
}

/// Render a match as the matched text followed by each capture, comma
/// separated. Unset captures render as nothing.
fn format_match(m: &Match, input: &str) -> String {
    m.groups()
        .map(|g| g.map_or("", |r| &input[r]))
        .collect::<Vec<_>>()
        .join(",")
}

pub trait StringTestHelpers {
    /// Fluent equality check against a str.
    fn test_eq(&self, s: &str);
}

impl StringTestHelpers for String {
    #[track_caller]
    fn test_eq(&self, rhs: &str) {
        assert_eq!(self.as_str(), rhs)
    }
}

pub trait VecTestHelpers {
    /// Fluent equality check against a list of strs.
    fn test_eq(&self, rhs: Vec<&str>);
}

impl VecTestHelpers for Vec<&str> {
    #[track_caller]
    fn test_eq(&self, rhs: Vec<&str>) {
        assert_eq!(*self, rhs)
    }
}

/// A regex compiled under some TestConfig, which it remembers so that
/// searches run against the configured input width.
#[derive(Debug, Clone)]
pub struct TestCompiledRegex {
    re: Regex,
    tc: TestConfig,
}

impl TestCompiledRegex {
    /// All matches in \p input from byte offset \p start, with byte offsets.
    #[track_caller]
    pub fn matches(&self, input: &str, start: usize) -> Vec<Match> {
        if !self.tc.wide {
            return self.re.find_from(input, start).collect();
        }
        // Search the UTF-16 encoding, even when the input is ASCII.
        let units = to_utf16(input);
        let offsets = utf16_to_byte_offsets(input);
        let unit_start = offsets.partition_point(|&b| b < start);
        let to_bytes = |r: Range| offsets[r.start]..offsets[r.end];
        self.re
            .find_from_utf16(&units, unit_start)
            .map(|mut m| {
                m.range = to_bytes(m.range());
                for cap in m.captures.iter_mut() {
                    *cap = cap.take().map(to_bytes);
                }
                m
            })
            .collect()
    }

    /// The first match in \p input, if any.
    pub fn find(&self, input: &str) -> Option<Match> {
        self.matches(input, 0).into_iter().next()
    }

    #[track_caller]
    fn find_or_panic(&self, input: &str) -> Match {
        match self.find(input) {
            Some(m) => m,
            None => panic!("Failed to match {}", input),
        }
    }

    /// The first match, formatted by `format_match`.
    #[track_caller]
    pub fn match1f(&self, input: &str) -> String {
        format_match(&self.find_or_panic(input), input)
    }

    /// The text of named group \p group in the first match.
    #[track_caller]
    pub fn match1_named_group(&self, input: &str, group: &str) -> String {
        match self.find_or_panic(input).named_group(group) {
            Some(r) => input[r].to_string(),
            None => panic!("Named capture group did not match {}", group),
        }
    }

    /// The first match and its captures, with None for unset groups.
    #[track_caller]
    pub fn match1_vec<'b>(&self, input: &'b str) -> Vec<Option<&'b str>> {
        self.find_or_panic(input)
            .groups()
            .map(|g| g.map(|r| &input[r]))
            .collect()
    }

    #[track_caller]
    pub fn test_fails(&self, input: &str) {
        assert!(self.find(input).is_none(), "Should not have matched {}", input)
    }

    #[track_caller]
    pub fn test_succeeds(&self, input: &str) {
        assert!(self.find(input).is_some(), "Should have matched {}", input)
    }

    /// Byte ranges of every match from \p start.
    pub fn match_all_from(&self, input: &str, start: usize) -> Vec<Range> {
        self.matches(input, start)
            .iter()
            .map(Match::range)
            .collect()
    }

    /// Text of every match.
    pub fn match_all<'b>(&self, input: &'b str) -> Vec<&'b str> {
        self.match_all_from(input, 0)
            .into_iter()
            .map(|r| &input[r])
            .collect()
    }
}

/// One point in the test matrix.
#[derive(Debug, Copy, Clone)]
pub struct TestConfig {
    // Search UTF-16 rather than the str.
    wide: bool,

    // Compile with the bytecode optimizations.
    optimize: bool,
}

impl TestConfig {
    #[track_caller]
    pub fn compile(&self, pattern: &str) -> TestCompiledRegex {
        self.compilef(pattern, "")
    }

    /// Compile \p pattern with flags given as a string like "gi".
    #[track_caller]
    pub fn compilef(&self, pattern: &str, flags_str: &str) -> TestCompiledRegex {
        let mut flags = Flags::from(flags_str);
        flags.no_opt = !self.optimize;
        match Regex::with_flags(pattern, flags) {
            Ok(re) => TestCompiledRegex { re, tc: *self },
            Err(err) => panic!(
                "Failed to compile /{}/{} under {:?}: {}",
                pattern, flags_str, self, err
            ),
        }
    }
}

/// Run \p func under every TestConfig.
pub fn test_with_configs<F>(func: F)
where
    F: Fn(TestConfig),
{
    for &wide in &[false, true] {
        for &optimize in &[false, true] {
            func(TestConfig { wide, optimize });
        }
    }
}
