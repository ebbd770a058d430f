use crate::ast;
use crate::classicalbacktrack::BacktrackExecutor;
use crate::disasm;
use crate::emit;
use crate::error::MatchError;
use crate::exec;
use crate::exec::{Found, MatchProducer};
use crate::indexing::{InputIndexer, Latin1Input, Utf16Input};
use crate::insn::Program;
use crate::ir;
use crate::parse;
use crate::util::{to_char_sat, utf16_with_byte_offsets};

use core::{fmt, str::FromStr};
use std::sync::Arc;

pub use crate::error::Error;

/// Flags used to control regex parsing and matching.
/// The default flags are case-sensitive, not-multiline, and optimizing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// If set, make the regex case-insensitive.
    /// Equivalent to the 'i' flag in JavaScript.
    pub icase: bool,

    /// If set, ^ and $ match at line separators, not just the input boundaries.
    /// Equivalent to the 'm' flag in JavaScript.
    pub multiline: bool,

    /// If set, . matches at line separators as well as any other character.
    /// Equivalent to the 's' flag in JavaScript.
    pub dot_all: bool,

    /// If set, the regex is interpreted as a Unicode regex.
    /// Equivalent to the 'u' flag in JavaScript.
    pub unicode: bool,

    /// If set, each search only tries its start offset.
    /// Equivalent to the 'y' flag in JavaScript.
    pub sticky: bool,

    /// Recorded in the program header; iteration is always available.
    /// Equivalent to the 'g' flag in JavaScript.
    pub global: bool,

    /// If set, disable literal coalescing, single-unit loops and the start
    /// predicate.
    pub no_opt: bool,
}

impl Flags {
    const ICASE: u8 = 1;
    const GLOBAL: u8 = 2;
    const MULTILINE: u8 = 4;
    const UNICODE: u8 = 8;
    const DOT_ALL: u8 = 16;
    const STICKY: u8 = 32;

    /// Construct a Flags from a Unicode codepoints iterator, using JavaScript
    /// letters. Unknown letters are ignored.
    #[inline]
    pub fn new<T: Iterator<Item = u32>>(chars: T) -> Self {
        let mut result = Self::default();
        for c in chars {
            match to_char_sat(c) {
                'g' => result.global = true,
                'i' => result.icase = true,
                'm' => result.multiline = true,
                's' => result.dot_all = true,
                'u' => result.unicode = true,
                'y' => result.sticky = true,
                _ => {
                    // Silently skip unsupported flags.
                }
            }
        }
        result
    }

    /// \return the header byte for these flags. `no_opt` is not recorded.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        for &(set, bit) in &[
            (self.icase, Self::ICASE),
            (self.global, Self::GLOBAL),
            (self.multiline, Self::MULTILINE),
            (self.unicode, Self::UNICODE),
            (self.dot_all, Self::DOT_ALL),
            (self.sticky, Self::STICKY),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }

    /// Inverse of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        Flags {
            icase: bits & Self::ICASE != 0,
            global: bits & Self::GLOBAL != 0,
            multiline: bits & Self::MULTILINE != 0,
            unicode: bits & Self::UNICODE != 0,
            dot_all: bits & Self::DOT_ALL != 0,
            sticky: bits & Self::STICKY != 0,
            no_opt: false,
        }
    }
}

impl From<&str> for Flags {
    /// Construct a Flags from a string, using JavaScript letters.
    ///
    /// See also: [`Flags::new`].
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s.chars().map(u32::from))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &(set, letter) in &[
            (self.global, "g"),
            (self.icase, "i"),
            (self.multiline, "m"),
            (self.dot_all, "s"),
            (self.unicode, "u"),
            (self.sticky, "y"),
        ] {
            if set {
                f.write_str(letter)?;
            }
        }
        Ok(())
    }
}

/// Options applied when compiling.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// The largest permitted program, in bytes.
    pub max_program_len: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_program_len: u32::MAX,
        }
    }
}

/// Limits applied to a single search.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// The most choice points a search may push, across all start positions.
    pub backtrack_limit: Option<u64>,

    /// The deepest permitted nesting of lookarounds.
    pub depth_limit: Option<u32>,
}

/// A span of input, in the offsets of whatever was searched.
pub type Range = core::ops::Range<usize>;

/// A successful match: its extent and the extent of each capture group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The extent of the whole match, possibly empty.
    pub range: Range,

    /// One entry per capture group, in source order. None means the group
    /// did not participate in the match.
    pub captures: Vec<Option<Range>>,

    // Either empty, when no group is named, or one entry per capture with
    // "" for unnamed groups.
    pub(crate) group_names: Box<[Box<str>]>,
}

impl Match {
    /// Group 0 is the whole match; group N is the Nth capture group.
    #[inline]
    pub fn group(&self, idx: usize) -> Option<Range> {
        match idx.checked_sub(1) {
            None => Some(self.range()),
            Some(cap) => self.captures.get(cap)?.clone(),
        }
    }

    /// The range of the group named \p name, if it participated.
    pub fn named_group(&self, name: &str) -> Option<Range> {
        if name.is_empty() {
            return None;
        }
        let idx = self.group_names.iter().position(|n| n.as_ref() == name)?;
        self.captures[idx].clone()
    }

    /// (name, range) for each named group, in source order.
    #[inline]
    pub fn named_groups(&self) -> NamedGroups {
        NamedGroups {
            mat: self,
            idx: 0,
        }
    }

    #[inline]
    pub fn range(&self) -> Range {
        self.range.clone()
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.range.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.range.end
    }

    /// The whole match followed by every capture group, as from `group`.
    #[inline]
    pub fn groups(&self) -> Groups {
        Groups {
            mat: self,
            idxs: 0..self.captures.len() + 1,
        }
    }

    /// Rewrite every range start through \p start and every end through
    /// \p end.
    fn map_offsets(
        mut self,
        start: impl Fn(usize) -> usize,
        end: impl Fn(usize) -> usize,
    ) -> Self {
        self.range = start(self.range.start)..end(self.range.end);
        for r in self.captures.iter_mut().flatten() {
            *r = start(r.start)..end(r.end);
        }
        self
    }
}

/// Iterator returned by [`Match::groups`].
#[derive(Debug, Clone)]
pub struct Groups<'m> {
    mat: &'m Match,
    idxs: Range,
}

impl Iterator for Groups<'_> {
    type Item = Option<Range>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.idxs.next()?;
        Some(self.mat.group(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.idxs.size_hint()
    }
}

/// Iterator returned by [`Match::named_groups`].
#[derive(Debug, Clone)]
pub struct NamedGroups<'m> {
    mat: &'m Match,
    // Next index into the group names.
    idx: usize,
}

impl<'m> Iterator for NamedGroups<'m> {
    type Item = (&'m str, Option<Range>);

    fn next(&mut self) -> Option<Self::Item> {
        let mat: &'m Match = self.mat;
        let names = &mat.group_names;
        while self.idx < names.len() {
            let idx = self.idx;
            self.idx += 1;
            if !names[idx].is_empty() {
                return Some((&*names[idx], mat.captures[idx].clone()));
            }
        }
        None
    }
}

/// Run one search of \p prog over \p input from \p start.
fn search<Input: InputIndexer>(
    prog: &Program,
    input: Input,
    start: usize,
    options: &MatchOptions,
) -> Result<Option<Found>, MatchError> {
    BacktrackExecutor::new(prog, input, options).next_match(start)
}

/// An iterator over the matches in a slice of code units, yielding unit
/// offsets.
#[derive(Debug)]
pub struct Matches<'r, Input: InputIndexer> {
    inner: exec::Matches<BacktrackExecutor<'r, Input>>,
}

impl<Input: InputIndexer> Iterator for Matches<'_, Input> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        // Without limits a search cannot fail.
        self.inner.next()?.ok()
    }
}

/// The code units backing a string search.
#[derive(Debug)]
enum StrInput<'t> {
    /// ASCII text, searched directly.
    Ascii(&'t [u8]),

    /// Other text, transcoded. `offsets` maps unit offsets to byte offsets.
    Utf16 { units: Vec<u16>, offsets: Vec<usize> },
}

impl<'t> StrInput<'t> {
    fn new(text: &'t str) -> Self {
        if text.is_ascii() {
            StrInput::Ascii(text.as_bytes())
        } else {
            let (units, offsets) = utf16_with_byte_offsets(text);
            StrInput::Utf16 { units, offsets }
        }
    }

    /// \return the unit offset of byte offset \p start.
    fn unit_offset(&self, start: usize) -> usize {
        match self {
            StrInput::Ascii(_) => start,
            StrInput::Utf16 { offsets, .. } => offsets.partition_point(|&b| b < start),
        }
    }

    /// Search from unit offset \p start, returning byte offsets.
    fn search(
        &self,
        prog: &Program,
        start: usize,
        options: &MatchOptions,
    ) -> Result<Option<Found>, MatchError> {
        match self {
            StrInput::Ascii(bytes) => search(prog, Latin1Input::ascii(bytes), start, options),
            StrInput::Utf16 { units, offsets } => {
                let found = search(prog, Utf16Input::non_ascii(units), start, options)?;
                // A unit offset between the halves of a pair shares its byte
                // offset with the lead. Ends round up past the trail.
                let mid_pair = |u: usize| u > 0 && u < units.len() && offsets[u - 1] == offsets[u];
                let byte_end = |u: usize| offsets[if mid_pair(u) { u + 1 } else { u }];
                Ok(found.map(|Found { mat, resume }| Found {
                    mat: mat.map_offsets(|u| offsets[u], byte_end),
                    resume: resume.map(|u| if mid_pair(u) { u + 1 } else { u }),
                }))
            }
        }
    }
}

/// An iterator over the matches in a `&str`, yielding byte offsets.
#[derive(Debug)]
pub struct StrMatches<'r, 't> {
    prog: &'r Program,
    input: StrInput<'t>,
    // Unit offset of the next search.
    resume: Option<usize>,
}

impl Iterator for StrMatches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let start = self.resume.take()?;
        // Without limits a search cannot fail.
        let found = self
            .input
            .search(self.prog, start, &MatchOptions::default())
            .ok()??;
        self.resume = found.resume;
        Some(found.mat)
    }
}

/// A Regex is the compiled version of a pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    prog: Arc<Program>,
}

impl From<Program> for Regex {
    fn from(prog: Program) -> Self {
        Self {
            prog: Arc::new(prog),
        }
    }
}

impl Regex {
    /// Construct a regex by parsing `pattern` using the default flags.
    /// An Error may be returned if the syntax is invalid.
    #[inline]
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Self::with_flags(pattern, Flags::default())
    }

    /// Construct a regex by parsing `pattern` with `flags`.
    /// An Error may be returned if the syntax is invalid.
    ///
    /// Note it is preferable to cache a Regex which is intended to be used more
    /// than once, as the parse may be expensive.
    #[inline]
    pub fn with_flags<F>(pattern: &str, flags: F) -> Result<Regex, Error>
    where
        F: Into<Flags>,
    {
        Self::with_options(pattern, flags.into(), CompileOptions::default())
    }

    /// Construct a regex by parsing `pattern` with `flags`, subject to
    /// `options`.
    pub fn with_options(
        pattern: &str,
        flags: Flags,
        options: CompileOptions,
    ) -> Result<Regex, Error> {
        let ast = parse::try_parse(pattern, flags)?;
        Self::from_ast(&ast, options)
    }

    /// Compile an already built syntax tree. The tree is validated first.
    pub fn from_ast(ast: &ast::Regex, options: CompileOptions) -> Result<Regex, Error> {
        let ir = ir::lower(ast)?;
        let prog = emit::emit(&ir, &options)?;
        log::debug!(
            "Compiled with flags '{}': {} bytes, {} groups, {} loops, constraints {}",
            ast.flags,
            prog.bytes.len(),
            prog.header.marked_count,
            prog.header.loop_count,
            prog.header.constraints.bits()
        );
        log::trace!("{}", disasm::disassemble(&prog));
        Ok(prog.into())
    }

    /// The compiled program.
    #[inline]
    pub fn program(&self) -> &Program {
        &self.prog
    }

    /// Searches `text` to find the first match.
    #[inline]
    pub fn find(&self, text: &str) -> Option<Match> {
        self.find_iter(text).next()
    }

    /// Searches `text`, returning an iterator over non-overlapping matches.
    #[inline]
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> StrMatches<'r, 't> {
        self.find_from(text, 0)
    }

    /// Returns an iterator for matches found in `text` starting at byte index
    /// `start`. Note this may be different from passing a sliced `text` in
    /// the case of lookbehind assertions.
    /// Example:
    ///
    ///  ```rust
    ///   use regvm::Regex;
    ///   let text = "xyxy";
    ///   let re = Regex::new(r"(?<=x)y").unwrap();
    ///   let t1 = re.find(&text[1..]).unwrap().range();
    ///   assert!(t1 == (2..3));
    ///   let t2 = re.find_from(text, 1).next().unwrap().range();
    ///   assert!(t2 == (1..2));
    ///   ```
    pub fn find_from<'r, 't>(&'r self, text: &'t str, start: usize) -> StrMatches<'r, 't> {
        let input = StrInput::new(text);
        let resume = Some(input.unit_offset(start));
        StrMatches {
            prog: &self.prog,
            input,
            resume,
        }
    }

    /// Searches `text` from byte index `start` under `options`.
    pub fn try_find(
        &self,
        text: &str,
        start: usize,
        options: &MatchOptions,
    ) -> Result<Option<Match>, MatchError> {
        let input = StrInput::new(text);
        let start = input.unit_offset(start);
        Ok(input.search(&self.prog, start, options)?.map(|found| found.mat))
    }

    /// Searches UTF-16 `text` from unit index `start`. Offsets in the result
    /// are unit indexes. Unpaired surrogates are permitted.
    #[inline]
    pub fn find_utf16(&self, text: &[u16], start: usize) -> Option<Match> {
        self.try_find_utf16(text, start, &MatchOptions::default())
            .ok()
            .flatten()
    }

    /// Searches Latin-1 `text` from index `start`. Each byte is one code unit.
    #[inline]
    pub fn find_latin1(&self, text: &[u8], start: usize) -> Option<Match> {
        self.try_find_latin1(text, start, &MatchOptions::default())
            .ok()
            .flatten()
    }

    /// Like `find_utf16`, but under `options`.
    pub fn try_find_utf16(
        &self,
        text: &[u16],
        start: usize,
        options: &MatchOptions,
    ) -> Result<Option<Match>, MatchError> {
        Ok(search(&self.prog, Utf16Input::new(text), start, options)?.map(|found| found.mat))
    }

    /// Like `find_latin1`, but under `options`.
    pub fn try_find_latin1(
        &self,
        text: &[u8],
        start: usize,
        options: &MatchOptions,
    ) -> Result<Option<Match>, MatchError> {
        Ok(search(&self.prog, Latin1Input::new(text), start, options)?.map(|found| found.mat))
    }

    /// Returns an iterator over non-overlapping matches in UTF-16 `text`.
    #[inline]
    pub fn find_iter_utf16<'r, 't>(&'r self, text: &'t [u16]) -> Matches<'r, Utf16Input<'t>> {
        self.find_from_utf16(text, 0)
    }

    /// Returns an iterator over non-overlapping matches in Latin-1 `text`.
    #[inline]
    pub fn find_iter_latin1<'r, 't>(&'r self, text: &'t [u8]) -> Matches<'r, Latin1Input<'t>> {
        self.find_from_latin1(text, 0)
    }

    /// Returns an iterator for matches found in UTF-16 `text` starting at
    /// unit index `start`.
    pub fn find_from_utf16<'r, 't>(
        &'r self,
        text: &'t [u16],
        start: usize,
    ) -> Matches<'r, Utf16Input<'t>> {
        self.matches(Utf16Input::new(text), start)
    }

    /// Returns an iterator for matches found in Latin-1 `text` starting at
    /// index `start`.
    pub fn find_from_latin1<'r, 't>(
        &'r self,
        text: &'t [u8],
        start: usize,
    ) -> Matches<'r, Latin1Input<'t>> {
        self.matches(Latin1Input::new(text), start)
    }

    fn matches<Input: InputIndexer>(&self, input: Input, start: usize) -> Matches<'_, Input> {
        let executor = BacktrackExecutor::new(&self.prog, input, &MatchOptions::default());
        Matches {
            inner: exec::Matches::new(executor, start),
        }
    }
}

impl FromStr for Regex {
    type Err = Error;

    /// Attempts to parse a string into a regular expression
    #[inline]
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::new(s)
    }
}
