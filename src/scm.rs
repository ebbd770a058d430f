use crate::charclasses::is_line_terminator;
use crate::cursor;
use crate::cursor::Direction;
use crate::folds;
use crate::indexing::InputIndexer;
use crate::insn::RangeList;

/// A trait for things that match a single character.
pub trait SingleCharMatcher<Input: InputIndexer, Dir: Direction> {
    /// \return whether we match the character at the given position, advancing
    /// the position if so. On a false return, the position is unspecified.
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool;
}

/// MatchChar8, MatchChar16, U16MatchChar32.
pub struct Char {
    pub c: u32,
    pub code_point: bool,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for Char {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        cursor::next(input, dir, pos, self.code_point) == Some(self.c)
    }
}

/// The ICase variants; `c` is canonical.
pub struct CharICase {
    pub c: u32,
    pub unicode: bool,
    pub code_point: bool,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for CharICase {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos, self.code_point) {
            Some(c2) => c2 == self.c || folds::canonicalize(c2, self.unicode) == self.c,
            None => false,
        }
    }
}

/// Bracket and U16Bracket.
pub struct Bracket<'a> {
    pub ranges: RangeList<'a>,
    pub code_point: bool,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for Bracket<'_> {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos, self.code_point) {
            Some(c) => self.ranges.contains(c),
            None => false,
        }
    }
}

/// MatchAny and U16MatchAny.
pub struct MatchAny {
    pub code_point: bool,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for MatchAny {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        // If there is a character, it counts as a match.
        cursor::next(input, dir, pos, self.code_point).is_some()
    }
}

/// MatchAnyButNewline and U16MatchAnyButNewline.
pub struct MatchAnyExceptLineTerminator {
    pub code_point: bool,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir>
    for MatchAnyExceptLineTerminator
{
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos, self.code_point) {
            Some(c) => !is_line_terminator(c),
            None => false,
        }
    }
}
