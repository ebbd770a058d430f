use crate::cursor;
use crate::cursor::Direction;
use crate::folds;
use crate::indexing::InputIndexer;
use core::ops::Range;

/// Check whether the \p orig_range within \p input matches at position \p pos.
pub fn backref<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    orig_range: Range<usize>,
    pos: &mut usize,
) -> bool {
    cursor::subrange_eq(input, dir, pos, orig_range.start, orig_range.end)
}

/// \return whether two characters have the same canonical case.
#[inline]
pub fn fold_equals(c1: u32, c2: u32, unicode: bool) -> bool {
    c1 == c2 || folds::canonicalize(c1, unicode) == folds::canonicalize(c2, unicode)
}

/// Case-insensitive backreference. Compares by code unit, or by code point
/// in unicode mode.
pub fn backref_icase<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    orig_range: Range<usize>,
    pos: &mut usize,
    unicode: bool,
) -> bool {
    // Walk the referenced text in the same direction as the cursor.
    let mut ref_pos = if Dir::FORWARD {
        orig_range.start
    } else {
        orig_range.end
    };
    loop {
        let done = if Dir::FORWARD {
            ref_pos >= orig_range.end
        } else {
            ref_pos <= orig_range.start
        };
        if done {
            return true;
        }
        let c1 = cursor::next(input, dir, &mut ref_pos, unicode);
        let c2 = cursor::next(input, dir, pos, unicode);
        match (c1, c2) {
            (Some(c1), Some(c2)) if fold_equals(c1, c2, unicode) => {}
            _ => return false,
        }
    }
}
