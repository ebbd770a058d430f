use crate::indexing::InputIndexer;

#[derive(Debug, Copy, Clone)]
pub struct Forward;

#[derive(Debug, Copy, Clone)]
pub struct Backward;

pub trait Direction: core::fmt::Debug + Copy + Clone {
    const FORWARD: bool;
    fn new() -> Self;
}

impl Direction for Forward {
    const FORWARD: bool = true;
    #[inline(always)]
    fn new() -> Self {
        Forward {}
    }
}

impl Direction for Backward {
    const FORWARD: bool = false;
    #[inline(always)]
    fn new() -> Self {
        Backward {}
    }
}

/// \return the next code unit, updating the position.
#[inline(always)]
pub fn next_unit<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    _dir: Dir,
    pos: &mut usize,
) -> Option<u32> {
    if Dir::FORWARD {
        let c = input.peek_right(*pos)?;
        *pos += 1;
        Some(c)
    } else {
        let c = input.peek_left(*pos)?;
        *pos -= 1;
        Some(c)
    }
}

/// \return the next code point, updating the position.
/// Surrogate pairs are only joined in wide input.
#[inline(always)]
pub fn next_code_point<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    _dir: Dir,
    pos: &mut usize,
) -> Option<u32> {
    if Dir::FORWARD {
        input.next_cp_right(pos)
    } else {
        input.next_cp_left(pos)
    }
}

/// \return the next code unit or code point, updating the position.
#[inline(always)]
pub fn next<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    pos: &mut usize,
    code_point: bool,
) -> Option<u32> {
    if code_point {
        next_code_point(input, dir, pos)
    } else {
        next_unit(input, dir, pos)
    }
}

/// \return whether a unit is available in the direction of travel.
#[inline(always)]
pub fn has_next<Input: InputIndexer, Dir: Direction>(input: &Input, _dir: Dir, pos: usize) -> bool {
    if Dir::FORWARD {
        pos < input.len()
    } else {
        pos > 0
    }
}

/// \return whether we match some literal bytes, compared to code units.
/// If so, update the position. If not, the position is unspecified.
#[inline(always)]
pub fn try_match_lit<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    pos: &mut usize,
    bytes: &[u8],
) -> bool {
    for &b in bytes {
        match next_unit(input, dir, pos) {
            Some(c) if c == b as u32 => {}
            _ => return false,
        }
    }
    true
}

/// \return whether the units in [start, end) equal those at \p pos, in the
/// direction of travel. If so, update the position.
pub fn subrange_eq<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    _dir: Dir,
    pos: &mut usize,
    start: usize,
    end: usize,
) -> bool {
    let len = end - start;
    let (from, to) = if Dir::FORWARD {
        match pos.checked_add(len) {
            Some(to) if to <= input.len() => (*pos, to),
            _ => return false,
        }
    } else {
        match pos.checked_sub(len) {
            Some(from) => (from, *pos),
            None => return false,
        }
    };
    if (0..len).all(|i| input.unit(start + i) == input.unit(from + i)) {
        *pos = if Dir::FORWARD { to } else { from };
        true
    } else {
        false
    }
}
