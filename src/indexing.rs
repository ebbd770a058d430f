use crate::util::{combine_surrogates, is_lead_surrogate, is_trail_surrogate};
use core::fmt::Debug;

/// A helper type that holds an input sequence of code units and allows
/// indexing into it. Positions are unit offsets.
pub trait InputIndexer: Debug + Copy + Clone {
    /// Whether code units are 16 bits, so that surrogate pairs exist.
    const WIDE: bool;

    /// \return the number of code units.
    fn len(&self) -> usize;

    /// \return whether the input is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// \return the code unit at \p pos, which must be in range.
    fn unit(&self, pos: usize) -> u32;

    /// \return whether some code unit is outside ASCII.
    fn has_non_ascii(&self) -> bool;

    /// \return the unit to the right (starting at) \p pos, or None if we are
    /// at the end.
    #[inline(always)]
    fn peek_right(&self, pos: usize) -> Option<u32> {
        if pos < self.len() {
            Some(self.unit(pos))
        } else {
            None
        }
    }

    /// \return the unit to the left (ending just before) \p pos, or None if
    /// we are at the start.
    #[inline(always)]
    fn peek_left(&self, pos: usize) -> Option<u32> {
        if pos > 0 {
            Some(self.unit(pos - 1))
        } else {
            None
        }
    }

    /// \return the code point to the right of \p pos, advancing past it.
    /// A valid surrogate pair is decoded as one code point.
    #[inline(always)]
    fn next_cp_right(&self, pos: &mut usize) -> Option<u32> {
        let lead = self.peek_right(*pos)?;
        *pos += 1;
        if Self::WIDE && is_lead_surrogate(lead) {
            if let Some(trail) = self.peek_right(*pos).filter(|&t| is_trail_surrogate(t)) {
                *pos += 1;
                return Some(combine_surrogates(lead, trail));
            }
        }
        Some(lead)
    }

    /// \return the code point to the left of \p pos, retreating past it.
    #[inline(always)]
    fn next_cp_left(&self, pos: &mut usize) -> Option<u32> {
        let trail = self.peek_left(*pos)?;
        *pos -= 1;
        if Self::WIDE && is_trail_surrogate(trail) {
            if let Some(lead) = self.peek_left(*pos).filter(|&l| is_lead_surrogate(l)) {
                *pos -= 1;
                return Some(combine_surrogates(lead, trail));
            }
        }
        Some(trail)
    }

    /// \return the position of the first occurrence of \p unit at or after
    /// \p pos.
    fn find_unit(&self, pos: usize, unit: u32) -> Option<usize>;

    /// \return the position of the first occurrence of \p seq at or after
    /// \p pos.
    fn find_seq(&self, pos: usize, seq: &[u8]) -> Option<usize>;
}

/// Latin-1 input: one byte per code unit.
#[derive(Debug, Copy, Clone)]
pub struct Latin1Input<'a> {
    bytes: &'a [u8],
    non_ascii: bool,
}

impl<'a> Latin1Input<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            non_ascii: !bytes.is_ascii(),
        }
    }

    /// Wrap bytes already known to be ASCII.
    pub(crate) fn ascii(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.is_ascii());
        Self {
            bytes,
            non_ascii: false,
        }
    }
}

impl InputIndexer for Latin1Input<'_> {
    const WIDE: bool = false;

    #[inline(always)]
    fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn unit(&self, pos: usize) -> u32 {
        self.bytes[pos] as u32
    }

    fn has_non_ascii(&self) -> bool {
        self.non_ascii
    }

    fn find_unit(&self, pos: usize, unit: u32) -> Option<usize> {
        if unit > 0xFF {
            return None;
        }
        let rest = self.bytes.get(pos..)?;
        memchr::memchr(unit as u8, rest).map(|idx| pos + idx)
    }

    fn find_seq(&self, pos: usize, seq: &[u8]) -> Option<usize> {
        let rest = self.bytes.get(pos..)?;
        memchr::memmem::find(rest, seq).map(|idx| pos + idx)
    }
}

/// UTF-16 input. Unpaired surrogates are permitted.
#[derive(Debug, Copy, Clone)]
pub struct Utf16Input<'a> {
    units: &'a [u16],
    non_ascii: bool,
}

impl<'a> Utf16Input<'a> {
    pub fn new(units: &'a [u16]) -> Self {
        Self {
            units,
            non_ascii: units.iter().any(|&u| u >= 0x80),
        }
    }

    /// Wrap units already known to contain a non-ASCII unit.
    pub(crate) fn non_ascii(units: &'a [u16]) -> Self {
        Self {
            units,
            non_ascii: true,
        }
    }
}

impl InputIndexer for Utf16Input<'_> {
    const WIDE: bool = true;

    #[inline(always)]
    fn len(&self) -> usize {
        self.units.len()
    }

    #[inline(always)]
    fn unit(&self, pos: usize) -> u32 {
        self.units[pos] as u32
    }

    fn has_non_ascii(&self) -> bool {
        self.non_ascii
    }

    fn find_unit(&self, pos: usize, unit: u32) -> Option<usize> {
        let rest = self.units.get(pos..)?;
        rest.iter()
            .position(|&u| u as u32 == unit)
            .map(|idx| pos + idx)
    }

    fn find_seq(&self, pos: usize, seq: &[u8]) -> Option<usize> {
        let (&first, tail) = match seq.split_first() {
            Some(split) => split,
            None => return Some(pos),
        };
        let mut start = pos;
        loop {
            let found = self.find_unit(start, first as u32)?;
            let candidate = self.units.get(found + 1..found + 1 + tail.len());
            if let Some(candidate) = candidate {
                if candidate.iter().zip(tail).all(|(&u, &b)| u == b as u16) {
                    return Some(found);
                }
            } else {
                return None;
            }
            start = found + 1;
        }
    }
}
