//! Bytecode instructions for a compiled regex
//!
//! A program is a flat byte stream. Each instruction is a one byte opcode
//! followed by little-endian, unaligned operands. Jump targets are absolute
//! byte offsets into the stream.

use crate::api::Flags;
use crate::codepointset::Interval;
use crate::types::{CaptureGroupID, LoopID};
use core::{cmp::Ordering, ops};

pub type JumpTarget = u32;

/// Facts about every possible match of some part of a pattern.
/// These let the matcher skip work which cannot succeed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Constraints(u8);

impl Constraints {
    pub const NONE: Constraints = Constraints(0);

    /// A match requires a non-ASCII code unit somewhere in the input.
    pub const NON_ASCII: Constraints = Constraints(1);

    /// A match can only start at offset 0.
    pub const ANCHORED_AT_START: Constraints = Constraints(2);

    /// A match consumes at least one code unit.
    pub const NON_EMPTY: Constraints = Constraints(4);

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Construct from raw bits, dropping unknown ones.
    #[inline]
    pub fn from_bits(bits: u8) -> Constraints {
        Constraints(bits & 7)
    }

    #[inline]
    pub fn contains(self, other: Constraints) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl ops::BitOr for Constraints {
    type Output = Constraints;
    fn bitor(self, rhs: Constraints) -> Constraints {
        Constraints(self.0 | rhs.0)
    }
}

impl ops::BitAnd for Constraints {
    type Output = Constraints;
    fn bitand(self, rhs: Constraints) -> Constraints {
        Constraints(self.0 & rhs.0)
    }
}

impl ops::BitOrAssign for Constraints {
    fn bitor_assign(&mut self, rhs: Constraints) {
        self.0 |= rhs.0
    }
}

/// Instruction opcodes. The discriminant is the encoded byte.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    Goal = 0,
    LeftAnchor,
    RightAnchor,
    MatchAny,
    U16MatchAny,
    MatchAnyButNewline,
    U16MatchAnyButNewline,
    MatchChar8,
    MatchCharICase8,
    MatchChar16,
    MatchCharICase16,
    U16MatchChar32,
    U16MatchCharICase32,
    MatchNChar8,
    MatchNCharICase8,
    Alternation,
    Jump32,
    Bracket,
    U16Bracket,
    BeginMarkedSubexpression,
    EndMarkedSubexpression,
    BackRef,
    WordBoundary,
    Lookaround,
    BeginLoop,
    EndLoop,
    BeginSimpleLoop,
    EndSimpleLoop,
    Width1Loop,
}

const OPCODES: [Opcode; 29] = [
    Opcode::Goal,
    Opcode::LeftAnchor,
    Opcode::RightAnchor,
    Opcode::MatchAny,
    Opcode::U16MatchAny,
    Opcode::MatchAnyButNewline,
    Opcode::U16MatchAnyButNewline,
    Opcode::MatchChar8,
    Opcode::MatchCharICase8,
    Opcode::MatchChar16,
    Opcode::MatchCharICase16,
    Opcode::U16MatchChar32,
    Opcode::U16MatchCharICase32,
    Opcode::MatchNChar8,
    Opcode::MatchNCharICase8,
    Opcode::Alternation,
    Opcode::Jump32,
    Opcode::Bracket,
    Opcode::U16Bracket,
    Opcode::BeginMarkedSubexpression,
    Opcode::EndMarkedSubexpression,
    Opcode::BackRef,
    Opcode::WordBoundary,
    Opcode::Lookaround,
    Opcode::BeginLoop,
    Opcode::EndLoop,
    Opcode::BeginSimpleLoop,
    Opcode::EndSimpleLoop,
    Opcode::Width1Loop,
];

impl Opcode {
    #[inline]
    pub fn from_byte(b: u8) -> Option<Opcode> {
        OPCODES.get(b as usize).copied()
    }
}

/// Byte offsets of patchable target fields, relative to the opcode.
pub mod patch_offset {
    pub const ALTERNATION_TARGET: usize = 1;
    pub const JUMP_TARGET: usize = 1;
    pub const LOOKAROUND_CONTINUATION: usize = 8;
    pub const BEGIN_LOOP_NOT_TAKEN: usize = 18;
    pub const BEGIN_SIMPLE_LOOP_NOT_TAKEN: usize = 2;
    pub const WIDTH1_LOOP_NOT_TAKEN: usize = 14;
}

/// The size of a fixed-width Width1Loop header, excluding its body.
pub const WIDTH1_LOOP_HEADER_LEN: usize = 18;

/// The longest run held by one MatchNChar8 instruction.
pub const MAX_NCHAR_LEN: usize = 255;

/// A view of the ranges of an encoded bracket.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RangeList<'a> {
    // count * (start u32, end u32)
    bytes: &'a [u8],
}

impl<'a> RangeList<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / 8
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Interval {
        let base = idx * 8;
        Interval::new(read_u32(self.bytes, base), read_u32(self.bytes, base + 4))
    }

    pub fn iter(&self) -> impl Iterator<Item = Interval> + 'a {
        let list = *self;
        (0..list.len()).map(move |i| list.get(i))
    }

    /// \return whether \p cp is in some range, via binary search.
    pub fn contains(&self, cp: u32) -> bool {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.get(mid).compare(cp) {
                Ordering::Equal => return true,
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        false
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn<'a> {
    /// The match was successful.
    Goal,

    /// `^`: start of input, or after a line terminator if multiline.
    LeftAnchor,

    /// `$`: end of input, or before a line terminator if multiline.
    RightAnchor,

    /// `.` under dotAll, one code unit.
    MatchAny,

    /// `.` under dotAll, one code point.
    U16MatchAny,

    /// `.`, one code unit which is not a line terminator.
    MatchAnyButNewline,

    /// `.`, one code point which is not a line terminator.
    U16MatchAnyButNewline,

    MatchChar8(u8),
    MatchCharICase8(u8),
    MatchChar16(u16),
    MatchCharICase16(u16),
    U16MatchChar32(u32),
    U16MatchCharICase32(u32),

    /// A run of 8-bit literals.
    MatchNChar8(&'a [u8]),

    /// A run of canonicalized 8-bit literals, compared case-insensitively.
    MatchNCharICase8(&'a [u8]),

    /// Try the next instruction; on failure resume at `target`.
    Alternation {
        target: JumpTarget,
        primary: Constraints,
        secondary: Constraints,
    },

    Jump32(JumpTarget),

    /// Match one code unit against inclusive ranges.
    Bracket(RangeList<'a>),

    /// Match one code point against inclusive ranges.
    U16Bracket(RangeList<'a>),

    BeginMarkedSubexpression(CaptureGroupID),
    EndMarkedSubexpression(CaptureGroupID),
    BackRef(CaptureGroupID),

    WordBoundary {
        invert: bool,
    },

    /// The body follows and ends with Goal; execution resumes at
    /// `continuation`.
    Lookaround {
        invert: bool,
        forwards: bool,
        constraints: Constraints,
        mexp_begin: CaptureGroupID,
        mexp_end: CaptureGroupID,
        continuation: JumpTarget,
    },

    /// Enter a general loop from outside.
    BeginLoop {
        loop_id: LoopID,
        min: u32,
        max: u32,
        mexp_begin: CaptureGroupID,
        mexp_end: CaptureGroupID,
        greedy: bool,
        not_taken: JumpTarget,
    },

    /// End of a general loop body; `target` is its BeginLoop.
    EndLoop {
        target: JumpTarget,
    },

    /// A greedy `*` loop with a non-empty body and no captures.
    BeginSimpleLoop {
        constraints: Constraints,
        not_taken: JumpTarget,
    },

    EndSimpleLoop {
        target: JumpTarget,
    },

    /// The next instruction always matches exactly one code unit.
    /// Attempt to match it [min, max] times.
    Width1Loop {
        loop_id: LoopID,
        min: u32,
        max: u32,
        greedy: bool,
        not_taken: JumpTarget,
    },
}

#[inline(always)]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline(always)]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline(always)]
fn read_bool(bytes: &[u8], at: usize) -> bool {
    bytes[at] != 0
}

impl<'a> Insn<'a> {
    /// Decode the instruction at \p ip.
    /// \return the instruction and its encoded length.
    /// Malformed bytecode panics.
    pub fn decode(bytes: &'a [u8], ip: usize) -> (Insn<'a>, usize) {
        let op = match Opcode::from_byte(bytes[ip]) {
            Some(op) => op,
            None => rs_unreachable!("Unknown opcode"),
        };
        let b = &bytes[ip..];
        match op {
            Opcode::Goal => (Insn::Goal, 1),
            Opcode::LeftAnchor => (Insn::LeftAnchor, 1),
            Opcode::RightAnchor => (Insn::RightAnchor, 1),
            Opcode::MatchAny => (Insn::MatchAny, 1),
            Opcode::U16MatchAny => (Insn::U16MatchAny, 1),
            Opcode::MatchAnyButNewline => (Insn::MatchAnyButNewline, 1),
            Opcode::U16MatchAnyButNewline => (Insn::U16MatchAnyButNewline, 1),
            Opcode::MatchChar8 => (Insn::MatchChar8(b[1]), 2),
            Opcode::MatchCharICase8 => (Insn::MatchCharICase8(b[1]), 2),
            Opcode::MatchChar16 => (Insn::MatchChar16(read_u16(b, 1)), 3),
            Opcode::MatchCharICase16 => (Insn::MatchCharICase16(read_u16(b, 1)), 3),
            Opcode::U16MatchChar32 => (Insn::U16MatchChar32(read_u32(b, 1)), 5),
            Opcode::U16MatchCharICase32 => (Insn::U16MatchCharICase32(read_u32(b, 1)), 5),
            Opcode::MatchNChar8 | Opcode::MatchNCharICase8 => {
                let n = b[1] as usize;
                let run = &b[2..2 + n];
                let insn = if op == Opcode::MatchNChar8 {
                    Insn::MatchNChar8(run)
                } else {
                    Insn::MatchNCharICase8(run)
                };
                (insn, 2 + n)
            }
            Opcode::Alternation => (
                Insn::Alternation {
                    target: read_u32(b, 1),
                    primary: Constraints::from_bits(b[5]),
                    secondary: Constraints::from_bits(b[6]),
                },
                7,
            ),
            Opcode::Jump32 => (Insn::Jump32(read_u32(b, 1)), 5),
            Opcode::Bracket | Opcode::U16Bracket => {
                let count = read_u32(b, 1) as usize;
                let ranges = RangeList {
                    bytes: &b[5..5 + 8 * count],
                };
                let insn = if op == Opcode::Bracket {
                    Insn::Bracket(ranges)
                } else {
                    Insn::U16Bracket(ranges)
                };
                (insn, 5 + 8 * count)
            }
            Opcode::BeginMarkedSubexpression => {
                (Insn::BeginMarkedSubexpression(read_u16(b, 1)), 3)
            }
            Opcode::EndMarkedSubexpression => (Insn::EndMarkedSubexpression(read_u16(b, 1)), 3),
            Opcode::BackRef => (Insn::BackRef(read_u16(b, 1)), 3),
            Opcode::WordBoundary => (
                Insn::WordBoundary {
                    invert: read_bool(b, 1),
                },
                2,
            ),
            Opcode::Lookaround => (
                Insn::Lookaround {
                    invert: read_bool(b, 1),
                    forwards: read_bool(b, 2),
                    constraints: Constraints::from_bits(b[3]),
                    mexp_begin: read_u16(b, 4),
                    mexp_end: read_u16(b, 6),
                    continuation: read_u32(b, 8),
                },
                12,
            ),
            Opcode::BeginLoop => (
                Insn::BeginLoop {
                    loop_id: read_u32(b, 1),
                    min: read_u32(b, 5),
                    max: read_u32(b, 9),
                    mexp_begin: read_u16(b, 13),
                    mexp_end: read_u16(b, 15),
                    greedy: read_bool(b, 17),
                    not_taken: read_u32(b, 18),
                },
                22,
            ),
            Opcode::EndLoop => (
                Insn::EndLoop {
                    target: read_u32(b, 1),
                },
                5,
            ),
            Opcode::BeginSimpleLoop => (
                Insn::BeginSimpleLoop {
                    constraints: Constraints::from_bits(b[1]),
                    not_taken: read_u32(b, 2),
                },
                6,
            ),
            Opcode::EndSimpleLoop => (
                Insn::EndSimpleLoop {
                    target: read_u32(b, 1),
                },
                5,
            ),
            Opcode::Width1Loop => (
                Insn::Width1Loop {
                    loop_id: read_u32(b, 1),
                    min: read_u32(b, 5),
                    max: read_u32(b, 9),
                    greedy: read_bool(b, 13),
                    not_taken: read_u32(b, 14),
                },
                WIDTH1_LOOP_HEADER_LEN,
            ),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Insn::Goal => Opcode::Goal,
            Insn::LeftAnchor => Opcode::LeftAnchor,
            Insn::RightAnchor => Opcode::RightAnchor,
            Insn::MatchAny => Opcode::MatchAny,
            Insn::U16MatchAny => Opcode::U16MatchAny,
            Insn::MatchAnyButNewline => Opcode::MatchAnyButNewline,
            Insn::U16MatchAnyButNewline => Opcode::U16MatchAnyButNewline,
            Insn::MatchChar8(..) => Opcode::MatchChar8,
            Insn::MatchCharICase8(..) => Opcode::MatchCharICase8,
            Insn::MatchChar16(..) => Opcode::MatchChar16,
            Insn::MatchCharICase16(..) => Opcode::MatchCharICase16,
            Insn::U16MatchChar32(..) => Opcode::U16MatchChar32,
            Insn::U16MatchCharICase32(..) => Opcode::U16MatchCharICase32,
            Insn::MatchNChar8(..) => Opcode::MatchNChar8,
            Insn::MatchNCharICase8(..) => Opcode::MatchNCharICase8,
            Insn::Alternation { .. } => Opcode::Alternation,
            Insn::Jump32(..) => Opcode::Jump32,
            Insn::Bracket(..) => Opcode::Bracket,
            Insn::U16Bracket(..) => Opcode::U16Bracket,
            Insn::BeginMarkedSubexpression(..) => Opcode::BeginMarkedSubexpression,
            Insn::EndMarkedSubexpression(..) => Opcode::EndMarkedSubexpression,
            Insn::BackRef(..) => Opcode::BackRef,
            Insn::WordBoundary { .. } => Opcode::WordBoundary,
            Insn::Lookaround { .. } => Opcode::Lookaround,
            Insn::BeginLoop { .. } => Opcode::BeginLoop,
            Insn::EndLoop { .. } => Opcode::EndLoop,
            Insn::BeginSimpleLoop { .. } => Opcode::BeginSimpleLoop,
            Insn::EndSimpleLoop { .. } => Opcode::EndSimpleLoop,
            Insn::Width1Loop { .. } => Opcode::Width1Loop,
        }
    }

    /// Append the encoding of this instruction to \p out.
    /// Brackets are encoded with `encode_bracket`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        match *self {
            Insn::Goal
            | Insn::LeftAnchor
            | Insn::RightAnchor
            | Insn::MatchAny
            | Insn::U16MatchAny
            | Insn::MatchAnyButNewline
            | Insn::U16MatchAnyButNewline => {}
            Insn::MatchChar8(c) | Insn::MatchCharICase8(c) => out.push(c),
            Insn::MatchChar16(c) | Insn::MatchCharICase16(c) => {
                out.extend_from_slice(&c.to_le_bytes())
            }
            Insn::U16MatchChar32(c) | Insn::U16MatchCharICase32(c) => {
                out.extend_from_slice(&c.to_le_bytes())
            }
            Insn::MatchNChar8(run) | Insn::MatchNCharICase8(run) => {
                debug_assert!(run.len() <= MAX_NCHAR_LEN, "Run too long");
                out.push(run.len() as u8);
                out.extend_from_slice(run);
            }
            Insn::Alternation {
                target,
                primary,
                secondary,
            } => {
                out.extend_from_slice(&target.to_le_bytes());
                out.push(primary.bits());
                out.push(secondary.bits());
            }
            Insn::Jump32(target) => out.extend_from_slice(&target.to_le_bytes()),
            Insn::Bracket(ranges) | Insn::U16Bracket(ranges) => {
                out.extend_from_slice(&(ranges.len() as u32).to_le_bytes());
                out.extend_from_slice(ranges.bytes);
            }
            Insn::BeginMarkedSubexpression(idx)
            | Insn::EndMarkedSubexpression(idx)
            | Insn::BackRef(idx) => out.extend_from_slice(&idx.to_le_bytes()),
            Insn::WordBoundary { invert } => out.push(invert as u8),
            Insn::Lookaround {
                invert,
                forwards,
                constraints,
                mexp_begin,
                mexp_end,
                continuation,
            } => {
                out.push(invert as u8);
                out.push(forwards as u8);
                out.push(constraints.bits());
                out.extend_from_slice(&mexp_begin.to_le_bytes());
                out.extend_from_slice(&mexp_end.to_le_bytes());
                out.extend_from_slice(&continuation.to_le_bytes());
            }
            Insn::BeginLoop {
                loop_id,
                min,
                max,
                mexp_begin,
                mexp_end,
                greedy,
                not_taken,
            } => {
                out.extend_from_slice(&loop_id.to_le_bytes());
                out.extend_from_slice(&min.to_le_bytes());
                out.extend_from_slice(&max.to_le_bytes());
                out.extend_from_slice(&mexp_begin.to_le_bytes());
                out.extend_from_slice(&mexp_end.to_le_bytes());
                out.push(greedy as u8);
                out.extend_from_slice(&not_taken.to_le_bytes());
            }
            Insn::EndLoop { target } | Insn::EndSimpleLoop { target } => {
                out.extend_from_slice(&target.to_le_bytes())
            }
            Insn::BeginSimpleLoop {
                constraints,
                not_taken,
            } => {
                out.push(constraints.bits());
                out.extend_from_slice(&not_taken.to_le_bytes());
            }
            Insn::Width1Loop {
                loop_id,
                min,
                max,
                greedy,
                not_taken,
            } => {
                out.extend_from_slice(&loop_id.to_le_bytes());
                out.extend_from_slice(&min.to_le_bytes());
                out.extend_from_slice(&max.to_le_bytes());
                out.push(greedy as u8);
                out.extend_from_slice(&not_taken.to_le_bytes());
            }
        }
    }
}

/// Append a Bracket or U16Bracket instruction matching \p ivs to \p out.
pub fn encode_bracket(out: &mut Vec<u8>, code_points: bool, ivs: &[Interval]) {
    let op = if code_points {
        Opcode::U16Bracket
    } else {
        Opcode::Bracket
    };
    out.push(op as u8);
    out.extend_from_slice(&(ivs.len() as u32).to_le_bytes());
    for iv in ivs {
        out.extend_from_slice(&iv.first.to_le_bytes());
        out.extend_from_slice(&iv.last.to_le_bytes());
    }
}

/// Overwrite the u32 at \p at.
pub fn patch_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// The fixed header of a program.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Capture groups, excluding the whole match.
    pub marked_count: u16,

    /// Loop slots used by BeginLoop and Width1Loop.
    pub loop_count: u16,

    /// The flags bits, as `Flags::bits`.
    pub flags: u8,

    /// Constraints of the whole pattern.
    pub constraints: Constraints,
}

impl Header {
    pub fn flags(&self) -> Flags {
        Flags::from_bits(self.flags)
    }
}

/// A compiled regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub header: Header,

    /// The instruction stream.
    pub bytes: Vec<u8>,

    /// Capture group names, indexed by group.
    pub group_names: Vec<Option<Box<str>>>,

    /// Whether the optimizer was disabled.
    pub(crate) no_opt: bool,
}

impl Program {
    /// Decode the instruction at \p ip.
    #[inline]
    pub fn insn_at(&self, ip: usize) -> (Insn<'_>, usize) {
        Insn::decode(&self.bytes, ip)
    }

    /// Iterate over (offset, instruction) pairs. Width1Loop bodies are
    /// yielded as ordinary instructions.
    pub fn insns(&self) -> InsnIter<'_> {
        InsnIter {
            bytes: &self.bytes,
            ip: 0,
        }
    }

    #[inline]
    pub fn flags(&self) -> Flags {
        let mut flags = self.header.flags();
        flags.no_opt = self.no_opt;
        flags
    }
}

/// Iterator over the instructions of a program.
#[derive(Debug, Clone)]
pub struct InsnIter<'a> {
    bytes: &'a [u8],
    ip: usize,
}

impl<'a> Iterator for InsnIter<'a> {
    type Item = (usize, Insn<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.ip >= self.bytes.len() {
            return None;
        }
        let ip = self.ip;
        let (insn, len) = Insn::decode(self.bytes, ip);
        self.ip += len;
        Some((ip, insn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(insn: Insn, expected_len: usize) {
        let mut bytes = Vec::new();
        insn.encode(&mut bytes);
        assert_eq!(bytes.len(), expected_len, "{:?}", insn);
        let (decoded, len) = Insn::decode(&bytes, 0);
        assert_eq!(len, expected_len);
        assert_eq!(decoded, insn);
    }

    #[test]
    fn encoded_sizes() {
        roundtrip(Insn::Goal, 1);
        roundtrip(Insn::MatchCharICase8(b'A'), 2);
        roundtrip(Insn::MatchChar16(0x17F), 3);
        roundtrip(Insn::U16MatchChar32(0x1F600), 5);
        roundtrip(Insn::MatchNChar8(b"abc"), 5);
        roundtrip(
            Insn::Alternation {
                target: 0x1234,
                primary: Constraints::NON_EMPTY,
                secondary: Constraints::NONE,
            },
            7,
        );
        roundtrip(Insn::BackRef(7), 3);
        roundtrip(
            Insn::Lookaround {
                invert: true,
                forwards: false,
                constraints: Constraints::NON_EMPTY | Constraints::NON_ASCII,
                mexp_begin: 1,
                mexp_end: 3,
                continuation: 99,
            },
            12,
        );
        roundtrip(
            Insn::BeginLoop {
                loop_id: 2,
                min: 1,
                max: u32::MAX,
                mexp_begin: 0,
                mexp_end: 1,
                greedy: true,
                not_taken: 0x40,
            },
            22,
        );
        roundtrip(
            Insn::BeginSimpleLoop {
                constraints: Constraints::NON_EMPTY,
                not_taken: 12,
            },
            6,
        );
        roundtrip(
            Insn::Width1Loop {
                loop_id: 0,
                min: 0,
                max: 3,
                greedy: false,
                not_taken: 20,
            },
            18,
        );
    }

    #[test]
    fn patch_offsets_line_up() {
        let mut bytes = Vec::new();
        Insn::BeginLoop {
            loop_id: 0,
            min: 0,
            max: 1,
            mexp_begin: 0,
            mexp_end: 0,
            greedy: true,
            not_taken: 0,
        }
        .encode(&mut bytes);
        patch_u32(&mut bytes, patch_offset::BEGIN_LOOP_NOT_TAKEN, 0xABCD);
        assert!(matches!(
            Insn::decode(&bytes, 0).0,
            Insn::BeginLoop {
                not_taken: 0xABCD,
                ..
            }
        ));

        let mut bytes = Vec::new();
        Insn::Width1Loop {
            loop_id: 0,
            min: 0,
            max: 1,
            greedy: true,
            not_taken: 0,
        }
        .encode(&mut bytes);
        patch_u32(&mut bytes, patch_offset::WIDTH1_LOOP_NOT_TAKEN, 77);
        assert!(matches!(
            Insn::decode(&bytes, 0).0,
            Insn::Width1Loop { not_taken: 77, .. }
        ));
    }

    #[test]
    fn bracket_lookup() {
        let mut bytes = Vec::new();
        let ivs = [
            Interval::new('0' as u32, '9' as u32),
            Interval::new('a' as u32, 'f' as u32),
            Interval::new(0x1F600, 0x1F64F),
        ];
        encode_bracket(&mut bytes, true, &ivs);
        assert_eq!(bytes.len(), 5 + 8 * 3);
        let ranges = match Insn::decode(&bytes, 0) {
            (Insn::U16Bracket(ranges), 29) => ranges,
            other => panic!("Unexpected decode {:?}", other),
        };
        assert_eq!(ranges.iter().collect::<Vec<_>>(), ivs.to_vec());
        assert!(ranges.contains('5' as u32));
        assert!(ranges.contains('f' as u32));
        assert!(ranges.contains(0x1F610));
        assert!(!ranges.contains('g' as u32));
        assert!(!ranges.contains(0));
    }

    #[test]
    #[should_panic]
    fn unknown_opcode_panics() {
        Insn::decode(&[0xEE], 0);
    }

    #[test]
    fn constraint_sets() {
        let both = Constraints::NON_EMPTY | Constraints::ANCHORED_AT_START;
        assert!(both.contains(Constraints::NON_EMPTY));
        assert!(!both.contains(Constraints::NON_ASCII));
        assert_eq!(both & Constraints::NON_EMPTY, Constraints::NON_EMPTY);
        assert_eq!(both.bits(), 6);
    }
}
