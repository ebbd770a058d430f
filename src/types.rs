//! Small shared types for compiled programs and their execution state.

use core::ops::Range;

/// Index of a capture group within a program. Group 0 is the first
/// parenthesized group, not the overall match.
pub type CaptureGroupID = u16;

/// Groups past this count are rejected by the parser.
pub const MAX_CAPTURE_GROUPS: usize = 65535;

/// Loop slots past this count are rejected by the emitter.
pub const MAX_LOOPS: usize = 65535;

/// Index of a loop slot.
pub type LoopID = u32;

/// Byte offset of an instruction.
pub type IP = usize;

/// Per-loop bookkeeping while a BeginLoop is active.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LoopRecord {
    /// Iterations entered so far.
    pub iterations: u32,

    /// Input position at which the current iteration began.
    pub entry_pos: usize,
}

/// The extent recorded for one capture group.
/// A group run by a lookbehind records its end before its start.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CaptureSlot {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl CaptureSlot {
    pub const UNSET: CaptureSlot = CaptureSlot {
        start: None,
        end: None,
    };

    /// The captured range, once both ends are known.
    pub fn range(&self) -> Option<Range<usize>> {
        Some(self.start?..self.end?)
    }

    /// Whether either end has been recorded.
    pub fn is_touched(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}
