//! Support for quickly finding potential match locations.
use crate::indexing::InputIndexer;
use crate::insn::{Insn, Program};

/// A cheap necessary condition for a match to begin at some position,
/// derived from the first instruction that consumes input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPredicate<'a> {
    /// Any position may begin a match.
    Arbitrary,

    /// A match must begin with this code unit.
    Unit(u8),

    /// A match must begin with this sequence of code units.
    Seq(&'a [u8]),
}

impl<'a> StartPredicate<'a> {
    /// Compute the predicate for a program.
    pub fn for_program(prog: &'a Program) -> Self {
        if prog.no_opt {
            return StartPredicate::Arbitrary;
        }
        // Opening a capture group consumes nothing, so look past it.
        for (_, insn) in prog.insns() {
            match insn {
                Insn::BeginMarkedSubexpression(_) => continue,
                Insn::MatchChar8(c) => return StartPredicate::Unit(c),
                Insn::MatchNChar8(run) => return StartPredicate::Seq(run),
                _ => break,
            }
        }
        StartPredicate::Arbitrary
    }

    /// \return the first position at or after \p pos which may begin a
    /// match, or None if there is none.
    pub fn find<Input: InputIndexer>(&self, input: &Input, pos: usize) -> Option<usize> {
        match *self {
            StartPredicate::Arbitrary if pos <= input.len() => Some(pos),
            StartPredicate::Arbitrary => None,
            StartPredicate::Unit(c) => input.find_unit(pos, c as u32),
            StartPredicate::Seq(seq) => input.find_seq(pos, seq),
        }
    }
}
