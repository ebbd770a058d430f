//! Textual rendering of compiled programs.
//!
//! The format is stable: golden tests and the command line tool depend on it.

use crate::insn::{Insn, Program, RangeList};
use core::fmt::{self, Write};

fn is_printable_ascii(c: u32) -> bool {
    (0x20..0x7F).contains(&c)
}

fn write_char8(f: &mut dyn Write, c: u8) -> fmt::Result {
    if is_printable_ascii(c as u32) {
        write!(f, "'{}'", c as char)
    } else {
        write!(f, "0x{:02x}", c)
    }
}

fn write_run(f: &mut dyn Write, run: &[u8]) -> fmt::Result {
    f.write_char('\'')?;
    for &b in run {
        if is_printable_ascii(b as u32) && b != b'\'' && b != b'\\' {
            f.write_char(b as char)?;
        } else {
            write!(f, "\\x{:02X}", b)?;
        }
    }
    f.write_char('\'')
}

fn write_bracket_char(f: &mut dyn Write, c: u32) -> fmt::Result {
    match char::from_u32(c) {
        Some(ch) if is_printable_ascii(c) && !"\\][-^".contains(ch) => f.write_char(ch),
        _ => write!(f, "\\u{{{:x}}}", c),
    }
}

fn write_ranges(f: &mut dyn Write, ranges: &RangeList) -> fmt::Result {
    f.write_char('[')?;
    for iv in ranges.iter() {
        write_bracket_char(f, iv.first)?;
        if iv.last != iv.first {
            f.write_char('-')?;
            write_bracket_char(f, iv.last)?;
        }
    }
    f.write_char(']')
}

fn write_max(f: &mut dyn Write, max: u32) -> fmt::Result {
    if max == u32::MAX {
        f.write_str("inf")
    } else {
        write!(f, "{}", max)
    }
}

fn greediness(greedy: bool) -> &'static str {
    if greedy {
        "greedy"
    } else {
        "nongreedy"
    }
}

/// Write the text of one instruction, without its offset.
pub fn write_insn(f: &mut dyn Write, insn: &Insn) -> fmt::Result {
    let name = insn.opcode();
    match *insn {
        Insn::Goal
        | Insn::LeftAnchor
        | Insn::RightAnchor
        | Insn::MatchAny
        | Insn::U16MatchAny
        | Insn::MatchAnyButNewline
        | Insn::U16MatchAnyButNewline => write!(f, "{:?}", name),
        Insn::MatchChar8(c) | Insn::MatchCharICase8(c) => {
            write!(f, "{:?} ", name)?;
            write_char8(f, c)
        }
        Insn::MatchChar16(c) | Insn::MatchCharICase16(c) => write!(f, "{:?} 0x{:04x}", name, c),
        Insn::U16MatchChar32(c) | Insn::U16MatchCharICase32(c) => {
            write!(f, "{:?} 0x{:x}", name, c)
        }
        Insn::MatchNChar8(run) | Insn::MatchNCharICase8(run) => {
            write!(f, "{:?} ", name)?;
            write_run(f, run)
        }
        Insn::Alternation {
            target,
            primary,
            secondary,
        } => write!(
            f,
            "Alternation: target 0x{:04x}, constraints {},{}",
            target,
            primary.bits(),
            secondary.bits()
        ),
        Insn::Jump32(target) => write!(f, "Jump32: 0x{:04x}", target),
        Insn::Bracket(ref ranges) | Insn::U16Bracket(ref ranges) => {
            write!(f, "{:?} ", name)?;
            write_ranges(f, ranges)
        }
        Insn::BeginMarkedSubexpression(idx)
        | Insn::EndMarkedSubexpression(idx)
        | Insn::BackRef(idx) => write!(f, "{:?}: {}", name, idx),
        Insn::WordBoundary { invert } => {
            write!(f, "WordBoundary: {}", if invert { "\\B" } else { "\\b" })
        }
        Insn::Lookaround {
            invert,
            forwards,
            constraints,
            mexp_begin,
            mexp_end,
            continuation,
        } => {
            let kind = match (forwards, invert) {
                (true, false) => "=",
                (true, true) => "!",
                (false, false) => "<=",
                (false, true) => "<!",
            };
            write!(
                f,
                "Lookaround: {} (constraints {}, marked {}-{}, continuation 0x{:04x})",
                kind,
                constraints.bits(),
                mexp_begin,
                mexp_end,
                continuation
            )
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
            write!(f, "BeginLoop: {} {} {{{},", loop_id, greediness(greedy), min)?;
            write_max(f, max)?;
            write!(
                f,
                "}} marked {}-{} exit 0x{:04x}",
                mexp_begin, mexp_end, not_taken
            )
        }
        Insn::EndLoop { target } | Insn::EndSimpleLoop { target } => {
            write!(f, "{:?}: 0x{:04x}", name, target)
        }
        Insn::BeginSimpleLoop {
            constraints,
            not_taken,
        } => write!(
            f,
            "BeginSimpleLoop: constraints {}, exit 0x{:04x}",
            constraints.bits(),
            not_taken
        ),
        Insn::Width1Loop {
            loop_id,
            min,
            max,
            greedy,
            not_taken,
        } => {
            write!(f, "Width1Loop: {} {} {{{},", loop_id, greediness(greedy), min)?;
            write_max(f, max)?;
            write!(f, "}} exit 0x{:04x}", not_taken)
        }
    }
}

/// Render \p prog: a header line, then one line per instruction.
pub fn disassemble(prog: &Program) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_program(&mut out, prog);
    out
}

fn write_program(f: &mut dyn Write, prog: &Program) -> fmt::Result {
    let h = &prog.header;
    writeln!(
        f,
        "Header: marked: {} loops: {} flags: {} constraints: {}",
        h.marked_count,
        h.loop_count,
        h.flags,
        h.constraints.bits()
    )?;
    for (offset, insn) in prog.insns() {
        write!(f, "{:04x}  ", offset)?;
        write_insn(f, &insn)?;
        f.write_char('\n')?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_program(f, self)
    }
}
