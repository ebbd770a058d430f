//! Regex compiler back-end: transforms IR into a Program

use crate::api::CompileOptions;
use crate::error::{too_large, Error};
use crate::insn::{
    encode_bracket, patch_offset, patch_u32, Constraints, Header, Insn, JumpTarget, Program,
    MAX_NCHAR_LEN,
};
use crate::ir;
use crate::ir::{AnchorType, Node, Quantifier};
use crate::types::{CaptureGroupID, LoopID, MAX_LOOPS};
use crate::util::is_surrogate;
use std::convert::TryFrom;

/// \return the constraints satisfied by every match of \p node.
pub fn constraints_of(node: &Node, multiline: bool) -> Constraints {
    match node {
        &Node::Char { c, .. } => {
            // Canonical values of ASCII characters stay ASCII, so a non-ASCII
            // canonical value has no ASCII equivalent.
            if c >= 0x80 {
                Constraints::NON_EMPTY | Constraints::NON_ASCII
            } else {
                Constraints::NON_EMPTY
            }
        }
        Node::Bracket(cps) => {
            if cps.has_ascii() {
                Constraints::NON_EMPTY
            } else {
                Constraints::NON_EMPTY | Constraints::NON_ASCII
            }
        }
        Node::MatchAny | Node::MatchAnyExceptLineTerminator => Constraints::NON_EMPTY,
        Node::Cat(nodes) => {
            let mut result = Constraints::NONE;
            for (idx, n) in nodes.iter().enumerate() {
                let c = constraints_of(n, multiline);
                if idx == 0 {
                    result |= c & Constraints::ANCHORED_AT_START;
                }
                result |= c & (Constraints::NON_EMPTY | Constraints::NON_ASCII);
            }
            result
        }
        Node::Alt(left, right) => {
            constraints_of(left, multiline) & constraints_of(right, multiline)
        }
        Node::CaptureGroup(contents, ..) => constraints_of(contents, multiline),
        Node::Loop { loopee, quant, .. } => {
            if quant.min == 0 {
                Constraints::NONE
            } else {
                constraints_of(loopee, multiline)
            }
        }
        Node::Anchor(AnchorType::StartOfLine) if !multiline => Constraints::ANCHORED_AT_START,
        Node::Empty
        | Node::Goal
        | Node::Anchor(..)
        | Node::WordBoundary { .. }
        | Node::BackRef(..)
        | Node::LookaroundAssertion { .. } => Constraints::NONE,
    }
}

/// Type which wraps up the context needed to emit a Program.
struct Emitter {
    bytes: Vec<u8>,

    // Compile-time flags.
    unicode: bool,
    multiline: bool,
    no_opt: bool,

    // Number of loops seen so far.
    next_loop_id: u32,

    max_len: u32,
}

impl Emitter {
    /// \return the offset of the next instruction emitted.
    fn here(&self) -> Result<JumpTarget, Error> {
        match u32::try_from(self.bytes.len()) {
            Ok(len) if len <= self.max_len => Ok(len),
            _ => too_large("Compiled program exceeds size limit"),
        }
    }

    /// Emit an instruction, returning its offset.
    fn emit_insn(&mut self, insn: Insn) -> Result<JumpTarget, Error> {
        let offset = self.here()?;
        insn.encode(&mut self.bytes);
        Ok(offset)
    }

    /// Point the target field at \p insn_offset + \p field to the next
    /// instruction.
    fn patch_to_here(&mut self, insn_offset: JumpTarget, field: usize) -> Result<(), Error> {
        let target = self.here()?;
        patch_u32(&mut self.bytes, insn_offset as usize + field, target);
        Ok(())
    }

    fn alloc_loop(&mut self) -> Result<LoopID, Error> {
        if self.next_loop_id as usize >= MAX_LOOPS {
            return too_large("Loop count limit exceeded");
        }
        let id = self.next_loop_id;
        self.next_loop_id += 1;
        Ok(id)
    }

    fn emit_char(&mut self, c: u32, icase: bool) -> Result<(), Error> {
        let insn = if c <= 0xFF {
            if icase {
                Insn::MatchCharICase8(c as u8)
            } else {
                Insn::MatchChar8(c as u8)
            }
        } else if c <= 0xFFFF && !(self.unicode && is_surrogate(c)) {
            if icase {
                Insn::MatchCharICase16(c as u16)
            } else {
                Insn::MatchChar16(c as u16)
            }
        } else if icase {
            Insn::U16MatchCharICase32(c)
        } else {
            Insn::U16MatchChar32(c)
        };
        self.emit_insn(insn)?;
        Ok(())
    }

    /// Emit a run of 8-bit literals sharing case sensitivity.
    fn emit_literal_run(&mut self, run: &[u8], icase: bool) -> Result<(), Error> {
        for chunk in run.chunks(MAX_NCHAR_LEN) {
            let insn = match (chunk.len(), icase) {
                (1, false) => Insn::MatchChar8(chunk[0]),
                (1, true) => Insn::MatchCharICase8(chunk[0]),
                (_, false) => Insn::MatchNChar8(chunk),
                (_, true) => Insn::MatchNCharICase8(chunk),
            };
            self.emit_insn(insn)?;
        }
        Ok(())
    }

    fn emit_cat(&mut self, nodes: &[Node]) -> Result<(), Error> {
        let mut idx = 0;
        while idx < nodes.len() {
            match nodes[idx] {
                Node::Char { c, icase } if c <= 0xFF && !self.no_opt => {
                    let mut run = vec![c as u8];
                    idx += 1;
                    while let Some(&Node::Char { c, icase: ic }) = nodes.get(idx) {
                        if c > 0xFF || ic != icase {
                            break;
                        }
                        run.push(c as u8);
                        idx += 1;
                    }
                    self.emit_literal_run(&run, icase)?;
                }
                ref node => {
                    self.emit_node(node)?;
                    idx += 1;
                }
            }
        }
        Ok(())
    }

    fn emit_alt(&mut self, node: &Node) -> Result<(), Error> {
        // Unroll the right-folded chain.
        let mut alts = Vec::new();
        let mut cur = node;
        while let Node::Alt(left, right) = cur {
            alts.push(left.as_ref());
            cur = right.as_ref();
        }
        alts.push(cur);

        // suffix[i] is the intersection of the constraints of alts[i..].
        let mut suffix = vec![Constraints::NONE; alts.len()];
        let mut acc = None;
        for (idx, alt) in alts.iter().enumerate().rev() {
            let c = constraints_of(alt, self.multiline);
            let merged = match acc {
                None => c,
                Some(prev) => c & prev,
            };
            suffix[idx] = merged;
            acc = Some(merged);
        }

        let mut jumps = Vec::with_capacity(alts.len() - 1);
        for idx in 0..alts.len() - 1 {
            let alternation = self.emit_insn(Insn::Alternation {
                target: 0,
                primary: constraints_of(alts[idx], self.multiline),
                secondary: suffix[idx + 1],
            })?;
            self.emit_node(alts[idx])?;
            jumps.push(self.emit_insn(Insn::Jump32(0))?);
            self.patch_to_here(alternation, patch_offset::ALTERNATION_TARGET)?;
        }
        if let Some(last) = alts.last() {
            self.emit_node(last)?;
        }
        for jump in jumps {
            self.patch_to_here(jump, patch_offset::JUMP_TARGET)?;
        }
        Ok(())
    }

    fn is_width1_loop(&self, loopee: &Node) -> bool {
        !self.no_opt && loopee.matches_exactly_one_unit(self.unicode)
    }

    /// \return whether a loop may use BeginSimpleLoop.
    fn is_simple_loop(
        &self,
        loopee: &Node,
        quant: &Quantifier,
        enclosed_groups: &core::ops::Range<CaptureGroupID>,
    ) -> bool {
        if self.no_opt
            || !quant.greedy
            || quant.min != 0
            || !quant.is_unbounded()
            || !enclosed_groups.is_empty()
        {
            return false;
        }
        let mut nested_ok = true;
        ir::visit(loopee, 0, &mut |n, _| {
            if let Node::Loop { loopee, .. } = n {
                nested_ok &= self.is_width1_loop(loopee);
            }
        });
        nested_ok && constraints_of(loopee, self.multiline).contains(Constraints::NON_EMPTY)
    }

    fn emit_loop(
        &mut self,
        loopee: &Node,
        quant: &Quantifier,
        enclosed_groups: &core::ops::Range<CaptureGroupID>,
    ) -> Result<(), Error> {
        if quant.max == 0 {
            return Ok(());
        }
        if quant.min == 1 && quant.max == 1 {
            return self.emit_node(loopee);
        }

        if self.is_width1_loop(loopee) {
            let loop_id = self.alloc_loop()?;
            let start = self.emit_insn(Insn::Width1Loop {
                loop_id,
                min: quant.min,
                max: quant.max,
                greedy: quant.greedy,
                not_taken: 0,
            })?;
            self.emit_node(loopee)?;
            self.patch_to_here(start, patch_offset::WIDTH1_LOOP_NOT_TAKEN)?;
        } else if self.is_simple_loop(loopee, quant, enclosed_groups) {
            let start = self.emit_insn(Insn::BeginSimpleLoop {
                constraints: constraints_of(loopee, self.multiline),
                not_taken: 0,
            })?;
            self.emit_node(loopee)?;
            self.emit_insn(Insn::EndSimpleLoop { target: start })?;
            self.patch_to_here(start, patch_offset::BEGIN_SIMPLE_LOOP_NOT_TAKEN)?;
        } else {
            let loop_id = self.alloc_loop()?;
            let start = self.emit_insn(Insn::BeginLoop {
                loop_id,
                min: quant.min,
                max: quant.max,
                mexp_begin: enclosed_groups.start,
                mexp_end: enclosed_groups.end,
                greedy: quant.greedy,
                not_taken: 0,
            })?;
            self.emit_node(loopee)?;
            self.emit_insn(Insn::EndLoop { target: start })?;
            self.patch_to_here(start, patch_offset::BEGIN_LOOP_NOT_TAKEN)?;
        }
        Ok(())
    }

    fn emit_node(&mut self, node: &Node) -> Result<(), Error> {
        match node {
            Node::Empty => {}
            Node::Goal => {
                self.emit_insn(Insn::Goal)?;
            }
            &Node::Char { c, icase } => self.emit_char(c, icase)?,
            Node::Cat(nodes) => self.emit_cat(nodes)?,
            Node::Alt(..) => self.emit_alt(node)?,
            Node::MatchAny => {
                let insn = if self.unicode {
                    Insn::U16MatchAny
                } else {
                    Insn::MatchAny
                };
                self.emit_insn(insn)?;
            }
            Node::MatchAnyExceptLineTerminator => {
                let insn = if self.unicode {
                    Insn::U16MatchAnyButNewline
                } else {
                    Insn::MatchAnyButNewline
                };
                self.emit_insn(insn)?;
            }
            Node::Anchor(AnchorType::StartOfLine) => {
                self.emit_insn(Insn::LeftAnchor)?;
            }
            Node::Anchor(AnchorType::EndOfLine) => {
                self.emit_insn(Insn::RightAnchor)?;
            }
            &Node::WordBoundary { invert } => {
                self.emit_insn(Insn::WordBoundary { invert })?;
            }
            Node::CaptureGroup(contents, idx) => {
                self.emit_insn(Insn::BeginMarkedSubexpression(*idx))?;
                self.emit_node(contents)?;
                self.emit_insn(Insn::EndMarkedSubexpression(*idx))?;
            }
            &Node::BackRef(idx) => {
                self.emit_insn(Insn::BackRef(idx))?;
            }
            Node::Bracket(cps) => {
                self.here()?;
                let code_points = self.unicode && ir::needs_u16_bracket(cps);
                encode_bracket(&mut self.bytes, code_points, cps.intervals());
            }
            Node::LookaroundAssertion {
                negate,
                backwards,
                start_group,
                end_group,
                contents,
            } => {
                let start = self.emit_insn(Insn::Lookaround {
                    invert: *negate,
                    forwards: !*backwards,
                    constraints: constraints_of(contents, self.multiline),
                    mexp_begin: *start_group,
                    mexp_end: *end_group,
                    continuation: 0,
                })?;
                self.emit_node(contents)?;
                self.emit_insn(Insn::Goal)?;
                self.patch_to_here(start, patch_offset::LOOKAROUND_CONTINUATION)?;
            }
            Node::Loop {
                loopee,
                quant,
                enclosed_groups,
            } => self.emit_loop(loopee, quant, enclosed_groups)?,
        }
        Ok(())
    }
}

/// Compile the IR regex \p re into a Program.
pub fn emit(re: &ir::Regex, options: &CompileOptions) -> Result<Program, Error> {
    let mut emitter = Emitter {
        bytes: Vec::new(),
        unicode: re.flags.unicode,
        multiline: re.flags.multiline,
        no_opt: re.flags.no_opt,
        next_loop_id: 0,
        max_len: options.max_program_len,
    };
    emitter.emit_node(&re.node)?;
    // Validates the final length.
    emitter.here()?;

    let loop_count = match u16::try_from(emitter.next_loop_id) {
        Ok(count) => count,
        Err(_) => return too_large("Loop count limit exceeded"),
    };
    Ok(Program {
        header: Header {
            marked_count: re.group_count,
            loop_count,
            flags: re.flags.bits(),
            constraints: constraints_of(&re.node, re.flags.multiline),
        },
        bytes: emitter.bytes,
        group_names: re.group_names.clone(),
        no_opt: re.flags.no_opt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Flags;
    use crate::insn::Opcode;
    use crate::parse::try_parse;

    fn compile(pattern: &str, flags: &str) -> Program {
        let ast = try_parse(pattern, Flags::from(flags)).expect("Pattern should parse");
        let ir = ir::lower(&ast).expect("Pattern should lower");
        emit(&ir, &CompileOptions::default()).expect("Pattern should compile")
    }

    fn opcodes(prog: &Program) -> Vec<Opcode> {
        prog.insns().map(|(_, insn)| insn.opcode()).collect()
    }

    #[test]
    fn literal_runs_are_chunked() {
        let prog = compile(&"a".repeat(300), "");
        let insns: Vec<_> = prog.insns().collect();
        assert_eq!(insns.len(), 3);
        assert!(matches!(insns[0], (0, Insn::MatchNChar8(run)) if run.len() == 255));
        assert!(matches!(insns[1], (257, Insn::MatchNChar8(run)) if run.len() == 45));
        assert!(matches!(insns[2], (304, Insn::Goal)));

        let prog = compile(&"b".repeat(256), "");
        assert_eq!(
            opcodes(&prog),
            vec![Opcode::MatchNChar8, Opcode::MatchChar8, Opcode::Goal]
        );
    }

    #[test]
    fn literal_runs_split_on_case_and_width() {
        let prog = compile("ab1\u{3b1}cd", "i");
        assert_eq!(
            opcodes(&prog),
            vec![
                Opcode::MatchNCharICase8,
                Opcode::MatchChar8,
                Opcode::MatchCharICase16,
                Opcode::MatchNCharICase8,
                Opcode::Goal
            ]
        );
    }

    #[test]
    fn unoptimized_literals_are_separate() {
        let mut flags = Flags::from("");
        flags.no_opt = true;
        let ast = try_parse("abc", flags).expect("Pattern should parse");
        let ir = ir::lower(&ast).expect("Pattern should lower");
        let prog = emit(&ir, &CompileOptions::default()).expect("Pattern should compile");
        assert_eq!(
            opcodes(&prog),
            vec![
                Opcode::MatchChar8,
                Opcode::MatchChar8,
                Opcode::MatchChar8,
                Opcode::Goal
            ]
        );
    }

    #[test]
    fn char_widths() {
        assert_eq!(
            opcodes(&compile("\u{100}\u{1F600}", "u")),
            vec![Opcode::MatchChar16, Opcode::U16MatchChar32, Opcode::Goal]
        );
        // Without unicode an astral literal is two code units.
        assert_eq!(
            opcodes(&compile("\u{1F600}", "")),
            vec![Opcode::MatchChar16, Opcode::MatchChar16, Opcode::Goal]
        );
        assert_eq!(
            opcodes(&compile("\\ud800", "u")),
            vec![Opcode::U16MatchChar32, Opcode::Goal]
        );
    }

    #[test]
    fn loop_strategies() {
        assert_eq!(
            opcodes(&compile("a*", "")),
            vec![Opcode::Width1Loop, Opcode::MatchChar8, Opcode::Goal]
        );
        assert_eq!(
            opcodes(&compile("(?:ab)*", "")),
            vec![
                Opcode::BeginSimpleLoop,
                Opcode::MatchNChar8,
                Opcode::EndSimpleLoop,
                Opcode::Goal
            ]
        );
        assert_eq!(
            opcodes(&compile("(?:ab)*?", "")),
            vec![
                Opcode::BeginLoop,
                Opcode::MatchNChar8,
                Opcode::EndLoop,
                Opcode::Goal
            ]
        );
        // A capture group forces the general form.
        assert_eq!(
            opcodes(&compile("(ab)*", ""))[0],
            Opcode::BeginLoop
        );
        // A possibly empty body forces the general form.
        assert_eq!(opcodes(&compile("(?:a?)*", ""))[0], Opcode::BeginLoop);
        // Nested width-1 loops are allowed in simple loops.
        assert_eq!(
            opcodes(&compile("(?:ab*)*", "")),
            vec![
                Opcode::BeginSimpleLoop,
                Opcode::MatchChar8,
                Opcode::Width1Loop,
                Opcode::MatchChar8,
                Opcode::EndSimpleLoop,
                Opcode::Goal
            ]
        );
        // Unicode dot may consume a pair, so it is never a width-1 body.
        assert_eq!(opcodes(&compile(".*", "u"))[0], Opcode::BeginSimpleLoop);
        assert_eq!(opcodes(&compile(".{2,3}", "u"))[0], Opcode::BeginLoop);
        assert_eq!(opcodes(&compile("a{0}", "")), vec![Opcode::Goal]);
        assert_eq!(
            opcodes(&compile("a{1}", "")),
            vec![Opcode::MatchChar8, Opcode::Goal]
        );
    }

    #[test]
    fn loop_slots_in_emission_order() {
        let prog = compile("(?:(a)b*)+c{2,3}", "");
        assert_eq!(prog.header.loop_count, 3);
        let ids: Vec<u32> = prog
            .insns()
            .filter_map(|(_, insn)| match insn {
                Insn::BeginLoop { loop_id, .. } | Insn::Width1Loop { loop_id, .. } => {
                    Some(loop_id)
                }
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn alternation_targets_and_constraints() {
        let prog = compile("ab|^c|d", "");
        let insns: Vec<_> = prog.insns().collect();
        match insns[0].1 {
            Insn::Alternation {
                target,
                primary,
                secondary,
            } => {
                assert_eq!(primary, Constraints::NON_EMPTY);
                assert_eq!(secondary, Constraints::NON_EMPTY);
                // The second alternative begins after the first's Jump32.
                assert!(matches!(insns[3], (off, Insn::Alternation { .. }) if off as u32 == target));
            }
            ref other => panic!("Unexpected insn {:?}", other),
        }
        match insns[3].1 {
            Insn::Alternation { primary, .. } => assert_eq!(
                primary,
                Constraints::NON_EMPTY | Constraints::ANCHORED_AT_START
            ),
            ref other => panic!("Unexpected insn {:?}", other),
        }
        // Both jumps go to the Goal.
        let goal = insns.last().map(|&(off, _)| off as u32);
        for (_, insn) in &insns {
            if let Insn::Jump32(target) = insn {
                assert_eq!(Some(*target), goal);
            }
        }
    }

    #[test]
    fn header_constraints() {
        assert_eq!(
            compile("^abc", "").header.constraints,
            Constraints::NON_EMPTY | Constraints::ANCHORED_AT_START
        );
        assert_eq!(
            compile("^abc", "m").header.constraints,
            Constraints::NON_EMPTY
        );
        assert_eq!(
            compile("\u{e9}", "").header.constraints,
            Constraints::NON_EMPTY | Constraints::NON_ASCII
        );
        assert_eq!(
            compile("[^\\x00-\\x7f]", "").header.constraints,
            Constraints::NON_EMPTY | Constraints::NON_ASCII
        );
        assert_eq!(compile("a*", "").header.constraints, Constraints::NONE);
        assert_eq!(
            compile("a|\u{e9}", "").header.constraints,
            Constraints::NON_EMPTY
        );
        // Kelvin sign folds to ASCII k under iu.
        assert_eq!(
            compile("\u{212A}", "iu").header.constraints,
            Constraints::NON_EMPTY
        );
    }

    #[test]
    fn program_too_large() {
        let ast = try_parse("abcdefgh", Flags::default()).expect("Pattern should parse");
        let ir = ir::lower(&ast).expect("Pattern should lower");
        let options = CompileOptions { max_program_len: 4 };
        assert!(matches!(emit(&ir, &options), Err(Error::PatternTooLarge(..))));
    }
}
