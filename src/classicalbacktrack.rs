//! Classical backtracking execution engine

use crate::api::{Match, MatchOptions};
use crate::charclasses::{is_line_terminator, is_word_char};
use crate::cursor;
use crate::cursor::{Backward, Direction, Forward};
use crate::error::MatchError;
use crate::exec;
use crate::indexing::InputIndexer;
use crate::insn::{Constraints, Insn, Program};
use crate::matchers;
use crate::scm;
use crate::scm::SingleCharMatcher;
use crate::startpredicate::StartPredicate;
use crate::types::{CaptureGroupID, CaptureSlot, LoopRecord, LoopID, IP};
use core::ops::Range;

#[derive(Clone, Debug)]
enum BacktrackInsn {
    /// Nothing more to backtrack.
    /// This "backstops" our stack.
    Exhausted,

    /// Restore the IP and position.
    SetPosition { ip: IP, pos: usize },

    SetLoopRecord { id: LoopID, data: LoopRecord },

    SetCaptureSlot { id: CaptureGroupID, data: CaptureSlot },

    EnterNonGreedyLoop {
        // The IP of the loop.
        // This is guaranteed to point to a BeginLoop.
        ip: IP,
        data: LoopRecord,
    },

    GreedyLoop1Char {
        continuation: IP,
        min: usize,
        max: usize,
    },

    NonGreedyLoop1Char {
        continuation: IP,
        min: usize,
        max: usize,
    },
}

/// The operands of a BeginLoop.
#[derive(Debug, Clone, Copy)]
struct LoopFields {
    loop_id: LoopID,
    min: u32,
    max: u32,
    mexp_begin: CaptureGroupID,
    mexp_end: CaptureGroupID,
    greedy: bool,
    not_taken: u32,
    body: IP,
}

#[derive(Debug, Default)]
struct State {
    loops: Vec<LoopRecord>,
    groups: Vec<CaptureSlot>,
}

#[derive(Debug)]
pub(crate) struct MatchAttempter<'a, Input: InputIndexer> {
    prog: &'a Program,
    input: Input,
    bts: Vec<BacktrackInsn>,
    s: State,

    icase: bool,
    multiline: bool,
    unicode: bool,
    has_non_ascii: bool,

    // Choice points pushed so far, across all start positions.
    steps: u64,
    backtrack_limit: Option<u64>,
    depth: u32,
    depth_limit: Option<u32>,
}

impl<'a, Input: InputIndexer> MatchAttempter<'a, Input> {
    pub(crate) fn new(prog: &'a Program, input: Input, options: &MatchOptions) -> Self {
        let flags = prog.flags();
        Self {
            prog,
            input,
            bts: vec![BacktrackInsn::Exhausted],
            s: State {
                loops: vec![LoopRecord::default(); prog.header.loop_count as usize],
                groups: vec![CaptureSlot::UNSET; prog.header.marked_count as usize],
            },
            icase: flags.icase,
            multiline: flags.multiline,
            unicode: flags.unicode,
            has_non_ascii: input.has_non_ascii(),
            steps: 0,
            backtrack_limit: options.backtrack_limit,
            depth: 0,
            depth_limit: options.depth_limit,
        }
    }

    /// Push a choice point, charging it against the budget.
    #[inline(always)]
    fn push_choice(&mut self, bt: BacktrackInsn) -> Result<(), MatchError> {
        self.charge_step()?;
        self.bts.push(bt);
        Ok(())
    }

    #[inline(always)]
    fn charge_step(&mut self) -> Result<(), MatchError> {
        self.steps += 1;
        match self.backtrack_limit {
            Some(limit) if self.steps > limit => {
                log::debug!("Backtracking budget of {} steps exhausted", limit);
                Err(MatchError::BudgetExceeded { limit })
            }
            _ => Ok(()),
        }
    }

    /// \return whether the given constraints might be met from \p pos.
    #[inline]
    fn satisfiable<Dir: Direction>(&self, c: Constraints, pos: usize, dir: Dir) -> bool {
        if c.contains(Constraints::NON_EMPTY) && !cursor::has_next(&self.input, dir, pos) {
            return false;
        }
        if c.contains(Constraints::ANCHORED_AT_START) && pos != 0 {
            return false;
        }
        if c.contains(Constraints::NON_ASCII) && !self.has_non_ascii {
            return false;
        }
        true
    }

    fn set_group(&mut self, id: CaptureGroupID, data: CaptureSlot) {
        let cg = &mut self.s.groups[id as usize];
        self.bts.push(BacktrackInsn::SetCaptureSlot { id, data: *cg });
        *cg = data;
    }

    fn loop_fields(&self, ip: IP) -> LoopFields {
        match self.prog.insn_at(ip) {
            (
                Insn::BeginLoop {
                    loop_id,
                    min,
                    max,
                    mexp_begin,
                    mexp_end,
                    greedy,
                    not_taken,
                },
                len,
            ) => LoopFields {
                loop_id,
                min,
                max,
                mexp_begin,
                mexp_end,
                greedy,
                not_taken,
                body: ip + len,
            },
            _ => rs_unreachable!("Loop target must be a BeginLoop"),
        }
    }

    /// Record entry into a new iteration: bump the count and clear the
    /// captures inside the loop, all undoably.
    fn prepare_to_enter_loop(&mut self, pos: usize, fields: &LoopFields) {
        let id = fields.loop_id;
        let record = &mut self.s.loops[id as usize];
        self.bts.push(BacktrackInsn::SetLoopRecord {
            id,
            data: *record,
        });
        record.iterations += 1;
        record.entry_pos = pos;
        for gid in fields.mexp_begin..fields.mexp_end {
            if self.s.groups[gid as usize].is_touched() {
                self.set_group(gid, CaptureSlot::UNSET);
            }
        }
    }

    fn run_loop(
        &mut self,
        fields: &LoopFields,
        pos: usize,
        ip: IP,
    ) -> Result<Option<IP>, MatchError> {
        let record = self.s.loops[fields.loop_id as usize];
        let iteration = record.iterations;

        let do_taken = iteration < fields.max;
        let do_not_taken = iteration >= fields.min;

        let loop_taken_ip = fields.body;
        let loop_not_taken_ip = fields.not_taken as IP;

        // If we have looped more than the minimum number of iterations, reject empty
        // matches. ES6 21.2.2.5.1 Note 4: "once the minimum number of
        // repetitions has been satisfied, any more expansions of Atom that match the
        // empty character sequence are not considered for further repetitions."
        if record.entry_pos == pos && iteration > fields.min {
            return Ok(None);
        }

        Ok(match (do_taken, do_not_taken) {
            (false, false) => {
                // No arms viable.
                None
            }
            (false, true) => {
                // Only skipping is viable.
                Some(loop_not_taken_ip)
            }
            (true, false) => {
                // Only entering is viable.
                self.prepare_to_enter_loop(pos, fields);
                Some(loop_taken_ip)
            }
            (true, true) if !fields.greedy => {
                // Both arms are viable; backtrack into the loop.
                let mut data = record;
                data.entry_pos = pos;
                self.push_choice(BacktrackInsn::EnterNonGreedyLoop { ip, data })?;
                Some(loop_not_taken_ip)
            }
            (true, true) => {
                // Both arms are viable; backtrack out of the loop.
                self.push_choice(BacktrackInsn::SetPosition {
                    ip: loop_not_taken_ip,
                    pos,
                })?;
                self.prepare_to_enter_loop(pos, fields);
                Some(loop_taken_ip)
            }
        })
    }

    // Drive the loop up to \p max times.
    // \return the position (min, max), or None on failure.
    #[inline(always)]
    fn run_scm_loop_impl<Dir: Direction, Scm: SingleCharMatcher<Input, Dir>>(
        input: &Input,
        mut pos: usize,
        min: u32,
        max: u32,
        dir: Dir,
        matcher: Scm,
    ) -> Option<(usize, usize)> {
        debug_assert!(min <= max, "min should be <= max");
        // Drive the iteration min times.
        // That tells us the min position.
        for _ in 0..min {
            if !matcher.matches(input, dir, &mut pos) {
                return None;
            }
        }
        let min_pos = pos;

        // Drive it up to the max.
        for _ in min..max {
            let saved = pos;
            if !matcher.matches(input, dir, &mut pos) {
                pos = saved;
                break;
            }
        }
        Some((min_pos, pos))
    }

    // Given that ip points at a loop whose body matches exactly one code
    // unit, run a "single character loop". We don't need to save our position
    // every iteration: we can backtrack by stepping one unit back.
    // \return the next IP, or None if the loop failed.
    #[allow(clippy::too_many_arguments)]
    fn run_scm_loop<Dir: Direction>(
        &mut self,
        dir: Dir,
        pos: &mut usize,
        min: u32,
        max: u32,
        body: IP,
        continuation: IP,
        greedy: bool,
    ) -> Result<Option<IP>, MatchError> {
        let input = &self.input;
        let unicode = self.unicode;
        let (insn, _) = self.prog.insn_at(body);
        let loop_res = match insn {
            Insn::MatchChar8(c) => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::Char {
                    c: c as u32,
                    code_point: false,
                },
            ),
            Insn::MatchChar16(c) => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::Char {
                    c: c as u32,
                    code_point: false,
                },
            ),
            Insn::MatchCharICase8(c) => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::CharICase {
                    c: c as u32,
                    unicode,
                    code_point: false,
                },
            ),
            Insn::MatchCharICase16(c) => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::CharICase {
                    c: c as u32,
                    unicode,
                    code_point: false,
                },
            ),
            Insn::Bracket(ranges) => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::Bracket {
                    ranges,
                    code_point: false,
                },
            ),
            Insn::MatchAny => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::MatchAny { code_point: false },
            ),
            Insn::MatchAnyButNewline => Self::run_scm_loop_impl(
                input,
                *pos,
                min,
                max,
                dir,
                scm::MatchAnyExceptLineTerminator { code_point: false },
            ),
            _ => rs_unreachable!("Width1Loop body must match one code unit"),
        };

        // If loop_res is none, we failed to match at least the minimum.
        let (min_pos, max_pos) = match loop_res {
            Some(res) => res,
            None => return Ok(None),
        };
        debug_assert!(
            if Dir::FORWARD {
                min_pos <= max_pos
            } else {
                min_pos >= max_pos
            },
            "min should be <= (>=) max if cursor is tracking forwards (backwards)"
        );

        if min_pos != max_pos {
            // Backtracking is possible.
            let bti = if greedy {
                BacktrackInsn::GreedyLoop1Char {
                    continuation,
                    min: min_pos,
                    max: max_pos,
                }
            } else {
                BacktrackInsn::NonGreedyLoop1Char {
                    continuation,
                    min: min_pos,
                    max: max_pos,
                }
            };
            self.push_choice(bti)?;
        }

        // Start at the max (min) if greedy (nongreedy).
        *pos = if greedy { max_pos } else { min_pos };
        Ok(Some(continuation))
    }

    // Run a lookaround body starting at \p ip, forwards or backwards according
    // to Direction. The half-open range start_group..end_group is the range
    // of contained capture groups.
    // \return whether we matched and negate was false, or did not match but negate
    // is true.
    fn run_lookaround<Dir: Direction>(
        &mut self,
        ip: IP,
        pos: usize,
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        negate: bool,
    ) -> Result<bool, MatchError> {
        if let Some(limit) = self.depth_limit {
            if self.depth >= limit {
                log::debug!("Lookaround depth limit of {} exceeded", limit);
                return Err(MatchError::DepthExceeded { limit });
            }
        }

        // Copy capture groups, because if the match fails (or if we are inverted)
        // we need to restore these.
        let range = (start_group as usize)..(end_group as usize);
        let saved_groups = self.s.groups[range.clone()].to_vec();

        // Start with an "empty" backtrack stack.
        let mut saved_bts = vec![BacktrackInsn::Exhausted];
        core::mem::swap(&mut self.bts, &mut saved_bts);

        // Enter into the lookaround's instruction stream.
        self.depth += 1;
        let res = self.try_at_pos(ip, pos, Dir::new());
        self.depth -= 1;

        // Put back our bts.
        core::mem::swap(&mut self.bts, &mut saved_bts);
        let matched = res?.is_some();

        // If we are a positive lookaround that successfully matched, retain the
        // capture groups (but we need to set up backtracking). Otherwise restore
        // them.
        if matched && !negate {
            for (idx, cg) in saved_groups.iter().enumerate() {
                self.bts.push(BacktrackInsn::SetCaptureSlot {
                    id: (idx as CaptureGroupID) + start_group,
                    data: *cg,
                });
            }
        } else {
            self.s.groups.splice(range, saved_groups);
        }
        Ok(matched != negate)
    }

    /// Attempt to backtrack.
    /// \return true if we backtracked, false if we exhaust the backtrack stack.
    fn try_backtrack<Dir: Direction>(
        &mut self,
        ip: &mut IP,
        pos: &mut usize,
        _dir: Dir,
    ) -> Result<bool, MatchError> {
        loop {
            // We always have a single Exhausted instruction backstopping our stack,
            // so we do not need to check for empty bts.
            let bt = match self.bts.last_mut() {
                Some(bt) => bt,
                None => rs_unreachable!("BT stack should never be empty"),
            };
            match bt {
                BacktrackInsn::Exhausted => return Ok(false),

                &mut BacktrackInsn::SetPosition {
                    ip: saved_ip,
                    pos: saved_pos,
                } => {
                    *ip = saved_ip;
                    *pos = saved_pos;
                    self.bts.pop();
                    return Ok(true);
                }
                &mut BacktrackInsn::SetLoopRecord { id, data } => {
                    self.s.loops[id as usize] = data;
                    self.bts.pop();
                }
                &mut BacktrackInsn::SetCaptureSlot { id, data } => {
                    self.s.groups[id as usize] = data;
                    self.bts.pop();
                }

                &mut BacktrackInsn::EnterNonGreedyLoop { ip: loop_ip, data } => {
                    // Must pop before we enter the loop.
                    self.bts.pop();
                    let fields = self.loop_fields(loop_ip);
                    *ip = fields.body;
                    *pos = data.entry_pos;
                    self.s.loops[fields.loop_id as usize] = data;
                    self.prepare_to_enter_loop(*pos, &fields);
                    return Ok(true);
                }

                BacktrackInsn::GreedyLoop1Char {
                    continuation,
                    min,
                    max,
                } => {
                    // The match failed at the max location.
                    // If min is equal to max, there is no more backtracking to be done;
                    // otherwise move opposite the direction of the cursor.
                    if *max == *min {
                        // We have backtracked this loop as far as possible.
                        self.bts.pop();
                        continue;
                    }
                    let newmax = if Dir::FORWARD { *max - 1 } else { *max + 1 };
                    *max = newmax;
                    *pos = newmax;
                    *ip = *continuation;
                    self.charge_step()?;
                    return Ok(true);
                }

                BacktrackInsn::NonGreedyLoop1Char {
                    continuation,
                    min,
                    max,
                } => {
                    // The match failed at the min location.
                    if *max == *min {
                        // We have backtracked this loop as far as possible.
                        self.bts.pop();
                        continue;
                    }
                    // Move in the direction of the cursor.
                    let newmin = if Dir::FORWARD { *min + 1 } else { *min - 1 };
                    *min = newmin;
                    *pos = newmin;
                    *ip = *continuation;
                    self.charge_step()?;
                    return Ok(true);
                }
            }
        }
    }

    /// Attempt to match at a given IP and position.
    pub(crate) fn try_at_pos<Dir: Direction>(
        &mut self,
        mut ip: IP,
        mut pos: usize,
        dir: Dir,
    ) -> Result<Option<usize>, MatchError> {
        debug_assert!(
            self.bts.len() == 1,
            "Should be only initial exhausted backtrack insn"
        );
        let prog = self.prog;
        let input = self.input;
        // These are not really loops, they are just labels that we effectively 'goto'
        // to.
        #[allow(clippy::never_loop)]
        'nextinsn: loop {
            'backtrack: loop {
                let (insn, len) = prog.insn_at(ip);

                // Helper macro to either step to the next insn, or backtrack.
                macro_rules! next_or_bt {
                    ($e:expr) => {
                        if $e {
                            ip += len;
                            continue 'nextinsn;
                        } else {
                            break 'backtrack;
                        }
                    };
                }

                // Helper macro to jump to a computed IP, or backtrack on None.
                macro_rules! goto_or_bt {
                    ($e:expr) => {
                        match $e {
                            Some(next_ip) => {
                                ip = next_ip;
                                continue 'nextinsn;
                            }
                            None => break 'backtrack,
                        }
                    };
                }

                match insn {
                    Insn::Goal => {
                        // Keep all but the initial give-up bts.
                        self.bts.truncate(1);
                        return Ok(Some(pos));
                    }

                    Insn::MatchChar8(c) => next_or_bt!(scm::Char {
                        c: c as u32,
                        code_point: false
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::MatchChar16(c) => next_or_bt!(scm::Char {
                        c: c as u32,
                        code_point: false
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::U16MatchChar32(c) => next_or_bt!(scm::Char {
                        c,
                        code_point: true
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::MatchCharICase8(c) => next_or_bt!(scm::CharICase {
                        c: c as u32,
                        unicode: self.unicode,
                        code_point: false,
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::MatchCharICase16(c) => next_or_bt!(scm::CharICase {
                        c: c as u32,
                        unicode: self.unicode,
                        code_point: false,
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::U16MatchCharICase32(c) => next_or_bt!(scm::CharICase {
                        c,
                        unicode: self.unicode,
                        code_point: true,
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::MatchNChar8(run) => {
                        next_or_bt!(cursor::try_match_lit(&input, dir, &mut pos, run))
                    }

                    Insn::MatchNCharICase8(run) => {
                        let unicode = self.unicode;
                        let m = run.iter().all(|&b| {
                            match cursor::next_unit(&input, dir, &mut pos) {
                                Some(c) => matchers::fold_equals(c, b as u32, unicode),
                                None => false,
                            }
                        });
                        next_or_bt!(m)
                    }

                    Insn::MatchAny => {
                        next_or_bt!(scm::MatchAny { code_point: false }.matches(
                            &input,
                            dir,
                            &mut pos
                        ))
                    }

                    Insn::U16MatchAny => {
                        next_or_bt!(scm::MatchAny { code_point: true }.matches(
                            &input,
                            dir,
                            &mut pos
                        ))
                    }

                    Insn::MatchAnyButNewline => next_or_bt!(
                        scm::MatchAnyExceptLineTerminator { code_point: false }
                            .matches(&input, dir, &mut pos)
                    ),

                    Insn::U16MatchAnyButNewline => next_or_bt!(
                        scm::MatchAnyExceptLineTerminator { code_point: true }
                            .matches(&input, dir, &mut pos)
                    ),

                    Insn::Bracket(ranges) => next_or_bt!(scm::Bracket {
                        ranges,
                        code_point: false
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::U16Bracket(ranges) => next_or_bt!(scm::Bracket {
                        ranges,
                        code_point: true
                    }
                    .matches(&input, dir, &mut pos)),

                    Insn::WordBoundary { invert } => {
                        let unicode_icase = self.unicode && self.icase;
                        let prev_wordchar = input
                            .peek_left(pos)
                            .map_or(false, |c| is_word_char(c, unicode_icase));
                        let curr_wordchar = input
                            .peek_right(pos)
                            .map_or(false, |c| is_word_char(c, unicode_icase));
                        let is_boundary = prev_wordchar != curr_wordchar;
                        next_or_bt!(is_boundary != invert)
                    }

                    Insn::LeftAnchor => {
                        let matches = match input.peek_left(pos) {
                            None => true,
                            Some(c) => self.multiline && is_line_terminator(c),
                        };
                        next_or_bt!(matches)
                    }

                    Insn::RightAnchor => {
                        let matches = match input.peek_right(pos) {
                            None => true, // we're at the right of the string
                            Some(c) => self.multiline && is_line_terminator(c),
                        };
                        next_or_bt!(matches)
                    }

                    Insn::Jump32(target) => {
                        ip = target as IP;
                        continue 'nextinsn;
                    }

                    Insn::Alternation {
                        target,
                        primary,
                        secondary,
                    } => {
                        let primary_ok = self.satisfiable(primary, pos, dir);
                        let secondary_ok = self.satisfiable(secondary, pos, dir);
                        match (primary_ok, secondary_ok) {
                            (true, true) => {
                                self.push_choice(BacktrackInsn::SetPosition {
                                    ip: target as IP,
                                    pos,
                                })?;
                                next_or_bt!(true)
                            }
                            (true, false) => next_or_bt!(true),
                            (false, true) => {
                                ip = target as IP;
                                continue 'nextinsn;
                            }
                            (false, false) => break 'backtrack,
                        }
                    }

                    Insn::BeginMarkedSubexpression(cg_idx) => {
                        let data = if Dir::FORWARD {
                            CaptureSlot {
                                start: Some(pos),
                                end: None,
                            }
                        } else {
                            CaptureSlot {
                                start: None,
                                end: Some(pos),
                            }
                        };
                        self.set_group(cg_idx, data);
                        next_or_bt!(true)
                    }

                    Insn::EndMarkedSubexpression(cg_idx) => {
                        let mut data = self.s.groups[cg_idx as usize];
                        if Dir::FORWARD {
                            debug_assert!(data.start.is_some(), "Group should have been entered");
                            data.end = Some(pos);
                        } else {
                            debug_assert!(data.end.is_some(), "Group should have been entered");
                            data.start = Some(pos);
                        }
                        self.set_group(cg_idx, data);
                        next_or_bt!(true)
                    }

                    Insn::BackRef(cg_idx) => {
                        // Backreferences to a capture group that did not match always
                        // succeed (ES6 21.2.2.9).
                        // Note we may be in the capture group we are examining, e.g. /(abc\1)/.
                        let matched = match self.s.groups[cg_idx as usize].range() {
                            Some(orig_range) if self.icase => matchers::backref_icase(
                                &input,
                                dir,
                                orig_range,
                                &mut pos,
                                self.unicode,
                            ),
                            Some(orig_range) => {
                                matchers::backref(&input, dir, orig_range, &mut pos)
                            }
                            None => true,
                        };
                        next_or_bt!(matched)
                    }

                    Insn::Lookaround {
                        invert,
                        forwards,
                        constraints,
                        mexp_begin,
                        mexp_end,
                        continuation,
                    } => {
                        let body = ip + len;
                        let satisfied = if forwards {
                            if self.satisfiable(constraints, pos, Forward) {
                                self.run_lookaround::<Forward>(
                                    body, pos, mexp_begin, mexp_end, invert,
                                )?
                            } else {
                                invert
                            }
                        } else if self.satisfiable(constraints, pos, Backward) {
                            self.run_lookaround::<Backward>(
                                body, pos, mexp_begin, mexp_end, invert,
                            )?
                        } else {
                            invert
                        };
                        if satisfied {
                            ip = continuation as IP;
                            continue 'nextinsn;
                        } else {
                            break 'backtrack;
                        }
                    }

                    Insn::BeginLoop { loop_id, .. } => {
                        // Entering a loop, not re-entering it.
                        let record = &mut self.s.loops[loop_id as usize];
                        let saved = *record;
                        record.iterations = 0;
                        self.bts.push(BacktrackInsn::SetLoopRecord {
                            id: loop_id,
                            data: saved,
                        });
                        let fields = self.loop_fields(ip);
                        goto_or_bt!(self.run_loop(&fields, pos, ip)?)
                    }

                    Insn::EndLoop { target } => {
                        let fields = self.loop_fields(target as IP);
                        goto_or_bt!(self.run_loop(&fields, pos, target as IP)?)
                    }

                    Insn::BeginSimpleLoop {
                        constraints,
                        not_taken,
                    } => {
                        if self.satisfiable(constraints, pos, dir) {
                            self.push_choice(BacktrackInsn::SetPosition {
                                ip: not_taken as IP,
                                pos,
                            })?;
                            next_or_bt!(true)
                        } else {
                            ip = not_taken as IP;
                            continue 'nextinsn;
                        }
                    }

                    Insn::EndSimpleLoop { target } => {
                        ip = target as IP;
                        continue 'nextinsn;
                    }

                    Insn::Width1Loop {
                        min,
                        max,
                        greedy,
                        not_taken,
                        ..
                    } => goto_or_bt!(self.run_scm_loop(
                        dir,
                        &mut pos,
                        min,
                        max,
                        ip + len,
                        not_taken as IP,
                        greedy
                    )?),
                }
            }

            // This after the backtrack loop.
            // A break 'backtrack will jump here.
            if self.try_backtrack(&mut ip, &mut pos, dir)? {
                continue 'nextinsn;
            } else {
                // We have exhausted the backtracking stack.
                debug_assert!(self.bts.len() == 1, "Should have exhausted backtrack stack");
                return Ok(None);
            }
        }
    }
}

#[derive(Debug)]
pub struct BacktrackExecutor<'r, Input: InputIndexer> {
    input: Input,
    matcher: MatchAttempter<'r, Input>,
    start_pred: StartPredicate<'r>,
    group_names: Box<[Box<str>]>,
}

impl<'r, Input: InputIndexer> BacktrackExecutor<'r, Input> {
    pub(crate) fn new(prog: &'r Program, input: Input, options: &MatchOptions) -> Self {
        let group_names = if prog.group_names.iter().any(Option::is_some) {
            prog.group_names
                .iter()
                .map(|name| name.clone().unwrap_or_default())
                .collect()
        } else {
            Box::default()
        };
        Self {
            input,
            matcher: MatchAttempter::new(prog, input, options),
            start_pred: StartPredicate::for_program(prog),
            group_names,
        }
    }

    fn successful_match(&mut self, start: usize, end: usize) -> Match {
        // Take the captures, leaving every slot unset for the next attempt.
        let captures = self
            .matcher
            .s
            .groups
            .iter_mut()
            .map(|slot| core::mem::take(slot).range())
            .collect();
        Match {
            range: Range { start, end },
            captures,
            group_names: self.group_names.clone(),
        }
    }

    /// \return the position after \p pos, stepping over a whole surrogate
    /// pair in unicode mode.
    fn advance(&self, mut pos: usize) -> Option<usize> {
        if self.matcher.unicode {
            self.input.next_cp_right(&mut pos)?;
            Some(pos)
        } else if pos < self.input.len() {
            Some(pos + 1)
        } else {
            None
        }
    }
}

impl<Input: InputIndexer> exec::MatchProducer for BacktrackExecutor<'_, Input> {
    fn next_match(&mut self, start: usize) -> Result<Option<exec::Found>, MatchError> {
        let header = self.matcher.prog.header;
        let sticky = self.matcher.prog.flags().sticky;
        let constraints = header.constraints;
        let len = self.input.len();

        if constraints.contains(Constraints::NON_ASCII) && !self.matcher.has_non_ascii {
            return Ok(None);
        }
        let anchored = constraints.contains(Constraints::ANCHORED_AT_START);
        if start > len || (anchored && start != 0) {
            return Ok(None);
        }
        // The last position where a match may begin.
        let last_start = if constraints.contains(Constraints::NON_EMPTY) {
            match len.checked_sub(1) {
                Some(last) => last,
                None => return Ok(None),
            }
        } else {
            len
        };

        let mut pos = start;
        loop {
            // Find the next start location, or None if none.
            let candidate = if sticky || anchored {
                pos
            } else {
                match self.start_pred.find(&self.input, pos) {
                    Some(candidate) => candidate,
                    None => return Ok(None),
                }
            };
            if candidate > last_start {
                return Ok(None);
            }
            if let Some(end) = self.matcher.try_at_pos(0, candidate, Forward)? {
                // An empty match resumes one position later.
                let resume = if end != candidate {
                    Some(end)
                } else {
                    self.advance(end)
                };
                return Ok(Some(exec::Found {
                    mat: self.successful_match(candidate, end),
                    resume,
                }));
            }
            if sticky || anchored {
                return Ok(None);
            }
            // Didn't find it at this position, try the next one.
            pos = match self.advance(candidate) {
                Some(pos) => pos,
                None => return Ok(None),
            };
        }
    }
}
