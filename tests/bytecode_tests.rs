use pretty_assertions::assert_eq;
use regvm::{Flags, Opcode, Regex};

fn disasm(pattern: &str, flags: &str) -> String {
    Regex::with_flags(pattern, flags)
        .expect("Pattern should compile")
        .program()
        .to_string()
}

fn disasm_unoptimized(pattern: &str) -> String {
    let mut flags = Flags::default();
    flags.no_opt = true;
    regvm::disassemble(Regex::with_flags(pattern, flags).unwrap().program())
}

#[test]
fn literals_pick_the_narrowest_encoding() {
    assert_eq!(
        disasm(r"a\x01ſ", "i"),
        "\
Header: marked: 0 loops: 0 flags: 1 constraints: 5
0000  MatchCharICase8 'A'
0002  MatchChar8 0x01
0004  MatchChar16 0x017f
0007  Goal
"
    );

    assert_eq!(
        disasm("😀.", "u"),
        "\
Header: marked: 0 loops: 0 flags: 8 constraints: 5
0000  U16MatchChar32 0x1f600
0005  U16MatchAnyButNewline
0006  Goal
"
    );
}

#[test]
fn literal_runs_coalesce() {
    assert_eq!(
        disasm("it's", ""),
        "\
Header: marked: 0 loops: 0 flags: 0 constraints: 4
0000  MatchNChar8 'it\\x27s'
0006  Goal
"
    );

    // Runs longer than one instruction can hold are split.
    let re = Regex::new(&"a".repeat(300)).unwrap();
    let lens: Vec<_> = re
        .program()
        .insns()
        .filter_map(|(_, insn)| match insn {
            regvm::Insn::MatchNChar8(run) => Some(run.len()),
            _ => None,
        })
        .collect();
    assert_eq!(lens, vec![255, 45]);
}

#[test]
fn unoptimized_programs_use_single_literals() {
    assert_eq!(
        disasm_unoptimized("ab"),
        "\
Header: marked: 0 loops: 0 flags: 0 constraints: 4
0000  MatchChar8 'a'
0002  MatchChar8 'b'
0004  Goal
"
    );
}

#[test]
fn lookarounds() {
    assert_eq!(
        disasm("abc(?=^)(?!def)", "i"),
        "\
Header: marked: 0 loops: 0 flags: 1 constraints: 4
0000  MatchNCharICase8 'ABC'
0005  Lookaround: = (constraints 2, marked 0-0, continuation 0x0013)
0011  LeftAnchor
0012  Goal
0013  Lookaround: ! (constraints 4, marked 0-0, continuation 0x0025)
001f  MatchNCharICase8 'DEF'
0024  Goal
0025  Goal
"
    );
}

#[test]
fn alternations() {
    assert_eq!(
        disasm("a|bc|d", ""),
        "\
Header: marked: 0 loops: 0 flags: 0 constraints: 4
0000  Alternation: target 0x000e, constraints 4,4
0007  MatchChar8 'a'
0009  Jump32: 0x0020
000e  Alternation: target 0x001e, constraints 4,4
0015  MatchNChar8 'bc'
0019  Jump32: 0x0020
001e  MatchChar8 'd'
0020  Goal
"
    );
}

#[test]
fn loops() {
    assert_eq!(
        disasm("(ab)*c{2,5}?(?:de)*", ""),
        "\
Header: marked: 1 loops: 2 flags: 0 constraints: 4
0000  BeginLoop: 0 greedy {0,inf} marked 0-1 exit 0x0025
0016  BeginMarkedSubexpression: 0
0019  MatchNChar8 'ab'
001d  EndMarkedSubexpression: 0
0020  EndLoop: 0x0000
0025  Width1Loop: 1 nongreedy {2,5} exit 0x0039
0037  MatchChar8 'c'
0039  BeginSimpleLoop: constraints 4, exit 0x0048
003f  MatchNChar8 'de'
0043  EndSimpleLoop: 0x0039
0048  Goal
"
    );

    // Without optimization every loop is general.
    let prog = disasm_unoptimized("c{2,5}?(?:de)*");
    assert!(!prog.contains("Width1Loop"));
    assert!(!prog.contains("BeginSimpleLoop"));
    assert_eq!(prog.matches("BeginLoop").count(), 2);
}

#[test]
fn brackets_and_anchors() {
    assert_eq!(
        disasm("^[a-cx]$", ""),
        "\
Header: marked: 0 loops: 0 flags: 0 constraints: 6
0000  LeftAnchor
0001  Bracket [a-cx]
0016  RightAnchor
0017  Goal
"
    );

    // Multiline anchors do not anchor the search.
    assert!(disasm("^a", "m").starts_with("Header: marked: 0 loops: 0 flags: 4 constraints: 4\n"));
}

#[test]
fn degenerate_quantifiers() {
    assert_eq!(disasm("a{0}b", ""), disasm("b", ""));
    assert_eq!(disasm("(?:a){1}", ""), disasm("a", ""));
}

#[test]
fn header_fields_round_trip() {
    let re = Regex::with_flags(r"(?<x>a)(b)\1", "gimsuy").unwrap();
    let prog = re.program();
    assert_eq!(prog.header.marked_count, 2);
    assert_eq!(prog.header.flags, 1 | 2 | 4 | 8 | 16 | 32);
    assert_eq!(prog.flags().to_string(), "gimsuy");
    assert_eq!(
        prog.insns().last().map(|(_, insn)| insn.opcode()),
        Some(Opcode::Goal)
    );
}
