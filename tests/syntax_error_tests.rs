use regvm::ast::{Node, Regex as Ast, UNBOUNDED};
use regvm::{CompileOptions, Error, Flags, Regex};

#[track_caller]
fn test_1_error_flags(pattern: &str, flags: &str, expected_err: &str) {
    let res = Regex::with_flags(pattern, flags);
    let err = match res {
        Ok(_) => panic!("Pattern should not have parsed: {}", pattern),
        Err(err) => err,
    };
    assert!(
        err.text().contains(expected_err),
        "Error text '{}' did not contain '{}' for pattern '{}'",
        err.text(),
        expected_err,
        pattern
    );
}

#[track_caller]
fn test_1_error(pattern: &str, expected_err: &str) {
    test_1_error_flags(pattern, "u", expected_err)
}

#[test]
fn test_syntax_errors() {
    test_1_error(r"*", "Nothing to repeat");
    test_1_error(r"x**", "Nothing to repeat");
    test_1_error(r"?", "Nothing to repeat");
    test_1_error(r"{3,5}", "Nothing to repeat");
    test_1_error(r"x{5,3}", "Numbers out of order in quantifier");
    test_1_error(r"x{2", "Incomplete quantifier");

    test_1_error(r"]", "Lone quantifier brackets");
    test_1_error(r"}", "Lone quantifier brackets");
    test_1_error(r"[abc", "Unbalanced bracket");

    test_1_error(r"(", "Unbalanced parenthesis");
    test_1_error(r"(?!", "Unbalanced parenthesis");
    test_1_error(r"abc)", "Unbalanced parenthesis");
    test_1_error(r"(?x)", "Invalid group");

    test_1_error(r"[z-a]", "Range out of order in character class");
    test_1_error(r"[a-\s]", "Invalid character class range");
    test_1_error(r"[\d-z]", "Invalid character class range");

    test_1_error("\\", "Incomplete escape");
    test_1_error(r"\q", "Invalid escape");
    test_1_error(r"\xZ", "Invalid escape");
    test_1_error(r"\u{110000}", "Invalid unicode escape");
    test_1_error(r"\c1", "Invalid unicode escape");

    test_1_error("^*", "Quantifier not allowed here");
    test_1_error("$+", "Quantifier not allowed here");
    test_1_error(r"\b{2}", "Quantifier not allowed here");
    test_1_error("(?=abc)*", "Quantifier not allowed here");
    test_1_error("(?<!abc){3,}", "Quantifier not allowed here");

    test_1_error(r"\2(a)", "Backreference \\2 exceeds number of capture groups");
    test_1_error(r"\1", "Backreference \\1 exceeds number of capture groups");
    test_1_error(r"\k<nope>(?<yes>a)", "Invalid named capture referenced");
    test_1_error(r"\k", "Invalid named reference");

    test_1_error(r"(?<>a)", "Empty capture group name");
    test_1_error(r"(?<1a>a)", "Invalid capture group name");
    test_1_error(r"(?<a>x)(?<a>y)", "Duplicate capture group name 'a'");

    test_1_error(r"\p{L}", "Unicode property escapes are not supported");
    test_1_error(r"[\P{L}]", "Unicode property escapes are not supported");
}

#[test]
fn annex_b_forms_parse_without_unicode() {
    for pattern in &[
        r"]", r"}", r"{", r"x{2", r"\q", r"\xZ", r"\c1", r"[\d-z]", r"\p{L}", r"\8",
        r"(?=a)*",
    ] {
        assert!(
            Regex::new(pattern).is_ok(),
            "Pattern should have parsed: {}",
            pattern
        );
    }
    // These are errors in every mode.
    test_1_error_flags(r"a**", "", "Nothing to repeat");
    test_1_error_flags(r"x{5,3}", "", "Numbers out of order in quantifier");
    test_1_error_flags(r"(?<!a)+", "", "Quantifier not allowed here");
}

#[test]
fn test_excessive_capture_groups() {
    let mut captures = String::from("s");
    for _ in 0..65536 {
        captures.push_str("(x)");
    }
    let err = Regex::new(&captures).unwrap_err();
    assert!(matches!(err, Error::PatternTooLarge(_)), "{:?}", err);
    assert!(err.text().contains("Capture group count limit exceeded"));
}

#[test]
fn test_excessive_loops() {
    let mut loops = String::from("s");
    for _ in 0..65536 {
        loops.push_str("(?:xy){3,5}");
    }
    let err = Regex::new(&loops).unwrap_err();
    assert!(matches!(err, Error::PatternTooLarge(_)), "{:?}", err);
    assert!(err.text().contains("Loop count limit exceeded"));
}

#[test]
fn test_program_too_large() {
    let options = CompileOptions {
        max_program_len: 16,
    };
    let err = Regex::with_options("abcdefghijklmnopqrstuvwxyz", Flags::default(), options)
        .unwrap_err();
    assert!(matches!(err, Error::PatternTooLarge(_)), "{:?}", err);

    let options = CompileOptions {
        max_program_len: 1024,
    };
    assert!(Regex::with_options("abc", Flags::default(), options).is_ok());
}

#[test]
fn test_invalid_ast() {
    let compile = |node: Node| {
        let ast = Ast {
            node,
            flags: Flags::default(),
        };
        Regex::from_ast(&ast, CompileOptions::default())
    };

    let err = compile(Node::BackRef(0)).unwrap_err();
    assert!(matches!(err, Error::Syntax(_)), "{:?}", err);

    let err = compile(Node::Quantified {
        body: Box::new(Node::Char('a' as u32)),
        min: 3,
        max: 2,
        greedy: true,
    })
    .unwrap_err();
    assert!(matches!(err, Error::Syntax(_)), "{:?}", err);

    let err = compile(Node::Alt(vec![Node::Char('a' as u32)])).unwrap_err();
    assert_eq!(err.text(), "Alternation needs two branches");

    assert!(compile(Node::Quantified {
        body: Box::new(Node::Char('a' as u32)),
        min: 0,
        max: UNBOUNDED,
        greedy: false,
    })
    .is_ok());
}

#[test]
fn error_display() {
    let err = Regex::new("(").unwrap_err();
    assert_eq!(err.to_string(), "Invalid regular expression: Unbalanced parenthesis");
}
