use regvm::{MatchError, MatchOptions, Regex};

fn with_budget(limit: u64) -> MatchOptions {
    MatchOptions {
        backtrack_limit: Some(limit),
        depth_limit: None,
    }
}

fn with_depth(limit: u32) -> MatchOptions {
    MatchOptions {
        backtrack_limit: None,
        depth_limit: Some(limit),
    }
}

#[test]
fn catastrophic_pattern_exhausts_budget() {
    let re = Regex::new("(a*)*b").unwrap();
    let text = "a".repeat(32);
    let res = re.try_find(&text, 0, &with_budget(1000));
    assert_eq!(res, Err(MatchError::BudgetExceeded { limit: 1000 }));

    // Exhaustion is deterministic.
    assert_eq!(re.try_find(&text, 0, &with_budget(1000)), res);

    // Other input representations share the same accounting.
    let wide: Vec<u16> = text.encode_utf16().collect();
    assert_eq!(re.try_find_utf16(&wide, 0, &with_budget(1000)), res);
    assert_eq!(re.try_find_latin1(text.as_bytes(), 0, &with_budget(1000)), res);
}

#[test]
fn unlimited_searches_complete() {
    let re = Regex::new("(a*)*b").unwrap();
    let text = "a".repeat(12);
    assert_eq!(re.try_find(&text, 0, &MatchOptions::default()), Ok(None));
    assert!(re.find(&text).is_none());

    let m = re.try_find("aaab", 0, &MatchOptions::default()).unwrap().unwrap();
    assert_eq!(m.range(), 0..4);
}

#[test]
fn budget_never_changes_the_answer() {
    let re = Regex::new("(a|ab)(c|bcd)(d*)").unwrap();
    let text = "xxabcd";
    let expected = re.find(text).expect("Should have matched");
    assert_eq!(expected.range(), 2..6);

    let mut succeeded = false;
    for limit in 0..200 {
        match re.try_find(text, 0, &with_budget(limit)) {
            Ok(Some(m)) => {
                assert_eq!(m, expected);
                succeeded = true;
            }
            Ok(None) => panic!("Budget of {} produced a false negative", limit),
            Err(err) => {
                assert!(!succeeded, "Budget of {} failed after a smaller one passed", limit);
                assert_eq!(err, MatchError::BudgetExceeded { limit });
            }
        }
    }
    assert!(succeeded);
}

#[test]
fn lookaround_depth_limit() {
    let re = Regex::new("(?=(?=(?=a)))a").unwrap();
    assert_eq!(
        re.try_find("a", 0, &with_depth(2)),
        Err(MatchError::DepthExceeded { limit: 2 })
    );
    let m = re.try_find("a", 0, &with_depth(3)).unwrap().unwrap();
    assert_eq!(m.range(), 0..1);

    // A lookbehind with nothing behind it is decided without being entered.
    let re = Regex::new("(?<!b)a").unwrap();
    assert!(re.try_find("a", 0, &with_depth(0)).unwrap().is_some());
    assert_eq!(
        re.try_find("ba", 0, &with_depth(0)),
        Err(MatchError::DepthExceeded { limit: 0 })
    );

    // Patterns without lookarounds ignore the depth limit.
    let re = Regex::new("a+").unwrap();
    assert!(re.try_find("aaa", 0, &with_depth(0)).unwrap().is_some());
}

#[test]
fn error_messages() {
    assert_eq!(
        MatchError::BudgetExceeded { limit: 10 }.to_string(),
        "Match aborted: backtracking budget of 10 steps exceeded"
    );
    assert_eq!(
        MatchError::DepthExceeded { limit: 4 }.to_string(),
        "Match aborted: lookaround nesting exceeded depth 4"
    );
}
