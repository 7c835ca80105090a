//! Engine behaviour through the public API

use pcrex::{
    CompileErrorKind, CompileOptions, ExecError, ExecResult, MatchOptions, Matcher, MatcherState,
    Regex, StudyOptions, CODE_NO_MATCH, CODE_PARTIAL,
};

fn spans(re: &Regex, subject: &str) -> Vec<Option<(usize, usize)>> {
    match re.exec(subject.as_bytes(), MatchOptions::empty()).unwrap() {
        ExecResult::Matched(spans) => spans,
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn test_group_counts() {
    for (pattern, groups) in [("()", 1), ("(())", 2), ("((?:))", 1), ("", 0), ("^", 0), ("^$", 0)] {
        assert_eq!(Regex::new(pattern).unwrap().groups(), groups, "{pattern}");
    }
}

#[test]
fn test_compile_is_deterministic() {
    let a = Regex::new("(?<x>a)(b)(?<y>c)").unwrap();
    let b = Regex::new("(?<x>a)(b)(?<y>c)").unwrap();
    assert_eq!(a.groups(), b.groups());
    assert_eq!(a.group_names(), b.group_names());
}

#[test]
fn test_compile_error_offsets() {
    let err = Regex::new("(").unwrap_err();
    assert_eq!((err.message.as_str(), err.offset), ("missing )", 1));
    let err = Regex::new("\\").unwrap_err();
    assert_eq!((err.message.as_str(), err.offset), ("\\ at end of pattern", 1));
    let err = Regex::new("abc\\").unwrap_err();
    assert_eq!((err.message.as_str(), err.offset), ("\\ at end of pattern", 4));
    for k in [0, 3, 7] {
        let mut pattern = "abcdefgh".to_string();
        pattern.replace_range(k..=k, "\0");
        let err = Regex::new(&pattern).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::NulByteInPattern);
        assert_eq!((err.message.as_str(), err.offset), ("NUL byte in pattern", k));
    }
}

#[test]
fn test_unset_group_vs_empty_group() {
    let re = Regex::new("^(X)*ab(c)$").unwrap();
    let s = spans(&re, "abc");
    assert_eq!(s[0], Some((0, 3)));
    assert_eq!(s[1], None);
    assert_eq!(s[2], Some((2, 3)));

    let re = Regex::new("a(x?)b").unwrap();
    assert_eq!(spans(&re, "ab")[1], Some((1, 1)));
}

#[test]
fn test_backref_inside_its_own_repeat() {
    let re = Regex::new("(?:(a|b\\1)c)+").unwrap();
    assert_eq!(spans(&re, "acbac"), vec![Some((0, 5)), Some((2, 4))]);
    let re = Regex::new("(a|b\\1)+").unwrap();
    assert_eq!(spans(&re, "aba"), vec![Some((0, 3)), Some((1, 3))]);
    // No completed iteration yet, so the reference cannot match.
    let re = Regex::new("^(a\\1?)+$").unwrap();
    assert_eq!(spans(&re, "aaa"), vec![Some((0, 3)), Some((1, 3))]);
}

#[test]
fn test_deep_nesting_is_rejected() {
    let pattern = format!("{}{}", "(".repeat(100_000), ")".repeat(100_000));
    let err = Regex::new(&pattern).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::NestingTooDeep);
    assert_eq!(err.message, "parentheses are too deeply nested");
    assert_eq!(err.offset, 250);

    let nested = format!("{}a{}", "(?:".repeat(50), ")".repeat(50));
    assert!(Regex::new(&nested).unwrap().is_match("a"));
}

#[test]
fn test_caseless_literal_and_class_agree() {
    let options = CompileOptions::UTF8 | CompileOptions::CASELESS;
    for pattern in ["k", "[k]", "K", "\\x{212a}"] {
        let re = Regex::compile(pattern, options).unwrap();
        for subject in ["k", "K", "\u{212a}"] {
            assert!(re.is_match(subject), "{pattern:?} on {subject:?}");
        }
    }
}

#[test]
fn test_leftmost_first_alternation() {
    let re = Regex::new("a|ab").unwrap();
    assert_eq!(re.find("ab"), Some("a"));
    let re = Regex::new("(a+?)(b*)").unwrap();
    assert_eq!(re.captures("aab").unwrap(), vec![Some("a"), Some("a"), Some("")]);
}

#[test]
fn test_zero_length_scan() {
    let re = Regex::new("\\w*").unwrap();
    let found: Vec<_> = re
        .find_all("cat dog", MatchOptions::empty())
        .unwrap()
        .into_iter()
        .map(|m| (m.text, m.start, m.end))
        .collect();
    assert_eq!(
        found,
        vec![
            ("cat".to_string(), 0, 3),
            (String::new(), 3, 3),
            ("dog".to_string(), 4, 7)
        ]
    );
}

#[test]
fn test_matcher_partial_is_a_match() {
    let re = Regex::new("^abc").unwrap();
    let mut m = re.new_matcher();
    assert!(m.execute_str("ab", MatchOptions::PARTIAL_SOFT));
    assert!(m.matches());
    assert!(m.partial());
    assert!(m.execute_str("abc", MatchOptions::PARTIAL_SOFT));
    assert!(m.matches());
    assert!(!m.partial());
}

#[test]
fn test_soft_partial() {
    let re = Regex::new("^abc").unwrap();
    assert_eq!(
        re.exec(b"ab", MatchOptions::PARTIAL_SOFT).unwrap(),
        ExecResult::Partial { start: 0, end: 2 }
    );
    assert!(matches!(
        re.exec(b"abc", MatchOptions::PARTIAL_SOFT).unwrap(),
        ExecResult::Matched(_)
    ));
    assert_eq!(re.exec(b"ab", MatchOptions::empty()).unwrap(), ExecResult::NoMatch);
}

#[test]
fn test_hard_partial_prefers_partial() {
    let re = Regex::new("dog(sbody)?").unwrap();
    assert!(matches!(
        re.exec(b"dogsb", MatchOptions::PARTIAL_SOFT).unwrap(),
        ExecResult::Matched(_)
    ));
    assert_eq!(
        re.exec(b"dogsb", MatchOptions::PARTIAL_HARD).unwrap(),
        ExecResult::Partial { start: 0, end: 5 }
    );
}

#[test]
fn test_result_codes() {
    let re = Regex::new("(a)(b)?(c)?").unwrap();
    assert_eq!(re.exec(b"a", MatchOptions::empty()).unwrap().code(), 2);
    assert_eq!(re.exec(b"z", MatchOptions::empty()).unwrap().code(), CODE_NO_MATCH);
    let re = Regex::new("abc").unwrap();
    assert_eq!(
        re.exec(b"xab", MatchOptions::PARTIAL_SOFT).unwrap().code(),
        CODE_PARTIAL
    );
}

#[test]
fn test_exec_at_sees_earlier_text() {
    let re = Regex::new("\\bfoo").unwrap();
    assert_eq!(
        re.exec_at(b"xfoo foo", 1, MatchOptions::empty()).unwrap(),
        ExecResult::Matched(vec![Some((5, 8))])
    );
    let re = Regex::new("(?<=x)foo").unwrap();
    assert_eq!(
        re.exec_at(b"xfoo", 1, MatchOptions::empty()).unwrap(),
        ExecResult::Matched(vec![Some((1, 4))])
    );
}

#[test]
#[should_panic]
fn test_exec_at_past_end_panics() {
    let re = Regex::new("a").unwrap();
    let _ = re.exec_at(b"abc", 4, MatchOptions::empty());
}

#[test]
fn test_replace_all() {
    let re = Regex::new("foo").unwrap();
    assert_eq!(
        re.replace_all("I like foods.", "car", MatchOptions::empty()).unwrap(),
        "I like cards."
    );
    assert_eq!(
        re.replace_all("food fight fools foo", "car", MatchOptions::empty())
            .unwrap(),
        "card fight carls car"
    );
    let untouched = "nothing to see";
    assert_eq!(
        re.replace_all(untouched, "car", MatchOptions::empty()).unwrap(),
        untouched
    );
}

#[test]
fn test_named_groups() {
    let re = Regex::new("(?<year>\\d{4})-(?P<month>\\d\\d)-(?'day'\\d\\d)").unwrap();
    assert_eq!(re.group_index("month"), Ok(2));
    assert_eq!(
        re.group_index("week"),
        Err(ExecError::UnknownGroupName("week".into()))
    );
    let mut m = re.new_matcher();
    assert!(m.execute_str("on 2024-03-09", MatchOptions::empty()));
    assert_eq!(m.named_str("year").unwrap(), "2024");
    assert_eq!(m.named_str("day").unwrap(), "09");
    // Unknown names fail whether or not the last run matched.
    assert!(!m.execute_str("no date", MatchOptions::empty()));
    assert!(m.named("week").is_err());
    assert_eq!(m.named_str("year").unwrap(), "");
}

#[test]
fn test_duplicate_names_need_option() {
    let err = Regex::new("(?<n>a)|(?<n>b)").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::DuplicateGroupName);
    let re = Regex::compile("(?<n>a)|(?<n>b)", CompileOptions::DUPNAMES).unwrap();
    assert_eq!(re.group_numbers("n").unwrap(), vec![1, 2]);
}

#[test]
fn test_double_release_is_safe() {
    let mut re = Regex::new("(a)").unwrap();
    let copy = re.clone();
    re.release();
    re.release();
    assert!(re.is_released());
    assert_eq!(re.groups(), 0);
    assert_eq!(re.exec(b"a", MatchOptions::empty()), Err(ExecError::Null));
    assert!(copy.is_match("a"));
}

#[test]
fn test_matcher_lifecycle() {
    let re = Regex::new("(\\d+)(x)?").unwrap();
    let mut m = Matcher::new();
    assert_eq!(m.state(), MatcherState::Unbound);
    m.bind(&re);
    assert_eq!(m.state(), MatcherState::Bound);
    assert!(m.execute(b"ab 42", MatchOptions::empty()));
    assert_eq!(m.state(), MatcherState::Matched);
    assert_eq!(m.group(1), b"42");
    assert!(!m.present(2));
    assert_eq!(m.extract(), [&b"42"[..], &b"42"[..], &b""[..]]);
    assert!(!m.execute(b"none", MatchOptions::empty()));
    assert_eq!(m.state(), MatcherState::NoMatch);
    assert!(m.extract().is_empty());
}

#[test]
fn test_matcher_constructed_by_regex() {
    let re = Regex::new("b+").unwrap();
    let m = re.matcher(b"abbbc", MatchOptions::empty());
    assert!(m.matches());
    assert_eq!(m.index(), Some((1, 4)));
}

#[test]
fn test_must_compile() {
    let re = Regex::must_compile("a+", CompileOptions::empty());
    assert!(re.is_match("caab"));
    let re = Regex::must_compile_and_study("a+", CompileOptions::empty(), StudyOptions::empty());
    assert!(re.study_data().is_some());
}

#[test]
#[should_panic(expected = "missing )")]
fn test_must_compile_panics() {
    Regex::must_compile("(", CompileOptions::empty());
}

#[test]
fn test_utf8_offsets_are_bytes() {
    let re = Regex::compile("é(.)", CompileOptions::UTF8).unwrap();
    assert_eq!(spans(&re, "caféü"), vec![Some((3, 7)), Some((5, 7))]);
    assert!(matches!(
        re.exec(b"caf\xc3", MatchOptions::empty()),
        Err(ExecError::BadUtf8 { offset: 3 })
    ));
}

#[test]
fn test_quote_meta_round_trip() {
    let text = "a.b*c(d)[e]$";
    let re = Regex::new(&Regex::quote_meta(text)).unwrap();
    assert_eq!(re.find(text), Some(text));
}

#[test]
fn test_split_and_func_replace() {
    let re = Regex::new("\\s*,\\s*").unwrap();
    assert_eq!(
        re.split("a , b,c", -1, MatchOptions::empty()).unwrap(),
        vec!["a", "b", "c"]
    );
    let re = Regex::new("\\d").unwrap();
    let doubled = re
        .replace_all_func("a1b2", MatchOptions::empty(), |d| d.repeat(2))
        .unwrap();
    assert_eq!(doubled, "a11b22");
}
