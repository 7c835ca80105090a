//! Studied and unstudied executions must agree, and simple patterns must
//! agree with the `regex` and `fancy-regex` crates.

use pcrex::{
    CompileOptions, ExecError, ExecLimits, ExecResult, MatchOptions, PartialMode, Regex,
    StudyOptions,
};

const PATTERNS: &[(&str, CompileOptions)] = &[
    ("abc", CompileOptions::empty()),
    ("a|ab", CompileOptions::empty()),
    ("(a+)(b*)c", CompileOptions::empty()),
    ("^(X)*ab(c)$", CompileOptions::empty()),
    ("\\w*", CompileOptions::empty()),
    ("x*y", CompileOptions::empty()),
    ("[aeiou]{2}", CompileOptions::empty()),
    ("hello", CompileOptions::CASELESS),
    ("^line", CompileOptions::MULTILINE),
    ("^line", CompileOptions::empty()),
    ("one$", CompileOptions::MULTILINE),
    ("\\bword\\b", CompileOptions::empty()),
    ("(?<=a)b", CompileOptions::empty()),
    ("(?!a)\\w", CompileOptions::empty()),
    ("(a)\\1", CompileOptions::empty()),
    ("(?:ab)+?c", CompileOptions::empty()),
    ("\\d{3}-\\d{4}", CompileOptions::empty()),
    ("[^a-z]+", CompileOptions::empty()),
    ("colou?r", CompileOptions::empty()),
    ("^\\s*#.*$", CompileOptions::MULTILINE),
    ("a.c", CompileOptions::DOTALL),
    ("a.c", CompileOptions::empty()),
    ("\\Aabc", CompileOptions::empty()),
    ("abc\\z", CompileOptions::empty()),
    ("(?>a+)b", CompileOptions::empty()),
    ("a++b", CompileOptions::empty()),
    ("\\R", CompileOptions::empty()),
    ("", CompileOptions::empty()),
    ("é+", CompileOptions::UTF8),
    ("[à-ÿ]+", CompileOptions::UTF8),
    ("\\w+", CompileOptions::UTF8.union(CompileOptions::UCP)),
    ("CAFÉ", CompileOptions::UTF8.union(CompileOptions::CASELESS)),
    ("b", CompileOptions::FIRSTLINE),
    ("ab", CompileOptions::ANCHORED),
    ("(?=abc)x", CompileOptions::empty()),
    ("(?!abc)x", CompileOptions::empty()),
    ("(?<=b)a", CompileOptions::empty()),
    ("(?:(a|b\\1)c)+", CompileOptions::empty()),
    ("(a)(?:b\\1)*", CompileOptions::empty()),
    ("k", CompileOptions::UTF8.union(CompileOptions::CASELESS)),
    ("(((a)))b", CompileOptions::empty()),
];

const SUBJECTS: &[&str] = &[
    "",
    "abc",
    "aab",
    "abcabc",
    "xxabc",
    "ab",
    "hello HELLO",
    "line one\nline two",
    "a word here",
    "ab ba",
    "aa",
    "ababc",
    "call 555-1234 now",
    "colour color",
    "  # comment\ncode",
    "a\nc",
    "aaab",
    "café éé",
    "\r\n",
    "xyz",
    "a\nb",
    "acbac",
    "abaaba",
    "K\u{212a}k",
];

const MODES: &[MatchOptions] = &[
    MatchOptions::empty(),
    MatchOptions::NOTEMPTY,
    MatchOptions::ANCHORED,
    MatchOptions::NOTBOL,
    MatchOptions::PARTIAL_SOFT,
    MatchOptions::PARTIAL_HARD,
];

fn study_for(options: MatchOptions) -> StudyOptions {
    if options.contains(MatchOptions::PARTIAL_HARD) {
        StudyOptions::JIT_PARTIAL_HARD_COMPILE
    } else if options.contains(MatchOptions::PARTIAL_SOFT) {
        StudyOptions::JIT_PARTIAL_SOFT_COMPILE
    } else {
        StudyOptions::empty()
    }
}

fn boundaries(subject: &str) -> impl Iterator<Item = usize> + '_ {
    (0..=subject.len()).filter(|&i| subject.is_char_boundary(i))
}

#[test]
fn test_study_does_not_change_results() {
    for &(pattern, compile) in PATTERNS {
        let plain = Regex::compile(pattern, compile).unwrap();
        let unoptimized = Regex::compile(pattern, compile | CompileOptions::NO_START_OPTIMIZE).unwrap();
        for &mode in MODES {
            let mut studied = plain.clone();
            studied.study(study_for(mode)).unwrap();
            for subject in SUBJECTS {
                for offset in boundaries(subject) {
                    let bytes = subject.as_bytes();
                    let expected = plain.exec_at(bytes, offset, mode);
                    let context = format!("{pattern:?} {compile:?} {mode:?} on {subject:?} at {offset}");
                    assert_eq!(studied.exec_at(bytes, offset, mode), expected, "studied {context}");
                    assert_eq!(
                        studied.exec_at(bytes, offset, mode | MatchOptions::NO_START_OPTIMIZE),
                        expected,
                        "no-start-optimize {context}"
                    );
                    assert_eq!(unoptimized.exec_at(bytes, offset, mode), expected, "unoptimized {context}");
                }
            }
        }
    }
}

#[test]
fn test_study_does_not_change_scans() {
    for &(pattern, compile) in PATTERNS {
        let plain = Regex::compile(pattern, compile).unwrap();
        let studied = Regex::compile_and_study(pattern, compile, StudyOptions::empty()).unwrap();
        for subject in SUBJECTS {
            assert_eq!(
                studied.captures_all(subject.as_bytes(), MatchOptions::empty()),
                plain.captures_all(subject.as_bytes(), MatchOptions::empty()),
                "{pattern:?} on {subject:?}"
            );
        }
    }
}

#[test]
fn test_leading_lookaround_partial_survives_study() {
    for (pattern, mode, study) in [
        ("(?=abc)x", MatchOptions::PARTIAL_SOFT, StudyOptions::JIT_PARTIAL_SOFT_COMPILE),
        ("(?!abc)x", MatchOptions::PARTIAL_SOFT, StudyOptions::JIT_PARTIAL_SOFT_COMPILE),
        ("(?=abc)x", MatchOptions::PARTIAL_HARD, StudyOptions::JIT_PARTIAL_HARD_COMPILE),
    ] {
        let plain = Regex::new(pattern).unwrap();
        let expected = plain.exec(b"ab", mode).unwrap();
        assert!(matches!(expected, ExecResult::Partial { start: 0, .. }), "{pattern:?} {mode:?}");
        let mut studied = plain.clone();
        studied.study(study).unwrap();
        assert_eq!(studied.exec(b"ab", mode).unwrap(), expected, "{pattern:?} {mode:?}");
    }
}

#[test]
fn test_mismatched_plan_is_ignored() {
    let plain = Regex::new("abcdef").unwrap();
    let mut studied = plain.clone();
    studied.study(StudyOptions::empty()).unwrap();
    assert_eq!(studied.study_data().unwrap().mode(), PartialMode::None);
    assert!(studied.study_data().unwrap().accelerates());

    // A full-match plan would reject this subject as too short.
    let partial = studied.exec(b"xabc", MatchOptions::PARTIAL_SOFT).unwrap();
    assert_eq!(partial, ExecResult::Partial { start: 1, end: 4 });
    assert_eq!(partial, plain.exec(b"xabc", MatchOptions::PARTIAL_SOFT).unwrap());

    studied.study(StudyOptions::JIT_PARTIAL_HARD_COMPILE).unwrap();
    assert_eq!(studied.study_data().unwrap().mode(), PartialMode::Hard);
    assert_eq!(studied.exec(b"xabc", MatchOptions::empty()).unwrap(), ExecResult::NoMatch);
}

#[test]
fn test_conflicting_study_modes_keep_previous_plan() {
    let mut re = Regex::new("abc").unwrap();
    re.study(StudyOptions::JIT_PARTIAL_SOFT_COMPILE).unwrap();
    let conflicting =
        StudyOptions::JIT_PARTIAL_SOFT_COMPILE | StudyOptions::JIT_PARTIAL_HARD_COMPILE;
    assert!(re.study(conflicting).is_err());
    assert_eq!(re.study_data().unwrap().mode(), PartialMode::Soft);

    let re = Regex::compile_and_study("abc", CompileOptions::empty(), conflicting).unwrap();
    assert!(re.study_data().is_none());
    assert!(re.is_match("xabc"));
}

#[test]
fn test_study_released_pattern() {
    let mut re = Regex::new("abc").unwrap();
    re.release();
    assert!(re.study(StudyOptions::empty()).is_err());
}

#[test]
fn test_match_limit() {
    let mut re = Regex::new("(a+)+b").unwrap();
    re.set_limits(ExecLimits {
        match_limit: 5_000,
        ..Default::default()
    });
    let subject = "a".repeat(30);
    assert_eq!(
        re.exec(subject.as_bytes(), MatchOptions::empty()),
        Err(ExecError::MatchLimit)
    );
    assert_eq!(ExecError::MatchLimit.code(), -8);
}

#[test]
fn test_depth_limit() {
    let mut re = Regex::new("(?:a|b)*c").unwrap();
    re.set_limits(ExecLimits {
        depth_limit: 16,
        ..Default::default()
    });
    let subject = "ab".repeat(100);
    assert_eq!(
        re.exec(subject.as_bytes(), MatchOptions::empty()),
        Err(ExecError::RecursionLimit)
    );
    re.set_limits(ExecLimits::default());
    assert_eq!(re.exec(subject.as_bytes(), MatchOptions::empty()), Ok(ExecResult::NoMatch));
}

fn ours(pattern: &str, subject: &str) -> Option<Vec<Option<(usize, usize)>>> {
    match Regex::new(pattern).unwrap().exec(subject.as_bytes(), MatchOptions::empty()) {
        Ok(ExecResult::Matched(spans)) => Some(spans),
        _ => None,
    }
}

#[test]
fn test_agrees_with_regex_crate() {
    let patterns = [
        "\\d+",
        "a|ab",
        "(a+)(b*)",
        "[a-z]+@[a-z]+\\.com",
        "(\\w+)\\s(\\w+)",
        "colou?r",
        "^abc",
        "x{2,3}",
        "(?i)hello",
        "[^aeiou ]+",
        "(a|b)*c",
        "a*?b",
        "(?:(\\d)|(x))+",
    ];
    let subjects = [
        "abc",
        "mail bob@example.com today",
        "hello World",
        "xxxx",
        "ababc",
        "colour",
        "HeLLo",
        "12x3",
        "",
    ];
    for pattern in patterns {
        let oracle = regex::Regex::new(pattern).unwrap();
        for subject in subjects {
            let expected = oracle.captures(subject).map(|caps| {
                (0..caps.len())
                    .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                    .collect::<Vec<_>>()
            });
            assert_eq!(ours(pattern, subject), expected, "{pattern:?} on {subject:?}");
        }
    }
}

#[test]
fn test_agrees_with_fancy_regex() {
    let patterns = [
        "(\\w)\\1",
        "(?<=@)\\w+",
        "\\w+(?=!)",
        "\\b(?!un)\\w+ed\\b",
        "(?>a+)b",
        "(?<!x)y",
    ];
    let subjects = ["hello!", "see @home", "undone tried", "aaab", "xy zy", "book"];
    for pattern in patterns {
        let oracle = fancy_regex::Regex::new(pattern).unwrap();
        for subject in subjects {
            let expected = oracle.captures(subject).unwrap().map(|caps| {
                (0..caps.len())
                    .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
                    .collect::<Vec<_>>()
            });
            assert_eq!(ours(pattern, subject), expected, "{pattern:?} on {subject:?}");
        }
    }
}
