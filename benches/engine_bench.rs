//! Benchmarks for compile, study and match throughput

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pcrex::{CompileOptions, MatchOptions, Regex, StudyOptions};

fn bench_simple_pattern(c: &mut Criterion) {
    let input = "The answer is 42 and the question is 6 times 7";
    let re = Regex::new(r"\d+").unwrap();

    c.bench_function("simple_pattern_scan", |b| {
        b.iter(|| {
            let found = re.find_all_bytes(black_box(input.as_bytes()), MatchOptions::empty());
            black_box(found)
        })
    });
}

fn bench_email_pattern(c: &mut Criterion) {
    let pattern = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
    let input = "Contact us at support@example.com or sales@company.org for more info.";
    let re = Regex::new(pattern).unwrap();

    c.bench_function("email_pattern_scan", |b| {
        b.iter(|| {
            let found = re.find_all(black_box(input), MatchOptions::empty());
            black_box(found)
        })
    });
}

fn bench_capture_groups(c: &mut Criterion) {
    let input = "Dates: 2024-01-15, 2024-02-20, 2024-03-25, 2024-04-30";
    let re = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();

    c.bench_function("capture_groups", |b| {
        b.iter(|| {
            let caps = re.captures_all(black_box(input.as_bytes()), MatchOptions::empty());
            black_box(caps)
        })
    });
}

fn bench_matcher_reuse(c: &mut Criterion) {
    let re = Regex::new(r"(?<key>\w+)=(?<value>\w+)").unwrap();
    let lines: Vec<String> = (0..100).map(|i| format!("  key{i}=value{i}")).collect();

    c.bench_function("matcher_reuse_100_lines", |b| {
        b.iter(|| {
            let mut m = re.new_matcher();
            let mut hits = 0;
            for line in &lines {
                if m.execute_str(black_box(line), MatchOptions::empty()) {
                    hits += m.named_str("value").map_or(0, str::len);
                }
            }
            black_box(hits)
        })
    });
}

fn bench_study(c: &mut Criterion) {
    let input = format!("{}needle", "haystack ".repeat(2000));
    let pattern = "n[aeiou]+dle";
    let plain = Regex::new(pattern).unwrap();
    let studied =
        Regex::compile_and_study(pattern, CompileOptions::empty(), StudyOptions::empty()).unwrap();

    let mut group = c.benchmark_group("study");
    for (name, re) in [("unstudied", &plain), ("studied", &studied)] {
        group.bench_with_input(BenchmarkId::new("search", name), re, |b, re| {
            b.iter(|| black_box(re.exec(black_box(input.as_bytes()), MatchOptions::empty())))
        });
    }
    group.finish();
}

fn bench_large_input(c: &mut Criterion) {
    let input = "word ".repeat(10000);
    let re = Regex::new(r"\b\w+\b").unwrap();

    c.bench_function("large_input_10k_words", |b| {
        b.iter(|| {
            let found = re.find_all_bytes(black_box(input.as_bytes()), MatchOptions::empty());
            black_box(found)
        })
    });
}

fn bench_pattern_compilation(c: &mut Criterion) {
    let patterns = vec![
        r"\d+",
        r"\b[A-Za-z]+\b",
        r"(\d{4})-(\d{2})-(\d{2})",
        r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}",
        r"(?<=\$)\d+(?:\.\d\d)?",
    ];

    let mut group = c.benchmark_group("pattern_compilation");
    for pattern in patterns {
        group.bench_with_input(BenchmarkId::new("compile", pattern), pattern, |b, p| {
            b.iter(|| {
                let re = Regex::new(black_box(p)).unwrap();
                black_box(re)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_simple_pattern,
    bench_email_pattern,
    bench_capture_groups,
    bench_matcher_reuse,
    bench_study,
    bench_large_input,
    bench_pattern_compilation,
);

criterion_main!(benches);
