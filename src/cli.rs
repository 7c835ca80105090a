//! CLI interface using clap
//!
//! Defines the command-line arguments and one handler per subcommand. The
//! handlers only go through the public engine API.

use std::io::{self, IsTerminal, Read};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use pcrex::output::json::{render, Layout};
use pcrex::output::text::{
    format_exec_result, format_replace_result, format_test_result, format_validate_result,
};
use pcrex::output::{
    Capture, ExecOutput, Match, ReplaceResult, TestResult, ValidateResult, ValidationError,
};
use pcrex::{CompileOptions, MatchOptions, MatcherState, Regex, StudyOptions};

#[derive(Parser)]
#[command(name = "pcrex")]
#[command(author, version, about = "Perl-compatible regular expressions: test, exec, replace, validate.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub flags: PatternFlags,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output (default)
    Json,
    /// Human-readable text
    Text,
}

/// Compile flags shared by every subcommand
#[derive(Args, Clone, Copy, Default)]
pub struct PatternFlags {
    /// Case-insensitive matching
    #[arg(long, short = 'i', global = true)]
    pub caseless: bool,

    /// ^ and $ match at internal newlines
    #[arg(long, short = 'm', global = true)]
    pub multiline: bool,

    /// Dot matches newline
    #[arg(long, short = 's', global = true)]
    pub dotall: bool,

    /// Ignore whitespace and # comments in the pattern
    #[arg(long, short = 'x', global = true)]
    pub extended: bool,

    /// Treat pattern and input as UTF-8
    #[arg(long, short = 'u', global = true)]
    pub utf8: bool,

    /// Study the pattern before matching
    #[arg(long, global = true)]
    pub study: bool,
}

impl PatternFlags {
    pub fn compile_options(self) -> CompileOptions {
        let mut options = CompileOptions::empty();
        options.set(CompileOptions::CASELESS, self.caseless);
        options.set(CompileOptions::MULTILINE, self.multiline);
        options.set(CompileOptions::DOTALL, self.dotall);
        options.set(CompileOptions::EXTENDED, self.extended);
        options.set(CompileOptions::UTF8, self.utf8);
        options
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every match of a pattern with its captures
    Test {
        /// The pattern to test
        pattern: String,

        /// Input text (read from stdin when omitted)
        input: Option<String>,

        /// Maximum number of matches to return
        #[arg(long, default_value = "100")]
        max_matches: usize,
    },

    /// Run a single match and report its state
    Exec {
        /// The pattern to run
        pattern: String,

        /// Input text (read from stdin when omitted)
        input: Option<String>,

        /// Report a partial match when no full match exists
        #[arg(long, conflicts_with = "hard")]
        soft: bool,

        /// Report a partial match as soon as one is found
        #[arg(long)]
        hard: bool,

        /// Only match at the start of the input
        #[arg(long)]
        anchored: bool,

        /// Reject empty matches
        #[arg(long)]
        notempty: bool,
    },

    /// Replace every match
    Replace {
        /// The pattern
        pattern: String,

        /// The replacement text
        replacement: String,

        /// Input text (read from stdin when omitted)
        input: Option<String>,

        /// Expand $1, ${name} and $$ in the replacement
        #[arg(long, short = 't')]
        template: bool,
    },

    /// Check that a pattern compiles and describe its groups
    Validate {
        /// The pattern to validate
        pattern: String,
    },
}

/// Parse CLI arguments
pub fn parse() -> Cli {
    Cli::parse()
}

fn compile(pattern: &str, flags: PatternFlags) -> Result<Regex> {
    let options = flags.compile_options();
    let regex = if flags.study {
        Regex::compile_and_study(pattern, options, StudyOptions::empty())?
    } else {
        Regex::compile(pattern, options)?
    };
    Ok(regex)
}

/// Use `input` if given, otherwise read all of stdin.
fn read_input(input: Option<&str>, hint: &str) -> Result<String> {
    if let Some(text) = input {
        return Ok(text.to_string());
    }
    if io::stdin().is_terminal() {
        eprintln!("pcrex: reading from stdin (pipe data or press Ctrl-D when done)");
        eprintln!("  hint: {hint}");
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}

fn captures_of(
    subject: &str,
    spans: &[Option<(usize, usize)>],
    names: &[String],
) -> Vec<Capture> {
    spans
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(group, span)| {
            let (start, end) = (*span)?;
            Some(Capture {
                group,
                name: names.get(group).filter(|n| !n.is_empty()).cloned(),
                text: slice(subject, start, end),
                start,
                end,
            })
        })
        .collect()
}

fn slice(subject: &str, start: usize, end: usize) -> String {
    String::from_utf8_lossy(&subject.as_bytes()[start..end]).into_owned()
}

/// Handle the test command
pub fn handle_test(
    pattern: &str,
    input: Option<&str>,
    max_matches: usize,
    flags: PatternFlags,
    format: OutputFormat,
) -> Result<String> {
    let regex = compile(pattern, flags)?;
    let text = read_input(input, &format!("pcrex test '{pattern}' \"text\""))?;
    let names = regex.group_names();

    let started = Instant::now();
    let all = regex.captures_all(text.as_bytes(), MatchOptions::empty())?;
    let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    let matches: Vec<Match> = all
        .iter()
        .take(max_matches)
        .filter_map(|spans| {
            let (start, end) = spans.first().copied().flatten()?;
            Some(Match {
                text: slice(&text, start, end),
                start,
                end,
                captures: captures_of(&text, spans, &names),
            })
        })
        .collect();

    let result = TestResult {
        pattern: pattern.to_string(),
        studied: regex.study_data().is_some(),
        groups: regex.groups(),
        input_length: text.len(),
        matched: !matches.is_empty(),
        match_count: matches.len(),
        matches,
        elapsed_us,
    };

    match format {
        OutputFormat::Json => Ok(render(&result, Layout::Pretty)),
        OutputFormat::Text => Ok(format_test_result(&result)),
    }
}

/// Match-time flags of the exec command
#[derive(Clone, Copy, Default)]
pub struct ExecFlags {
    pub soft: bool,
    pub hard: bool,
    pub anchored: bool,
    pub notempty: bool,
}

impl ExecFlags {
    fn match_options(self) -> MatchOptions {
        let mut options = MatchOptions::empty();
        options.set(MatchOptions::PARTIAL_SOFT, self.soft);
        options.set(MatchOptions::PARTIAL_HARD, self.hard);
        options.set(MatchOptions::ANCHORED, self.anchored);
        options.set(MatchOptions::NOTEMPTY, self.notempty);
        options
    }

    fn study_options(self) -> StudyOptions {
        if self.hard {
            StudyOptions::JIT_PARTIAL_HARD_COMPILE
        } else if self.soft {
            StudyOptions::JIT_PARTIAL_SOFT_COMPILE
        } else {
            StudyOptions::empty()
        }
    }
}

/// Handle the exec command
pub fn handle_exec(
    pattern: &str,
    input: Option<&str>,
    exec: ExecFlags,
    flags: PatternFlags,
    format: OutputFormat,
) -> Result<String> {
    let mut regex = Regex::compile(pattern, flags.compile_options())?;
    if flags.study {
        regex.study(exec.study_options())?;
    }
    let text = read_input(input, &format!("pcrex exec '{pattern}' \"text\""))?;

    let mut matcher = regex.new_matcher();
    matcher.execute_str(&text, exec.match_options());
    if let Some(err) = matcher.err() {
        return Err(err.clone().into());
    }

    let state = match matcher.state() {
        MatcherState::Matched => "matched",
        MatcherState::Partial => "partial",
        _ => "no_match",
    };
    let names = regex.group_names();
    let spans: Vec<_> = (0..=matcher.groups())
        .map(|g| matcher.group_indices(g))
        .collect();
    let result = ExecOutput {
        pattern: pattern.to_string(),
        state: state.to_string(),
        code: matcher.code(),
        span: matcher.index(),
        text: matcher.index().map(|(start, end)| slice(&text, start, end)),
        captures: captures_of(&text, &spans, &names),
    };

    match format {
        OutputFormat::Json => Ok(render(&result, Layout::Pretty)),
        OutputFormat::Text => Ok(format_exec_result(&result)),
    }
}

/// Handle the replace command
pub fn handle_replace(
    pattern: &str,
    replacement: &str,
    input: Option<&str>,
    template: bool,
    flags: PatternFlags,
    format: OutputFormat,
) -> Result<String> {
    let regex = compile(pattern, flags)?;
    let text = read_input(
        input,
        &format!("pcrex replace '{pattern}' '{replacement}' \"text\""),
    )?;

    let (replaced, replacements_made) =
        regex.replace_all_counted(&text, replacement, template, MatchOptions::empty())?;

    let result = ReplaceResult {
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
        template,
        original: text,
        result: replaced,
        replacements_made,
    };

    match format {
        OutputFormat::Json => Ok(render(&result, Layout::Pretty)),
        OutputFormat::Text => Ok(format_replace_result(&result)),
    }
}

/// Distinct group names in group order.
fn named_groups(regex: &Regex) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in regex.group_names() {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Handle the validate command. An invalid pattern is a result, not a failure.
pub fn handle_validate(pattern: &str, flags: PatternFlags, format: OutputFormat) -> Result<String> {
    let result = match Regex::compile(pattern, flags.compile_options()) {
        Ok(regex) => {
            let (prefix, _) = regex.literal_prefix();
            ValidateResult {
                pattern: pattern.to_string(),
                valid: true,
                groups: Some(regex.groups()),
                names: named_groups(&regex),
                literal_prefix: (!prefix.is_empty()).then_some(prefix),
                error: None,
            }
        }
        Err(e) => ValidateResult {
            pattern: pattern.to_string(),
            valid: false,
            groups: None,
            names: Vec::new(),
            literal_prefix: None,
            error: Some(ValidationError {
                kind: format!("{:?}", e.kind),
                position: e.offset,
                message: e.message,
            }),
        },
    };

    match format {
        OutputFormat::Json => Ok(render(&result, Layout::Pretty)),
        OutputFormat::Text => Ok(format_validate_result(&result)),
    }
}
