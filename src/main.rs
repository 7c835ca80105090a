//! pcrex - Perl-compatible regular expressions from the command line

mod cli;

use std::process::ExitCode;

use pcrex::output::error_codes;
use pcrex::output::json::{render, Layout};
use pcrex::output::ErrorResponse;
use pcrex::{CompileError, ExecError};

fn main() -> ExitCode {
    use cli::{parse, Commands, ExecFlags};

    env_logger::init();
    let args = parse();

    let Some(command) = args.command else {
        eprintln!("pcrex: Perl-compatible regular expressions");
        eprintln!();
        eprintln!("Usage: pcrex <COMMAND>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  test      List every match of a pattern with its captures");
        eprintln!("  exec      Run a single match and report its state");
        eprintln!("  replace   Replace every match");
        eprintln!("  validate  Check that a pattern compiles and describe its groups");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -f, --format <FORMAT>  Output format [json|text] (default: json)");
        eprintln!("  -i -m -s -x -u         Caseless, multiline, dotall, extended, UTF-8");
        eprintln!("  --study                Study the pattern before matching");
        eprintln!("  -h, --help             Print help");
        eprintln!("  -V, --version          Print version");
        return ExitCode::SUCCESS;
    };

    let format = args.format;
    let flags = args.flags;

    let result = match command {
        Commands::Test {
            pattern,
            input,
            max_matches,
        } => cli::handle_test(&pattern, input.as_deref(), max_matches, flags, format),

        Commands::Exec {
            pattern,
            input,
            soft,
            hard,
            anchored,
            notempty,
        } => cli::handle_exec(
            &pattern,
            input.as_deref(),
            ExecFlags {
                soft,
                hard,
                anchored,
                notempty,
            },
            flags,
            format,
        ),

        Commands::Replace {
            pattern,
            replacement,
            input,
            template,
        } => cli::handle_replace(
            &pattern,
            &replacement,
            input.as_deref(),
            template,
            flags,
            format,
        ),

        Commands::Validate { pattern } => cli::handle_validate(&pattern, flags, format),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", render(&error_response(&e), Layout::Line));
            ExitCode::FAILURE
        }
    }
}

/// Map a command failure to the structured error printed on stderr.
fn error_response(e: &anyhow::Error) -> ErrorResponse {
    if let Some(compile) = e.downcast_ref::<CompileError>() {
        return ErrorResponse::new(error_codes::INVALID_PATTERN, &compile.message)
            .with_position(compile.offset);
    }
    if e.downcast_ref::<ExecError>().is_some() {
        return ErrorResponse::new(error_codes::EXEC_ERROR, e.to_string());
    }
    if e.downcast_ref::<std::io::Error>().is_some() {
        return ErrorResponse::new(error_codes::INVALID_INPUT, format!("{e:#}"));
    }
    ErrorResponse::new(error_codes::COMMAND_ERROR, format!("{e:#}"))
}
