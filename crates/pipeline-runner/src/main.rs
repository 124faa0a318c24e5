//! CLI entry point for the pipeline runner binary.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use pipeline_core::{Machine, MachineConfig, RegisterClass};
use pipeline_runner::demo::demo_program;
use pipeline_runner::errors::format_fault_for_stderr;
use pipeline_runner::loader::load_program;
use pipeline_runner::parser::LoadedProgram;
use pipeline_runner::printer::ConsoleTracer;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: pipeline-run <command>

Commands:
  run   <input>  Execute a program and print every retirement
  check <input>  Load and tokenize a program without running it
  demo           Execute the built-in demonstration program

Options:
  -h, --help     Show this help message

Programs hold one instruction per line. Text after ';' is a comment.
Set RUST_LOG (e.g. RUST_LOG=debug) for diagnostic logging on stderr.

Examples:
  pipeline-run run program.p86
  pipeline-run demo
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(InputArgs),
    Check(InputArgs),
    Demo,
}

#[derive(Debug, PartialEq, Eq)]
struct InputArgs {
    input: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_input_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "check" => parse_input_args(args)
            .map(Command::Check)
            .map(ParseResult::Command),
        "demo" => parse_demo_args(args).map(|()| ParseResult::Command(Command::Demo)),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_input_args(args: impl Iterator<Item = OsString>) -> Result<InputArgs, String> {
    let mut input: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(InputArgs { input })
}

fn parse_demo_args(mut args: impl Iterator<Item = OsString>) -> Result<(), String> {
    match args.next() {
        None => Ok(()),
        Some(arg) if arg == "--help" || arg == "-h" => Err(USAGE_TEXT.to_string()),
        Some(arg) => Err(format!("unexpected argument: {}", arg.to_string_lossy())),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load(args: &InputArgs) -> Result<LoadedProgram, i32> {
    load_program(&args.input).map_err(|error| {
        eprintln!("{}", error.format_for_stderr());
        1
    })
}

fn run_check(args: &InputArgs) -> Result<(), i32> {
    let loaded = load(args)?;
    println!(
        "{}: {} instructions",
        args.input.display(),
        loaded.program.len()
    );
    Ok(())
}

fn run_file(args: &InputArgs) -> Result<(), i32> {
    execute(&load(args)?)
}

fn run_demo() -> Result<(), i32> {
    let loaded = demo_program().map_err(|error| {
        eprintln!("error: {error}");
        1
    })?;
    execute(&loaded)
}

fn execute(loaded: &LoadedProgram) -> Result<(), i32> {
    let mut machine = Machine::new(loaded.program.clone(), MachineConfig::default());
    let mut tracer = ConsoleTracer::new(io::BufWriter::new(io::stdout()));
    let result = machine.run_traced(&mut tracer);
    let fault_address = tracer.fault_address();
    if let Err(error) = tracer.finish() {
        eprintln!("error: failed to write trace: {error}");
        return Err(1);
    }

    print_final_registers(&machine);

    result.map(|_| ()).map_err(|fault| {
        let location = fault_address.and_then(|address| loaded.location_of(address));
        eprintln!("{}", format_fault_for_stderr(&fault, location));
        1
    })
}

fn print_final_registers(machine: &Machine) {
    let line = machine
        .registers()
        .class(RegisterClass::Execution)
        .map(|(reg, value)| format!("{}={value}", reg.name()))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{line}");
}

fn main() {
    init_logging();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => match run_file(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Check(args))) => match run_check(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Demo)) => match run_demo() {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn os(args: &[&str]) -> impl Iterator<Item = OsString> {
        args.iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_run_command() {
        let result = parse_args(os(&["run", "program.p86"])).expect("valid run args should parse");
        assert!(matches!(
            result,
            ParseResult::Command(Command::Run(InputArgs { input })) if input == PathBuf::from("program.p86")
        ));
    }

    #[test]
    fn parses_check_command() {
        let result = parse_input_args(os(&["program.p86"])).expect("valid check args should parse");
        assert_eq!(
            result,
            InputArgs {
                input: PathBuf::from("program.p86"),
            }
        );
    }

    #[test]
    fn parses_demo_command() {
        let result = parse_args(os(&["demo"])).expect("demo should parse");
        assert!(matches!(result, ParseResult::Command(Command::Demo)));
    }

    #[test]
    fn demo_rejects_arguments() {
        let error = parse_args(os(&["demo", "extra.p86"])).expect_err("demo takes no input");
        assert!(error.contains("unexpected argument"));
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args(os(&["--help"])).expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_command() {
        let error = parse_args(os(&["assemble"])).expect_err("unknown command should fail parse");
        assert!(error.contains("unknown command"));
    }

    #[test]
    fn run_requires_input() {
        let error = parse_input_args(std::iter::empty()).expect_err("missing input should fail");
        assert!(error.contains("missing input"));
    }

    #[test]
    fn run_rejects_two_inputs() {
        let error = parse_input_args(os(&["a.p86", "b.p86"])).expect_err("one input only");
        assert!(error.contains("multiple input paths"));
    }

    #[test]
    fn run_rejects_options() {
        for flag in ["--trace", "--step-limit", "-q"] {
            let error = parse_args(os(&["run", "a.p86", flag])).expect_err("no run options");
            assert_eq!(error, format!("unknown option: {flag}"));
        }
    }
}
