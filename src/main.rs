//! argcheck CLI - debugging driver
//!
//! Commands:
//!   parse    - Parse format strings from stdin and print their constraints
//!   check    - Compare a source string with its translation
//!   schema   - Print the JSON schema of the config file

use argcheck::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "parse" => cmd_parse(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "schema" => cmd_schema(),
        "version" | "--version" | "-v" => {
            println!("argcheck {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
argcheck - D format string checker

USAGE:
    argcheck <COMMAND> [OPTIONS]

COMMANDS:
    parse [--json] [--marks]            Parse format strings from stdin, one per line
    check <msgid> <msgstr> [--lax]      Check a translation against its source string
    schema                              Print JSON schema of argcheck.yaml
    version                             Print version

OPTIONS:
    --config <file>                     Load settings from a YAML file
                                        (default: ./argcheck.yaml if present)
    --json                              JSON output (parse)
    --marks                             Print directive markers (parse)
    --lax                               Ask for a subset check instead of equivalence;
                                        only honoured with equality_policy: caller_decides

ENVIRONMENT:
    RUST_LOG                            Log filter (default: warn)

EXAMPLES:
    printf '%%d files\n%%1$s and %%2$s\n' | argcheck parse
    argcheck check '%d files' '%s Dateien'
"#
    );
}

fn cmd_parse(args: &[String]) -> Result<()> {
    let json_output = args.contains(&"--json".to_string());
    let show_marks = args.contains(&"--marks".to_string());
    let parser = DFormat::new(load_config(args)?);

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        let outcome = parser.parse(&line, false);

        if json_output {
            let value = match &outcome.result {
                Ok(spec) => serde_json::json!({
                    "input": line,
                    "valid": true,
                    "spec": spec,
                    "marks": outcome.marks,
                }),
                Err(e) => serde_json::json!({
                    "input": line,
                    "valid": false,
                    "reason": e.to_string(),
                    "offset": e.offset,
                    "marks": outcome.marks,
                }),
            };
            writeln!(out, "{}", serde_json::to_string(&value)?)?;
            continue;
        }

        match &outcome.result {
            Ok(spec) => writeln!(out, "{}", spec.list())?,
            Err(e) => writeln!(out, "INVALID: {}", e)?,
        }
        if show_marks {
            writeln!(out, "  {}", render_marks(&line, &outcome.marks))?;
        }
    }
    Ok(())
}

/// One indicator character per input byte: `<` directive start, `>`
/// directive end, `!` error.
fn render_marks(line: &str, marks: &[DirectiveMark]) -> String {
    let mut indicator = vec![b' '; line.len()];
    for mark in marks {
        if let Some(slot) = indicator.get_mut(mark.offset) {
            *slot = match mark.kind {
                MarkKind::Start => b'<',
                MarkKind::End => b'>',
                MarkKind::Error => b'!',
            };
        }
    }
    String::from_utf8_lossy(&indicator).trim_end().to_string()
}

fn cmd_check(args: &[String]) -> Result<()> {
    let positional: Vec<&String> = positional_args(args);
    if positional.len() < 2 {
        return Err("Usage: argcheck check <msgid> <msgstr> [--lax]".into());
    }
    let msgid = positional[0];
    let msgstr = positional[1];
    let lax = args.contains(&"--lax".to_string());
    let parser = DFormat::new(load_config(args)?);

    let spec1 = parser.parse(msgid, false).into_result()?;
    let spec2 = parser.parse(msgstr, true).into_result()?;

    let mut logger = |d: &CheckDiagnostic| eprintln!("{}", d);
    if parser.check(&spec1, &spec2, !lax, Some(&mut logger), msgid, msgstr) {
        Err("Check failed".into())
    } else {
        println!("OK");
        Ok(())
    }
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(CheckerConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Arguments that are neither flags nor flag values
fn positional_args(args: &[String]) -> Vec<&String> {
    let mut result = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
        } else if arg == "--config" {
            skip_next = true;
        } else if !arg.starts_with("--") {
            result.push(arg);
        }
    }
    result
}

fn load_config(args: &[String]) -> Result<CheckerConfig> {
    let explicit = args
        .iter()
        .position(|a| a == "--config")
        .map(|i| {
            args.get(i + 1)
                .map(PathBuf::from)
                .ok_or_else(|| Error::from("--config needs a file argument"))
        })
        .transpose()?;

    match explicit {
        Some(path) => CheckerConfig::load_file(&path),
        None => Ok(CheckerConfig::load_from_dir(&std::env::current_dir()?)?.unwrap_or_default()),
    }
}
