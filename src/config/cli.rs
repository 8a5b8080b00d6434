//! Command-line argument parser
//!
//! Parses command-line arguments for the loopguard binary.

use std::path::PathBuf;
use std::process;

/// Command-line arguments for loopguard
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Script file to instrument
    pub script: Option<PathBuf>,

    /// Watchdog timeout in milliseconds
    pub timeout: Option<u64>,

    /// Message to report when a loop is broken
    pub message: Option<String>,

    /// Callback source text to invoke when a loop is broken
    pub callback: Option<String>,

    /// Where to write the instrumented source (stdout if absent)
    pub output: Option<PathBuf>,

    /// Execute the instrumented script after rewriting it
    pub run: bool,
}

/// Parse command-line arguments from the process environment
pub fn parse_cli_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    parse_args(args)
}

/// Parse an explicit argument list
pub fn parse_args(args: Vec<String>) -> CliArgs {
    let mut cli_args = CliArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--version" | "-v" => {
                println!("loopguard {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "--timeout" | "-t" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<u64>() {
                        Ok(timeout) => cli_args.timeout = Some(timeout),
                        Err(_) => {
                            eprintln!("Error: invalid value for --timeout: {}", args[i + 1]);
                            process::exit(1);
                        }
                    }
                    i += 2;
                } else {
                    eprintln!("Error: missing argument for --timeout");
                    process::exit(1);
                }
            }
            "--message" | "-m" => {
                if i + 1 < args.len() {
                    cli_args.message = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: missing argument for --message");
                    process::exit(1);
                }
            }
            "--callback" | "-c" => {
                if i + 1 < args.len() {
                    cli_args.callback = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: missing argument for --callback");
                    process::exit(1);
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    cli_args.output = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("Error: missing argument for --output");
                    process::exit(1);
                }
            }
            "--run" => {
                cli_args.run = true;
                i += 1;
            }
            other if other.starts_with('-') => {
                eprintln!("Error: unknown option '{}'", other);
                process::exit(1);
            }
            _ => {
                if cli_args.script.is_some() {
                    eprintln!("Error: more than one script file given");
                    process::exit(1);
                }
                cli_args.script = Some(PathBuf::from(&args[i]));
                i += 1;
            }
        }
    }

    cli_args
}

/// Print usage information
fn print_help() {
    println!("loopguard {} - loop watchdog instrumentation for sandboxed scripts", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: loopguard [options] <script>");
    println!();
    println!("Options:");
    println!("  -t, --timeout <millis>   Watchdog timeout in milliseconds (default 2000)");
    println!("  -m, --message <text>     Report this message when a loop is broken");
    println!("  -c, --callback <source>  Invoke this callable with (line, column) instead");
    println!("  -o, --output <file>      Write instrumented source to a file");
    println!("      --run                Execute the instrumented script");
    println!("  -h, --help               Show this help");
    println!("  -v, --version            Show the version");
}
