//! Loopguard - loop watchdog instrumentation for sandboxed scripts
//!
//! This is the main entry point for the loopguard command-line tool.

use std::fs;
use std::process;
use std::rc::Rc;

use loopguard::config::{self, parse_cli_args};
use loopguard::{GuardError, Instrumenter, Interpreter, Result, SystemHost};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_cli_args();

    let script_path = match &args.script {
        Some(path) => path.clone(),
        None => {
            return Err(GuardError::Io(
                "no script file given (see --help)".to_string(),
            ))
        }
    };

    let config = config::config_from_args(&args)?;
    let source = fs::read_to_string(&script_path)?;

    let mut instrumenter = Instrumenter::new(config)?;
    let instrumented = instrumenter.run(&source)?;

    if let Some(output) = &args.output {
        fs::write(output, &instrumented)?;
        eprintln!("Wrote instrumented script to {}", output.display());
    } else if !args.run {
        print!("{}", instrumented);
    }

    if args.run {
        let host = Rc::new(SystemHost::new());
        let mut interpreter = Interpreter::new(host);
        interpreter.run(&instrumented)?;
    }

    Ok(())
}
