//! Runs a nibblevm program and dumps the final machine state.
//!
//! # Usage
//! ```text
//! nibblevm <source> [OPTIONS]
//! nibblevm -f <file.b4s> [OPTIONS]
//! nibblevm -i <image.b4> [OPTIONS]
//! ```
//!
//! After a successful run the register and the operand stack are printed to
//! stdout, top of stack first. Built-in output (`top`, `say`) is written to
//! stdout as the program runs.

use nibblevm::utils::log::{SHOW_TIMESTAMP, VERBOSE};
use nibblevm::virtual_machine::errors::VMError;
use nibblevm::virtual_machine::program::Program;
use nibblevm::virtual_machine::vm::{Limits, RunOutcome, Session};
use nibblevm::{debug, error, info};
use std::env;
use std::fs;
use std::io;
use std::process;
use std::sync::atomic::Ordering;

enum Input {
    Inline(String),
    File(String),
    Image(String),
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let mut input: Option<Input> = None;
    let mut limits = Limits::default();
    let mut disasm = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("-f" | "--file" | "-i" | "--image") => {
                let value = required_value(&args, &mut i, k);
                let next = if k == "-f" || k == "--file" {
                    Input::File(value)
                } else {
                    Input::Image(value)
                };
                set_input(&mut input, next);
            }
            k @ "--max-stack" => limits.stack = parse_limit(&args, &mut i, k),
            k @ "--max-frames" => limits.frames = parse_limit(&args, &mut i, k),
            "--disasm" | "-d" => {
                disasm = true;
                i += 1;
            }
            "--no-timestamps" => {
                SHOW_TIMESTAMP.store(false, Ordering::Relaxed);
                i += 1;
            }
            "--verbose" | "-v" => {
                VERBOSE.store(true, Ordering::Relaxed);
                i += 1;
            }
            other if other.starts_with("--") => {
                error!("Unknown option: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
            source => {
                set_input(&mut input, Input::Inline(source.to_string()));
                i += 1;
            }
        }
    }

    let Some(input) = input else {
        error!("No program given\n");
        print_usage(&args[0]);
        process::exit(1);
    };

    let mut session = Session::with_limits(limits);
    let program = match &input {
        Input::Inline(source) => session.assemble(source),
        Input::File(path) => session.assemble_file(path),
        Input::Image(path) => fs::read(path)
            .map_err(VMError::from)
            .and_then(|bytes| Program::from_bytes(&bytes)),
    };
    let program = match program {
        Ok(p) => p,
        Err(e) => {
            // Assembly errors were already reported with a source diagnostic.
            if e.source_offset().is_none() {
                error!("Failed to load program: {}", e);
            }
            process::exit(1);
        }
    };

    if disasm {
        print!("{}", program.disassemble());
        return;
    }

    let limits = session.limits();
    debug!(
        "Loaded {} instructions (stack {}, frames {})",
        program.len(),
        limits.stack,
        limits.frames
    );
    let names: Vec<String> = session
        .symbols()
        .iter()
        .map(|(id, name)| format!("{name}={id}"))
        .collect();
    debug!("Symbols: {}", names.join(" "));

    let stdout = io::stdout();
    let outcome = match session.run_program(&program, &mut stdout.lock()) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Execution failed: {}", e);
            process::exit(1);
        }
    };

    if outcome.halted {
        info!("Halted");
    }
    debug!(
        "{} instructions, {} calls, jump cache {} hits / {} misses",
        outcome.stats.instructions,
        outcome.stats.calls,
        outcome.stats.cache_hits,
        outcome.stats.cache_misses
    );
    print_state(&outcome);
}

fn print_state(outcome: &RunOutcome) {
    println!("A = {}", outcome.register);
    for (i, value) in outcome.stack_top_down().enumerate() {
        println!("st[{}] = {}", i, value);
    }
}

fn set_input(slot: &mut Option<Input>, input: Input) {
    if slot.is_some() {
        error!("Only one program may be given");
        process::exit(1);
    }
    *slot = Some(input);
}

fn required_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        error!("{flag} requires an argument");
        process::exit(1);
    }
    let value = args[*i].clone();
    *i += 1;
    value
}

fn parse_limit(args: &[String], i: &mut usize, flag: &str) -> usize {
    let value = required_value(args, i, flag);
    match value.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            error!("{flag} expects a positive integer, got {value}");
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
nibblevm

USAGE:
    {program} <source> [OPTIONS]
    {program} -f <file.b4s> [OPTIONS]
    {program} -i <image.b4> [OPTIONS]

ARGS:
    <source>    Program text to assemble and run

OPTIONS:
    -f, --file <file>       Assemble and run a source file
    -i, --image <file>      Run a compiled program image
    -d, --disasm            Print the disassembly instead of running
        --max-stack <n>     Operand stack capacity (default 1024)
        --max-frames <n>    Call depth limit (default 1024)
        --no-timestamps     Omit timestamps from log lines
    -v, --verbose           Log execution statistics
    -h, --help              Print this help message

EXAMPLES:
    # Print a string
    {program} \"'Hello, World!'.say\"

    # Count down a billion times
    {program} \"1000000000=?[]\"

    # Run a compiled image
    {program} -i hello.b4
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
