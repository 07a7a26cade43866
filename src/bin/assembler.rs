//! Source to program image compiler CLI.
//!
//! Reads a source file and writes the packed program image.
//!
//! # Usage
//! ```text
//! assembler <input.b4s> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.b4s`: Source file to assemble
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.b4`)
//! - `-d, --disasm`: Print the disassembly after writing the image
//! - `--no-timestamps`: Omit timestamps from log lines
//!
//! # Examples
//! ```text
//! assembler hello.b4s
//! assembler hello.b4s -o out/hello.b4
//! ```

use nibblevm::utils::log::SHOW_TIMESTAMP;
use nibblevm::virtual_machine::assembler::assemble_file;
use nibblevm::{error, info};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::atomic::Ordering;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut disasm = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--disasm" | "-d" => {
                disasm = true;
                i += 1;
            }
            "--no-timestamps" => {
                SHOW_TIMESTAMP.store(false, Ordering::Relaxed);
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.b4", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let program = match assemble_file(input_path) {
        Ok(p) => p,
        Err(e) => {
            error!("Assembly failed: {}", e);
            process::exit(1);
        }
    };

    let image = program.to_bytes();

    if let Err(e) = fs::write(&output_path, &image) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} instructions in {} code bytes, {} byte image)",
        input_path,
        output_path,
        program.len(),
        program.as_bytes().len(),
        image.len()
    );

    if disasm {
        print!("{}", program.disassemble());
    }
}

const USAGE: &str = "\
Program Assembler

USAGE:
    {program} <input.b4s> [OPTIONS]

ARGS:
    <input.b4s>    Source file to assemble

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.b4)
    -d, --disasm            Print the disassembly after writing the image
        --no-timestamps     Omit timestamps from log lines
    -h, --help              Print this help message

EXAMPLES:
    # Assemble to default output name
    {program} hello.b4s

    # Assemble with explicit output
    {program} hello.b4s -o out/hello.b4
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
