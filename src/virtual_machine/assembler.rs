//! Source text to packed instruction stream.
//!
//! The language has one character per instruction. The assembler scans the
//! source once, left to right, and emits nibbles as it goes.
//!
//! # Syntax
//!
//! ```text
//! 'Hello, World!'.say     strings push a 0 terminator, then one literal per byte
//! ?4=1[top.1+]            digits are decimal literals, names are literals of their id
//! neg:?-: 4.neg           `.name` pushes the id and calls it
//! ```
//!
//! - Whitespace is ignored.
//! - A run of decimal digits is one literal of any length.
//! - An identifier (`[A-Za-z_][A-Za-z0-9_]*`) is interned into the symbol
//!   table and emitted as a literal of its id. Directly after `.`, the
//!   literal is followed by a `Call`.
//! - `'...'` emits literal `0` then one literal per byte; `\` escapes the
//!   next byte.
//! - `%` duplicates the top value (`0$`).
//! - Every other instruction is its punctuation character (see [`isa`](super::isa)).

use crate::error;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::{Program, ProgramBuilder};
use crate::virtual_machine::symbols::SymbolTable;
use crate::virtual_machine::vm::Session;
use std::fmt::Write;
use std::path::Path;

const QUOTE: u8 = b'\'';
const ESCAPE: u8 = b'\\';
const DUP: u8 = b'%';

/// Converts a source byte offset to a 1-based `(line, column)` pair.
fn line_and_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Formats a compiler-style diagnostic for assembly failures.
fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    column: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(column.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    diag
}

/// Logs a caret diagnostic for errors that carry a source offset.
fn log_assembly_error(file: &str, source: &str, err: &VMError) {
    if let Some(offset) = err.source_offset() {
        let (line, column) = line_and_column(source, offset);
        error!(
            "{}",
            render_assembly_diagnostic(file, source, line, column, &err.to_string())
        );
    } else {
        error!("{err}");
    }
}

/// Single-pass scanner state.
struct Assembler<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: ProgramBuilder,
    symbols: &'a mut SymbolTable,
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Assembler<'a> {
    fn new(source: &'a str, symbols: &'a mut SymbolTable) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            out: ProgramBuilder::new(),
            symbols,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn run(mut self) -> Result<Program, VMError> {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_ascii_whitespace() => self.pos += 1,
                b'0'..=b'9' => self.digits(),
                c if is_name_start(c) => {
                    let id = self.name()?;
                    self.out.emit_literal(id as u64);
                }
                b'.' => {
                    self.pos += 1;
                    if self.peek().is_some_and(is_name_start) {
                        let id = self.name()?;
                        self.out.emit_literal(id as u64);
                    }
                    self.out.emit(Instruction::Call);
                }
                QUOTE => self.string()?,
                DUP => {
                    self.pos += 1;
                    self.out.emit_literal(0);
                    self.out.emit(Instruction::Pick);
                }
                _ => {
                    let character = self.source[self.pos..]
                        .chars()
                        .next()
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    let instr = Instruction::from_symbol(character).ok_or(
                        VMError::UnexpectedCharacter {
                            character,
                            offset: self.pos,
                        },
                    )?;
                    self.out.emit(instr);
                    self.pos += 1;
                }
            }
        }
        Ok(self.out.finish())
    }

    fn digits(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.out.emit_literal_digits(&self.bytes[start..self.pos]);
    }

    fn name(&mut self) -> Result<usize, VMError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_continue) {
            self.pos += 1;
        }
        self.symbols.intern(&self.source[start..self.pos], start)
    }

    fn string(&mut self) -> Result<(), VMError> {
        let start = self.pos;
        self.pos += 1;
        self.out.emit_literal(0);
        loop {
            let Some(mut b) = self.peek() else {
                return Err(VMError::UnterminatedString { offset: start });
            };
            self.pos += 1;
            if b == QUOTE {
                return Ok(());
            }
            if b == ESCAPE {
                let Some(escaped) = self.peek() else {
                    return Err(VMError::UnterminatedString { offset: start });
                };
                self.pos += 1;
                b = escaped;
            }
            self.out.emit_literal(b as u64);
        }
    }
}

/// Assembles `source`, interning names into `symbols`.
///
/// Names interned by a failed assembly are removed again, so the table is
/// unchanged on error.
pub fn assemble_with_symbols(source: &str, symbols: &mut SymbolTable) -> Result<Program, VMError> {
    let mark = symbols.len();
    let result = Assembler::new(source, symbols).run();
    if result.is_err() {
        symbols.truncate(mark);
    }
    result
}

/// Assembles with diagnostics logged against `source_name` on failure.
pub(crate) fn assemble_named(
    source: &str,
    source_name: &str,
    symbols: &mut SymbolTable,
) -> Result<Program, VMError> {
    let result = assemble_with_symbols(source, symbols);
    if let Err(err) = &result {
        log_assembly_error(source_name, source, err);
    }
    result
}

/// Assembles `source` against a fresh session holding only the built-in names.
pub fn assemble_source(source: impl Into<String>) -> Result<Program, VMError> {
    Session::new().assemble(&source.into())
}

/// Convenience: assemble directly from file path
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    Session::new().assemble_file(path)
}
