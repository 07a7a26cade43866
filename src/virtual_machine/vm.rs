//! Core virtual machine implementation.
//!
//! A [`Machine`] executes one packed [`Program`] against an operand stack, a
//! single counter register `A`, a function table, and an explicit call-frame
//! stack. Calls never recurse natively: entering a function swaps the active
//! code range and pushes the caller's context as a [`frames::CallFrame`].
//!
//! All arithmetic uses wrapping semantics to prevent overflow panics.
//!
//! A [`Session`] owns the symbol table, so names keep their ids across runs.

pub mod builtins;
mod frames;
mod jump;
mod stack;

use crate::virtual_machine::assembler::assemble_named;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::literal;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::symbols::SymbolTable;
use builtins::Builtin;
use frames::{CallFrame, FrameStack, FunctionEntry, FunctionTable};
use jump::JumpCache;
use stack::OperandStack;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Capacities of every bounded container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Operand stack slots.
    pub stack: usize,
    /// Call frames (maximum call depth).
    pub frames: usize,
    /// Function table slots, built-ins included.
    pub functions: usize,
    /// Symbol table entries, built-ins included.
    pub symbols: usize,
    /// Longest accepted identifier, in bytes.
    pub max_name_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            stack: 1024,
            frames: 1024,
            functions: 1024,
            symbols: 1024,
            max_name_len: 255,
        }
    }
}

/// Counters collected during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    /// Instructions dispatched (a literal counts once).
    pub instructions: u64,
    /// `Call` instructions executed, built-ins included.
    pub calls: u64,
    /// Bracket jumps served from the cache.
    pub cache_hits: u64,
    /// Bracket jumps that required a scan.
    pub cache_misses: u64,
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Counter register `A`.
    pub register: i64,
    /// Operand stack, bottom to top.
    pub stack: Vec<i64>,
    /// Whether the run ended through `hlt`.
    pub halted: bool,
    pub stats: ExecStats,
}

impl RunOutcome {
    /// Iterates the stack from the top down.
    pub fn stack_top_down(&self) -> impl Iterator<Item = i64> + '_ {
        self.stack.iter().rev().copied()
    }

    pub fn top(&self) -> Option<i64> {
        self.stack.last().copied()
    }
}

/// Persistent assembler and execution context.
///
/// Holds the symbol table, with `top`, `say`, and `hlt` interned at ids 0, 1
/// and 2, and the limits every run uses. A failed run leaves the session usable.
pub struct Session {
    symbols: SymbolTable,
    limits: Limits,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            symbols: SymbolTable::with_builtins(limits.symbols, limits.max_name_len),
            limits,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Assembles `source` against this session's symbol table.
    pub fn assemble(&mut self, source: &str) -> Result<Program, VMError> {
        assemble_named(source, "<source>", &mut self.symbols)
    }

    /// Reads and assembles a source file against this session's symbol table.
    pub fn assemble_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Program, VMError> {
        let path_ref = path.as_ref();
        let source = fs::read_to_string(path_ref).map_err(|e| VMError::Io {
            reason: format!("{}: {e}", path_ref.display()),
        })?;
        assemble_named(&source, &path_ref.display().to_string(), &mut self.symbols)
    }

    /// Assembles and runs `source`, writing built-in output to stdout.
    pub fn run(&mut self, source: &str) -> Result<RunOutcome, VMError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(source, &mut out)
    }

    /// Assembles and runs `source`, writing built-in output to `out`.
    pub fn run_with_output<W: Write>(
        &mut self,
        source: &str,
        out: &mut W,
    ) -> Result<RunOutcome, VMError> {
        let program = self.assemble(source)?;
        self.run_program(&program, out)
    }

    /// Runs an already assembled program.
    pub fn run_program<W: Write>(
        &self,
        program: &Program,
        out: &mut W,
    ) -> Result<RunOutcome, VMError> {
        let outcome = Machine::new(program, &self.limits).run(out)?;
        out.flush()?;
        Ok(outcome)
    }
}

/// Execution state of a single run.
///
/// Created per program and consumed by [`Machine::run`], so a machine that
/// failed can not be resumed.
pub struct Machine<'p> {
    program: &'p Program,
    /// Next instruction to execute.
    ip: usize,
    /// Active code range `[start, end)`.
    start: usize,
    end: usize,
    /// Counter register.
    a: i64,
    stack: OperandStack,
    frames: FrameStack,
    functions: FunctionTable,
    jumps: JumpCache,
    stats: ExecStats,
    halted: bool,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Program, limits: &Limits) -> Self {
        Self {
            program,
            ip: 0,
            start: 0,
            end: program.len(),
            a: 0,
            stack: OperandStack::new(limits.stack),
            frames: FrameStack::new(limits.frames),
            functions: FunctionTable::new(limits.functions),
            jumps: JumpCache::new(program.len()),
            stats: ExecStats::default(),
            halted: false,
        }
    }

    /// Executes until the top-level range is exhausted, `@` returns from top
    /// level, or `hlt` is called.
    pub fn run<W: Write>(mut self, out: &mut W) -> Result<RunOutcome, VMError> {
        while !self.halted {
            if self.ip >= self.end {
                let Some(frame) = self.frames.pop() else {
                    break;
                };
                self.ip = frame.ip;
                self.start = frame.start;
                self.end = frame.end;
                self.a = frame.a;
                continue;
            }

            let offset = self.ip;
            let Some(instr) = self.program.instruction(offset) else {
                break;
            };
            self.ip += 1;
            self.stats.instructions += 1;
            self.exec(instr, offset, out)?;
        }

        Ok(RunOutcome {
            register: self.a,
            stack: self.stack.into_vec(),
            halted: self.halted,
            stats: self.stats,
        })
    }

    /// Executes a single instruction located at `offset`.
    fn exec<W: Write>(
        &mut self,
        instr: Instruction,
        offset: usize,
        out: &mut W,
    ) -> Result<(), VMError> {
        use Instruction::*;
        match instr {
            Literal => self.op_literal(offset),
            Add => self.op_binary(offset, i64::wrapping_add),
            Sub => self.op_binary(offset, i64::wrapping_sub),
            Mul => self.op_binary(offset, i64::wrapping_mul),
            Pick => self.op_pick(offset),
            LoadA => {
                self.a = self.stack.pop(offset)?;
                Ok(())
            }
            PushA => self.stack.push(self.a, offset),
            Drop => self.stack.pop(offset).map(|_| ()),
            Swap => self.stack.swap(offset),
            Define => self.op_define(offset),
            Call => self.op_call(offset, out),
            Return => {
                self.ip = self.end;
                Ok(())
            }
            OpenA => self.op_open(instr, offset, |v| v == 0),
            OpenB => self.op_open(instr, offset, |v| v <= 0),
            CloseA | CloseB => self.op_close(instr, offset),
        }
    }

    fn op_literal(&mut self, offset: usize) -> Result<(), VMError> {
        let (value, next) = literal::decode_run(self.program, self.ip, self.end)?;
        self.ip = next;
        self.stack.push(value as i64, offset)
    }

    /// Pops X (top) then Y and pushes `f(X, Y)`.
    fn op_binary(&mut self, offset: usize, f: fn(i64, i64) -> i64) -> Result<(), VMError> {
        let (x, y) = self.stack.pop2(offset)?;
        self.stack.push(f(x, y), offset)
    }

    fn op_pick(&mut self, offset: usize) -> Result<(), VMError> {
        let index = self.stack.pop(offset)?;
        if index >= 0 {
            let depth = usize::try_from(index).unwrap_or(usize::MAX);
            let value = self.stack.peek(depth, offset)?;
            self.stack.push(value, offset)
        } else {
            let value = self.stack.pop(offset)?;
            let depth = usize::try_from(index.unsigned_abs() - 1).unwrap_or(usize::MAX);
            self.stack.poke(depth, value, offset)
        }
    }

    fn op_define(&mut self, offset: usize) -> Result<(), VMError> {
        let id = self.stack.pop(offset)?;
        let body_start = self.ip;
        let marker = self.find_definition_end(body_start, offset)?;
        self.functions.define(id, body_start, marker, offset)?;
        self.ip = marker + 1;
        Ok(())
    }

    /// Finds the `:` closing a definition whose body starts at `pos`. Literal
    /// runs are skipped whole so their digits are never read as instructions.
    fn find_definition_end(&self, mut pos: usize, offset: usize) -> Result<usize, VMError> {
        while pos < self.end {
            match self.program.instruction(pos) {
                Some(Instruction::Define) => return Ok(pos),
                Some(Instruction::Literal) => {
                    pos = literal::skip_run(self.program, pos + 1, self.end)?;
                }
                Some(_) => pos += 1,
                None => break,
            }
        }
        Err(VMError::UnterminatedDefinition { offset })
    }

    fn op_call<W: Write>(&mut self, offset: usize, out: &mut W) -> Result<(), VMError> {
        let id = self.stack.pop(offset)?;
        self.stats.calls += 1;
        match self.functions.lookup(id, offset)? {
            FunctionEntry::Builtin(builtin) => self.call_builtin(builtin, offset, out),
            FunctionEntry::Defined { start, end } => {
                let frame = CallFrame {
                    ip: self.ip,
                    start: self.start,
                    end: self.end,
                    a: self.a,
                };
                self.frames.push(frame, offset)?;
                self.start = start;
                self.end = end;
                self.ip = start;
                self.a = 0;
                Ok(())
            }
            FunctionEntry::Undefined => Err(VMError::UndefinedFunction { id, offset }),
        }
    }

    fn call_builtin<W: Write>(
        &mut self,
        builtin: Builtin,
        offset: usize,
        out: &mut W,
    ) -> Result<(), VMError> {
        match builtin {
            Builtin::Top => builtins::top(&self.stack, out, offset),
            Builtin::Say => builtins::say(&mut self.stack, out, offset),
            Builtin::Hlt => {
                self.halted = true;
                Ok(())
            }
        }
    }

    /// Pops the loop guard; skips past the matching closer when `skip` holds.
    fn op_open(
        &mut self,
        instr: Instruction,
        offset: usize,
        skip: fn(i64) -> bool,
    ) -> Result<(), VMError> {
        let value = self.stack.pop(offset)?;
        if skip(value) {
            self.ip = self.jump(instr, offset)?;
        }
        Ok(())
    }

    /// Loops back past the matching opener while `A` is nonzero, decrementing it.
    fn op_close(&mut self, instr: Instruction, offset: usize) -> Result<(), VMError> {
        if self.a != 0 {
            self.a = self.a.wrapping_sub(1);
            self.ip = self.jump(instr, offset)?;
        }
        Ok(())
    }

    fn jump(&mut self, instr: Instruction, offset: usize) -> Result<usize, VMError> {
        self.jumps.resolve(
            self.program,
            offset,
            instr,
            self.start,
            self.end,
            &mut self.stats,
        )
    }
}
