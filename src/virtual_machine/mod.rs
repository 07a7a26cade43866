//! 4-bit opcode stack virtual machine.
//!
//! Source text is assembled into a stream of nibbles, two per byte, and
//! executed by an interpreter with no native recursion.
//!
//! # Architecture
//!
//! - **Operand stack**: bounded stack of `i64` values
//! - **Register `A`**: one counter, loaded by `=`, pushed by `?`, and
//!   decremented by both loop closers
//! - **Instruction format**: one nibble per instruction; numbers are embedded
//!   as decimal literal runs
//! - **Functions**: `:` binds an id to the code up to the next `:`; `.` calls
//!   it. Ids 0, 1 and 2 are the built-ins `top`, `say` and `hlt`
//! - **Loops**: `[ ]` and `< >` are two independent bracket families whose
//!   targets are resolved once and cached per bracket
//!
//! # Modules
//!
//! - [`assembler`]: Source scanning, diagnostics, and nibble emission
//! - [`errors`]: Assembly and execution error types
//! - [`isa`]: Instruction set definition and source-character mapping
//! - [`literal`]: Decimal literal run codec
//! - [`program`]: Packed instruction streams, images, and disassembly
//! - [`symbols`]: Identifier interning
//! - [`vm`]: Execution engine, sessions, and built-ins

pub mod assembler;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod literal;
pub mod program;
pub mod symbols;
pub mod vm;
