//! nibblevm: a 4-bit opcode stack virtual machine.
//!
//! Programs are written in a one-character-per-instruction assembly language,
//! packed two instructions per byte, and executed against an operand stack, a
//! single counter register, a function table, and an explicit call-frame stack.
//!
//! ```text
//! 'Hello, World!'.say     print a string
//! ?4=1[top.1+]            count from 0 to 4, printing each value
//! 1000000000=?[]          loop a billion times
//! neg:?-: 4.neg           define `neg`, then call it on 4
//! ```
//!
//! See [`virtual_machine`] for the instruction set and execution model.

pub mod types;
pub mod utils;
pub mod virtual_machine;
