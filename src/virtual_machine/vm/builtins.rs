//! Built-in routines reachable through `Call` at fixed low ids.

use super::stack::OperandStack;
use crate::virtual_machine::errors::VMError;
use std::io::Write;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Builtin {
    /// Print the top of the stack without popping.
    Top = 0,
    /// Print the 0-terminated byte string on top of the stack and pop it.
    Say = 1,
    /// Stop the run.
    Hlt = 2,
}

impl Builtin {
    /// All built-ins, indexed by id.
    pub const ALL: [Builtin; 3] = [Builtin::Top, Builtin::Say, Builtin::Hlt];

    /// Name interned for this built-in in every session.
    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Top => "top",
            Builtin::Say => "say",
            Builtin::Hlt => "hlt",
        }
    }

    pub const fn id(self) -> usize {
        self as usize
    }
}

/// `top`: writes `top: <value>`.
pub(super) fn top<W: Write>(
    stack: &OperandStack,
    out: &mut W,
    offset: usize,
) -> Result<(), VMError> {
    let value = stack.peek(0, offset)?;
    writeln!(out, "top: {value}")?;
    Ok(())
}

/// `say`: writes the bytes above the nearest 0 in push order, then drops
/// them together with the 0.
pub(super) fn say<W: Write>(
    stack: &mut OperandStack,
    out: &mut W,
    offset: usize,
) -> Result<(), VMError> {
    let values = stack.as_slice();
    let terminator = values
        .iter()
        .rposition(|&v| v == 0)
        .ok_or(VMError::MissingStringTerminator { offset })?;

    let bytes = values[terminator + 1..]
        .iter()
        .map(|&v| u8::try_from(v).map_err(|_| VMError::InvalidByte { value: v, offset }))
        .collect::<Result<Vec<u8>, VMError>>()?;

    out.write_all(&bytes)?;
    out.write_all(b"\n")?;
    stack.truncate(terminator);
    Ok(())
}
