//! Decimal literal runs.
//!
//! A literal is the `Literal` opcode followed by a run of decimal digit
//! nibbles (0-9, most significant first) and one terminator:
//!
//! - [`END`] (`0xA`): the value is the digits read so far.
//! - [`END_PLUS_ONE`] (`0xB`): the value is one more digit, a leading `1`,
//!   prepended to the digits read so far.
//!
//! The second form saves a nibble for every number whose decimal form starts
//! with `1`: `123` encodes as `2 3 B`, `10` as `0 B`, and `1` as a bare `B`.
//! Arithmetic is wrapping 64-bit; the engine reinterprets the result as `i64`.
//!
//! Nibbles 12-15 never appear inside a run, so a forward scan over raw
//! nibbles can never mistake literal content for a bracket.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::program::Program;

/// Terminates a run; the value is the digits read.
pub const END: u8 = 0xA;
/// Terminates a run; the value gains a leading decimal `1`.
pub const END_PLUS_ONE: u8 = 0xB;

/// Encodes `value` as a run (digits and terminator, without the opcode).
pub fn encode(value: u64) -> Vec<u8> {
    encode_digits(value.to_string().as_bytes())
}

/// Encodes an ASCII decimal digit string of any length.
///
/// Leading zeros are dropped; an empty or all-zero string encodes zero.
/// Values beyond `u64::MAX` wrap when decoded.
pub fn encode_digits(digits: &[u8]) -> Vec<u8> {
    debug_assert!(digits.iter().all(u8::is_ascii_digit));

    let first = digits.iter().position(|&d| d != b'0');
    let Some(first) = first else {
        return vec![END];
    };
    let significant = &digits[first..];

    let (body, terminator) = match significant.split_first() {
        Some((b'1', rest)) => (rest, END_PLUS_ONE),
        _ => (significant, END),
    };

    let mut run = Vec::with_capacity(body.len() + 1);
    run.extend(body.iter().map(|d| d - b'0'));
    run.push(terminator);
    run
}

/// Decodes the run starting at `start` (the nibble after the opcode).
///
/// Reads no further than `end`. Returns the value and the position just past
/// the terminator.
pub fn decode_run(program: &Program, start: usize, end: usize) -> Result<(u64, usize), VMError> {
    let mut acc: u64 = 0;
    let mut place: u64 = 1;
    let mut pos = start;

    loop {
        let nibble = if pos < end { program.nibble(pos) } else { None };
        let Some(nibble) = nibble else {
            return Err(VMError::MalformedLiteral {
                found: None,
                offset: pos,
            });
        };

        match nibble {
            0..=9 => {
                acc = acc.wrapping_mul(10).wrapping_add(nibble as u64);
                place = place.wrapping_mul(10);
            }
            END => return Ok((acc, pos + 1)),
            END_PLUS_ONE => return Ok((acc.wrapping_add(place), pos + 1)),
            _ => {
                return Err(VMError::MalformedLiteral {
                    found: Some(nibble),
                    offset: pos,
                });
            }
        }
        pos += 1;
    }
}

/// Skips the run starting at `start` without computing its value.
///
/// Returns the position just past the terminator.
pub fn skip_run(program: &Program, start: usize, end: usize) -> Result<usize, VMError> {
    let mut pos = start;
    loop {
        match program.nibble(pos).filter(|_| pos < end) {
            Some(0..=9) => pos += 1,
            Some(END | END_PLUS_ONE) => return Ok(pos + 1),
            found => {
                return Err(VMError::MalformedLiteral { found, offset: pos });
            }
        }
    }
}
