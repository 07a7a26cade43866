//! Packed instruction streams and their serialized image.
//!
//! A [`Program`] stores nibbles two per byte, low nibble first. The image
//! written by [`Program::to_bytes`] prefixes the payload with a magic header
//! and format version so stale or foreign files are rejected on load.

use crate::types::encoding::{Decode, Encode, EncodeSink, SizeCounter};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::literal;
use nibblevm_derive::BinaryCodec;
use std::fmt::Write;

/// Magic bytes identifying a serialized program image.
const MAGIC: &[u8; 4] = b"B4VM";

/// Current image format version.
const CURRENT_VERSION: Version = Version::new(1, 0);

/// Version for image format compatibility.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, BinaryCodec)]
struct Version {
    major: u8,
    minor: u8,
}

impl Version {
    const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

/// An immutable, packed instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, BinaryCodec)]
pub struct Program {
    /// Packed nibbles, low nibble first. An odd-length stream pads the last
    /// high nibble with zero.
    code: Vec<u8>,
    /// Number of nibbles in the stream.
    len: usize,
}

impl Program {
    /// Packs a sequence of 4-bit values. High bits of each input are ignored.
    pub fn from_nibbles(nibbles: &[u8]) -> Program {
        let mut builder = ProgramBuilder::new();
        for &n in nibbles {
            builder.push_nibble(n);
        }
        builder.finish()
    }

    /// Number of nibbles in the stream.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed byte representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    /// Returns the nibble at `pos`, or `None` past the end.
    #[inline(always)]
    pub fn nibble(&self, pos: usize) -> Option<u8> {
        if pos >= self.len {
            return None;
        }
        let byte = self.code[pos >> 1];
        Some(if pos & 1 == 0 { byte & 0x0F } else { byte >> 4 })
    }

    /// Returns the instruction at `pos`, or `None` past the end.
    #[inline(always)]
    pub fn instruction(&self, pos: usize) -> Option<Instruction> {
        self.nibble(pos).map(Instruction::from_nibble)
    }

    /// Serializes the program to a portable binary image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut counter = SizeCounter::new();
        self.encode_image(&mut counter);

        let mut out = Vec::with_capacity(counter.len());
        self.encode_image(&mut out);
        out
    }

    fn encode_image<S: EncodeSink>(&self, out: &mut S) {
        MAGIC.encode(out);
        CURRENT_VERSION.encode(out);
        self.encode(out);
    }

    /// Deserializes a program image.
    ///
    /// Validates the magic header and version, and rejects payloads whose
    /// nibble count does not match the packed bytes.
    pub fn from_bytes(mut input: &[u8]) -> Result<Self, VMError> {
        if input.len() < MAGIC.len() {
            return Err(VMError::DecodeError {
                reason: "truncated".to_string(),
            });
        }

        if &<[u8; 4]>::decode(&mut input)? != MAGIC {
            return Err(VMError::DecodeError {
                reason: "bad magic".to_string(),
            });
        }

        if Version::decode(&mut input)? != CURRENT_VERSION {
            return Err(VMError::DecodeError {
                reason: "unsupported version".to_string(),
            });
        }

        let p = Program::decode(&mut input)?;
        if !input.is_empty() {
            return Err(VMError::DecodeError {
                reason: "trailing bytes".to_string(),
            });
        }
        if p.code.len() != p.len.div_ceil(2) {
            return Err(VMError::DecodeError {
                reason: format!(
                    "{} nibbles do not fit {} packed bytes",
                    p.len,
                    p.code.len()
                ),
            });
        }
        if p.len % 2 == 1 && p.code[p.code.len() - 1] >> 4 != 0 {
            return Err(VMError::DecodeError {
                reason: "nonzero padding nibble".to_string(),
            });
        }
        Ok(p)
    }

    /// Renders one line per instruction with literal runs decoded.
    ///
    /// ```text
    /// 0000  0 LIT    5
    /// 0003  = LDA
    /// ```
    ///
    /// A malformed literal ends the listing with an error line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut pos = 0;
        while let Some(instr) = self.instruction(pos) {
            if instr == Instruction::Literal {
                match literal::decode_run(self, pos + 1, self.len) {
                    Ok((value, next)) => {
                        let _ = writeln!(
                            out,
                            "{pos:04}  {} {:<6} {}",
                            instr.symbol(),
                            instr.mnemonic(),
                            value as i64
                        );
                        pos = next;
                    }
                    Err(err) => {
                        let _ = writeln!(out, "{pos:04}  error: {err}");
                        break;
                    }
                }
            } else {
                let _ = writeln!(out, "{pos:04}  {} {}", instr.symbol(), instr.mnemonic());
                pos += 1;
            }
        }
        out
    }
}

/// Appends nibbles to a growing stream.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    code: Vec<u8>,
    len: usize,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_nibble(&mut self, nibble: u8) {
        let nibble = nibble & 0x0F;
        if self.len % 2 == 0 {
            self.code.push(nibble);
        } else if let Some(last) = self.code.last_mut() {
            *last |= nibble << 4;
        }
        self.len += 1;
    }

    pub fn emit(&mut self, instr: Instruction) {
        self.push_nibble(instr.code());
    }

    /// Emits a `Literal` instruction followed by the run for `value`.
    pub fn emit_literal(&mut self, value: u64) {
        self.emit(Instruction::Literal);
        for n in literal::encode(value) {
            self.push_nibble(n);
        }
    }

    /// Emits a `Literal` instruction followed by the run for an ASCII decimal
    /// digit string of any length.
    pub fn emit_literal_digits(&mut self, digits: &[u8]) {
        self.emit(Instruction::Literal);
        for n in literal::encode_digits(digits) {
            self.push_nibble(n);
        }
    }

    pub fn finish(self) -> Program {
        Program {
            code: self.code,
            len: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::isa::Instruction::*;

    #[test]
    fn packs_low_nibble_first() {
        let p = Program::from_nibbles(&[0x1, 0x2, 0x3]);
        assert_eq!(p.as_bytes(), &[0x21, 0x03]);
        assert_eq!(p.len(), 3);
        assert_eq!(p.nibble(0), Some(1));
        assert_eq!(p.nibble(1), Some(2));
        assert_eq!(p.nibble(2), Some(3));
        assert_eq!(p.nibble(3), None);
    }

    #[test]
    fn builder_emits_literal_runs() {
        let mut b = ProgramBuilder::new();
        b.emit_literal(5);
        b.emit(LoadA);
        let p = b.finish();
        assert_eq!(p.len(), 4);
        assert_eq!(p.instruction(0), Some(Literal));
        assert_eq!(p.nibble(1), Some(5));
        assert_eq!(p.nibble(2), Some(literal::END));
        assert_eq!(p.instruction(3), Some(LoadA));
    }

    #[test]
    fn image_roundtrip() {
        let mut b = ProgramBuilder::new();
        b.emit_literal(123);
        b.emit(PushA);
        b.emit(Add);
        let p = b.finish();
        assert_eq!(Program::from_bytes(&p.to_bytes()).unwrap(), p);
    }

    #[test]
    fn image_is_preallocated_exactly() {
        let p = Program::from_nibbles(&[1, 2, 3]);
        let bytes = p.to_bytes();
        // magic, version, length-prefixed code, nibble count
        assert_eq!(bytes.len(), 4 + 2 + (8 + 2) + 8);
        assert_eq!(bytes.capacity(), bytes.len());
        assert_eq!(&bytes[..4], b"B4VM");
    }

    #[test]
    fn image_roundtrip_empty() {
        let p = Program::default();
        assert_eq!(Program::from_bytes(&p.to_bytes()).unwrap(), p);
    }

    #[test]
    fn from_bytes_truncated() {
        let bytes = Program::from_nibbles(&[1, 2, 3]).to_bytes();
        assert!(matches!(
            Program::from_bytes(&bytes[..bytes.len() - 1]),
            Err(VMError::DecodeError { .. })
        ));
        assert!(matches!(
            Program::from_bytes(b"B4"),
            Err(VMError::DecodeError { .. })
        ));
    }

    #[test]
    fn from_bytes_bad_magic() {
        let mut bytes = Program::from_nibbles(&[1]).to_bytes();
        bytes[0] = b'X';
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError {
                reason: "bad magic".to_string()
            })
        );
    }

    #[test]
    fn from_bytes_unsupported_version() {
        let mut bytes = Program::from_nibbles(&[1]).to_bytes();
        bytes[4] = 9;
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError {
                reason: "unsupported version".to_string()
            })
        );
    }

    #[test]
    fn from_bytes_trailing_bytes() {
        let mut bytes = Program::from_nibbles(&[1]).to_bytes();
        bytes.push(0);
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(VMError::DecodeError {
                reason: "trailing bytes".to_string()
            })
        );
    }

    #[test]
    fn from_bytes_rejects_inconsistent_length() {
        let bad = Program {
            code: vec![0x21],
            len: 5,
        };
        assert!(matches!(
            Program::from_bytes(&bad.to_bytes()),
            Err(VMError::DecodeError { .. })
        ));

        let dirty_pad = Program {
            code: vec![0x21, 0xF3],
            len: 3,
        };
        assert_eq!(
            Program::from_bytes(&dirty_pad.to_bytes()),
            Err(VMError::DecodeError {
                reason: "nonzero padding nibble".to_string()
            })
        );
    }

    #[test]
    fn disassemble_decodes_literals() {
        let mut b = ProgramBuilder::new();
        b.emit_literal(5);
        b.emit(LoadA);
        b.emit(PushA);
        let text = b.finish().disassemble();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["0000", "0", "LIT", "5"]);
        assert_eq!(lines[1], "0003  = LDA");
        assert_eq!(lines[2], "0004  ? PUSHA");
    }

    #[test]
    fn disassemble_stops_at_malformed_literal() {
        let p = Program::from_nibbles(&[Add.code(), 0, 3, 0xC, Add.code()]);
        let text = p.disassemble();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0001  error: malformed literal"));
    }
}
