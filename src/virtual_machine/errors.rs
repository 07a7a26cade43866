use crate::types::encoding::DecodeError;
use nibblevm_derive::Error;

/// Errors that can occur during assembly or execution.
///
/// Assembly errors carry a byte `offset` into the source text; runtime errors
/// carry a nibble `offset` into the instruction stream. Every error is fatal
/// to the run that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    // =========================
    // Assembly
    // =========================
    /// Character that is neither whitespace, a literal, a name, nor an opcode.
    #[error("unexpected character {character:?} at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },
    /// Quoted string without a closing quote.
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    /// Identifier longer than the configured maximum.
    #[error("name too long at offset {offset}: {prefix}... (limit {limit} bytes)")]
    NameTooLong {
        prefix: String,
        limit: usize,
        offset: usize,
    },
    /// More distinct names than the symbol table can hold.
    #[error("symbol table overflow at offset {offset}: capacity {capacity}")]
    SymbolTableOverflow { capacity: usize, offset: usize },

    // =========================
    // Instruction stream
    // =========================
    /// A literal run contained a reserved value or ran off the stream.
    #[error("malformed literal at nibble {offset}: found {found:?}")]
    MalformedLiteral { found: Option<u8>, offset: usize },
    /// Bracket scan exhausted the active code range.
    #[error("unmatched `{bracket}` at nibble {offset}")]
    UnmatchedBracket { bracket: char, offset: usize },
    /// `:` without a closing `:` in the active code range.
    #[error("unterminated function definition at nibble {offset}")]
    UnterminatedDefinition { offset: usize },

    // =========================
    // Functions
    // =========================
    /// Call to an id with no definition that is not a built-in.
    #[error("undefined function {id} called at nibble {offset}")]
    UndefinedFunction { id: i64, offset: usize },
    /// Definition targeting a built-in id or an id outside the function table.
    #[error("cannot define function {id} at nibble {offset}: {reason}")]
    ReservedFunctionId {
        id: i64,
        reason: &'static str,
        offset: usize,
    },
    /// Call depth exceeded the frame stack capacity.
    #[error("frame stack overflow at nibble {offset}: capacity {capacity}")]
    FrameStackOverflow { capacity: usize, offset: usize },

    // =========================
    // Operand stack
    // =========================
    /// Push onto a full operand stack.
    #[error("stack overflow at nibble {offset}: capacity {capacity}")]
    StackOverflow { capacity: usize, offset: usize },
    /// Pop from an empty stack, or a stack-relative access past the bottom.
    #[error("stack underflow at nibble {offset}: needed {needed}, have {available}")]
    StackUnderflow {
        needed: usize,
        available: usize,
        offset: usize,
    },

    // =========================
    // Built-ins
    // =========================
    /// `say` found no 0 terminator beneath the string.
    #[error("say: no string terminator on the stack (called at nibble {offset})")]
    MissingStringTerminator { offset: usize },
    /// `say` found an element that is not a byte.
    #[error("say: {value} is not a byte (called at nibble {offset})")]
    InvalidByte { value: i64, offset: usize },

    // =========================
    // Host
    // =========================
    /// Output or file I/O failure.
    #[error("io error: {reason}")]
    Io { reason: String },
    /// Program image could not be decoded.
    #[error("decoding error: {reason}")]
    DecodeError { reason: String },
}

impl VMError {
    /// Source byte offset for assembly errors, `None` for everything else.
    pub fn source_offset(&self) -> Option<usize> {
        match self {
            VMError::UnexpectedCharacter { offset, .. }
            | VMError::UnterminatedString { offset }
            | VMError::NameTooLong { offset, .. }
            | VMError::SymbolTableOverflow { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl From<DecodeError> for VMError {
    fn from(err: DecodeError) -> Self {
        VMError::DecodeError {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for VMError {
    fn from(err: std::io::Error) -> Self {
        VMError::Io {
            reason: err.to_string(),
        }
    }
}
