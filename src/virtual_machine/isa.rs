//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the VM's sixteen 4-bit instructions. The
//! [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical table and invokes a callback macro for code generation, so the
//! instruction enum, the source-character mapping, and the ISA lock test all
//! come from one list.
//!
//! # Instruction Format
//!
//! Every instruction is a single nibble; two instructions share a byte, low
//! nibble first. The only multi-nibble construct is a literal: the `Literal`
//! code followed by a literal run (see [`literal`](super::literal)).
//!
//! Entries must be listed in code order: `Instruction::ALL[n]` is the
//! instruction with code `n`.

/// Invokes a callback macro with the complete instruction definition list.
///
/// Each entry is `Name = code, 'source char', "MNEMONIC"`.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// `0-9`, names, quotes ; push the value of the literal run that follows
            Literal = 0x0, '0', "LIT",
            // =========================
            // Arithmetic
            // =========================
            /// `+` ; pop X, pop Y, push X + Y
            Add = 0x1, '+', "ADD",
            /// `-` ; pop X, pop Y, push X - Y
            Sub = 0x2, '-', "SUB",
            /// `*` ; pop X, pop Y, push X * Y
            Mul = 0x3, '*', "MUL",
            // =========================
            // Stack and register
            // =========================
            /// `$` ; pop I; I >= 0: push copy of element I below top; I < 0: pop V, store V |I| deep
            Pick = 0x4, '$', "PICK",
            /// `=` ; A = pop
            LoadA = 0x5, '=', "LDA",
            /// `?` ; push A
            PushA = 0x6, '?', "PUSHA",
            /// `!` ; pop and discard
            Drop = 0x7, '!', "DROP",
            /// `,` ; swap the two top values
            Swap = 0x8, ',', "SWAP",
            // =========================
            // Functions
            // =========================
            /// `:` ; pop id, define it as the code up to the next `:`
            Define = 0x9, ':', "DEF",
            /// `.` ; pop id, call it
            Call = 0xA, '.', "CALL",
            /// `@` ; return from the current function
            Return = 0xB, '@', "RET",
            // =========================
            // Loops
            // =========================
            /// `[` ; pop, skip past matching `]` if zero
            OpenA = 0xC, '[', "OPENA",
            /// `]` ; if A != 0 { A -= 1; jump past matching `[` }
            CloseA = 0xD, ']', "CLOSEA",
            /// `<` ; pop, skip past matching `>` if <= 0
            OpenB = 0xE, '<', "OPENB",
            /// `>` ; if A != 0 { A -= 1; jump past matching `<` }
            CloseB = 0xF, '>', "CLOSEB",
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:expr, $symbol:literal, $mnemonic:literal
        ),* $(,)?
    ) => {
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $code,
            )*
        }

        impl Instruction {
            /// All instructions, indexed by code.
            pub const ALL: [Instruction; 16] = [ $( Instruction::$name, )* ];

            /// Decodes the low four bits of `nibble`.
            #[inline(always)]
            pub const fn from_nibble(nibble: u8) -> Self {
                Self::ALL[(nibble & 0x0F) as usize]
            }

            /// Returns the 4-bit code.
            #[inline(always)]
            pub const fn code(self) -> u8 {
                self as u8
            }

            /// Returns the source character that assembles to this instruction.
            pub const fn symbol(self) -> char {
                match self {
                    $( Instruction::$name => $symbol, )*
                }
            }

            /// Returns the disassembly mnemonic.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Maps a punctuation character to its instruction.
            ///
            /// Digits are not opcodes: they start literals and are handled by the
            /// assembler before this lookup.
            pub fn from_symbol(c: char) -> Option<Self> {
                let instr = match c {
                    $( $symbol => Instruction::$name, )*
                    _ => return None,
                };
                (instr != Instruction::Literal).then_some(instr)
            }
        }
    };
}

for_each_instruction!(define_instructions);

/// Direction a bracket scan travels in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanDirection {
    Forward,
    Backward,
}

impl Instruction {
    /// For a bracket instruction, returns `(nesting, target, direction)`: the
    /// code that deepens the scan, the code that ends it, and which way to scan.
    ///
    /// Openers scan forward for their closer; closers scan backward for their opener.
    pub const fn bracket_scan(self) -> Option<(Instruction, Instruction, ScanDirection)> {
        use Instruction::*;
        use ScanDirection::*;
        match self {
            OpenA => Some((OpenA, CloseA, Forward)),
            CloseA => Some((CloseA, OpenA, Backward)),
            OpenB => Some((OpenB, CloseB, Forward)),
            CloseB => Some((CloseB, OpenB, Backward)),
            _ => None,
        }
    }
}
