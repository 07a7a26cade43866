//! Function table and call-frame stack.

use super::builtins::Builtin;
use crate::virtual_machine::errors::VMError;

/// State of one function id.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum FunctionEntry {
    Builtin(Builtin),
    Undefined,
    /// Code range `[start, end)`, possibly empty.
    Defined {
        start: usize,
        end: usize,
    },
}

/// Fixed-size table indexed by function id.
pub(super) struct FunctionTable {
    entries: Vec<FunctionEntry>,
}

impl FunctionTable {
    /// Creates a table with `capacity` slots. Built-in ids are always present.
    pub(super) fn new(capacity: usize) -> Self {
        let mut entries = vec![FunctionEntry::Undefined; capacity.max(Builtin::ALL.len())];
        for builtin in Builtin::ALL {
            entries[builtin.id()] = FunctionEntry::Builtin(builtin);
        }
        Self { entries }
    }

    /// Records the code range for `id`. Redefinition replaces the range.
    pub(super) fn define(
        &mut self,
        id: i64,
        start: usize,
        end: usize,
        offset: usize,
    ) -> Result<(), VMError> {
        let reserved = |reason| VMError::ReservedFunctionId { id, reason, offset };
        let idx = usize::try_from(id).map_err(|_| reserved("negative id"))?;
        match self.entries.get_mut(idx) {
            Some(FunctionEntry::Builtin(_)) => Err(reserved("id belongs to a built-in")),
            Some(slot) => {
                *slot = FunctionEntry::Defined { start, end };
                Ok(())
            }
            None => Err(reserved("id exceeds the function table capacity")),
        }
    }

    /// Resolves `id` for a call. Undefined and out-of-range ids are
    /// [`VMError::UndefinedFunction`].
    pub(super) fn lookup(&self, id: i64, offset: usize) -> Result<FunctionEntry, VMError> {
        let entry = usize::try_from(id)
            .ok()
            .and_then(|idx| self.entries.get(idx).copied())
            .unwrap_or(FunctionEntry::Undefined);
        match entry {
            FunctionEntry::Undefined => Err(VMError::UndefinedFunction { id, offset }),
            entry => Ok(entry),
        }
    }
}

/// Saved context of a suspended caller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) struct CallFrame {
    /// Position to resume at.
    pub ip: usize,
    pub start: usize,
    pub end: usize,
    /// Caller's counter register.
    pub a: i64,
}

/// Bounded stack of call frames. Depth 0 is top level.
pub(super) struct FrameStack {
    frames: Vec<CallFrame>,
    capacity: usize,
}

impl FrameStack {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            capacity,
        }
    }

    pub(super) fn push(&mut self, frame: CallFrame, offset: usize) -> Result<(), VMError> {
        if self.frames.len() >= self.capacity {
            return Err(VMError::FrameStackOverflow {
                capacity: self.capacity,
                offset,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }
}
