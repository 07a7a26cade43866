//! Bracket matching with a per-position target cache.
//!
//! The first traversal of a bracket scans for its partner; the target is then
//! memoized under the bracket's own position, so loops cost one scan per
//! bracket for the whole run.

use super::ExecStats;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, ScanDirection};
use crate::virtual_machine::program::Program;

pub(super) struct JumpCache {
    targets: Vec<Option<usize>>,
}

impl JumpCache {
    pub(super) fn new(program_len: usize) -> Self {
        Self {
            targets: vec![None; program_len],
        }
    }

    /// Returns the jump target for `bracket` at `pos`: just past the
    /// matching closer for an opener, just past the matching opener for a
    /// closer. The scan never leaves `[start, end)`.
    pub(super) fn resolve(
        &mut self,
        program: &Program,
        pos: usize,
        bracket: Instruction,
        start: usize,
        end: usize,
        stats: &mut ExecStats,
    ) -> Result<usize, VMError> {
        if let Some(Some(target)) = self.targets.get(pos).copied() {
            // A cached target from a wider range is not reused in a narrower one.
            if target > start && target <= end {
                stats.cache_hits += 1;
                return Ok(target);
            }
        }

        stats.cache_misses += 1;
        let target = scan(program, pos, bracket, start, end)?;
        if let Some(slot) = self.targets.get_mut(pos) {
            *slot = Some(target);
        }
        Ok(target)
    }
}

/// Depth-counted scan from the bracket at `pos`, counting only brackets of
/// the same family. Literal runs never contain nibbles >= 12, so raw nibbles
/// are scanned without decoding.
fn scan(
    program: &Program,
    pos: usize,
    bracket: Instruction,
    start: usize,
    end: usize,
) -> Result<usize, VMError> {
    let unmatched = || VMError::UnmatchedBracket {
        bracket: bracket.symbol(),
        offset: pos,
    };
    let Some((nesting, target, direction)) = bracket.bracket_scan() else {
        return Err(unmatched());
    };

    let mut depth = 0usize;
    let mut visit = |p: usize| -> Option<usize> {
        let instr = program.instruction(p)?;
        if instr == nesting {
            depth += 1;
        } else if instr == target {
            depth -= 1;
            if depth == 0 {
                return Some(p + 1);
            }
        }
        None
    };

    let found = match direction {
        ScanDirection::Forward => (pos..end.min(program.len())).find_map(&mut visit),
        ScanDirection::Backward => (start..=pos).rev().find_map(&mut visit),
    };
    found.ok_or_else(unmatched)
}
