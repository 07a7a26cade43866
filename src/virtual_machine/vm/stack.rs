use crate::virtual_machine::errors::VMError;

/// Bounded operand stack of signed integers, stored bottom to top.
///
/// Every accessor takes the nibble `offset` of the executing instruction so
/// failures point at the instruction that caused them.
pub(super) struct OperandStack {
    values: Vec<i64>,
    capacity: usize,
}

impl OperandStack {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub(super) fn as_slice(&self) -> &[i64] {
        &self.values
    }

    pub(super) fn into_vec(self) -> Vec<i64> {
        self.values
    }

    /// Returns [`VMError::StackOverflow`] if the stack is full.
    pub(super) fn push(&mut self, value: i64, offset: usize) -> Result<(), VMError> {
        if self.values.len() >= self.capacity {
            return Err(VMError::StackOverflow {
                capacity: self.capacity,
                offset,
            });
        }
        self.values.push(value);
        Ok(())
    }

    /// Returns [`VMError::StackUnderflow`] if the stack is empty.
    pub(super) fn pop(&mut self, offset: usize) -> Result<i64, VMError> {
        self.values.pop().ok_or(VMError::StackUnderflow {
            needed: 1,
            available: 0,
            offset,
        })
    }

    /// Pops the top two values, returning `(top, second)`.
    pub(super) fn pop2(&mut self, offset: usize) -> Result<(i64, i64), VMError> {
        self.require(2, offset)?;
        let x = self.pop(offset)?;
        let y = self.pop(offset)?;
        Ok((x, y))
    }

    /// Returns the value `depth` elements below the top (0 is the top).
    pub(super) fn peek(&self, depth: usize, offset: usize) -> Result<i64, VMError> {
        let idx = self.index_of(depth, offset)?;
        Ok(self.values[idx])
    }

    /// Overwrites the value `depth` elements below the top.
    pub(super) fn poke(&mut self, depth: usize, value: i64, offset: usize) -> Result<(), VMError> {
        let idx = self.index_of(depth, offset)?;
        self.values[idx] = value;
        Ok(())
    }

    pub(super) fn swap(&mut self, offset: usize) -> Result<(), VMError> {
        self.require(2, offset)?;
        let n = self.values.len();
        self.values.swap(n - 1, n - 2);
        Ok(())
    }

    /// Drops every element at index `len` and above.
    pub(super) fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    fn index_of(&self, depth: usize, offset: usize) -> Result<usize, VMError> {
        let needed = depth.saturating_add(1);
        self.require(needed, offset)?;
        Ok(self.values.len() - needed)
    }

    fn require(&self, needed: usize, offset: usize) -> Result<(), VMError> {
        if self.values.len() < needed {
            return Err(VMError::StackUnderflow {
                needed,
                available: self.values.len(),
                offset,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_order() {
        let mut s = OperandStack::new(4);
        s.push(1, 0).unwrap();
        s.push(2, 0).unwrap();
        assert_eq!(s.pop2(0).unwrap(), (2, 1));
        assert!(s.as_slice().is_empty());
    }

    #[test]
    fn overflow_at_capacity() {
        let mut s = OperandStack::new(1);
        s.push(1, 0).unwrap();
        assert_eq!(
            s.push(2, 3),
            Err(VMError::StackOverflow {
                capacity: 1,
                offset: 3
            })
        );
    }

    #[test]
    fn pop2_leaves_stack_untouched_on_underflow() {
        let mut s = OperandStack::new(4);
        s.push(9, 0).unwrap();
        assert_eq!(
            s.pop2(1),
            Err(VMError::StackUnderflow {
                needed: 2,
                available: 1,
                offset: 1
            })
        );
        assert_eq!(s.as_slice(), &[9]);
    }

    #[test]
    fn peek_and_poke_by_depth() {
        let mut s = OperandStack::new(4);
        for v in [10, 20, 30] {
            s.push(v, 0).unwrap();
        }
        assert_eq!(s.peek(0, 0).unwrap(), 30);
        assert_eq!(s.peek(2, 0).unwrap(), 10);
        assert!(s.peek(3, 0).is_err());
        assert!(s.peek(usize::MAX, 0).is_err());
        s.poke(1, 99, 0).unwrap();
        assert_eq!(s.as_slice(), &[10, 99, 30]);
    }

    #[test]
    fn swap_top_two() {
        let mut s = OperandStack::new(4);
        s.push(3, 0).unwrap();
        assert!(s.swap(0).is_err());
        s.push(7, 0).unwrap();
        s.swap(0).unwrap();
        assert_eq!(s.as_slice(), &[7, 3]);
    }
}
