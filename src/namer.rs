//! Parameter name allocation for unnamed and blank parameters.

use std::collections::HashSet;

/// Hands out `p0`, `p1`, ... skipping names already used in the frame.
#[derive(Debug, Default)]
pub struct NameAllocator {
    next: usize,
    taken: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new function frame.
    pub fn reset(&mut self) {
        self.next = 0;
        self.taken.clear();
    }

    /// Mark a declared parameter name as used in the current frame.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Next unused generated name.
    pub fn allocate(&mut self) -> String {
        loop {
            let candidate = format!("p{}", self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_and_reset() {
        let mut namer = NameAllocator::new();
        assert_eq!(namer.allocate(), "p0");
        assert_eq!(namer.allocate(), "p1");
        namer.reset();
        assert_eq!(namer.allocate(), "p0");
    }

    #[test]
    fn test_skips_reserved() {
        let mut namer = NameAllocator::new();
        namer.reserve("p0");
        namer.reserve("p2");
        assert_eq!(namer.allocate(), "p1");
        assert_eq!(namer.allocate(), "p3");
    }
}
