use crate::error::{Error, Result};

/// Sequential `u32` id allocator that refuses to wrap around.
///
/// Ids are never freed: dictionaries and DAGs only grow during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdGenerator {
    next: u32,
    what: &'static str,
}

impl IdGenerator {
    /// Creates a generator whose first id is `first`. `what` names the id
    /// space in capacity errors.
    pub(crate) fn new(first: u32, what: &'static str) -> Self {
        Self { next: first, what }
    }

    /// Gets a new id.
    pub(crate) fn get(&mut self) -> Result<u32> {
        if self.next == u32::MAX {
            return Err(Error::capacity(self.what, u32::MAX as u64));
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// The id the next call to `get` returns.
    pub(crate) fn peek(&self) -> u32 {
        self.next
    }
}
