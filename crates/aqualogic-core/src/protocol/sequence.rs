//! Identity allocation for queued commands.
//!
//! Every [`PendingCommand`](crate::domain::store::PendingCommand) gets a
//! [`CommandId`] when it is queued.  The id is how a reconciliation timer
//! finds "its" command again two seconds later, after the command has left
//! the send queue and possibly been satisfied or retried in the meantime.
//!
//! # Thread safety
//!
//! Commands are submitted from arbitrary caller threads while the reader task
//! is running, so the counter is an `AtomicU64` and never needs a lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identity of one queued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd#{}", self.0)
    }
}

/// Hands out unique, increasing [`CommandId`]s.
///
/// # Examples
///
/// ```rust
/// use aqualogic_core::protocol::sequence::{CommandId, CommandIdCounter};
///
/// let ids = CommandIdCounter::new();
/// assert_eq!(ids.next(), CommandId(1));
/// assert_eq!(ids.next(), CommandId(2));
/// ```
#[derive(Debug)]
pub struct CommandIdCounter {
    inner: AtomicU64,
}

impl CommandIdCounter {
    /// Creates a counter whose first id is 1.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(1),
        }
    }

    /// Allocates the next id.
    ///
    /// `Relaxed` is enough: ids only need to be unique, not ordered with
    /// respect to other memory operations.
    pub fn next(&self) -> CommandId {
        CommandId(self.inner.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CommandIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_are_unique_across_threads() {
        // Arrange
        let ids = Arc::new(CommandIdCounter::new());

        // Act
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<CommandId> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_display_is_prefixed() {
        assert_eq!(CommandId(7).to_string(), "cmd#7");
    }
}
