//! Queue Store
//!
//! Ordered list of playable items plus the current position. Pure data: the
//! controller owns the store exclusively and publishes snapshots only after a
//! mutation has completed, so readers never observe a half-applied change.
//!
//! Invariant: `current_index` is `Some(i)` with `i < len` whenever the queue is
//! non-empty and playback has a position; it is `None` iff the queue is empty
//! or has been cleared.

use crate::error::{Error, Result};
use raikiri_common::{QueueContext, QueueItem};

/// Result of moving forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to this index
    Moved(usize),
    /// Already on the last item (or empty); position unchanged
    EndOfQueue,
}

/// What `remove_at` did to the current position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub removed: QueueItem,
    /// The removed item was the current one
    pub was_current: bool,
    pub current_index: Option<usize>,
}

#[derive(Debug, Default)]
pub struct QueueStore {
    items: Vec<QueueItem>,
    current_index: Option<usize>,
    context: QueueContext,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue wholesale
    ///
    /// An empty `items` clears the queue regardless of `start_index`. For a
    /// non-empty list `start_index` must be in bounds.
    pub fn set_queue(
        &mut self,
        items: Vec<QueueItem>,
        start_index: i64,
        context: QueueContext,
    ) -> Result<Option<usize>> {
        if items.is_empty() {
            self.clear();
            self.context = context;
            return Ok(None);
        }

        if start_index < 0 || start_index as usize >= items.len() {
            return Err(Error::InvalidIndex {
                index: start_index,
                len: items.len(),
            });
        }

        let start = start_index as usize;
        self.items = items;
        self.current_index = Some(start);
        self.context = context;
        Ok(Some(start))
    }

    /// Remove one item, keeping the position on the same logical item
    ///
    /// Removing the current item snaps to the item that followed it (clamped to
    /// the new last item); removing the only item empties the queue.
    pub fn remove_at(&mut self, index: usize) -> Result<Removal> {
        if index >= self.items.len() {
            return Err(Error::InvalidIndex {
                index: index as i64,
                len: self.items.len(),
            });
        }

        let removed = self.items.remove(index);
        let was_current = self.current_index == Some(index);

        self.current_index = match self.current_index {
            _ if self.items.is_empty() => None,
            Some(current) if index < current => Some(current - 1),
            Some(current) if index == current => Some(current.min(self.items.len() - 1)),
            other => other,
        };

        Ok(Removal {
            removed,
            was_current,
            current_index: self.current_index,
        })
    }

    /// Move forward one position; never wraps
    pub fn next(&mut self) -> Advance {
        match self.current_index {
            Some(current) if current + 1 < self.items.len() => {
                self.current_index = Some(current + 1);
                Advance::Moved(current + 1)
            }
            _ => Advance::EndOfQueue,
        }
    }

    /// Move back one position; no-op at index 0
    ///
    /// Returns the new index when the position changed.
    pub fn prev(&mut self) -> Option<usize> {
        match self.current_index {
            Some(current) if current > 0 => {
                self.current_index = Some(current - 1);
                Some(current - 1)
            }
            _ => None,
        }
    }

    pub fn jump_to(&mut self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(Error::InvalidIndex {
                index: index as i64,
                len: self.items.len(),
            });
        }
        self.current_index = Some(index);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.current_index = None;
        self.context = QueueContext::default();
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current_index.and_then(|i| self.items.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn context(&self) -> &QueueContext {
        &self.context
    }

    pub fn paths(&self) -> Vec<String> {
        self.items.iter().map(|i| i.path.clone()).collect()
    }
}
