//! SELECT register caching (§3 "DAP substate", §4.2 "SELECT caching").
//!
//! Tracks the last-written SELECT word so the transactor can elide a
//! redundant write whenever consecutive accesses land in the same
//! (APSEL, APBANKSEL, DPBANKSEL, CTRLSEL) quadruple (§8 invariant 5).

use super::dp::Select;

#[derive(Debug, Default, Clone, Copy)]
pub struct SelectState {
    last_written: Option<Select>,
}

impl SelectState {
    pub const fn new() -> Self {
        Self { last_written: None }
    }

    /// Any protocol-level failure invalidates the cache: the target may
    /// have missed the write, or require a line reset before any banked
    /// access can be trusted again (§4.2).
    pub fn invalidate(&mut self) {
        self.last_written = None;
    }

    /// Returns `Some(required)` if `required` differs from the cached
    /// value (or nothing has been written yet), i.e. a write is needed;
    /// `None` if the cache already matches and the write can be elided.
    pub fn needs_write(&self, required: Select) -> Option<Select> {
        match self.last_written {
            Some(cached) if cached == required => None,
            _ => Some(required),
        }
    }

    /// Record that `written` was just successfully written.
    pub fn record_write(&mut self, written: Select) {
        self.last_written = Some(written);
    }

    /// The last value known to be written, or the all-zero reset value if
    /// nothing has been written yet (or the cache was invalidated). Used to
    /// preserve unrelated fields (e.g. DPBANKSEL while updating APSEL) when
    /// building the next required SELECT word.
    pub fn current(&self) -> Select {
        self.last_written.unwrap_or(Select(0))
    }
}
