/// Append-only log of domain events owned by a single aggregate.
///
/// Not synchronized: an aggregate instance belongs to exactly one in-flight operation.
#[derive(Debug, Clone)]
pub struct EventLog<E> {
    entries: Vec<E>,
}

impl<E> EventLog<E> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn record(&mut self, event: E) {
        self.entries.push(event);
    }

    /// Pending events, oldest first, without clearing
    pub fn pending(&self) -> &[E] {
        &self.entries
    }

    /// Return all pending events and clear the log
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}
