/// Handle for a scheduled item, usable to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId(u64);

struct Entry<T> {
    id: ScheduleId,
    due: f64,
    item: T,
}

/// Deferred events keyed to elapsed simulation time.
///
/// Replaces host-runtime timers: the owner polls the queue once per fixed
/// tick with the current simulation clock, so deferred transitions stay
/// deterministic and unit-testable. Items due at the same instant fire in
/// insertion order.
pub struct ScheduleQueue<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> Default for ScheduleQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScheduleQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `item` to fire once `poll` is called with `now >= due`.
    /// A non-finite `due` is clamped to fire on the next poll.
    pub fn schedule_at(&mut self, due: f64, item: T) -> ScheduleId {
        let id = ScheduleId(self.next_id);
        self.next_id += 1;
        let due = if due.is_finite() { due } else { f64::MIN };
        self.entries.push(Entry { id, due, item });
        id
    }

    /// Cancel a pending item. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: ScheduleId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Drop every pending item (level teardown).
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Remove and return every item due at or before `now`, ordered by
    /// (due time, insertion order).
    pub fn poll(&mut self, now: f64) -> Vec<T> {
        let mut due: Vec<Entry<T>> = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].due <= now {
                due.push(self.entries.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.0.cmp(&b.id.0)));
        due.into_iter().map(|e| e.item).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
