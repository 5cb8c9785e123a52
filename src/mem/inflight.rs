use crate::timeq::Cycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOrigin {
    Demand,
    Prefetch,
}

/// A fill that has reached its arrival cycle and left the table.
#[derive(Debug, Clone, Copy)]
pub struct RetiredFill {
    pub key: u64,
    pub ready_at: Cycle,
    pub origin: FillOrigin,
    pub consumed: bool,
}

#[derive(Debug)]
struct InflightEntry {
    key: u64,
    ready_at: Cycle,
    origin: FillOrigin,
    consumed: bool,
}

/// Fills in transit from tier-2 to tier-1.  Occupancy is bounded by the
/// prefetch lookahead plus one demand entry, so linear scans are fine.
/// Retirement preserves insertion order for fills due in the same cycle.
#[derive(Debug, Default)]
pub struct InflightTable {
    entries: Vec<InflightEntry>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: u64) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn ready_at(&self, key: u64) -> Option<Cycle> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.ready_at)
    }

    pub fn insert(&mut self, key: u64, ready_at: Cycle, origin: FillOrigin) {
        debug_assert!(!self.has(key), "duplicate in-flight fill");
        self.entries.push(InflightEntry {
            key,
            ready_at,
            origin,
            consumed: false,
        });
    }

    /// A demand access found this fill in transit.  Returns the origin on
    /// the first consumption, None when the fill was already consumed or
    /// is not present.
    pub fn consume(&mut self, key: u64) -> Option<FillOrigin> {
        let entry = self.entries.iter_mut().find(|entry| entry.key == key)?;
        if entry.consumed {
            return None;
        }
        entry.consumed = true;
        Some(entry.origin)
    }

    /// Removes and returns every fill due at `now`, in insertion order.
    pub fn retire_due(&mut self, now: Cycle) -> Vec<RetiredFill> {
        let mut due = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() {
            if self.entries[idx].ready_at <= now {
                let entry = self.entries.remove(idx);
                due.push(RetiredFill {
                    key: entry.key,
                    ready_at: entry.ready_at,
                    origin: entry.origin,
                    consumed: entry.consumed,
                });
            } else {
                idx += 1;
            }
        }
        due
    }

    pub fn next_ready(&self) -> Option<Cycle> {
        self.entries.iter().map(|entry| entry.ready_at).min()
    }
}

#[cfg(test)]
mod tests {
    use super::{FillOrigin, InflightTable};

    #[test]
    fn new_table_is_empty() {
        let table = InflightTable::new();
        assert!(table.is_empty());
        assert!(!table.has(0));
        assert_eq!(table.next_ready(), None);
    }

    #[test]
    fn tracks_membership_and_ready_cycle() {
        let mut table = InflightTable::new();
        table.insert(7, 12, FillOrigin::Demand);
        assert!(table.has(7));
        assert_eq!(table.ready_at(7), Some(12));
        assert_eq!(table.ready_at(8), None);
    }

    #[test]
    fn retires_due_fills_in_insertion_order() {
        let mut table = InflightTable::new();
        table.insert(1, 10, FillOrigin::Prefetch);
        table.insert(2, 10, FillOrigin::Prefetch);
        table.insert(3, 11, FillOrigin::Demand);
        let due = table.retire_due(10);
        let keys: Vec<u64> = due.iter().map(|fill| fill.key).collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.next_ready(), Some(11));
    }

    #[test]
    fn retire_due_takes_everything_at_or_before_now() {
        let mut table = InflightTable::new();
        table.insert(1, 5, FillOrigin::Prefetch);
        table.insert(2, 3, FillOrigin::Prefetch);
        let due = table.retire_due(9);
        assert_eq!(due.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn consume_reports_origin_once() {
        let mut table = InflightTable::new();
        table.insert(4, 8, FillOrigin::Prefetch);
        assert_eq!(table.consume(4), Some(FillOrigin::Prefetch));
        assert_eq!(table.consume(4), None);
        let due = table.retire_due(8);
        assert!(due[0].consumed);
    }

    #[test]
    fn consume_of_absent_key_is_none() {
        let mut table = InflightTable::new();
        assert_eq!(table.consume(1), None);
    }
}
