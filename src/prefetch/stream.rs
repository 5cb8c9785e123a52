use crate::prefetch::PrefetchPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Training,
    Streaming,
}

/// Stream detector for monotonically increasing line-aligned runs.
///
/// The whole state is four integers and every transition is an equality
/// comparison, which keeps the hardware realisation in the
/// comparator-and-counter range.  Writes never reach `observe`.
#[derive(Debug)]
pub struct StreamPrefetcher {
    state: StreamState,
    last: u64,
    streak: u32,
    trigger: u32,
    lookahead: u64,
}

impl StreamPrefetcher {
    pub fn new(trigger: u32, lookahead: u64) -> Self {
        Self {
            state: StreamState::Idle,
            last: 0,
            streak: 0,
            trigger: trigger.max(1),
            lookahead,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    fn restart(&mut self, key: u64) {
        self.last = key;
        self.streak = 1;
    }

    fn window(&self) -> Vec<u64> {
        (1..=self.lookahead)
            .filter_map(|dist| self.last.checked_add(dist))
            .collect()
    }
}

impl PrefetchPolicy for StreamPrefetcher {
    fn observe(&mut self, key: u64) -> Vec<u64> {
        match self.state {
            StreamState::Idle => {
                self.state = StreamState::Training;
                self.restart(key);
                Vec::new()
            }
            StreamState::Training => {
                if self.last.checked_add(1) == Some(key) {
                    self.streak += 1;
                    self.last = key;
                    if self.streak >= self.trigger {
                        self.state = StreamState::Streaming;
                        return self.window();
                    }
                } else {
                    self.restart(key);
                }
                Vec::new()
            }
            StreamState::Streaming => {
                if self.last.checked_add(1) == Some(key) {
                    self.last = key;
                    self.window()
                } else {
                    self.state = StreamState::Training;
                    self.restart(key);
                    Vec::new()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StreamPrefetcher, StreamState};
    use crate::prefetch::PrefetchPolicy;

    #[test]
    fn first_read_starts_training() {
        let mut pf = StreamPrefetcher::new(2, 16);
        assert_eq!(pf.state(), StreamState::Idle);
        assert!(pf.observe(100).is_empty());
        assert_eq!(pf.state(), StreamState::Training);
        assert_eq!(pf.streak(), 1);
    }

    #[test]
    fn second_sequential_read_arms_streaming() {
        let mut pf = StreamPrefetcher::new(2, 16);
        pf.observe(100);
        let window = pf.observe(101);
        assert_eq!(pf.state(), StreamState::Streaming);
        assert_eq!(window, (102..=117).collect::<Vec<u64>>());
    }

    #[test]
    fn streaming_tops_up_from_the_new_tail() {
        let mut pf = StreamPrefetcher::new(2, 4);
        pf.observe(10);
        pf.observe(11);
        let window = pf.observe(12);
        assert_eq!(window, vec![13, 14, 15, 16]);
    }

    #[test]
    fn non_sequential_read_restarts_training() {
        let mut pf = StreamPrefetcher::new(2, 16);
        pf.observe(10);
        assert!(pf.observe(500).is_empty());
        assert_eq!(pf.state(), StreamState::Training);
        assert_eq!(pf.streak(), 1);
    }

    #[test]
    fn gap_disarms_streaming_back_to_training() {
        let mut pf = StreamPrefetcher::new(2, 16);
        pf.observe(10);
        pf.observe(11);
        assert_eq!(pf.state(), StreamState::Streaming);
        assert!(pf.observe(4096).is_empty());
        assert_eq!(pf.state(), StreamState::Training);
        // A fresh run from the new base re-arms.
        let window = pf.observe(4097);
        assert_eq!(pf.state(), StreamState::Streaming);
        assert_eq!(window[0], 4098);
    }

    #[test]
    fn higher_trigger_needs_longer_run() {
        let mut pf = StreamPrefetcher::new(4, 8);
        pf.observe(0);
        assert!(pf.observe(1).is_empty());
        assert!(pf.observe(2).is_empty());
        assert!(!pf.observe(3).is_empty());
        assert_eq!(pf.state(), StreamState::Streaming);
    }

    #[test]
    fn repeated_key_never_trains() {
        let mut pf = StreamPrefetcher::new(2, 16);
        for _ in 0..10 {
            assert!(pf.observe(42).is_empty());
        }
        assert_eq!(pf.state(), StreamState::Training);
        assert_eq!(pf.streak(), 1);
    }

    #[test]
    fn window_stops_at_key_space_end() {
        let mut pf = StreamPrefetcher::new(2, 16);
        pf.observe(u64::MAX - 1);
        let window = pf.observe(u64::MAX);
        assert!(window.is_empty());
    }
}
