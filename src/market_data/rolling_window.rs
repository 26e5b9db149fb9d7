// ---------------------------------------------------------------------------
// RollingWindow -- bounded FIFO of observations for one instrument
// ---------------------------------------------------------------------------
//
// Appends are amortised O(1).  Evicted observations stay in the backing
// buffer until `capacity` of them have accumulated, then the buffer is
// compacted in one move, so `as_slice()` is always a contiguous,
// oldest-first view of the retained observations.

use tracing::debug;

use crate::types::Observation;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    buf: Vec<Observation>,
    /// Index of the oldest retained observation in `buf`.
    start: usize,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window retaining at most `capacity` observations
    /// (a capacity of zero is treated as one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Vec::with_capacity(capacity * 2),
            start: 0,
            capacity,
        }
    }

    /// Append an observation, evicting the oldest one when full.
    ///
    /// Returns the evicted observation, if any.
    pub fn append(&mut self, obs: Observation) -> Option<Observation> {
        self.buf.push(obs);
        let evicted = if self.len() > self.capacity {
            let oldest = self.buf[self.start];
            self.start += 1;
            Some(oldest)
        } else {
            None
        };
        if self.start >= self.capacity {
            self.compact();
        }
        evicted
    }

    /// Change the capacity, evicting the oldest observations if the window
    /// no longer fits.  Returns how many were evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        let capacity = capacity.max(1);
        let excess = self.len().saturating_sub(capacity);
        self.start += excess;
        self.capacity = capacity;
        self.compact();
        if excess > 0 {
            debug!(evicted = excess, capacity, "window shrunk");
        }
        excess
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
    }

    /// Read-only, oldest-first view of the retained observations.
    pub fn as_slice(&self) -> &[Observation] {
        &self.buf[self.start..]
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once at least `period` observations are retained.
    pub fn is_ready(&self, period: usize) -> bool {
        self.len() >= period
    }

    /// Most recent observation.
    pub fn latest(&self) -> Option<&Observation> {
        self.as_slice().last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.as_slice().iter()
    }

    pub fn to_vec(&self) -> Vec<Observation> {
        self.as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ts: i64) -> Observation {
        Observation::new(ts, 100.0 + ts as f64, 101.0 + ts as f64, 99.0 + ts as f64, 1.0)
    }

    fn filled(capacity: usize, count: i64) -> RollingWindow {
        let mut w = RollingWindow::new(capacity);
        for ts in 0..count {
            w.append(obs(ts));
        }
        w
    }

    #[test]
    fn append_below_capacity() {
        let mut w = RollingWindow::new(5);
        assert!(w.is_empty());
        for ts in 0..3 {
            assert!(w.append(obs(ts)).is_none());
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.latest().map(|o| o.timestamp), Some(2));
    }

    #[test]
    fn eviction_keeps_most_recent_in_order() {
        let capacity = 10;
        let k = 37;
        let mut w = RollingWindow::new(capacity);
        let mut evicted = Vec::new();
        for ts in 0..(capacity + k) as i64 {
            if let Some(e) = w.append(obs(ts)) {
                evicted.push(e.timestamp);
            }
        }
        assert_eq!(w.len(), capacity);
        let kept: Vec<i64> = w.iter().map(|o| o.timestamp).collect();
        let expected: Vec<i64> = (k as i64..(capacity + k) as i64).collect();
        assert_eq!(kept, expected);
        assert_eq!(evicted, (0..k as i64).collect::<Vec<_>>());
    }

    #[test]
    fn backing_buffer_stays_bounded() {
        let mut w = RollingWindow::new(4);
        for ts in 0..1_000 {
            w.append(obs(ts));
            assert!(w.buf.len() <= 2 * 4);
        }
        assert_eq!(w.as_slice().len(), 4);
    }

    #[test]
    fn shrink_capacity_evicts_oldest() {
        let mut w = filled(10, 8);
        assert_eq!(w.set_capacity(5), 3);
        let kept: Vec<i64> = w.iter().map(|o| o.timestamp).collect();
        assert_eq!(kept, vec![3, 4, 5, 6, 7]);
        assert_eq!(w.capacity(), 5);
    }

    #[test]
    fn grow_capacity_keeps_everything() {
        let mut w = filled(3, 5);
        assert_eq!(w.set_capacity(10), 0);
        assert_eq!(w.len(), 3);
        w.append(obs(5));
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut w = RollingWindow::new(0);
        w.append(obs(1));
        w.append(obs(2));
        assert_eq!(w.len(), 1);
        assert_eq!(w.latest().map(|o| o.close), Some(102.0));
    }

    #[test]
    fn ready_at_period_boundary() {
        let period = 14;
        let mut w = filled(100, period as i64 - 1);
        assert!(!w.is_ready(period));
        w.append(obs(period as i64));
        assert_eq!(w.len(), period);
        assert!(w.is_ready(period));
        assert!(!w.is_ready(period + 1));
    }
}
