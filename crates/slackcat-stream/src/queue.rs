use std::sync::{Mutex, MutexGuard, PoisonError};

/// Buffer of streamed lines, split into `pending` (not yet flushed) and
/// `in_flight` (returned by the last flush, not yet acknowledged).
///
/// A line lives in exactly one of the two partitions until [`ack`](Self::ack)
/// drops it. Every method takes the lock once for its whole body, so callers
/// never observe a half-moved batch.
#[derive(Debug, Default)]
pub struct StreamQueue {
    inner: Mutex<Partitions>,
}

#[derive(Debug, Default)]
struct Partitions {
    pending: Vec<String>,
    in_flight: Vec<String>,
}

impl StreamQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Partitions> {
        // Partitions stay consistent even if a holder panicked; keep going.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a line to `pending`.
    pub fn add(&self, line: impl Into<String>) {
        self.lock().pending.push(line.into());
    }

    /// True iff both partitions are empty.
    pub fn is_empty(&self) -> bool {
        let q = self.lock();
        q.pending.is_empty() && q.in_flight.is_empty()
    }

    /// Lines held across both partitions.
    pub fn len(&self) -> usize {
        let q = self.lock();
        q.pending.len() + q.in_flight.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Move all pending lines behind any unacknowledged ones and return the
    /// whole in-flight batch.
    pub fn flush(&self) -> Vec<String> {
        let mut q = self.lock();
        let Partitions { pending, in_flight } = &mut *q;
        in_flight.append(pending);
        in_flight.clone()
    }

    /// Drop the in-flight batch. Lines added since the last flush are untouched.
    pub fn ack(&self) {
        self.lock().in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_queue_is_empty() {
        let q = StreamQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert!(q.flush().is_empty());
    }

    #[test]
    fn flush_preserves_arrival_order() {
        let q = StreamQueue::new();
        for line in ["one", "two", "three", "four"] {
            q.add(line);
        }
        assert_eq!(q.flush(), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn unacknowledged_lines_survive_second_flush() {
        let q = StreamQueue::new();
        q.add("a");
        q.add("b");
        assert_eq!(q.flush(), vec!["a", "b"]);
        q.add("c");
        assert_eq!(q.flush(), vec!["a", "b", "c"]);
        q.ack();
        assert!(q.is_empty());
        assert!(q.flush().is_empty());
    }

    #[test]
    fn flush_ack_flush_scenario() {
        let q = StreamQueue::new();
        q.add("a");
        q.add("b");
        assert_eq!(q.flush(), vec!["a", "b"]);
        q.add("c");
        assert_eq!(q.flush(), vec!["a", "b", "c"]);
        q.ack();
        q.add("d");
        assert_eq!(q.flush(), vec!["d"]);
    }

    #[test]
    fn ack_only_clears_in_flight() {
        let q = StreamQueue::new();
        q.add("a");
        q.flush();
        q.ack();
        assert!(q.is_empty());

        q.add("b");
        q.flush();
        q.add("c");
        q.ack();
        assert!(!q.is_empty());
        assert_eq!(q.len(), 1);
        assert_eq!(q.in_flight_len(), 0);
        assert_eq!(q.flush(), vec!["c"]);
    }

    #[test]
    fn in_flight_counts_toward_emptiness() {
        let q = StreamQueue::new();
        q.add("a");
        q.flush();
        assert!(!q.is_empty());
        assert_eq!(q.in_flight_len(), 1);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        use std::sync::Arc;

        let q = Arc::new(StreamQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        q.add(format!("{t}-{i}"));
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        while seen.len() < 1000 {
            seen.extend(q.flush());
            q.ack();
            if handles.iter().all(|h| h.is_finished()) {
                seen.extend(q.flush());
                q.ack();
                break;
            }
        }
        for h in handles {
            h.join().unwrap();
        }
        seen.extend(q.flush());

        assert_eq!(seen.len(), 1000);
        // Per-producer order is preserved.
        for t in 0..4 {
            let prefix = format!("{t}-");
            let mine: Vec<usize> = seen
                .iter()
                .filter_map(|l| l.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(mine, (0..250).collect::<Vec<_>>());
        }
    }
}
