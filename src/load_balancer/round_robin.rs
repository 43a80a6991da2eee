//! Round-robin selection cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector.
/// Stores an internal counter to rotate through a fixed-size list.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next index into a list of `len` entries.
    ///
    /// The read and the increment happen in one `fetch_add`, so concurrent
    /// callers never share a cursor value. The counter wraps on overflow.
    ///
    /// `len` must be non-zero.
    pub fn next_index(&self, len: usize) -> usize {
        debug_assert!(len > 0, "round robin over an empty list");
        self.counter.fetch_add(1, Ordering::Relaxed) % len
    }

    /// Number of selections made so far (modulo `usize::MAX + 1`).
    #[cfg(test)]
    fn position(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_round_robin() {
        let rr = RoundRobin::new();

        assert_eq!(rr.next_index(3), 0);
        assert_eq!(rr.next_index(3), 1);
        assert_eq!(rr.next_index(3), 2);
        assert_eq!(rr.next_index(3), 0);
        assert_eq!(rr.position(), 4);
    }

    #[test]
    fn test_single_entry_always_zero() {
        let rr = RoundRobin::new();
        for _ in 0..10 {
            assert_eq!(rr.next_index(1), 0);
        }
    }

    #[test]
    fn test_wraps_on_overflow() {
        let rr = RoundRobin {
            counter: AtomicUsize::new(usize::MAX),
        };
        let first = rr.next_index(3);
        assert!(first < 3);
        assert_eq!(rr.next_index(3), 0);
    }

    #[test]
    fn test_concurrent_selection_loses_no_increment() {
        let rr = Arc::new(RoundRobin::new());
        let len = 4;
        let threads = 8;
        let per_thread = 1000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let rr = rr.clone();
                thread::spawn(move || {
                    let mut counts = vec![0usize; len];
                    for _ in 0..per_thread {
                        counts[rr.next_index(len)] += 1;
                    }
                    counts
                })
            })
            .collect();

        let mut totals = vec![0usize; len];
        for handle in handles {
            for (i, c) in handle.join().unwrap().into_iter().enumerate() {
                totals[i] += c;
            }
        }

        assert_eq!(rr.position(), threads * per_thread);
        // Every index claimed exactly total/len times.
        assert!(totals.iter().all(|&c| c == threads * per_thread / len));
    }
}
