//! Transcript hand-off between recognition and the single worker.
//!
//! Producers never block. Transcripts are handled strictly in arrival order,
//! one at a time. A transcript carrying the wake word supersedes everything
//! still waiting: the drain and the push happen under one lock, so no stale
//! transcript can slip in between.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

/// One recognized utterance awaiting interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Arrival order, starting at 0.
    pub seq: u64,
    pub text: String,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Transcript>,
    next_seq: u64,
    closed: bool,
    stale_dropped: u64,
}

impl QueueState {
    fn push(&mut self, text: String) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(Transcript { seq, text });
        seq
    }
}

/// Unbounded FIFO with a blocking consumer side.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transcript. Returns its sequence number, or `None` once the
    /// queue has been shut down.
    pub fn enqueue(&self, text: impl Into<String>) -> Option<u64> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let seq = state.push(text.into());
        drop(state);
        self.ready.notify_one();
        Some(seq)
    }

    /// Discard every waiting transcript, then append this one.
    ///
    /// Returns the new sequence number and how many transcripts were dropped.
    pub fn enqueue_fresh(&self, text: impl Into<String>) -> Option<(u64, usize)> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let dropped = state.items.len();
        state.items.clear();
        state.stale_dropped += dropped as u64;
        let seq = state.push(text.into());
        drop(state);
        if dropped > 0 {
            info!(dropped, seq, "wake word superseded queued transcripts");
        }
        self.ready.notify_one();
        Some((seq, dropped))
    }

    /// Block until a transcript is available. Returns `None` after
    /// `shutdown`, even if transcripts remain.
    pub fn dequeue(&self) -> Option<Transcript> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Drop every waiting transcript. Returns how many were dropped.
    pub fn drain_stale(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        state.stale_dropped += dropped as u64;
        if dropped > 0 {
            debug!(dropped, "drained stale transcripts");
        }
        dropped
    }

    /// Close the queue and wake the consumer.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.items.clear();
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total transcripts discarded as stale since creation.
    pub fn stale_dropped(&self) -> u64 {
        self.state.lock().stale_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn transcripts_come_out_in_arrival_order() {
        let queue = DispatchQueue::new();
        assert_eq!(queue.enqueue("one"), Some(0));
        assert_eq!(queue.enqueue("two"), Some(1));

        assert_eq!(queue.dequeue().map(|t| t.text), Some("one".to_string()));
        assert_eq!(queue.dequeue().map(|t| t.seq), Some(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn fresh_transcript_supersedes_waiting_ones() {
        let queue = DispatchQueue::new();
        queue.enqueue("play the wall");
        queue.enqueue("next");
        queue.enqueue("volume up");

        let (seq, dropped) = queue.enqueue_fresh("alice pause").expect("queue open");
        assert_eq!(dropped, 3);
        assert_eq!(seq, 3);
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.dequeue(),
            Some(Transcript {
                seq: 3,
                text: "alice pause".into()
            })
        );
        assert_eq!(queue.stale_dropped(), 3);
    }

    #[test]
    fn drain_stale_counts_dropped_items() {
        let queue = DispatchQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");
        assert_eq!(queue.drain_stale(), 2);
        assert_eq!(queue.drain_stale(), 0);
        assert_eq!(queue.stale_dropped(), 2);
    }

    #[test]
    fn shutdown_unblocks_a_waiting_consumer() {
        let queue = Arc::new(DispatchQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.dequeue())
        };

        std::thread::sleep(Duration::from_millis(50));
        queue.shutdown();

        let result = consumer.join().expect("consumer thread panicked");
        assert_eq!(result, None);
        assert!(queue.is_closed());
        assert_eq!(queue.enqueue("too late"), None);
        assert_eq!(queue.enqueue_fresh("alice"), None);
    }

    #[test]
    fn consumer_wakes_for_new_transcript() {
        let queue = Arc::new(DispatchQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.dequeue())
        };

        std::thread::sleep(Duration::from_millis(20));
        queue.enqueue("alice");

        let got = consumer.join().expect("consumer thread panicked");
        assert_eq!(got.map(|t| t.text), Some("alice".to_string()));
    }
}
