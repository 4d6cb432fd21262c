//! Per-session URL frontier
//!
//! FIFO queue of URLs to visit plus the set of every URL ever queued in the
//! session. The membership check, the insert into the seen set and the
//! enqueue happen under one lock, so no URL is handed out twice.
//!
//! The frontier also counts in-flight work: a URL handed out by
//! [`Frontier::take`] stays in flight until [`Frontier::complete`]. The
//! frontier is drained once the queue is empty and nothing is in flight;
//! only then can no further URLs appear.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<Url>,
    seen: HashSet<Url>,
    in_flight: usize,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<State>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueues a URL unless it was seen before in this session
    ///
    /// # Returns
    ///
    /// * `true` - The URL was newly queued
    /// * `false` - Already seen, or the frontier is closed
    pub fn offer(&self, url: Url) -> bool {
        {
            let mut state = self.lock();
            if state.closed || state.seen.contains(&url) {
                return false;
            }
            state.seen.insert(url.clone());
            state.queue.push_back(url);
        }
        self.notify.notify_one();
        true
    }

    /// Waits up to `timeout` for the next URL
    ///
    /// A returned URL counts as in flight until [`Frontier::complete`].
    ///
    /// # Returns
    ///
    /// * `Some(Url)` - The next URL to process
    /// * `None` - The timeout elapsed, or the frontier is drained or closed
    pub async fn take(&self, timeout: Duration) -> Option<Url> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(url) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(url);
                }
                if state.closed || state.in_flight == 0 {
                    return None;
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Marks one taken URL as fully processed
    pub fn complete(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Records a URL as seen without queueing it; idempotent
    pub fn mark_visited(&self, url: &Url) {
        self.lock().seen.insert(url.clone());
    }

    /// Returns true if the URL was queued or marked in this session
    pub fn has_seen(&self, url: &Url) -> bool {
        self.lock().seen.contains(url)
    }

    /// Queue empty and nothing in flight
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.queue.is_empty() && state.in_flight == 0
    }

    /// Discards pending URLs and rejects further offers
    ///
    /// # Returns
    ///
    /// The number of discarded URLs
    pub fn close(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            let discarded = state.queue.len();
            state.queue.clear();
            discarded
        };
        self.notify.notify_waiters();
        discarded
    }

    /// Number of URLs waiting in the queue
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of distinct URLs seen in this session
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn url(path: &str) -> Url {
        Url::parse("https://site.test/").unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn test_fifo_order_and_dedup() {
        let frontier = Frontier::new();
        assert!(frontier.offer(url("/a")));
        assert!(frontier.offer(url("/b")));
        assert!(!frontier.offer(url("/a")));

        assert_eq!(frontier.take(Duration::from_millis(10)).await, Some(url("/a")));
        assert_eq!(frontier.take(Duration::from_millis(10)).await, Some(url("/b")));
        frontier.complete();
        frontier.complete();

        // Taken URLs stay seen
        assert!(!frontier.offer(url("/a")));
        assert!(frontier.is_drained());
    }

    #[tokio::test]
    async fn test_take_on_drained_returns_immediately() {
        let frontier = Frontier::new();
        let started = std::time::Instant::now();
        assert_eq!(frontier.take(Duration::from_secs(5)).await, None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_take_times_out_while_work_in_flight() {
        let frontier = Frontier::new();
        frontier.offer(url("/a"));
        frontier.take(Duration::from_millis(10)).await.unwrap();

        assert!(!frontier.is_drained());
        assert_eq!(frontier.take(Duration::from_millis(30)).await, None);
        assert!(!frontier.is_drained());
    }

    #[tokio::test]
    async fn test_waiter_woken_by_offer() {
        let frontier = Arc::new(Frontier::new());
        frontier.offer(url("/seed"));
        frontier.take(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.take(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.offer(url("/found"));

        let taken = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taken, Some(url("/found")));
    }

    #[tokio::test]
    async fn test_waiter_woken_by_last_complete() {
        let frontier = Arc::new(Frontier::new());
        frontier.offer(url("/seed"));
        frontier.take(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.take(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.complete();

        let taken = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taken, None);
        assert!(frontier.is_drained());
    }

    #[tokio::test]
    async fn test_close_discards_and_rejects() {
        let frontier = Frontier::new();
        frontier.offer(url("/a"));
        frontier.offer(url("/b"));

        assert_eq!(frontier.close(), 2);
        assert!(!frontier.offer(url("/c")));
        assert_eq!(frontier.take(Duration::from_millis(10)).await, None);
    }

    #[test]
    fn test_mark_visited_blocks_offer() {
        let frontier = Frontier::new();
        frontier.mark_visited(&url("/seed"));
        frontier.mark_visited(&url("/seed"));

        assert!(frontier.has_seen(&url("/seed")));
        assert!(!frontier.offer(url("/seed")));
        assert_eq!(frontier.seen_count(), 1);
        assert_eq!(frontier.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_takers_never_share_a_url() {
        let frontier = Arc::new(Frontier::new());
        for i in 0..200 {
            frontier.offer(url(&format!("/p{}", i)));
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let frontier = Arc::clone(&frontier);
            handles.push(tokio::spawn(async move {
                let mut taken = Vec::new();
                while let Some(u) = frontier.take(Duration::from_millis(50)).await {
                    // Re-offering already seen URLs must not requeue them
                    frontier.offer(u.clone());
                    taken.push(u);
                    frontier.complete();
                }
                taken
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 200);
        assert_eq!(unique.len(), 200);
        assert!(frontier.is_drained());
    }
}
