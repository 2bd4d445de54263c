//! Global dispatch throttle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Single-slot token bucket: at most one permit per interval, handed out
/// FIFO across every caller sharing the throttle.
///
/// Clones share the slot, so every platform call paced by clones of one
/// throttle observes one global interval, not one per loop.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    next_slot: Arc<Mutex<Instant>>,
}

impl Throttle {
    /// Create a throttle with a fixed interval between permits.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Wait for the next permit. The first caller proceeds immediately;
    /// every subsequent caller waits out the interval.
    pub async fn acquire(&self) {
        let mut next = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = (*next).max(now);
        *next = slot + self.interval;
        drop(next);

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_permits_are_spaced_by_interval() {
        let throttle = Throttle::new(Duration::from_millis(100));

        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));

        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_the_slot() {
        let throttle = Throttle::new(Duration::from_millis(50));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move {
                throttle.acquire().await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for (i, t) in times.iter().enumerate() {
            assert_eq!(t.duration_since(start), Duration::from_millis(50 * i as u64));
        }
    }
}
