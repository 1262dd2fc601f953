//! Debounced rewrite scheduling
//!
//! Trailing-edge debounce keyed per node: scheduling again before the
//! quiescence delay elapses replaces the pending deadline, so a burst of
//! edits (a strength slider drag) collapses into a single rewrite. The
//! scheduler holds no timer handles; the runtime polls [`due`] on its own
//! tick and tests drive a [`ManualClock`] directly.
//!
//! [`due`]: RewriteScheduler::due
//! [`ManualClock`]: crate::clock::ManualClock

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::clock::Clock;
use crate::graph::NodeId;

pub struct RewriteScheduler {
    delay: Duration,
    clock: Arc<dyn Clock>,
    pending: HashMap<NodeId, Instant>,
}

impl RewriteScheduler {
    #[must_use]
    pub fn new(delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            delay,
            clock,
            pending: HashMap::new(),
        }
    }

    /// Schedule (or re-schedule) a rewrite for `node`.
    ///
    /// At most one rewrite is pending per node; the newer deadline replaces
    /// the older one, implicitly cancelling it.
    pub fn schedule(&mut self, node: NodeId) {
        let due = self.clock.now() + self.delay;
        self.pending.insert(node, due);
    }

    /// Cancel a pending rewrite, if any.
    pub fn cancel(&mut self, node: NodeId) {
        self.pending.remove(&node);
    }

    #[must_use]
    pub fn is_pending(&self, node: NodeId) -> bool {
        self.pending.contains_key(&node)
    }

    /// Remove and return every node whose quiescence delay has elapsed.
    pub fn due(&mut self) -> Vec<NodeId> {
        let now = self.clock.now();
        let fired: Vec<NodeId> = self
            .pending
            .iter()
            .filter(|(_, due)| **due <= now)
            .map(|(node, _)| *node)
            .collect();
        for node in &fired {
            self.pending.remove(node);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn scheduler(delay_ms: u64) -> (RewriteScheduler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let scheduler = RewriteScheduler::new(Duration::from_millis(delay_ms), clock.clone());
        (scheduler, clock)
    }

    #[test]
    fn fires_only_after_quiescence_delay() {
        let (mut scheduler, clock) = scheduler(250);
        scheduler.schedule(1);
        assert!(scheduler.due().is_empty());

        clock.advance(Duration::from_millis(249));
        assert!(scheduler.due().is_empty());

        clock.advance(Duration::from_millis(1));
        assert_eq!(scheduler.due(), vec![1]);
        assert!(!scheduler.is_pending(1));
    }

    #[test]
    fn reschedule_replaces_pending_deadline() {
        let (mut scheduler, clock) = scheduler(250);
        scheduler.schedule(1);
        clock.advance(Duration::from_millis(200));
        scheduler.schedule(1); // burst: pushes the deadline out

        clock.advance(Duration::from_millis(100));
        assert!(scheduler.due().is_empty());

        clock.advance(Duration::from_millis(150));
        assert_eq!(scheduler.due(), vec![1]);
    }

    #[test]
    fn burst_collapses_to_one_fire() {
        let (mut scheduler, clock) = scheduler(250);
        for _ in 0..3 {
            scheduler.schedule(7);
            clock.advance(Duration::from_millis(50));
        }
        clock.advance(Duration::from_millis(250));
        assert_eq!(scheduler.due(), vec![7]);
        assert!(scheduler.due().is_empty());
    }

    #[test]
    fn cancel_discards_pending_rewrite() {
        let (mut scheduler, clock) = scheduler(250);
        scheduler.schedule(1);
        scheduler.cancel(1);
        clock.advance(Duration::from_secs(1));
        assert!(scheduler.due().is_empty());
    }
}
