//! Cancellable timers on a virtual clock.
//!
//! The scheduler never reads the wall clock. Its owner moves time forward
//! explicitly: the engine loop from `Instant::elapsed`, tests by hand.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Queue of tasks keyed by deadline.
///
/// Tasks sharing a deadline run in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` to run `delay` after the current time.
    pub fn schedule_after(&mut self, delay: Duration, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = self.now + delay;
        self.queue.insert((deadline, id), task);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Remove a pending task. Returns it if it had not fired yet.
    pub fn cancel(&mut self, timer: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&timer.0)?;
        self.queue.remove(&(deadline, timer.0))
    }

    /// Drop every pending task. Returns how many were discarded.
    pub fn cancel_all(&mut self) -> usize {
        let discarded = self.queue.len();
        self.queue.clear();
        self.deadlines.clear();
        discarded
    }

    #[cfg(test)]
    fn is_pending(&self, timer: TimerId) -> bool {
        self.deadlines.contains_key(&timer.0)
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deadline of the earliest pending task.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest task due at or before `until`.
    ///
    /// The clock moves to that task's deadline, so anything the task
    /// schedules is relative to when it was due rather than to `until`.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let deadline = self.next_deadline()?;
        if deadline > until {
            return None;
        }

        let ((deadline, id), task) = self.queue.pop_first()?;
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        Some((TimerId(id), task))
    }

    /// Move the clock to `until`. Time never goes backwards.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(secs(3.0), "c");
        scheduler.schedule_after(secs(1.0), "a");
        scheduler.schedule_after(secs(2.0), "b");

        let mut fired = Vec::new();
        while let Some((_, task)) = scheduler.pop_due(secs(10.0)) {
            fired.push(task);
        }

        assert_eq!(fired, vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), secs(3.0));
    }

    #[test]
    fn test_same_deadline_keeps_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(secs(1.0), 1);
        scheduler.schedule_after(secs(1.0), 2);

        assert_eq!(scheduler.pop_due(secs(1.0)).map(|(_, t)| t), Some(1));
        assert_eq!(scheduler.pop_due(secs(1.0)).map(|(_, t)| t), Some(2));
    }

    #[test]
    fn test_not_due_stays_queued() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(secs(1.5), ());

        assert!(scheduler.pop_due(secs(1.4)).is_none());
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.pop_due(secs(1.5)).is_some());
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule_after(secs(1.0), "keep");
        let dropped = scheduler.schedule_after(secs(1.0), "drop");

        assert_eq!(scheduler.cancel(dropped), Some("drop"));
        assert_eq!(scheduler.cancel(dropped), None);
        assert!(scheduler.is_pending(keep));

        let (id, task) = scheduler.pop_due(secs(5.0)).unwrap();
        assert_eq!((id, task), (keep, "keep"));
        assert!(scheduler.pop_due(secs(5.0)).is_none());
    }

    #[test]
    fn test_reschedule_from_due_time() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(secs(3.0), "tick");

        // Catch up from 0 to 10s in one call, rescheduling as a periodic timer would.
        let mut fired_at = Vec::new();
        while let Some((_, task)) = scheduler.pop_due(secs(10.0)) {
            fired_at.push(scheduler.now());
            scheduler.schedule_after(secs(3.0), task);
        }
        scheduler.settle(secs(10.0));

        assert_eq!(fired_at, vec![secs(3.0), secs(6.0), secs(9.0)]);
        assert_eq!(scheduler.next_deadline(), Some(secs(12.0)));
    }

    #[test]
    fn test_cancel_all_and_settle() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(secs(1.0), ());
        scheduler.schedule_after(secs(2.0), ());

        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.next_deadline(), None);

        scheduler.settle(secs(4.0));
        scheduler.settle(secs(1.0));
        assert_eq!(scheduler.now(), secs(4.0));
    }
}
