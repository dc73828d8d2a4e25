use serde::{Deserialize, Serialize};

use crate::kart::KartId;

/// Work a task performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Deferred {
    /// Take back a boost item's speed bonus.
    RevertBoost { amount: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Task {
    handle: TaskHandle,
    owner: KartId,
    deadline: f64,
    work: Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fired {
    pub handle: TaskHandle,
    pub owner: KartId,
    pub work: Deferred,
}

#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    now: f64,
    next_handle: u64,
    // kept sorted by (deadline, handle)
    pending: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move the clock forward. Negative or non-finite steps are ignored.
    pub fn advance(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt;
        }
    }

    pub fn schedule(&mut self, owner: KartId, delay: f64, work: Deferred) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;

        let deadline = self.now + delay.max(0.0);
        let at = self
            .pending
            .partition_point(|t| t.deadline <= deadline);
        self.pending.insert(
            at,
            Task {
                handle,
                owner,
                deadline,
                work,
            },
        );
        handle
    }

    /// Returns whether the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    /// Drop every pending task owned by `owner`, returning what was dropped.
    pub fn cancel_owner(&mut self, owner: KartId) -> Vec<TaskHandle> {
        let mut dropped = Vec::new();
        self.pending.retain(|t| {
            if t.owner == owner {
                dropped.push(t.handle);
                false
            } else {
                true
            }
        });
        dropped
    }

    pub fn pending_for(&self, owner: KartId) -> usize {
        self.pending.iter().filter(|t| t.owner == owner).count()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Remove and return every task whose deadline is at or before `now`.
    pub fn drain_due(&mut self) -> Vec<Fired> {
        let due = self.pending.partition_point(|t| t.deadline <= self.now);
        self.pending
            .drain(..due)
            .map(|t| Fired {
                handle: t.handle,
                owner: t.owner,
                work: t.work,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KART: KartId = KartId(0);
    const BOOST: Deferred = Deferred::RevertBoost { amount: 15.0 };

    #[test]
    fn test_task_fires_at_deadline() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(KART, 1.5, BOOST);

        scheduler.advance(1.0);
        assert!(scheduler.drain_due().is_empty());

        scheduler.advance(0.5);
        let fired = scheduler.drain_due();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].handle, handle);
        assert!(!scheduler.is_pending(handle));
    }

    #[test]
    fn test_task_fires_once() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(KART, 0.1, BOOST);
        scheduler.advance(1.0);
        assert_eq!(scheduler.drain_due().len(), 1);
        scheduler.advance(1.0);
        assert!(scheduler.drain_due().is_empty());
    }

    #[test]
    fn test_fires_in_deadline_then_schedule_order() {
        let mut scheduler = Scheduler::new();
        let late = scheduler.schedule(KART, 2.0, BOOST);
        let first = scheduler.schedule(KART, 1.0, BOOST);
        let second = scheduler.schedule(KART, 1.0, BOOST);

        scheduler.advance(3.0);
        let order: Vec<_> = scheduler.drain_due().iter().map(|f| f.handle).collect();
        assert_eq!(order, vec![first, second, late]);
    }

    #[test]
    fn test_cancel_owner_only_touches_that_owner() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(KART, 1.0, BOOST);
        let other = scheduler.schedule(KartId(1), 1.0, BOOST);

        assert_eq!(scheduler.cancel_owner(KART).len(), 1);
        assert_eq!(scheduler.pending_for(KART), 0);
        assert!(scheduler.is_pending(other));
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(KART, 1.0, BOOST);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        scheduler.advance(5.0);
        assert!(scheduler.drain_due().is_empty());
    }

    #[test]
    fn test_negative_advance_is_ignored() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(1.0);
        scheduler.advance(-4.0);
        scheduler.advance(f64::NAN);
        assert_eq!(scheduler.now(), 1.0);
    }
}
