//! Timer bookkeeping driven by the injected clock.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Work the agent runs on a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Task {
    /// Visible-time accrual tick.
    Heartbeat,
    /// Timer-driven flush.
    Flush,
    /// Cadence decision check.
    Decision,
    /// One-off decision check after load.
    BootDecision,
    /// Cart refresh after an add-to-cart click.
    CartRefresh,
}

/// Next due time per task. Periodic tasks reschedule themselves.
#[derive(Debug, Default)]
pub struct Schedule {
    due: BTreeMap<Task, DateTime<Utc>>,
    periods: BTreeMap<Task, Duration>,
}

impl Schedule {
    /// Empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `period`, first at `now + period`. Periods under
    /// one millisecond are raised to one.
    pub fn every(&mut self, task: Task, period: Duration, now: DateTime<Utc>) {
        let period = period.max(Duration::milliseconds(1));
        self.periods.insert(task, period);
        self.due.insert(task, now + period);
    }

    /// Run `task` once at `at`, replacing any pending run.
    pub fn once(&mut self, task: Task, at: DateTime<Utc>) {
        self.periods.remove(&task);
        self.due.insert(task, at);
    }

    /// Earliest pending due time.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.due.values().min().copied()
    }

    /// Whether `task` is pending.
    #[must_use]
    pub fn is_pending(&self, task: Task) -> bool {
        self.due.contains_key(&task)
    }

    /// Pop every task due at `now`, rescheduling periodic ones from `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Task> {
        let ready: Vec<Task> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(task, _)| *task)
            .collect();
        for task in &ready {
            match self.periods.get(task) {
                Some(period) => {
                    self.due.insert(*task, now + *period);
                }
                None => {
                    self.due.remove(task);
                }
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn periodic_task_reschedules() {
        let mut schedule = Schedule::new();
        schedule.every(Task::Flush, Duration::milliseconds(5_000), at(0));

        assert!(schedule.take_due(at(4_999)).is_empty());
        assert_eq!(schedule.take_due(at(5_000)), vec![Task::Flush]);
        assert_eq!(schedule.next_due(), Some(at(10_000)));
    }

    #[test]
    fn zero_period_still_advances() {
        let mut schedule = Schedule::new();
        schedule.every(Task::Heartbeat, Duration::zero(), at(0));

        assert_eq!(schedule.take_due(at(1)), vec![Task::Heartbeat]);
        assert_eq!(schedule.next_due(), Some(at(2)));
        assert!(schedule.take_due(at(1)).is_empty());
    }

    #[test]
    fn one_shot_task_runs_once() {
        let mut schedule = Schedule::new();
        schedule.once(Task::BootDecision, at(1_500));

        assert_eq!(schedule.take_due(at(2_000)), vec![Task::BootDecision]);
        assert!(!schedule.is_pending(Task::BootDecision));
        assert!(schedule.take_due(at(9_000)).is_empty());
    }

    #[test]
    fn once_replaces_pending_run() {
        let mut schedule = Schedule::new();
        schedule.once(Task::CartRefresh, at(800));
        schedule.once(Task::CartRefresh, at(1_200));

        assert!(schedule.take_due(at(1_000)).is_empty());
        assert_eq!(schedule.take_due(at(1_200)), vec![Task::CartRefresh]);
    }

    #[test]
    fn due_tasks_come_out_in_task_order() {
        let mut schedule = Schedule::new();
        schedule.every(Task::Decision, Duration::milliseconds(1_000), at(0));
        schedule.every(Task::Heartbeat, Duration::milliseconds(1_000), at(0));

        assert_eq!(
            schedule.take_due(at(1_000)),
            vec![Task::Heartbeat, Task::Decision]
        );
    }
}
