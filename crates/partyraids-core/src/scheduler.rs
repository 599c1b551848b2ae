//! Cooperative tick scheduler.
//!
//! A monotonic deadline queue for hosts that drive work from a game tick.
//! Tasks are executed outside the queue lock, so a running task may schedule
//! further tasks (the scrubber re-arms itself this way).

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::host::ScheduledTask;

#[derive(Default)]
struct Queue {
    current_tick: u64,
    next_seq: u64,
    pending: BTreeMap<(u64, u64), ScheduledTask>,
}

/// Deadline queue of one-shot tasks keyed by host tick.
#[derive(Default)]
pub struct TickScheduler {
    queue: Mutex<Queue>,
}

impl TickScheduler {
    /// Creates an empty scheduler at tick zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms `task` to run `delay_ticks` after the current tick. Tasks due on
    /// the same tick run in the order they were scheduled.
    pub fn schedule(&self, delay_ticks: u64, task: ScheduledTask) {
        let mut queue = self.lock();
        let due = queue.current_tick.saturating_add(delay_ticks);
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.pending.insert((due, seq), task);
    }

    /// Moves time forward by `ticks`, running every task that comes due.
    /// Returns the number of tasks executed.
    pub fn advance(&self, ticks: u64) -> usize {
        let target = self.lock().current_tick.saturating_add(ticks);
        let mut executed = 0;

        loop {
            let task = {
                let mut queue = self.lock();
                let next_due = queue.pending.first_key_value().map(|(&(due, _), _)| due);
                match next_due {
                    Some(due) if due <= target => {
                        queue.current_tick = queue.current_tick.max(due);
                        queue.pending.pop_first().map(|(_, task)| task)
                    }
                    _ => {
                        queue.current_tick = target;
                        None
                    }
                }
            };

            match task {
                Some(task) => {
                    task();
                    executed += 1;
                }
                None => return executed,
            }
        }
    }

    /// The tick the scheduler has advanced to.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.lock().current_tick
    }

    /// Number of armed tasks that have not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }
}
