//! Deferred one-shot tasks on a dedicated timer thread.
//!
//! Timers are coarse (wall clock, not audio clock) and never block the caller.

use crossbeam_channel::{RecvTimeoutError, Sender};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

enum Command {
    Schedule {
        id: TimerId,
        deadline: Instant,
        task: Task,
    },
    Cancel(TimerId),
}

pub struct Scheduler {
    commands: Sender<Command>,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        let (commands, inbox) = crossbeam_channel::unbounded::<Command>();

        let spawned = std::thread::Builder::new()
            .name("sound-timers".into())
            .spawn(move || {
                let mut queue: BinaryHeap<Reverse<(Instant, TimerId)>> = BinaryHeap::new();
                let mut tasks: HashMap<TimerId, Task> = HashMap::new();
                let mut open = true;

                loop {
                    let next_deadline = queue.peek().map(|Reverse((deadline, _))| *deadline);
                    let command = match (next_deadline, open) {
                        (Some(deadline), true) => match inbox.recv_deadline(deadline) {
                            Ok(command) => Some(command),
                            Err(RecvTimeoutError::Timeout) => None,
                            Err(RecvTimeoutError::Disconnected) => {
                                open = false;
                                None
                            }
                        },
                        (Some(deadline), false) => {
                            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                            None
                        }
                        (None, true) => match inbox.recv() {
                            Ok(command) => Some(command),
                            Err(_) => {
                                open = false;
                                None
                            }
                        },
                        (None, false) => break,
                    };

                    match command {
                        Some(Command::Schedule { id, deadline, task }) => {
                            queue.push(Reverse((deadline, id)));
                            tasks.insert(id, task);
                        }
                        Some(Command::Cancel(id)) => {
                            if tasks.remove(&id).is_some() {
                                debug!("Timer {:?} cancelled", id);
                            }
                        }
                        None => {}
                    }
                    // A steady stream of commands must not hold back due tasks.
                    Self::run_due(&mut queue, &mut tasks);
                }
                debug!("Timer thread finished");
            });

        if let Err(err) = spawned {
            // Tasks sent to a dead thread are silently dropped; sounds stay silent.
            error!("Failed to start timer thread: {}", err);
        }

        Self {
            commands,
            next_id: AtomicU64::new(0),
        }
    }

    fn run_due(
        queue: &mut BinaryHeap<Reverse<(Instant, TimerId)>>,
        tasks: &mut HashMap<TimerId, Task>,
    ) {
        let now = Instant::now();
        while let Some(Reverse((deadline, id))) = queue.peek().copied() {
            if deadline > now {
                break;
            }
            queue.pop();
            if let Some(task) = tasks.remove(&id) {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    error!("Timer task {:?} panicked", id);
                }
            }
        }
    }

    /// Runs `task` once after `delay`. Returns immediately.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let deadline = Instant::now() + delay;
        let _ = self.commands.send(Command::Schedule {
            id,
            deadline,
            task: Box::new(task),
        });
        id
    }

    /// Drops a pending task. No effect if it already ran.
    pub fn cancel(&self, id: TimerId) {
        let _ = self.commands.send(Command::Cancel(id));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn tasks_run_in_deadline_order() {
        let scheduler = Scheduler::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        for (label, delay) in [("c", 60), ("a", 0), ("b", 30)] {
            let tx = tx.clone();
            scheduler.schedule(Duration::from_millis(delay), move || {
                tx.send(label).unwrap();
            });
        }
        let order: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn schedule_does_not_block_the_caller() {
        let scheduler = Scheduler::new();
        let started = Instant::now();
        scheduler.schedule(Duration::from_secs(5), || {});
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn cancelled_task_never_runs() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let h = hits.clone();
        let id = scheduler.schedule(Duration::from_millis(50), move || h.lock().push("cancelled"));
        scheduler.cancel(id);
        let (tx, rx) = crossbeam_channel::bounded(1);
        scheduler.schedule(Duration::from_millis(100), move || tx.send(()).unwrap());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(hits.lock().is_empty());
    }

    #[test]
    fn panicking_task_does_not_stop_the_timer_thread() {
        let scheduler = Scheduler::new();
        scheduler.schedule(Duration::ZERO, || panic!("boom"));
        let (tx, rx) = crossbeam_channel::bounded(1);
        scheduler.schedule(Duration::from_millis(10), move || tx.send(()).unwrap());
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn due_tasks_run_during_a_command_burst() {
        use std::sync::atomic::AtomicBool;

        let scheduler = Arc::new(Scheduler::new());
        let (tx, rx) = crossbeam_channel::bounded(1);
        scheduler.schedule(Duration::from_millis(20), move || tx.send(()).unwrap());

        let stop = Arc::new(AtomicBool::new(false));
        let flooder = {
            let scheduler = scheduler.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                let mut id = u64::MAX;
                while !stop.load(Ordering::Relaxed) {
                    scheduler.cancel(TimerId(id));
                    id -= 1;
                }
            })
        };

        let ran = rx.recv_timeout(Duration::from_millis(500)).is_ok();
        stop.store(true, Ordering::Relaxed);
        flooder.join().unwrap();
        assert!(ran);
    }

    #[test]
    fn pending_tasks_still_run_after_drop() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        {
            let scheduler = Scheduler::new();
            scheduler.schedule(Duration::from_millis(20), move || tx.send(()).unwrap());
        }
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }
}
