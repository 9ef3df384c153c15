//! Fan-out/join with cancellation.
//!
//! A job tracks `total` completion tokens. `on_done` fires exactly once:
//! with `true` when every token completed successfully, with `false` when any
//! token failed or the job was cancelled first.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of a join job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

type OnDone = Box<dyn FnOnce(bool)>;

struct JobState {
    completed: usize,
    total: usize,
    succeeded: bool,
    /// `None` once the job settled or was cancelled
    on_done: Option<OnDone>,
}

impl JobState {
    fn is_pending(&self) -> bool {
        self.on_done.is_some()
    }
}

/// Private completion callback handed to one task.
///
/// Dropping a token without firing it counts as a failed completion.
pub struct Completion {
    job: Option<Rc<RefCell<JobState>>>,
}

impl Completion {
    pub fn complete(mut self) {
        self.fire(true);
    }

    pub fn fail(mut self) {
        self.fire(false);
    }

    fn fire(&mut self, ok: bool) {
        let Some(job) = self.job.take() else {
            return;
        };

        let settled = {
            let mut state = job.borrow_mut();
            if !state.is_pending() {
                // cancelled or already settled
                return;
            }
            state.completed += 1;
            state.succeeded &= ok;
            if state.completed == state.total {
                let succeeded = state.succeeded;
                state.on_done.take().map(|on_done| (on_done, succeeded))
            } else {
                None
            }
        };

        if let Some((on_done, succeeded)) = settled {
            on_done(succeeded);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.fire(false);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("fired", &self.job.is_none())
            .finish()
    }
}

/// Tracks running join jobs so they can be cancelled by id
#[derive(Default)]
pub struct ParallelQueue {
    next_id: u64,
    jobs: FxHashMap<JobId, Weak<RefCell<JobState>>>,
}

impl ParallelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a job expecting `total` completions; returns one token per completion
    pub fn start(
        &mut self,
        total: usize,
        on_done: impl FnOnce(bool) + 'static,
    ) -> (JobId, Vec<Completion>) {
        self.prune();

        let id = JobId(self.next_id);
        self.next_id += 1;

        if total == 0 {
            on_done(true);
            return (id, Vec::new());
        }

        let job = Rc::new(RefCell::new(JobState {
            completed: 0,
            total,
            succeeded: true,
            on_done: Some(Box::new(on_done)),
        }));
        self.jobs.insert(id, Rc::downgrade(&job));

        let completions = (0..total)
            .map(|_| Completion {
                job: Some(Rc::clone(&job)),
            })
            .collect();

        (id, completions)
    }

    /// Invoke each task with its private completion token
    pub fn run<I, F>(&mut self, tasks: I, on_done: impl FnOnce(bool) + 'static) -> JobId
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(Completion),
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        let (id, completions) = self.start(tasks.len(), on_done);

        for (task, completion) in tasks.into_iter().zip(completions) {
            task(completion);
        }

        id
    }

    /// Cancel a pending job. `on_done(false)` fires now; later completions are no-ops.
    ///
    /// Returns `false` when the job already settled or was cancelled.
    pub fn cancel(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.remove(&id).and_then(|weak| weak.upgrade()) else {
            return false;
        };

        let on_done = job.borrow_mut().on_done.take();
        match on_done {
            Some(on_done) => {
                on_done(false);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: JobId) -> bool {
        self.jobs
            .get(&id)
            .and_then(Weak::upgrade)
            .is_some_and(|job| job.borrow().is_pending())
    }

    /// Number of jobs still waiting on completions
    pub fn pending(&self) -> usize {
        self.jobs
            .values()
            .filter_map(Weak::upgrade)
            .filter(|job| job.borrow().is_pending())
            .count()
    }

    fn prune(&mut self) {
        self.jobs.retain(|_, weak| {
            weak.upgrade()
                .is_some_and(|job| job.borrow().is_pending())
        });
    }
}

impl fmt::Debug for ParallelQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelQueue")
            .field("next_id", &self.next_id)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, impl FnOnce(bool) + 'static) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        (calls, move |ok| sink.borrow_mut().push(ok))
    }

    #[test]
    fn test_all_tasks_complete() {
        let mut queue = ParallelQueue::new();
        let (calls, on_done) = recorder();

        let (id, completions) = queue.start(3, on_done);
        assert!(queue.is_pending(id));

        for completion in completions {
            assert!(calls.borrow().is_empty());
            completion.complete();
        }

        assert_eq!(*calls.borrow(), vec![true]);
        assert!(!queue.is_pending(id));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_run_invokes_tasks_inline() {
        let mut queue = ParallelQueue::new();
        let (calls, on_done) = recorder();
        let invoked = Rc::new(Cell::new(0));

        let tasks = (0..4).map(|_| {
            let invoked = Rc::clone(&invoked);
            move |completion: Completion| {
                invoked.set(invoked.get() + 1);
                completion.complete();
            }
        });
        queue.run(tasks, on_done);

        assert_eq!(invoked.get(), 4);
        assert_eq!(*calls.borrow(), vec![true]);
    }

    #[test]
    fn test_empty_job_finishes_immediately() {
        let mut queue = ParallelQueue::new();
        let (calls, on_done) = recorder();

        let (id, completions) = queue.start(0, on_done);

        assert!(completions.is_empty());
        assert_eq!(*calls.borrow(), vec![true]);
        assert!(!queue.cancel(id));
    }

    #[test]
    fn test_cancel_after_partial_completion_fires_once() {
        let mut queue = ParallelQueue::new();
        let (calls, on_done) = recorder();

        let (id, mut completions) = queue.start(5, on_done);
        let rest = completions.split_off(2);

        for completion in completions {
            completion.complete();
        }
        assert!(queue.cancel(id));
        for completion in rest {
            completion.complete();
        }

        assert_eq!(*calls.borrow(), vec![false]);
        assert!(!queue.cancel(id), "second cancel is a no-op");
        assert_eq!(*calls.borrow(), vec![false]);
    }

    #[test]
    fn test_failed_completion_reports_false() {
        let mut queue = ParallelQueue::new();
        let (calls, on_done) = recorder();

        let (_, mut completions) = queue.start(2, on_done);
        completions.remove(0).fail();
        completions.remove(0).complete();

        assert_eq!(*calls.borrow(), vec![false]);
    }

    #[test]
    fn test_dropped_completion_counts_as_failure() {
        let mut queue = ParallelQueue::new();
        let (calls, on_done) = recorder();

        let (_, completions) = queue.start(2, on_done);
        drop(completions);

        assert_eq!(*calls.borrow(), vec![false]);
    }

    #[test]
    fn test_job_ids_are_unique() {
        let mut queue = ParallelQueue::new();
        let (a, _keep_a) = queue.start(1, |_| {});
        let (b, _keep_b) = queue.start(1, |_| {});
        assert_ne!(a, b);
        assert_eq!(queue.pending(), 2);
        assert_eq!(a.to_string(), "job-0");
    }
}
