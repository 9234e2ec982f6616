//! Background jobs and main-thread marshaling
//!
//! Worker threads prepare data (decoding, mesh building) but never touch the
//! renderer. Work that needs the render manager, the assets or the backend is
//! queued with [`JobManager::execute_on_main_thread`] and runs when the main
//! loop calls [`JobManager::run_main_thread_jobs`].

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::backend::GraphicsBackend;
use crate::manager::RenderManager;
use crate::resources::RenderAssets;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to spawn job worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Identifies a job queued with [`JobManager::execute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

/// Everything a main-thread job may touch
pub struct MainThread<'a> {
    pub manager: &'a mut RenderManager,
    pub assets: &'a mut RenderAssets,
    pub backend: &'a mut dyn GraphicsBackend,
}

type WorkerJob = Box<dyn FnOnce() + Send>;
type MainThreadJob = Box<dyn FnOnce(&mut MainThread<'_>) + Send>;

/// Ids of worker jobs that have not finished yet
#[derive(Default)]
struct JobTracker {
    pending: Mutex<HashSet<JobId>>,
    finished: Condvar,
}

impl JobTracker {
    fn start(&self, id: JobId) {
        self.pending.lock().insert(id);
    }

    fn finish(&self, id: JobId) {
        self.pending.lock().remove(&id);
        self.finished.notify_all();
    }

    fn wait(&self, id: JobId) {
        let mut pending = self.pending.lock();
        while pending.contains(&id) {
            self.finished.wait(&mut pending);
        }
    }
}

/// Cloneable handle worker jobs use to queue main-thread work
#[derive(Clone)]
pub struct MainThreadSender {
    sender: flume::Sender<MainThreadJob>,
}

impl MainThreadSender {
    pub fn send(&self, job: impl FnOnce(&mut MainThread<'_>) + Send + 'static) {
        if self.sender.send(Box::new(job)).is_err() {
            log::error!("Main-thread job dropped: job manager has shut down");
        }
    }
}

/// Worker pool plus a queue of jobs that must run on the main thread.
pub struct JobManager {
    sender: Option<flume::Sender<(JobId, WorkerJob)>>,
    workers: Vec<thread::JoinHandle<()>>,
    main_sender: flume::Sender<MainThreadJob>,
    main_receiver: flume::Receiver<MainThreadJob>,
    tracker: Arc<JobTracker>,
    next_id: AtomicU64,
    /// Main-thread jobs run per call to `run_main_thread_jobs`, the rest wait
    /// for the next call
    max_main_thread_jobs: usize,
}

impl JobManager {
    pub fn new(worker_threads: usize) -> Result<Self, JobError> {
        let (sender, receiver) = flume::unbounded::<(JobId, WorkerJob)>();
        let (main_sender, main_receiver) = flume::unbounded();
        let tracker = Arc::new(JobTracker::default());

        let worker_threads = worker_threads.max(1);
        let mut workers = Vec::with_capacity(worker_threads);
        for index in 0..worker_threads {
            let receiver = receiver.clone();
            let tracker = Arc::clone(&tracker);
            let handle = thread::Builder::new()
                .name(format!("job-worker-{}", index))
                .spawn(move || {
                    while let Ok((id, job)) = receiver.recv() {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            log::error!("Job {:?} panicked", id);
                        }
                        tracker.finish(id);
                    }
                })?;
            workers.push(handle);
        }
        log::debug!("Started {} job workers", worker_threads);

        Ok(Self {
            sender: Some(sender),
            workers,
            main_sender,
            main_receiver,
            tracker,
            next_id: AtomicU64::new(0),
            max_main_thread_jobs: 32,
        })
    }

    pub fn with_max_main_thread_jobs(mut self, max: usize) -> Self {
        self.max_main_thread_jobs = max.max(1);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Run `job` on a worker thread
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.tracker.start(id);

        let sent = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send((id, Box::new(job))).is_ok());
        if !sent {
            log::error!("Job {:?} dropped: workers have shut down", id);
            self.tracker.finish(id);
        }
        id
    }

    /// Queue `job` for the next [`run_main_thread_jobs`](Self::run_main_thread_jobs)
    pub fn execute_on_main_thread(&self, job: impl FnOnce(&mut MainThread<'_>) + Send + 'static) {
        self.main_thread_sender().send(job);
    }

    pub fn main_thread_sender(&self) -> MainThreadSender {
        MainThreadSender {
            sender: self.main_sender.clone(),
        }
    }

    /// Block until the worker job `id` has finished
    pub fn wait_on_job(&self, id: JobId) {
        self.tracker.wait(id);
    }

    pub fn is_finished(&self, id: JobId) -> bool {
        !self.tracker.pending.lock().contains(&id)
    }

    pub fn pending_main_thread_jobs(&self) -> usize {
        self.main_receiver.len()
    }

    /// Run queued main-thread jobs in submission order; returns how many ran.
    pub fn run_main_thread_jobs(&self, ctx: &mut MainThread<'_>) -> usize {
        let mut ran = 0;
        while ran < self.max_main_thread_jobs {
            let Ok(job) = self.main_receiver.try_recv() else {
                break;
            };
            job(&mut *ctx);
            ran += 1;
        }
        ran
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        // Closing the channel ends every worker loop once the queue drains
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Job worker panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_wait_on_job() {
        let jobs = JobManager::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let ids: Vec<JobId> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                jobs.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for id in ids {
            jobs.wait_on_job(id);
            assert!(jobs.is_finished(id));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_panicking_job_still_finishes() {
        let jobs = JobManager::new(1).unwrap();
        let id = jobs.execute(|| panic!("job failure"));
        jobs.wait_on_job(id);
        assert!(jobs.is_finished(id));
    }

    #[test]
    fn test_drop_joins_workers() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let jobs = JobManager::new(3).unwrap();
            assert_eq!(jobs.worker_count(), 3);
            for _ in 0..4 {
                let counter = Arc::clone(&counter);
                jobs.execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}
