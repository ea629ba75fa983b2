//! Background pipeline stages.
//!
//! Each stage is a bounded crossbeam channel drained by a fixed pool of named
//! worker threads. Workers block in `recv` between jobs. Shutdown sets the
//! shared stop flag and drops the stage's only sender, which disconnects the
//! channel and wakes every blocked worker at once.
//!
//! A per-stage in-flight set keyed by chunk coordinate is the single
//! duplicate-suppression mechanism: a coordinate can be queued or running in
//! a stage at most once.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use dashmap::DashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};
use voxen_common::{ChunkCoord, ChunkCoordBuildHasher};

use crate::error::{WorldError, WorldResult};

/// A unit of work for one chunk.
pub trait StageJob: Send + 'static {
    /// Chunk the job operates on.
    fn coord(&self) -> ChunkCoord;
}

/// What a worker did with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Work performed
    Done,
    /// Nothing to do (already handled or chunk gone)
    Skipped,
    /// Preconditions not met yet; the scan will resubmit
    Deferred,
}

type InFlight = DashSet<ChunkCoord, ChunkCoordBuildHasher>;

/// One pipeline stage: a bounded queue plus its worker pool.
pub struct Stage<J: StageJob> {
    name: &'static str,
    sender: Option<Sender<J>>,
    in_flight: Arc<InFlight>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl<J: StageJob> Stage<J> {
    /// Spawns `workers` threads running `handler` on queued jobs.
    pub fn spawn<F>(
        name: &'static str,
        workers: usize,
        capacity: usize,
        stop: Arc<AtomicBool>,
        handler: F,
    ) -> WorldResult<Self>
    where
        F: Fn(&J) -> WorldResult<JobOutcome> + Send + Sync + 'static,
    {
        let (sender, receiver) = bounded::<J>(capacity);
        let in_flight = Arc::new(InFlight::with_hasher(ChunkCoordBuildHasher::default()));
        let handler = Arc::new(handler);

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);
            let in_flight = Arc::clone(&in_flight);
            let stop = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("voxen-{name}-{i}"))
                .spawn(move || run_worker(name, &receiver, handler.as_ref(), &in_flight, &stop))
                .map_err(|source| WorldError::Spawn {
                    stage: name,
                    source,
                })?;
            handles.push(handle);
        }
        debug!("Started {name} stage with {workers} workers");

        Ok(Self {
            name,
            sender: Some(sender),
            in_flight,
            stop,
            workers: handles,
        })
    }

    /// Queues a job without blocking.
    ///
    /// Returns `false` if the coordinate is already in flight, the queue is
    /// full, or the stage is shutting down. Rejected jobs are picked up again
    /// by a later scan.
    pub fn submit(&self, job: J) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        if self.stop.load(Ordering::Acquire) {
            return false;
        }
        let coord = job.coord();
        if !self.in_flight.insert(coord) {
            return false;
        }
        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.in_flight.remove(&coord);
                false
            },
        }
    }

    /// Jobs queued or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true if a job for `coord` is queued or running.
    #[must_use]
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.in_flight.contains(&coord)
    }

    /// Returns the stage name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting jobs, wakes all workers and joins them.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("{} worker exited with a panic", self.name);
            }
        }
    }
}

impl<J: StageJob> Drop for Stage<J> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<J: StageJob> std::fmt::Debug for Stage<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("workers", &self.workers.len())
            .field("pending", &self.in_flight.len())
            .finish()
    }
}

fn run_worker<J: StageJob>(
    name: &'static str,
    receiver: &Receiver<J>,
    handler: &(dyn Fn(&J) -> WorldResult<JobOutcome> + Send + Sync),
    in_flight: &InFlight,
    stop: &AtomicBool,
) {
    while let Ok(job) = receiver.recv() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let coord = job.coord();
        match catch_unwind(AssertUnwindSafe(|| handler(&job))) {
            Ok(Ok(JobOutcome::Deferred)) => debug!("{name} job for chunk {coord} deferred"),
            Ok(Ok(_)) => {},
            Ok(Err(e)) => warn!("{name} job for chunk {coord} failed: {e}"),
            Err(_) => error!("{name} job for chunk {coord} panicked"),
        }
        in_flight.remove(&coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChunkState, StateError};
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    struct TestJob(ChunkCoord);

    impl StageJob for TestJob {
        fn coord(&self) -> ChunkCoord {
            self.0
        }
    }

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_jobs_run_on_workers() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let stage = Stage::spawn("test", 3, 64, running(), move |_: &TestJob| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(JobOutcome::Done)
        })
        .expect("spawn");
        assert_eq!(stage.worker_count(), 3);

        for x in 0..20 {
            assert!(stage.submit(TestJob(ChunkCoord::new(x, 0, 0))));
        }
        assert!(wait_until(|| done.load(Ordering::SeqCst) == 20));
        assert!(wait_until(|| stage.pending() == 0));
    }

    #[test]
    fn test_in_flight_coordinates_are_deduplicated() {
        let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
        let stage = Stage::spawn("dedupe", 1, 8, running(), move |_: &TestJob| {
            let _ = release_rx.recv();
            Ok(JobOutcome::Done)
        })
        .expect("spawn");

        let coord = ChunkCoord::new(1, 2, 3);
        assert!(stage.submit(TestJob(coord)));
        assert!(!stage.submit(TestJob(coord)));
        assert!(stage.is_pending(coord));

        release_tx.send(()).expect("release");
        assert!(wait_until(|| !stage.is_pending(coord)));
        assert!(stage.submit(TestJob(coord)));
        release_tx.send(()).expect("release");
    }

    #[test]
    fn test_failing_jobs_do_not_stop_the_stage() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let stage = Stage::spawn("flaky", 1, 8, running(), move |job: &TestJob| {
            match job.0.x {
                0 => Err(StateError {
                    from: ChunkState::Uninitialized,
                    event: "test",
                }
                .into()),
                1 => panic!("boom"),
                _ => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(JobOutcome::Done)
                },
            }
        })
        .expect("spawn");

        for x in 0..3 {
            assert!(stage.submit(TestJob(ChunkCoord::new(x, 0, 0))));
        }
        assert!(wait_until(|| done.load(Ordering::SeqCst) == 1));
        assert!(wait_until(|| stage.pending() == 0));
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut stage = Stage::spawn("stop", 4, 8, Arc::clone(&stop), |_: &TestJob| {
            Ok(JobOutcome::Skipped)
        })
        .expect("spawn");
        stage.shutdown();
        assert_eq!(stage.worker_count(), 0);
        assert!(stop.load(Ordering::SeqCst));
        assert!(!stage.submit(TestJob(ChunkCoord::default())));
    }
}
