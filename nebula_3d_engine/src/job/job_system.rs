/// Job system - decouples disk/codec-bound resource loading from the
/// single-threaded render/update loop.
///
/// Two operating modes, selected by `JobSystemConfig::thread_count`:
///
/// - **Inline** (`thread_count == 0`): `submit` runs the job synchronously
///   and invokes its completion immediately. Used when a backend cannot
///   tolerate off-thread work at all.
/// - **Multi-threaded**: a fixed pool of workers, each with a type-flag
///   mask. Jobs queue at three priorities; `update()` (called once per
///   frame on the owning thread) drains queues into idle matching workers
///   and then runs a bounded batch of pending completions.
///
/// Completions NEVER run on worker threads: workers hand finished jobs
/// back over a channel and the thread calling `update()` invokes exactly
/// one of on_success/on_failure. The job payload is owned by the job and
/// dropped exactly once, whether or not a completion consumes it.
///
/// There is no cancellation and no automatic retry; in-flight jobs always
/// run to completion, and retry policy belongs to the caller.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bitflags::bitflags;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::Result;
use crate::{engine_bail, engine_info, engine_warn};

/// Completions processed per `update()` tick
pub const MAX_COMPLETIONS_PER_UPDATE: usize = 512;

/// Idle poll interval for worker threads
const WORKER_IDLE_SLEEP: Duration = Duration::from_millis(10);

bitflags! {
    /// What kind of work a job performs, matched against worker masks
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JobTypeFlags: u8 {
        /// General work
        const GENERAL = 1 << 0;
        /// Disk/codec-bound resource loading
        const RESOURCE_LOAD = 1 << 1;
        /// Work touching GPU resources (often main-thread-only)
        const GPU_RESOURCE = 1 << 2;
    }
}

/// Job scheduling priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

impl JobPriority {
    fn queue_index(self) -> usize {
        match self {
            JobPriority::High => 0,
            JobPriority::Normal => 1,
            JobPriority::Low => 2,
        }
    }
}

/// Callback handed back to the update thread after a job runs
type Completion = Box<dyn FnOnce() + Send>;

/// The job's work function: runs on a worker (or inline), returns the
/// completion to invoke on the update thread
type Work = Box<dyn FnOnce(usize) -> Option<Completion> + Send>;

/// A unit of asynchronous work with typed success/failure continuations
pub struct Job {
    type_flags: JobTypeFlags,
    priority: JobPriority,
    work: Work,
}

impl Job {
    /// Create a job.
    ///
    /// `entry` runs on a worker thread (its argument is the worker index)
    /// and owns `payload` for the duration; returning `true` routes the
    /// payload to `on_success`, `false` to `on_failure`. If the selected
    /// callback is absent the payload is simply dropped.
    pub fn new<P, E>(
        type_flags: JobTypeFlags,
        priority: JobPriority,
        payload: P,
        entry: E,
        on_success: Option<Box<dyn FnOnce(P) + Send>>,
        on_failure: Option<Box<dyn FnOnce(P) + Send>>,
    ) -> Self
    where
        P: Send + 'static,
        E: FnOnce(usize, &mut P) -> bool + Send + 'static,
    {
        let work: Work = Box::new(move |worker_index| {
            let mut payload = payload;
            if entry(worker_index, &mut payload) {
                on_success.map(|cb| -> Completion { Box::new(move || cb(payload)) })
            } else {
                on_failure.map(|cb| -> Completion { Box::new(move || cb(payload)) })
            }
        });
        Self {
            type_flags,
            priority,
            work,
        }
    }

    /// Type flags this job was created with
    pub fn type_flags(&self) -> JobTypeFlags {
        self.type_flags
    }

    /// Priority this job was created with
    pub fn priority(&self) -> JobPriority {
        self.priority
    }
}

/// Job system configuration, consumed at init
#[derive(Debug, Clone)]
pub struct JobSystemConfig {
    /// Worker thread count; 0 selects inline mode
    pub thread_count: usize,
    /// Per-thread type masks. Threads beyond the vec's length default to
    /// GENERAL | RESOURCE_LOAD.
    pub type_masks: Vec<JobTypeFlags>,
}

impl Default for JobSystemConfig {
    fn default() -> Self {
        Self {
            thread_count: 0,
            type_masks: Vec::new(),
        }
    }
}

impl JobSystemConfig {
    /// A standard multi-threaded layout: `thread_count` workers, the first
    /// also accepting GPU-resource jobs
    pub fn with_threads(thread_count: usize) -> Self {
        let mut type_masks = vec![JobTypeFlags::GENERAL | JobTypeFlags::RESOURCE_LOAD; thread_count];
        if let Some(first) = type_masks.first_mut() {
            *first |= JobTypeFlags::GPU_RESOURCE;
        }
        Self {
            thread_count,
            type_masks,
        }
    }
}

/// One worker's shared state
struct WorkerSlot {
    /// The job assigned to this worker, set by the update thread
    job: Mutex<Option<Job>>,
    /// True from assignment until the worker finished the job
    busy: AtomicBool,
    /// Job types this worker accepts
    mask: JobTypeFlags,
}

/// Asynchronous task runner
pub struct JobSystem {
    running: Arc<AtomicBool>,
    slots: Vec<Arc<WorkerSlot>>,
    handles: Vec<JoinHandle<()>>,
    /// Priority queues (High, Normal, Low), owned by the update thread
    queues: [VecDeque<Job>; 3],
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
}

impl JobSystem {
    /// Create the job system.
    ///
    /// Spawns `config.thread_count` workers; zero threads selects inline
    /// mode where `submit` runs jobs synchronously.
    pub fn new(config: JobSystemConfig) -> Result<Self> {
        let (completion_tx, completion_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));

        let mut slots = Vec::with_capacity(config.thread_count);
        let mut handles = Vec::with_capacity(config.thread_count);

        for index in 0..config.thread_count {
            let mask = config
                .type_masks
                .get(index)
                .copied()
                .unwrap_or(JobTypeFlags::GENERAL | JobTypeFlags::RESOURCE_LOAD);
            let slot = Arc::new(WorkerSlot {
                job: Mutex::new(None),
                busy: AtomicBool::new(false),
                mask,
            });
            slots.push(slot.clone());

            let worker_running = running.clone();
            let tx = completion_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("nebula-job-{}", index))
                .spawn(move || worker_main(index, slot, worker_running, tx));
            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Let any already-spawned workers exit before failing.
                    running.store(false, Ordering::Release);
                    return Err(crate::error::Error::InitializationFailed(format!(
                        "failed to spawn job worker {}: {}",
                        index, e
                    )));
                }
            }
        }

        engine_info!(
            "nebula3d::JobSystem",
            "Job system initialized ({} worker threads{})",
            config.thread_count,
            if config.thread_count == 0 {
                ", inline mode"
            } else {
                ""
            }
        );

        Ok(Self {
            running,
            slots,
            handles,
            queues: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            completion_tx,
            completion_rx,
        })
    }

    /// Whether the system runs jobs inline on submit
    pub fn is_inline(&self) -> bool {
        self.slots.is_empty()
    }

    /// Submit a job.
    ///
    /// Inline mode runs the job and its completion immediately.
    /// Multi-threaded mode enqueues it (High-priority jobs first attempt
    /// direct assignment to an idle matching worker); rejects jobs whose
    /// type flags no worker mask covers.
    pub fn submit(&mut self, job: Job) -> Result<()> {
        if self.is_inline() {
            if let Some(completion) = (job.work)(0) {
                completion();
            }
            return Ok(());
        }

        if !self.slots.iter().any(|s| s.mask.intersects(job.type_flags)) {
            engine_bail!(
                "nebula3d::JobSystem",
                "No worker accepts job type {:?}",
                job.type_flags
            );
        }

        let job = if job.priority == JobPriority::High {
            match self.try_assign(job) {
                None => return Ok(()),
                Some(job) => job,
            }
        } else {
            job
        };

        self.queues[job.priority.queue_index()].push_back(job);
        Ok(())
    }

    /// Per-frame pump, called on the owning thread.
    ///
    /// Drains queued jobs into idle matching workers, then runs up to
    /// [`MAX_COMPLETIONS_PER_UPDATE`] pending completions on this thread.
    /// Returns the number of completions processed.
    pub fn update(&mut self) -> usize {
        // Hand queued jobs to idle workers, highest priority first.
        for queue_index in 0..self.queues.len() {
            while let Some(job) = self.queues[queue_index].pop_front() {
                match self.try_assign(job) {
                    None => continue,
                    Some(job) => {
                        self.queues[queue_index].push_front(job);
                        break;
                    }
                }
            }
        }

        let mut processed = 0;
        while processed < MAX_COMPLETIONS_PER_UPDATE {
            match self.completion_rx.try_recv() {
                Ok(completion) => {
                    completion();
                    processed += 1;
                }
                Err(_) => break,
            }
        }
        processed
    }

    /// Try to hand `job` to an idle worker with a matching mask.
    /// Returns the job back when every matching worker is busy.
    fn try_assign(&self, job: Job) -> Option<Job> {
        for slot in &self.slots {
            if slot.mask.intersects(job.type_flags) && !slot.busy.load(Ordering::Acquire) {
                slot.busy.store(true, Ordering::Release);
                *slot.job.lock().unwrap() = Some(job);
                return None;
            }
        }
        Some(job)
    }

    /// Jobs waiting in the priority queues
    pub fn queued_job_count(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                engine_warn!("nebula3d::JobSystem", "Worker thread panicked: {:?}", e);
            }
        }
    }
}

/// Worker thread body: poll the slot, run jobs, hand completions back
fn worker_main(
    index: usize,
    slot: Arc<WorkerSlot>,
    running: Arc<AtomicBool>,
    completion_tx: Sender<Completion>,
) {
    while running.load(Ordering::Acquire) {
        let job = slot.job.lock().unwrap().take();
        match job {
            Some(job) => {
                let completion = (job.work)(index);
                if let Some(completion) = completion {
                    // The update thread invokes this; workers never do.
                    completion_tx.send(completion).ok();
                }
                slot.busy.store(false, Ordering::Release);
            }
            None => {
                std::thread::sleep(WORKER_IDLE_SLEEP);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "job_system_tests.rs"]
mod tests;
