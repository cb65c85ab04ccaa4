//! Priority-ordered render queue.
//!
//! Accepts (document, page, scale, priority, callback) render requests and
//! executes them when the owner pumps the queue. Higher-priority requests
//! run first; within a priority level requests run in submission order.
//! Nothing renders eagerly; only queued pages are ever rendered.

use crate::cancel::CancellationToken;
use crate::priority::PagePriority;
use log::{debug, trace};
use paperview_engine::{DocumentHandle, EngineError, PageSurface, RenderEngine, RenderParams};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};

/// Unique identifier for a queued render job.
pub type JobId = u64;

/// Completion callback for a render request.
///
/// Invoked with the page number and either the rendered surface or the
/// engine error that sank the attempt. Never invoked for cancelled jobs.
pub type RenderCallback = Arc<dyn Fn(u32, Result<PageSurface, EngineError>) + Send + Sync>;

/// A single page render request. Ephemeral: one per render attempt.
pub struct RenderRequest {
    pub document: DocumentHandle,
    pub page_number: u32,
    pub scale: f32,
    pub priority: PagePriority,
    pub callback: RenderCallback,
}

struct Job {
    id: JobId,
    insertion_order: u64,
    request: RenderRequest,
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.request.priority.cmp(&other.request.priority) {
            // BinaryHeap is a max-heap; reverse insertion order so equal
            // priorities dequeue FIFO.
            Ordering::Equal => other.insertion_order.cmp(&self.insertion_order),
            ordering => ordering,
        }
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub queue_size: usize,
}

struct QueueState {
    heap: BinaryHeap<Job>,
    tokens: HashMap<JobId, CancellationToken>,
    next_job_id: JobId,
    insertion_counter: u64,
    stats: QueueStats,
}

/// Shared, caller-pumped render queue.
///
/// Thread-safe so multiple viewer instances can share one queue via `Arc`.
/// Execution itself is cooperative: `process_next` runs at most one job and
/// returns, so the owner controls interleaving.
pub struct RenderQueue {
    state: Mutex<QueueState>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                tokens: HashMap::new(),
                next_job_id: 1,
                insertion_counter: 0,
                stats: QueueStats::default(),
            }),
        }
    }

    /// Queue a render request.
    ///
    /// Returns the job id and a cancellation token. Cancelling the token
    /// turns the job into a no-op: it is skipped when reached and its
    /// callback never fires.
    pub fn submit(&self, request: RenderRequest) -> (JobId, CancellationToken) {
        let mut state = self.state.lock().unwrap();

        let id = state.next_job_id;
        state.next_job_id += 1;
        let insertion_order = state.insertion_counter;
        state.insertion_counter += 1;

        trace!(
            "queue render: page {} priority {:?} (job {})",
            request.page_number,
            request.priority,
            id
        );

        let token = CancellationToken::new();
        state.tokens.insert(id, token.clone());
        state.heap.push(Job { id, insertion_order, request });
        state.stats.jobs_submitted += 1;

        (id, token)
    }

    /// Execute the highest-priority pending job.
    ///
    /// Returns the job id if a job was dequeued (including cancelled jobs,
    /// which are dropped without running or invoking their callback), or
    /// `None` if the queue is empty. Rendering runs outside the queue lock.
    pub fn process_next(&self, engine: &dyn RenderEngine) -> Option<JobId> {
        let (job, token) = {
            let mut state = self.state.lock().unwrap();
            let job = state.heap.pop()?;
            let token = state.tokens.remove(&job.id);
            (job, token)
        };

        Some(self.execute(engine, job, token))
    }

    /// Execute the highest-priority pending job belonging to `document`.
    ///
    /// When the queue is shared between viewer instances, each viewer pumps
    /// only its own document's jobs. Jobs for other documents stay queued.
    pub fn process_next_for(
        &self,
        engine: &dyn RenderEngine,
        document: DocumentHandle,
    ) -> Option<JobId> {
        let (job, token) = {
            let mut state = self.state.lock().unwrap();

            let mut skipped = Vec::new();
            let mut found = None;
            while let Some(job) = state.heap.pop() {
                if job.request.document == document {
                    found = Some(job);
                    break;
                }
                skipped.push(job);
            }
            for job in skipped {
                state.heap.push(job);
            }

            let job = found?;
            let token = state.tokens.remove(&job.id);
            (job, token)
        };

        Some(self.execute(engine, job, token))
    }

    fn execute(&self, engine: &dyn RenderEngine, job: Job, token: Option<CancellationToken>) -> JobId {
        if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            debug!("skipping cancelled render job {}", job.id);
            self.state.lock().unwrap().stats.jobs_cancelled += 1;
            return job.id;
        }

        let params = RenderParams { page_number: job.request.page_number, scale: job.request.scale };
        let result = engine.render_page(job.request.document, params);

        {
            let mut state = self.state.lock().unwrap();
            if result.is_ok() {
                state.stats.jobs_completed += 1;
            } else {
                state.stats.jobs_failed += 1;
            }
        }

        (job.request.callback)(job.request.page_number, result);
        job.id
    }

    /// Raise the priority of a pending render for a document page.
    ///
    /// A page submitted at a background priority can become visible while it
    /// is still waiting; the pending job is promoted in place and keeps its
    /// original submission order, so it still dequeues ahead of later
    /// submissions at the same level. A lower or equal priority leaves the
    /// job untouched. Returns `true` if a pending job was promoted.
    pub fn upgrade_priority(
        &self,
        document: DocumentHandle,
        page_number: u32,
        priority: PagePriority,
    ) -> bool {
        let mut state = self.state.lock().unwrap();

        let mut jobs: Vec<Job> = state.heap.drain().collect();
        let mut upgraded = false;
        for job in &mut jobs {
            if job.request.document == document
                && job.request.page_number == page_number
                && job.request.priority < priority
            {
                trace!(
                    "promote page {} from {:?} to {:?} (job {})",
                    page_number,
                    job.request.priority,
                    priority,
                    job.id
                );
                job.request.priority = priority;
                upgraded = true;
            }
        }
        state.heap = jobs.into_iter().collect();

        upgraded
    }

    /// Cancel a queued job by id. Returns `true` if the job was pending.
    pub fn cancel_job(&self, id: JobId) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.tokens.remove(&id) {
            Some(token) => {
                token.cancel();
                let before = state.heap.len();
                let remaining: Vec<Job> =
                    state.heap.drain().filter(|job| job.id != id).collect();
                state.heap = remaining.into_iter().collect();
                state.stats.jobs_cancelled += (before - state.heap.len()) as u64;
                true
            }
            None => false,
        }
    }

    /// Cancel every pending job for a document. Returns the number dropped.
    ///
    /// Used when the viewer's source changes or the viewer is destroyed.
    pub fn cancel_document(&self, document: DocumentHandle) -> usize {
        let mut state = self.state.lock().unwrap();

        let before = state.heap.len();
        let (dropped, remaining): (Vec<Job>, Vec<Job>) =
            state.heap.drain().partition(|job| job.request.document == document);

        for job in &dropped {
            if let Some(token) = state.tokens.remove(&job.id) {
                token.cancel();
            }
        }

        state.heap = remaining.into_iter().collect();
        let cancelled = before - state.heap.len();
        state.stats.jobs_cancelled += cancelled as u64;

        if cancelled > 0 {
            debug!("cancelled {cancelled} pending jobs for document {}", document.raw());
        }
        cancelled
    }

    /// Pages of a document with a pending render, in arbitrary order.
    pub fn queued_pages(&self, document: DocumentHandle) -> Vec<u32> {
        let state = self.state.lock().unwrap();
        state
            .heap
            .iter()
            .filter(|job| job.request.document == document)
            .map(|job| job.request.page_number)
            .collect()
    }

    /// Whether a render for this document page is already pending.
    pub fn is_queued(&self, document: DocumentHandle, page_number: u32) -> bool {
        let state = self.state.lock().unwrap();
        state
            .heap
            .iter()
            .any(|job| job.request.document == document && job.request.page_number == page_number)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().heap.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock().unwrap();
        let mut stats = state.stats;
        stats.queue_size = state.heap.len();
        stats
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}
