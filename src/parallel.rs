//! The render job: a bounded worker pool behind an asynchronous handle.
//!
//! A dispatcher thread walks the image in row-major order and feeds one
//! message per pixel into a bounded channel. Worker threads pull pixels,
//! compute them and write the bytes straight into a shared canvas, so the
//! buffer is in row-major order no matter which pixel finishes first. At most
//! `max_in_flight` pixels sit in the channel at any time.
//!
//! Each pixel runs under `catch_unwind`. A panicking pixel is recorded and
//! the remaining pixels still run; the job then ends `Failed` and the partial
//! buffer is dropped.

use std::any::Any;
use std::panic::{ self, AssertUnwindSafe };
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::sync::mpsc;
use std::sync::{ Arc, Condvar, Mutex, MutexGuard, PoisonError };
use std::thread;
use std::time::{ Duration, Instant };

use log::{ debug, info, warn };

use crate::canvas::Canvas;
use crate::error::RenderError;

/// Computes the RGB bytes of the pixel at `(row, col)`.
pub type PixelFn = dyn Fn(usize, usize) -> [u8; 3] + Send + Sync;

/// Where a render job is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Created, but no pixel has been dispatched yet.
    Pending,
    Running,
    /// Every pixel was computed; the buffer is ready.
    Done,
    /// At least one pixel failed.
    Failed,
    /// Cancelled before every pixel was computed.
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        match self {
            JobState::Done | JobState::Failed | JobState::Cancelled => true,
            JobState::Pending | JobState::Running => false,
        }
    }
}

/// Size and parallelism of a job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JobLayout {
    pub width: usize,
    pub height: usize,
    pub threads: usize,
    pub max_in_flight: usize,
}

struct Outcome {
    state: JobState,
    result: Option<Result<Canvas, RenderError>>,
}

struct Shared {
    total: usize,
    completed: AtomicUsize,
    cancelled: AtomicBool,

    outcome: Mutex<Outcome>,
    finished: Condvar,
}

impl Shared {
    fn outcome(&self) -> MutexGuard<'_, Outcome> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_running(&self) {
        let mut outcome = self.outcome();
        if outcome.state == JobState::Pending {
            outcome.state = JobState::Running;
        }
    }

    fn finish(&self, result: Result<Canvas, RenderError>) {
        let state = match &result {
            Ok(_) => JobState::Done,
            Err(RenderError::Cancelled) => JobState::Cancelled,
            Err(_) => JobState::Failed,
        };

        let mut outcome = self.outcome();
        outcome.state = state;
        outcome.result = Some(result);
        self.finished.notify_all();
    }
}

/// A handle to an in-flight or finished render.
///
/// Handles are cheap to clone and all clones observe the same job. Dropping
/// every handle does not stop the job; call `cancel` for that.
#[derive(Clone)]
pub struct JobStatus {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStatus")
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish()
    }
}

impl JobStatus {
    fn new(total: usize) -> JobStatus {
        JobStatus {
            shared: Arc::new(Shared {
                total,
                completed: AtomicUsize::new(0),
                cancelled: AtomicBool::new(false),
                outcome: Mutex::new(Outcome {
                    state: JobState::Pending,
                    result: None,
                }),
                finished: Condvar::new(),
            }),
        }
    }

    /// A job that failed before it started.
    pub fn failed(error: RenderError) -> JobStatus {
        let status = JobStatus::new(0);
        status.shared.finish(Err(error));
        status
    }

    pub fn state(&self) -> JobState {
        self.shared.outcome().state
    }

    /// Fraction of pixels processed, in `[0, 1]`.
    ///
    /// The counter is updated without ordering guarantees, so a reading taken
    /// while the job runs may lag slightly behind.
    pub fn progress(&self) -> f64 {
        if self.state() == JobState::Done || self.shared.total == 0 {
            return 1.0;
        }

        let completed = self.shared.completed.load(Ordering::Relaxed);
        (completed as f64 / self.shared.total as f64).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Asks the job to stop. Pixels already being computed finish, queued ones
    /// are skipped. Has no effect on a finished job.
    pub fn cancel(&self) {
        if !self.is_finished() {
            self.shared.cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Blocks until the job finishes and takes its result.
    ///
    /// Only the first call receives the buffer. Later calls, on this handle or
    /// a clone, get `RenderError::Lost`.
    pub fn wait(&self) -> Result<Canvas, RenderError> {
        let mut outcome = self.shared.outcome();
        while !outcome.state.is_terminal() {
            outcome = self.shared.finished.wait(outcome)
                .unwrap_or_else(PoisonError::into_inner);
        }

        take_result(&mut outcome)
    }

    /// Like `wait`, but gives up after `timeout`, returning `None`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Canvas, RenderError>> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.shared.outcome();

        while !outcome.state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            outcome = self.shared.finished.wait_timeout(outcome, deadline - now)
                .unwrap_or_else(PoisonError::into_inner).0;
        }

        Some(take_result(&mut outcome))
    }
}

fn take_result(outcome: &mut Outcome) -> Result<Canvas, RenderError> {
    outcome.result.take().unwrap_or_else(|| {
        Err(RenderError::Lost("the result was already taken".to_string()))
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

enum Message {
    Pixel(usize, usize),
    Terminate,
}

#[derive(Default)]
struct Failures {
    count: usize,
    first: Option<RenderError>,
}

struct Worker {
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, pixel: Arc<PixelFn>, canvas: Arc<Mutex<Canvas>>,
        failures: Arc<Mutex<Failures>>, shared: Arc<Shared>,
        receiver: Arc<Mutex<mpsc::Receiver<Message>>>)
        -> Result<Worker, RenderError> {

        let thread = thread::Builder::new()
            .name(format!("render-worker-{}", id))
            .spawn(move || loop {
                // Obtain the message being executed.
                let message = match receiver.lock()
                    .unwrap_or_else(PoisonError::into_inner).recv() {
                    Ok(message) => message,
                    Err(_) => break,
                };

                match message {
                    Message::Pixel(row, col) => {
                        if shared.cancelled.load(Ordering::Relaxed) {
                            continue;
                        }

                        let rgb = panic::catch_unwind(AssertUnwindSafe(|| (*pixel)(row, col)));
                        match rgb {
                            Ok(rgb) => {
                                canvas.lock().unwrap_or_else(PoisonError::into_inner)
                                    .write_pixel(col, row, rgb);
                            },
                            Err(payload) => {
                                let message = panic_message(payload);
                                warn!("pixel ({}, {}) failed: {}", row, col, message);

                                let mut failures = failures.lock()
                                    .unwrap_or_else(PoisonError::into_inner);
                                failures.count += 1;
                                if failures.first.is_none() {
                                    failures.first = Some(
                                        RenderError::PixelFailed { row, col, message }
                                    );
                                }
                            },
                        }

                        shared.completed.fetch_add(1, Ordering::Relaxed);
                    },

                    Message::Terminate => {
                        // Exit the worker thread loop, terminating the thread.
                        break;
                    }
                }
            })
            .map_err(|e| RenderError::Lost(format!("cannot spawn worker: {}", e)))?;

        Ok(Worker { thread: Some(thread) })
    }
}

struct ThreadPool {
    workers: Vec<Worker>,
    sender: mpsc::SyncSender<Message>,
}

impl ThreadPool {
    fn new(layout: &JobLayout, pixel: Arc<PixelFn>, canvas: Arc<Mutex<Canvas>>,
        failures: Arc<Mutex<Failures>>, shared: Arc<Shared>)
        -> Result<ThreadPool, RenderError> {
        let (sender, receiver) = mpsc::sync_channel(layout.max_in_flight);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut pool = ThreadPool {
            workers: Vec::with_capacity(layout.threads),
            sender,
        };

        for id in 0..layout.threads {
            // On error the pool drops, which shuts down the workers so far.
            pool.workers.push(Worker::new(
                id,
                Arc::clone(&pixel),
                Arc::clone(&canvas),
                Arc::clone(&failures),
                Arc::clone(&shared),
                Arc::clone(&receiver)
            )?);
        }

        Ok(pool)
    }

    /// Queues a message, blocking while the channel is full.
    fn execute(&self, message: Message) -> Result<(), RenderError> {
        self.sender.send(message)
            .map_err(|_| RenderError::Lost("all render workers exited".to_string()))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            // A send error means the workers are already gone.
            let _ = self.sender.send(Message::Terminate);
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

fn run_job(layout: JobLayout, pixel: Arc<PixelFn>, shared: Arc<Shared>)
    -> Result<Canvas, RenderError> {
    let canvas = Arc::new(Mutex::new(Canvas::new(layout.width, layout.height)));
    let failures = Arc::new(Mutex::new(Failures::default()));

    {
        let pool = ThreadPool::new(
            &layout, pixel, Arc::clone(&canvas), Arc::clone(&failures),
            Arc::clone(&shared)
        )?;

        shared.set_running();

        'rows: for row in 0..layout.height {
            for col in 0..layout.width {
                if shared.cancelled.load(Ordering::Relaxed) {
                    debug!("dispatch stopped at pixel ({}, {})", row, col);
                    break 'rows;
                }

                pool.execute(Message::Pixel(row, col))?;
            }
        }

        // Dropping the pool waits for every queued pixel.
    }

    // A cancel that arrives after the last pixel was processed is too late.
    let complete = shared.completed.load(Ordering::Relaxed) == shared.total;
    if shared.cancelled.load(Ordering::Relaxed) && !complete {
        return Err(RenderError::Cancelled);
    }

    let failures = std::mem::take(
        &mut *failures.lock().unwrap_or_else(PoisonError::into_inner)
    );
    if let Some(first) = failures.first {
        return Err(RenderError::Failed {
            failures: failures.count,
            first: Box::new(first),
        });
    }

    let canvas = std::mem::take(
        &mut *canvas.lock().unwrap_or_else(PoisonError::into_inner)
    );

    Ok(canvas)
}

/// Starts computing a `width` x `height` image and returns immediately.
///
/// A layout without pixels, workers or queue space yields a job that has
/// already failed with `RenderError::InvalidOptions`.
pub fn spawn_job(layout: JobLayout, pixel: Arc<PixelFn>) -> JobStatus {
    if layout.width == 0 || layout.height == 0 {
        return JobStatus::failed(RenderError::InvalidOptions(
            "image width and height must be positive".to_string()
        ));
    }
    if layout.threads == 0 || layout.max_in_flight == 0 {
        return JobStatus::failed(RenderError::InvalidOptions(
            "a job needs at least one worker and one queue slot".to_string()
        ));
    }

    let status = JobStatus::new(layout.width * layout.height);
    let shared = Arc::clone(&status.shared);

    info!("rendering {}x{} using {} threads", layout.width, layout.height,
        layout.threads);

    let spawned = thread::Builder::new()
        .name("render-dispatch".to_string())
        .spawn(move || {
            let started = Instant::now();

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_job(layout, pixel, Arc::clone(&shared))
            }))
            .unwrap_or_else(|payload| Err(RenderError::Lost(panic_message(payload))));

            match &result {
                Ok(_) => info!("render finished in {:.2?}", started.elapsed()),
                Err(RenderError::Cancelled) => warn!("render cancelled"),
                Err(e) => warn!("render failed: {}", e),
            }

            shared.finish(result);
        });

    if let Err(e) = spawned {
        status.shared.finish(Err(RenderError::Lost(
            format!("cannot spawn dispatcher: {}", e)
        )));
    }

    status
}

#[cfg(test)]
fn layout(width: usize, height: usize) -> JobLayout {
    JobLayout { width, height, threads: 3, max_in_flight: 4 }
}

#[test]
fn job_assembles_row_major_buffer() {
    let job = spawn_job(layout(7, 5), Arc::new(|row: usize, col: usize| {
        [row as u8, col as u8, 42]
    }));

    let canvas = job.wait().unwrap();

    assert_eq!(job.state(), JobState::Done);
    assert_eq!(job.progress(), 1.0);
    assert!(job.is_finished());

    for row in 0..5 {
        for col in 0..7 {
            let offset = (row * 7 + col) * 3;
            assert_eq!(&canvas.as_rgb()[offset..offset + 3],
                &[row as u8, col as u8, 42]);
        }
    }
}

#[test]
fn result_is_handed_out_once() {
    let job = spawn_job(layout(2, 2), Arc::new(|_: usize, _: usize| [1, 2, 3]));
    let other = job.clone();

    assert!(job.wait().is_ok());
    assert!(matches!(other.wait(), Err(RenderError::Lost(_))));
}

#[test]
fn failing_pixels_are_isolated() {
    let job = spawn_job(layout(4, 4), Arc::new(|row: usize, col: usize| {
        if row == 2 && (col == 1 || col == 3) {
            panic!("bad pixel");
        }
        [0, 0, 0]
    }));

    match job.wait() {
        Err(RenderError::Failed { failures, first }) => {
            assert_eq!(failures, 2);
            match *first {
                RenderError::PixelFailed { row, message, .. } => {
                    assert_eq!(row, 2);
                    assert_eq!(message, "bad pixel");
                },
                other => panic!("unexpected first failure: {:?}", other),
            }
        },
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(job.state(), JobState::Failed);
    // Every unit was still processed.
    assert!(crate::feq(job.progress(), 1.0));
}

#[test]
fn cancelled_job_skips_queued_pixels() {
    let job = spawn_job(layout(100, 100), Arc::new(|_: usize, _: usize| {
        thread::sleep(Duration::from_millis(1));
        [9, 9, 9]
    }));

    job.cancel();

    assert_eq!(job.wait(), Err(RenderError::Cancelled));
    assert_eq!(job.state(), JobState::Cancelled);
    assert!(job.progress() < 1.0);
}

#[test]
fn wait_timeout_gives_up() {
    let job = spawn_job(layout(50, 50), Arc::new(|_: usize, _: usize| {
        thread::sleep(Duration::from_millis(2));
        [0, 0, 0]
    }));

    assert!(job.wait_timeout(Duration::from_millis(1)).is_none());
    assert!(!job.is_finished());

    job.cancel();
    assert_eq!(job.wait_timeout(Duration::from_secs(30)),
        Some(Err(RenderError::Cancelled)));
}

#[test]
fn failed_status() {
    let job = JobStatus::failed(RenderError::InvalidOptions("no".to_string()));

    assert_eq!(job.state(), JobState::Failed);
    assert!(job.is_finished());
    assert_eq!(job.wait(), Err(RenderError::InvalidOptions("no".to_string())));
}

#[test]
fn empty_layouts_fail_up_front() {
    let pixel: Arc<PixelFn> = Arc::new(|_: usize, _: usize| [0, 0, 0]);

    let no_workers = spawn_job(
        JobLayout { threads: 0, ..layout(4, 4) }, Arc::clone(&pixel)
    );
    assert_eq!(no_workers.state(), JobState::Failed);
    assert!(matches!(no_workers.wait(), Err(RenderError::InvalidOptions(_))));

    let no_pixels = spawn_job(layout(0, 4), pixel);
    assert!(matches!(no_pixels.wait(), Err(RenderError::InvalidOptions(_))));
}

#[test]
fn late_cancel_keeps_finished_buffer() {
    let handle: Arc<Mutex<Option<JobStatus>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&handle);

    // One worker, so pixel (2, 2) is the last one processed. It cancels the
    // job while it is being computed, after every other pixel is done.
    let job = spawn_job(
        JobLayout { width: 3, height: 3, threads: 1, max_in_flight: 4 },
        Arc::new(move |row: usize, col: usize| {
            if row == 2 && col == 2 {
                loop {
                    if let Some(job) = slot.lock().unwrap().clone() {
                        job.cancel();
                        break;
                    }
                    thread::yield_now();
                }
            }
            [row as u8, col as u8, 0]
        })
    );
    *handle.lock().unwrap() = Some(job.clone());

    let canvas = job.wait().unwrap();

    assert_eq!(job.state(), JobState::Done);
    assert_eq!(canvas.read_pixel(2, 2), Some([2, 2, 0]));
}
