//! Per-device inference worker.
//!
//! An executor is one thread draining a FIFO of inference jobs. On each
//! wakeup it pops jobs until the accumulated item count reaches the batch
//! size, concatenates their inputs into one tensor, runs the model once, and
//! scatters the outputs back to the blocked callers. Shutdown drains the
//! queue and completes every remaining job with an interruption error so no
//! waiter is orphaned.
//!
//! Load accounting: `waiting` counts items sitting in the queue; `reserved`
//! counts items a caller has committed through the processor but not yet
//! enqueued. The processor reads `waiting + reserved` to pick the least
//! loaded executor, and the reservation is transferred to `waiting` (clamped
//! at zero on the way out) when the job lands.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use goban::{MODEL_INPUT_SIZE, MODEL_OUTPUT_SIZE};
use tracing::{debug, trace};

use crate::job::InferenceJob;
use crate::model::{InferenceError, InferenceModel};

struct ExecutorState {
    queue: VecDeque<Arc<InferenceJob>>,
    waiting: usize,
    reserved: usize,
    terminated: bool,
}

struct ExecutorShared {
    state: Mutex<ExecutorState>,
    wake: Condvar,
}

/// One batching inference thread.
pub struct Executor {
    shared: Arc<ExecutorShared>,
    handle: Option<JoinHandle<()>>,
}

impl Executor {
    pub fn new(model: Box<dyn InferenceModel>, batch_size: usize) -> Self {
        let shared = Arc::new(ExecutorShared {
            state: Mutex::new(ExecutorState {
                queue: VecDeque::new(),
                waiting: 0,
                reserved: 0,
                terminated: false,
            }),
            wake: Condvar::new(),
        });

        let handle = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || run(model, shared, batch_size.max(1)))
        };

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Items queued plus items reserved; the processor's load metric.
    pub(crate) fn pending(&self) -> usize {
        let state = self.shared.state.lock().expect("executor state poisoned");
        state.waiting + state.reserved
    }

    /// Commits `count` items ahead of the enqueue that will follow.
    pub(crate) fn reserve(&self, count: usize) {
        let mut state = self.shared.state.lock().expect("executor state poisoned");
        state.reserved += count;
    }

    /// Enqueues a job and blocks until the executor completes it.
    pub(crate) fn execute(
        &self,
        inputs: Vec<f32>,
        count: usize,
    ) -> Result<Vec<f32>, InferenceError> {
        let job = Arc::new(InferenceJob::new(inputs, count));
        {
            let mut state = self.shared.state.lock().expect("executor state poisoned");
            if state.terminated {
                return Err(InferenceError::Interrupted);
            }
            state.queue.push_back(Arc::clone(&job));
            state.waiting += count;
            state.reserved = state.reserved.saturating_sub(count);
            self.wake_thread();
        }
        job.wait()
    }

    fn wake_thread(&self) {
        self.shared.wake.notify_all();
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("executor state poisoned");
            state.terminated = true;
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(mut model: Box<dyn InferenceModel>, shared: Arc<ExecutorShared>, batch_size: usize) {
    loop {
        let jobs = {
            let mut state = shared.state.lock().expect("executor state poisoned");
            while state.queue.is_empty() && !state.terminated {
                state = shared.wake.wait(state).expect("executor state poisoned");
            }

            if state.terminated {
                // Complete everything still queued; silent loss would leave
                // search workers blocked forever.
                while let Some(job) = state.queue.pop_front() {
                    state.waiting = state.waiting.saturating_sub(job.count());
                    job.complete(Err(InferenceError::Interrupted));
                }
                debug!("executor shut down");
                return;
            }

            let mut jobs = Vec::new();
            let mut items = 0;
            while items < batch_size {
                match state.queue.pop_front() {
                    Some(job) => {
                        state.waiting = state.waiting.saturating_sub(job.count());
                        items += job.count();
                        jobs.push(job);
                    }
                    None => break,
                }
            }
            jobs
        };

        forward(model.as_mut(), &jobs);
    }
}

/// Runs one concatenated batch and scatters outputs back to each job.
fn forward(model: &mut dyn InferenceModel, jobs: &[Arc<InferenceJob>]) {
    let total: usize = jobs.iter().map(|job| job.count()).sum();

    let mut inputs = Vec::with_capacity(total * MODEL_INPUT_SIZE);
    for job in jobs {
        inputs.extend_from_slice(&job.take_inputs());
    }

    let mut outputs = vec![0.0f32; total * MODEL_OUTPUT_SIZE];
    trace!(jobs = jobs.len(), items = total, "running inference batch");

    match model.run(&inputs, &mut outputs, total) {
        Ok(()) => {
            let mut offset = 0;
            for job in jobs {
                let len = job.count() * MODEL_OUTPUT_SIZE;
                job.complete(Ok(outputs[offset..offset + len].to_vec()));
                offset += len;
            }
        }
        Err(err) => {
            for job in jobs {
                job.complete(Err(err.clone()));
            }
        }
    }
}
