//! One blocking inference request.

use std::sync::{Condvar, Mutex};

use crate::model::InferenceError;

struct JobState {
    inputs: Option<Vec<f32>>,
    result: Option<Result<Vec<f32>, InferenceError>>,
}

/// A unit of work handed to an executor: the caller's input tensors, a slot
/// for the outputs, and a waiter. The caller blocks in [`InferenceJob::wait`]
/// until the executor completes the job, successfully or not.
pub(crate) struct InferenceJob {
    count: usize,
    state: Mutex<JobState>,
    done: Condvar,
}

impl InferenceJob {
    pub fn new(inputs: Vec<f32>, count: usize) -> Self {
        Self {
            count,
            state: Mutex::new(JobState {
                inputs: Some(inputs),
                result: None,
            }),
            done: Condvar::new(),
        }
    }

    /// Number of stacked input tensors.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Takes the input buffer for batch assembly. Called once, by the
    /// executor thread.
    pub fn take_inputs(&self) -> Vec<f32> {
        self.state
            .lock()
            .expect("job state poisoned")
            .inputs
            .take()
            .unwrap_or_default()
    }

    /// Completes the job and wakes the waiter.
    pub fn complete(&self, result: Result<Vec<f32>, InferenceError>) {
        let mut state = self.state.lock().expect("job state poisoned");
        state.result = Some(result);
        self.done.notify_all();
    }

    /// Blocks until the executor completes this job.
    pub fn wait(&self) -> Result<Vec<f32>, InferenceError> {
        let mut state = self.state.lock().expect("job state poisoned");
        loop {
            if let Some(result) = state.result.take() {
                return result;
            }
            state = self.done.wait(state).expect("job state poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn wait_returns_the_completed_result() {
        let job = Arc::new(InferenceJob::new(vec![1.0, 2.0], 1));
        let waiter = {
            let job = Arc::clone(&job);
            std::thread::spawn(move || job.wait())
        };
        assert_eq!(job.take_inputs(), vec![1.0, 2.0]);
        job.complete(Ok(vec![3.0]));
        assert_eq!(waiter.join().unwrap().unwrap(), vec![3.0]);
    }

    #[test]
    fn interrupted_jobs_propagate_the_error() {
        let job = InferenceJob::new(vec![], 1);
        job.complete(Err(InferenceError::Interrupted));
        assert!(matches!(job.wait(), Err(InferenceError::Interrupted)));
    }
}
