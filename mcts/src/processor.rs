//! Front door to the inference service.
//!
//! Owns one executor per (device x thread); each evaluation request is
//! routed to the executor with the least pending work. The selection and the
//! reservation happen under one lock so two concurrent requests cannot both
//! pick an executor that only has room for one of them.

use std::sync::Mutex;

use crate::executor::Executor;
use crate::model::{InferenceError, InferenceModel};

pub struct Processor {
    select: Mutex<()>,
    executors: Vec<Executor>,
}

impl Processor {
    /// Builds `devices.len() * threads_per_device` executors, constructing
    /// one model per executor through `make_model`. Fails with
    /// [`InferenceError::ResourceUnavailable`] when no executor can be
    /// brought up.
    pub fn new<F>(
        devices: &[i32],
        threads_per_device: usize,
        batch_size: usize,
        mut make_model: F,
    ) -> Result<Self, InferenceError>
    where
        F: FnMut(i32) -> Result<Box<dyn InferenceModel>, InferenceError>,
    {
        let mut executors = Vec::with_capacity(devices.len() * threads_per_device);
        for &device in devices {
            for _ in 0..threads_per_device {
                executors.push(Executor::new(make_model(device)?, batch_size));
            }
        }
        if executors.is_empty() {
            return Err(InferenceError::ResourceUnavailable(
                "no inference devices configured".into(),
            ));
        }
        Ok(Self {
            select: Mutex::new(()),
            executors,
        })
    }

    /// Runs `count` stacked input tensors through the least loaded executor
    /// and blocks until the outputs are back.
    pub fn execute(&self, inputs: Vec<f32>, count: usize) -> Result<Vec<f32>, InferenceError> {
        let index = {
            let _guard = self.select.lock().expect("processor selection poisoned");
            let index = self
                .executors
                .iter()
                .enumerate()
                .min_by_key(|(_, executor)| executor.pending())
                .map(|(i, _)| i)
                .expect("at least one executor");
            self.executors[index].reserve(count);
            index
        };
        self.executors[index].execute(inputs, count)
    }

    /// Number of executors backing this processor.
    pub fn executor_count(&self) -> usize {
        self.executors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UniformInference;
    use goban::{MODEL_INPUT_SIZE, MODEL_OUTPUT_SIZE};
    use std::sync::Arc;

    fn uniform_processor(devices: &[i32], threads: usize) -> Processor {
        Processor::new(devices, threads, 8, |_| Ok(Box::new(UniformInference))).unwrap()
    }

    #[test]
    fn construction_fails_without_devices() {
        let result = Processor::new(&[], 2, 8, |_| {
            Ok(Box::new(UniformInference) as Box<dyn InferenceModel>)
        });
        assert!(matches!(
            result,
            Err(InferenceError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn construction_propagates_model_failure() {
        let result = Processor::new(&[0], 1, 8, |device| {
            Err(InferenceError::ResourceUnavailable(format!(
                "device {device} missing"
            )))
        });
        assert!(result.is_err());
    }

    #[test]
    fn spawns_one_executor_per_device_thread() {
        let processor = uniform_processor(&[0, 1], 3);
        assert_eq!(processor.executor_count(), 6);
    }

    #[test]
    fn execute_round_trips_through_any_executor() {
        let processor = Arc::new(uniform_processor(&[0, 1], 2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let processor = Arc::clone(&processor);
                std::thread::spawn(move || {
                    processor.execute(vec![0.0; MODEL_INPUT_SIZE], 1).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), MODEL_OUTPUT_SIZE);
        }
    }
}
