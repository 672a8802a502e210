//! The inference primitive.
//!
//! The engine treats the neural network as an opaque function from a batch
//! of input tensors to a batch of output tensors. Backends (ONNX, Torch,
//! a remote service) implement [`InferenceModel`] and are constructed by the
//! embedder; the engine never loads model files itself. Each executor owns
//! its model exclusively, so implementations need `Send` but not `Sync`.

use goban::{MODEL_OUTPUT_SIZE, MODEL_PREDICTIONS, MODEL_SIZE};
use thiserror::Error;

/// Errors from the inference service.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// A device or backend could not be brought up at construction time.
    #[error("inference device unavailable: {0}")]
    ResourceUnavailable(String),

    /// The backend failed while running a batch.
    #[error("inference backend failed: {0}")]
    Model(String),

    /// The executor shut down before the job completed.
    #[error("executor shut down before the job completed")]
    Interrupted,
}

/// A batched policy/value network.
///
/// `inputs` holds `count` tensors of [`goban::MODEL_INPUT_SIZE`] floats laid
/// out back to back; `outputs` must be filled with `count` tensors of
/// [`MODEL_OUTPUT_SIZE`] floats.
pub trait InferenceModel: Send {
    fn run(
        &mut self,
        inputs: &[f32],
        outputs: &mut [f32],
        count: usize,
    ) -> Result<(), InferenceError>;
}

/// Flat stub network: every cell gets the same prior and the value head is
/// exactly even. Used by tests and usable as a no-network backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformInference;

impl InferenceModel for UniformInference {
    fn run(
        &mut self,
        _inputs: &[f32],
        outputs: &mut [f32],
        count: usize,
    ) -> Result<(), InferenceError> {
        let cells = MODEL_SIZE * MODEL_SIZE;
        let prior = 1.0 / cells as f32;
        for item in 0..count {
            let out = &mut outputs[item * MODEL_OUTPUT_SIZE..(item + 1) * MODEL_OUTPUT_SIZE];
            out[..MODEL_PREDICTIONS * cells].fill(prior);
            out[MODEL_PREDICTIONS * cells..].fill(0.0);
            out[MODEL_PREDICTIONS * cells] = 0.5;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goban::MODEL_INPUT_SIZE;

    #[test]
    fn uniform_model_fills_every_item() {
        let mut model = UniformInference;
        let inputs = vec![0.0; MODEL_INPUT_SIZE * 3];
        let mut outputs = vec![-1.0; MODEL_OUTPUT_SIZE * 3];
        model.run(&inputs, &mut outputs, 3).unwrap();

        let cells = MODEL_SIZE * MODEL_SIZE;
        for item in 0..3 {
            let out = &outputs[item * MODEL_OUTPUT_SIZE..(item + 1) * MODEL_OUTPUT_SIZE];
            assert!((out[0] - 1.0 / cells as f32).abs() < 1e-9);
            assert_eq!(out[MODEL_PREDICTIONS * cells], 0.5);
        }
    }
}
