//! Position evaluation through the inference service.
//!
//! Builds the feature tensor for a board, runs it through the processor
//! once, and decodes the output into candidate policies (legal, non-seki,
//! non-territory moves only) and a scalar value in `[-1, 1]` signed for the
//! side to move.

use std::sync::Arc;

use goban::{Board, Color, Rule, EMPTY, MODEL_PREDICTIONS, MODEL_SIZE, WHITE};

use crate::model::InferenceError;
use crate::policy::Policy;
use crate::processor::Processor;

/// Decoded network output for one position.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub policies: Vec<Policy>,
    pub value: f32,
}

/// Stateless feature-prep and decode front end; one `execute` per call.
#[derive(Clone)]
pub struct Evaluator {
    processor: Arc<Processor>,
    komi: f32,
    rule: Rule,
    superko: bool,
}

impl Evaluator {
    pub fn new(processor: Arc<Processor>, komi: f32, rule: Rule, superko: bool) -> Self {
        Self {
            processor,
            komi,
            rule,
            superko,
        }
    }

    /// Evaluates `board` for `color` to move.
    pub fn evaluate(&self, board: &mut Board, color: Color) -> Result<Evaluation, InferenceError> {
        let inputs = board.inputs(color, self.komi, self.rule, self.superko);
        let outputs = self.processor.execute(inputs, 1)?;

        let (w, h) = (board.width(), board.height());
        let offset_x = (MODEL_SIZE as i32 - w) / 2;
        let offset_y = (MODEL_SIZE as i32 - h) / 2;

        let enabled = board.enabled_map(color, true);
        let territories = board.territories(color);

        let mut policies = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let cell = (y * w + x) as usize;
                let grid = ((offset_y + y) * MODEL_SIZE as i32 + (offset_x + x)) as usize;
                if enabled[cell] && territories[cell] == EMPTY {
                    policies.push(Policy::new(x, y, outputs[grid]));
                }
            }
        }

        let mut value = outputs[MODEL_PREDICTIONS * MODEL_SIZE * MODEL_SIZE] * 2.0 - 1.0;
        if color == WHITE {
            value = -value;
        }

        Ok(Evaluation { policies, value })
    }
}
