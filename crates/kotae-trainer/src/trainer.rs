//! Fine-tuning loop plumbing.
//!
//! The optimizer lives with the caller: the loop hands every batch loss to an
//! `optimize` closure together with a flag marking accumulation-window
//! boundaries, and otherwise only keeps the books (global step,
//! logging-window loss, checkpoint cadence).

use candle_core::{Device, Tensor};
use kotae_core::types::{Feature, RawResult, StandardResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::QaBatch;
use crate::model::SpanModel;

/// Loop configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Optimizer steps happen every this many batches.
    pub grad_accum_steps: usize,
    /// Log the mean loss every this many optimizer steps.
    pub logging_steps: usize,
    /// Invoke the checkpoint callback every this many optimizer steps.
    pub save_steps: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            batch_size: 8,
            grad_accum_steps: 1,
            logging_steps: 50,
            save_steps: 500,
        }
    }
}

/// Bookkeeping across the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainStats {
    /// Optimizer steps taken so far.
    pub global_step: usize,
    /// Sum of all batch losses seen.
    pub running_loss: f64,
    /// `running_loss` snapshot at the last log line.
    logging_loss: f64,
    batches_since_step: usize,
}

impl TrainStats {
    /// Record one batch loss; returns `true` when an optimizer step is due.
    pub fn record(&mut self, loss: f64, grad_accum_steps: usize) -> bool {
        self.running_loss += loss;
        self.batches_since_step += 1;
        if self.batches_since_step >= grad_accum_steps {
            self.batches_since_step = 0;
            self.global_step += 1;
            true
        } else {
            false
        }
    }

    /// Mean loss since the last call, for periodic logging.
    pub fn window_loss(&mut self, logging_steps: usize) -> f64 {
        let window = (self.running_loss - self.logging_loss) / logging_steps as f64;
        self.logging_loss = self.running_loss;
        window
    }
}

/// Drives epochs over pre-built features.
pub struct Trainer<'a, M: SpanModel> {
    model: &'a M,
    config: TrainConfig,
    device: Device,
}

impl<'a, M: SpanModel> Trainer<'a, M> {
    pub fn new(model: &'a M, config: TrainConfig, device: Device) -> Self {
        Self {
            model,
            config,
            device,
        }
    }

    /// Run the configured number of epochs. `optimize` is called with every
    /// batch loss tensor so the caller can run its backward pass; the second
    /// argument is `true` when a full accumulation window has elapsed and the
    /// optimizer should step. `checkpoint` is called with the global step at
    /// every save point.
    pub fn train(
        &self,
        features: &[Feature],
        mut optimize: impl FnMut(&Tensor, bool) -> anyhow::Result<()>,
        mut checkpoint: impl FnMut(usize) -> anyhow::Result<()>,
    ) -> anyhow::Result<TrainStats> {
        anyhow::ensure!(!features.is_empty(), "no training features");
        let mut stats = TrainStats::default();
        let num_batches = features.len().div_ceil(self.config.batch_size);
        info!(
            features = features.len(),
            batches = num_batches,
            epochs = self.config.epochs,
            "starting training"
        );

        for epoch in 0..self.config.epochs {
            for chunk in features.chunks(self.config.batch_size) {
                let refs: Vec<&Feature> = chunk.iter().collect();
                let batch = QaBatch::from_features(&refs, &self.device)?;
                let output = self.model.forward(&batch)?;
                let loss = output
                    .loss
                    .ok_or_else(|| anyhow::anyhow!("training batch produced no loss"))?;
                let loss_value: f32 = loss.to_scalar()?;

                let step_due = stats.record(f64::from(loss_value), self.config.grad_accum_steps);
                optimize(&loss, step_due)?;
                if step_due {
                    if stats.global_step % self.config.logging_steps == 0 {
                        let step = stats.global_step;
                        let loss = stats.window_loss(self.config.logging_steps);
                        info!(epoch, step, loss, "training progress");
                    }
                    if stats.global_step % self.config.save_steps == 0 {
                        checkpoint(stats.global_step)?;
                    }
                }
            }
        }
        Ok(stats)
    }

    /// Run the model over evaluation features and collect raw results for
    /// the decoder.
    pub fn infer(&self, features: &[Feature]) -> anyhow::Result<Vec<RawResult>> {
        let mut results = Vec::with_capacity(features.len());
        for chunk in features.chunks(self.config.batch_size) {
            let refs: Vec<&Feature> = chunk.iter().collect();
            let batch = QaBatch::from_features(&refs, &self.device)?;
            let output = self.model.forward(&batch)?;
            let start_logits: Vec<Vec<f32>> = output.start_logits.to_vec2()?;
            let end_logits: Vec<Vec<f32>> = output.end_logits.to_vec2()?;
            for ((feature, start), end) in refs.iter().zip(start_logits).zip(end_logits) {
                results.push(RawResult::Standard(StandardResult {
                    unique_id: feature.unique_id,
                    start_logits: start,
                    end_logits: end,
                }));
            }
        }
        Ok(results)
    }
}
