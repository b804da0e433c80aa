//! The model seam: span heads behind a small trait.
//!
//! The transformer encoder is opaque to this crate; anything that can map a
//! [`QaBatch`] to start/end logits can be trained and decoded. The bundled
//! [`LinearSpanHead`] is a minimal trainable baseline (embedding plus linear
//! projection) used for smoke-testing the pipeline end to end.

use candle_core::{Device, Tensor, D};
use candle_nn::{embedding, linear, loss, Embedding, Linear, Module, VarBuilder};

use crate::batch::QaBatch;

/// Raw span scores for one batch.
#[derive(Debug)]
pub struct SpanOutput {
    /// `(batch, seq)` start logits.
    pub start_logits: Tensor,
    /// `(batch, seq)` end logits.
    pub end_logits: Tensor,
    /// Mean start/end cross-entropy, present when the batch carried labels.
    pub loss: Option<Tensor>,
}

/// Anything that turns a batch into span scores.
pub trait SpanModel {
    fn forward(&self, batch: &QaBatch) -> anyhow::Result<SpanOutput>;
}

/// Embedding + linear projection to two logits per position.
pub struct LinearSpanHead {
    embed: Embedding,
    project: Linear,
}

impl LinearSpanHead {
    pub fn new(vocab_size: usize, hidden_size: usize, vb: VarBuilder) -> anyhow::Result<Self> {
        let embed = embedding(vocab_size, hidden_size, vb.pp("embed"))?;
        let project = linear(hidden_size, 2, vb.pp("span"))?;
        Ok(Self { embed, project })
    }
}

impl SpanModel for LinearSpanHead {
    fn forward(&self, batch: &QaBatch) -> anyhow::Result<SpanOutput> {
        let hidden = self.embed.forward(&batch.input_ids)?;
        let logits = self.project.forward(&hidden)?;

        // (batch, seq, 2) -> two (batch, seq) planes.
        let start_logits = logits.narrow(D::Minus1, 0, 1)?.squeeze(D::Minus1)?;
        let end_logits = logits.narrow(D::Minus1, 1, 1)?.squeeze(D::Minus1)?;

        // Positions outside the answerable region get a large negative score
        // so they never win the argmax.
        let mask = batch.p_mask.affine(-10_000.0, 0.0)?;
        let start_logits = start_logits.broadcast_add(&mask)?;
        let end_logits = end_logits.broadcast_add(&mask)?;

        let loss = match (&batch.start_positions, &batch.end_positions) {
            (Some(starts), Some(ends)) => {
                let start_loss = loss::cross_entropy(&start_logits, starts)?;
                let end_loss = loss::cross_entropy(&end_logits, ends)?;
                Some(((start_loss + end_loss)? * 0.5)?)
            }
            _ => None,
        };

        Ok(SpanOutput {
            start_logits,
            end_logits,
            loss,
        })
    }
}

/// Build a head with freshly initialized weights on the given device.
pub fn new_span_head(
    vocab_size: usize,
    hidden_size: usize,
    device: &Device,
) -> anyhow::Result<(LinearSpanHead, candle_nn::VarMap)> {
    let varmap = candle_nn::VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, candle_core::DType::F32, device);
    let head = LinearSpanHead::new(vocab_size, hidden_size, vb)?;
    Ok((head, varmap))
}
