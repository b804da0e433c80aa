//! Packing features into candle tensors for the model seam.

use candle_core::{Device, Tensor};
use kotae_core::types::Feature;

/// One model-ready batch. All tensors share the leading batch dimension;
/// `start_positions`/`end_positions` are present only when every feature in
/// the batch carries training labels.
#[derive(Debug)]
pub struct QaBatch {
    /// `(batch, seq)` token ids.
    pub input_ids: Tensor,
    /// `(batch, seq)` attention mask, 1 on real tokens.
    pub input_mask: Tensor,
    /// `(batch, seq)` segment ids.
    pub segment_ids: Tensor,
    /// `(batch,)` position of the classification token.
    pub cls_index: Tensor,
    /// `(batch, seq)` mask of positions that cannot be part of an answer.
    pub p_mask: Tensor,
    /// `(batch,)` gold start positions, training only.
    pub start_positions: Option<Tensor>,
    /// `(batch,)` gold end positions, training only.
    pub end_positions: Option<Tensor>,
}

impl QaBatch {
    /// Pack a slice of features into one batch on the given device.
    pub fn from_features(features: &[&Feature], device: &Device) -> anyhow::Result<Self> {
        anyhow::ensure!(!features.is_empty(), "cannot batch zero features");
        let batch = features.len();
        let seq = features[0].input_ids.len();

        let input_ids = stack_u32(features, seq, device, |f| &f.input_ids)?;
        let input_mask = stack_u32(features, seq, device, |f| &f.input_mask)?;
        let segment_ids = stack_u32(features, seq, device, |f| &f.segment_ids)?;
        let p_mask = {
            let flat: Vec<f32> = features
                .iter()
                .flat_map(|f| f.p_mask.iter().map(|&m| m as f32))
                .collect();
            Tensor::from_vec(flat, (batch, seq), device)?
        };
        let cls_index = {
            let flat: Vec<u32> = features.iter().map(|f| f.cls_index as u32).collect();
            Tensor::from_vec(flat, (batch,), device)?
        };

        let labelled = features
            .iter()
            .all(|f| f.start_position.is_some() && f.end_position.is_some());
        let (start_positions, end_positions) = if labelled {
            let starts: Vec<u32> = features
                .iter()
                .map(|f| f.start_position.unwrap_or(0) as u32)
                .collect();
            let ends: Vec<u32> = features
                .iter()
                .map(|f| f.end_position.unwrap_or(0) as u32)
                .collect();
            (
                Some(Tensor::from_vec(starts, (batch,), device)?),
                Some(Tensor::from_vec(ends, (batch,), device)?),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            input_ids,
            input_mask,
            segment_ids,
            cls_index,
            p_mask,
            start_positions,
            end_positions,
        })
    }

    /// Number of features in the batch.
    pub fn len(&self) -> usize {
        self.input_ids.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn stack_u32(
    features: &[&Feature],
    seq: usize,
    device: &Device,
    field: impl Fn(&Feature) -> &Vec<u32>,
) -> anyhow::Result<Tensor> {
    let flat: Vec<u32> = features.iter().flat_map(|f| field(f).iter().copied()).collect();
    Ok(Tensor::from_vec(flat, (features.len(), seq), device)?)
}
