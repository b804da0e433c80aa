//! # Kotae
//!
//! Umbrella crate for the Kotae extractive question-answering pipeline.
//! Re-exports the feature building, decoding and scoring API from
//! [`kotae_core`] and the training plumbing from [`kotae_trainer`].

pub use kotae_core as core;
pub use kotae_trainer as trainer;

pub use kotae_core::{
    decode, BasicTokenizer, DecodeConfig, DecodeOutput, Example, Feature, FeatureBuilder,
    FeatureConfig, HfSubwordTokenizer, KotaeError, ModelFamily, RawResult, Result,
    SubwordTokenizer,
};
