//! # Kotae Trainer
//!
//! Dataset plumbing and the fine-tuning loop around `kotae-core`: SQuAD
//! loading, tensor batching, the span-head model seam and the epoch/step
//! bookkeeping. The transformer encoder itself is supplied by the caller
//! behind the [`model::SpanModel`] trait.

pub mod batch;
pub mod data;
pub mod model;
pub mod trainer;

pub use batch::QaBatch;
pub use data::{examples_from_dataset, load_examples, split_context};
pub use model::{LinearSpanHead, SpanModel, SpanOutput};
pub use trainer::{TrainConfig, TrainStats, Trainer};
