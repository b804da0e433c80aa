//! Feature construction: sliding-window chunking of long documents into
//! fixed-length, tensor-ready records.

pub mod builder;
pub mod max_context;

pub use builder::{FeatureBuilder, FeatureConfig, FIRST_UNIQUE_ID};
pub use max_context::is_max_context;
