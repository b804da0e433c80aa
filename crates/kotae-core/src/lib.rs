//! # Kotae Core
//!
//! The heart of the Kotae question-answering pipeline. Converts text examples
//! into fixed-length transformer features, decodes raw span scores back into
//! answer strings, and scores predictions with the standard SQuAD metrics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kotae_core::decode::{decode, DecodeConfig};
//! use kotae_core::encode::{FeatureBuilder, FeatureConfig};
//! use kotae_core::tokenize::HfSubwordTokenizer;
//! use kotae_core::types::Example;
//!
//! # fn main() -> kotae_core::Result<()> {
//! let tokenizer = HfSubwordTokenizer::from_file("tokenizer.json")?;
//! let doc_tokens = "The report was written by Ada."
//!     .split_whitespace()
//!     .map(str::to_string)
//!     .collect();
//! let examples = vec![Example::new("q1", "Who wrote the report?", doc_tokens)];
//! let features = FeatureBuilder::new(&tokenizer, FeatureConfig::new()).build(&examples)?;
//! // ... run the model over `features`, collect raw results ...
//! # let results = vec![];
//! let output = decode(&examples, &features, &results, &DecodeConfig::new())?;
//! output.write_predictions("predictions.json")?;
//! # Ok(())
//! # }
//! ```
pub mod decode;
pub mod encode;
pub mod error;
pub mod scoring;
pub mod tagging;
pub mod tokenize;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

// Re-export primary API
pub use decode::{decode, realign, DecodeConfig, DecodeOutput};
pub use encode::{FeatureBuilder, FeatureConfig};
pub use error::{KotaeError, Result};
pub use scoring::{compute_exact, compute_f1, evaluate, normalize_answer, Dataset, EvalMetrics};
pub use tagging::{LabelMap, TagConfig, TagExample, TagFeature, TagFeatureBuilder};
pub use tokenize::{BasicTokenizer, HfSubwordTokenizer, SubwordTokenizer};
pub use types::{Example, Feature, ModelFamily, NbestEntry, RawResult};
