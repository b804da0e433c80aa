//! Value types shared across feature building, decoding and scoring.

pub mod example;
pub mod family;
pub mod feature;
pub mod prediction;
pub mod result;

pub use example::Example;
pub use family::ModelFamily;
pub use feature::{DocSpan, Feature};
pub use prediction::{NbestEntry, NbestPrediction, PrelimPrediction};
pub use result::{PointerResult, RawResult, StandardResult};
