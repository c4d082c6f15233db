//! Ensemble synthesis from calibrated parameters.

pub mod generator;
pub mod random;
pub mod source;

pub use generator::{SynthesisConfig, SynthesisSummary, WeatherGenerator};
pub use random::MemberRng;
pub use source::{InMemoryPredictors, PredictorSource, PredictorStreams};
