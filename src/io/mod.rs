//! File formats: daily series, parameter files, manifests and ensemble output.

mod manifest;
mod output;
mod parameter_file;
mod series_file;
mod text;

pub use manifest::SynthesisManifest;
pub use output::EnsembleWriter;
pub use parameter_file::ParameterFile;
pub use series_file::{read_series, SeriesReader};
