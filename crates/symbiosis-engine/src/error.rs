//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, the run itself, and
//! telemetry output so that `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: symbiosis_core::ConfigError,
    },

    /// The simulation aborted.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: symbiosis_core::SimulationError,
    },

    /// A telemetry file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Output {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An exit record could not be serialized.
    #[error("failed to encode exit record: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
