//! Error types for the symbiosis-agents crate.
//!
//! Stochastic outcomes (digestion, escape, eviction) are ordinary values and
//! never errors. The variants here cover bad clade parameters, failed
//! random draws, and broken photosynthate accounting.

use symbiosis_types::{AgentId, CladeId};
use symbiosis_world::StreamError;

/// Errors that can occur during symbiont operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A clade parameter is outside its domain.
    #[error("invalid clade parameters: {reason}")]
    InvalidClade {
        /// What is wrong with the parameters.
        reason: String,
    },

    /// No clade exists with this id.
    #[error("unknown clade: {0}")]
    UnknownClade(CladeId),

    /// A committed photosynthate bank fell below zero.
    #[error("agent {agent} bank went negative ({bank}) at t={time}")]
    NegativeBank {
        /// The symbiont.
        agent: AgentId,
        /// The committed bank value.
        bank: f64,
        /// Commit time.
        time: f64,
    },

    /// An operation needed a host cell but the symbiont has none.
    #[error("agent {0} is not hosted in any cell")]
    NotHosted(AgentId),

    /// A random draw failed.
    #[error("stream error: {source}")]
    Stream {
        /// The underlying stream error.
        #[from]
        source: StreamError,
    },
}
