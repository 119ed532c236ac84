//! Phenotypic mutation at division.
//!
//! A child's inherited traits each pass through [`divfuzz`]: with
//! `phenotypic_mutation_prob` a mutation happens, deleterious with
//! `deleterious_prob` and beneficial otherwise. Its size is a gamma-drawn
//! percentage of the trait. Whether "deleterious" raises or lowers a trait
//! depends on the trait, so callers apply the result with
//! [`Mutation::apply_to_cost`] or [`Mutation::apply_to_yield`].

use symbiosis_types::{MutationType, Stream};
use symbiosis_world::RandomStreams;

use crate::config::MutationConfig;
use crate::error::AgentError;

/// Deleterious percentages are redrawn at or above this value.
const MAX_DELETERIOUS_PCT: f64 = 100.0;

/// Beneficial percentages are redrawn above this value.
const MAX_BENEFICIAL_PCT: f64 = 10.0;

/// Outcome of one mutation draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mutation {
    /// Direction of the mutation.
    pub kind: MutationType,
    /// Absolute size, in the units of the mutated trait.
    pub amount: f64,
}

impl Mutation {
    /// The identity mutation.
    pub const NONE: Self = Self {
        kind: MutationType::None,
        amount: 0.0,
    };

    /// Apply to a cost-like trait: deleterious mutations raise it.
    pub fn apply_to_cost(self, value: f64) -> f64 {
        match self.kind {
            MutationType::Deleterious => value + self.amount,
            MutationType::Beneficial => value - self.amount,
            MutationType::None => value,
        }
    }

    /// Apply to a yield-like trait: deleterious mutations lower it.
    pub fn apply_to_yield(self, value: f64) -> f64 {
        match self.kind {
            MutationType::Deleterious => value - self.amount,
            MutationType::Beneficial => value + self.amount,
            MutationType::None => value,
        }
    }
}

/// Draw a mutation of `value` on `stream`.
///
/// # Errors
///
/// Returns [`AgentError::Stream`] if a gamma parameter is invalid or the
/// percentage sampler exceeds its redraw limit.
pub fn divfuzz(
    value: f64,
    config: &MutationConfig,
    stream: Stream,
    streams: &mut RandomStreams,
) -> Result<Mutation, AgentError> {
    if streams.random(stream)? >= config.phenotypic_mutation_prob {
        return Ok(Mutation::NONE);
    }

    let (kind, pct) = if streams.random(stream)? < config.deleterious_prob {
        let pct = streams.gamma_until(
            config.deleterious_shape,
            config.deleterious_scale,
            stream,
            |x| x < MAX_DELETERIOUS_PCT,
        )?;
        (MutationType::Deleterious, pct)
    } else {
        let pct = streams.gamma_until(
            config.beneficial_shape,
            config.beneficial_scale,
            stream,
            |x| x <= MAX_BENEFICIAL_PCT,
        )?;
        (MutationType::Beneficial, pct)
    };

    Ok(Mutation {
        kind,
        amount: value * pct / 100.0,
    })
}
