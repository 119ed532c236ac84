//! Clade parameter bundles and the clade table.
//!
//! A clade is a configuration profile shared by a subpopulation: growth and
//! division timings, production and cost rates with their fuzz factors,
//! escape/eviction/affinity probabilities, initial surplus distribution,
//! and mutation distribution. The values are read from the `clades` list of
//! `symbiosis-config.yaml`; omitted fields fall back to the defaults below.
//!
//! Fuzz factors are fractions of the mean covered by two standard
//! deviations (see [`RandomStreams::fuzz`]).
//!
//! [`RandomStreams::fuzz`]: symbiosis_world::RandomStreams::fuzz

use serde::{Deserialize, Serialize};
use symbiosis_types::CladeId;

use crate::error::AgentError;

/// Parameters of one clade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CladeConfig {
    /// Human-readable label.
    #[serde(default)]
    pub name: String,

    /// Share of pool arrivals and initial symbionts (default: 0.5).
    #[serde(default = "default_proportion")]
    pub proportion: f64,

    /// Photosynthate produced per day in the top row (default: 1.15).
    #[serde(default = "default_production_rate")]
    pub photosynthetic_production_rate: f64,

    /// Fuzz on the production rate (default: 0.1).
    #[serde(default = "default_rate_fuzz")]
    pub ppr_fuzz: f64,

    /// Photosynthate spent per day while dividing (default: 24.0).
    #[serde(default = "default_mitotic_cost_rate")]
    pub mitotic_cost_rate: f64,

    /// Fuzz on the mitotic cost rate (default: 0.1).
    #[serde(default = "default_rate_fuzz")]
    pub mcr_fuzz: f64,

    /// Ratio of top-row to bottom-row production; `2.0` halves production
    /// by the last row (default: 2.0).
    #[serde(default = "default_photosynthetic_reduction")]
    pub photosynthetic_reduction: f64,

    /// Mean residence time before denouement, in days (default: 30.0).
    #[serde(default = "default_avg_residence_time")]
    pub avg_residence_time: f64,

    /// Fuzz on residence time (default: 0.2).
    #[serde(default = "default_timing_fuzz")]
    pub residence_fuzz: f64,

    /// Mean growth phase length, in days (default: 1.0).
    #[serde(default = "default_g0_length")]
    pub g0_length: f64,

    /// Fuzz on the growth phase length (default: 0.2).
    #[serde(default = "default_timing_fuzz")]
    pub g0_fuzz: f64,

    /// Mean division phase length, in days (default: one hour).
    #[serde(default = "default_g1sg2m_length")]
    pub g1sg2m_length: f64,

    /// Fuzz on the division phase length (default: 0.2).
    #[serde(default = "default_timing_fuzz")]
    pub g1sg2m_fuzz: f64,

    /// Probability of escaping rather than being digested in G0 (default: 0.5).
    #[serde(default = "default_half")]
    pub g0_escape_prob: f64,

    /// Probability of escaping rather than being digested in G1SG2M
    /// (default: 0.5).
    #[serde(default = "default_half")]
    pub g1sg2m_escape_prob: f64,

    /// Probability the parent, rather than the child, moves or is evicted
    /// at division (default: 0.5).
    #[serde(default = "default_half")]
    pub parent_eviction_prob: f64,

    /// Probability a pool arrival is taken up by the host (default: 1.0).
    #[serde(default = "default_one")]
    pub arrival_affinity_prob: f64,

    /// Probability a relocating symbiont is taken up after division
    /// (default: 1.0).
    #[serde(default = "default_one")]
    pub division_affinity_prob: f64,

    /// Gamma shape of the initial surplus (default: 2.0).
    #[serde(default = "default_initial_surplus_shape")]
    pub initial_surplus_shape: f64,

    /// Gamma scale of the initial surplus (default: 0.5).
    #[serde(default = "default_initial_surplus_scale")]
    pub initial_surplus_scale: f64,

    /// Initial surplus draws above this are redrawn (default: 5.0).
    #[serde(default = "default_max_initial_surplus")]
    pub max_initial_surplus: f64,

    /// Phenotypic mutation at division.
    #[serde(default)]
    pub mutation: MutationConfig,
}

/// Mutation distribution applied to a child's inherited traits.
///
/// A mutation happens with `phenotypic_mutation_prob`; it is deleterious
/// with `deleterious_prob` and otherwise beneficial. The size is a
/// percentage of the trait drawn from a gamma distribution: below 100 for
/// deleterious mutations, at most 10 for beneficial ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability that any mutation occurs (default: 0.1).
    #[serde(default = "default_phenotypic_mutation_prob")]
    pub phenotypic_mutation_prob: f64,

    /// Probability a mutation is deleterious (default: 0.5).
    #[serde(default = "default_half")]
    pub deleterious_prob: f64,

    /// Gamma shape of deleterious percentages (default: 2.0).
    #[serde(default = "default_mutation_shape")]
    pub deleterious_shape: f64,

    /// Gamma scale of deleterious percentages (default: 1/0.83915).
    #[serde(default = "default_deleterious_scale")]
    pub deleterious_scale: f64,

    /// Gamma shape of beneficial percentages (default: 2.0).
    #[serde(default = "default_mutation_shape")]
    pub beneficial_shape: f64,

    /// Gamma scale of beneficial percentages (default: 1/1.795).
    #[serde(default = "default_beneficial_scale")]
    pub beneficial_scale: f64,
}

impl MutationConfig {
    /// A configuration under which no mutation ever happens.
    pub fn disabled() -> Self {
        Self {
            phenotypic_mutation_prob: 0.0,
            ..Self::default()
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            phenotypic_mutation_prob: default_phenotypic_mutation_prob(),
            deleterious_prob: default_half(),
            deleterious_shape: default_mutation_shape(),
            deleterious_scale: default_deleterious_scale(),
            beneficial_shape: default_mutation_shape(),
            beneficial_scale: default_beneficial_scale(),
        }
    }
}

impl Default for CladeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            proportion: default_proportion(),
            photosynthetic_production_rate: default_production_rate(),
            ppr_fuzz: default_rate_fuzz(),
            mitotic_cost_rate: default_mitotic_cost_rate(),
            mcr_fuzz: default_rate_fuzz(),
            photosynthetic_reduction: default_photosynthetic_reduction(),
            avg_residence_time: default_avg_residence_time(),
            residence_fuzz: default_timing_fuzz(),
            g0_length: default_g0_length(),
            g0_fuzz: default_timing_fuzz(),
            g1sg2m_length: default_g1sg2m_length(),
            g1sg2m_fuzz: default_timing_fuzz(),
            g0_escape_prob: default_half(),
            g1sg2m_escape_prob: default_half(),
            parent_eviction_prob: default_half(),
            arrival_affinity_prob: default_one(),
            division_affinity_prob: default_one(),
            initial_surplus_shape: default_initial_surplus_shape(),
            initial_surplus_scale: default_initial_surplus_scale(),
            max_initial_surplus: default_max_initial_surplus(),
            mutation: MutationConfig::default(),
        }
    }
}

impl CladeConfig {
    /// Check that every parameter is inside its domain.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidClade`] naming the first bad parameter.
    pub fn validate(&self) -> Result<(), AgentError> {
        let probabilities = [
            ("proportion", self.proportion),
            ("g0_escape_prob", self.g0_escape_prob),
            ("g1sg2m_escape_prob", self.g1sg2m_escape_prob),
            ("parent_eviction_prob", self.parent_eviction_prob),
            ("arrival_affinity_prob", self.arrival_affinity_prob),
            ("division_affinity_prob", self.division_affinity_prob),
            (
                "phenotypic_mutation_prob",
                self.mutation.phenotypic_mutation_prob,
            ),
            ("deleterious_prob", self.mutation.deleterious_prob),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::InvalidClade {
                    reason: format!("{name} = {value} is not a probability"),
                });
            }
        }

        let non_negative = [
            ("photosynthetic_production_rate", self.photosynthetic_production_rate),
            ("ppr_fuzz", self.ppr_fuzz),
            ("mitotic_cost_rate", self.mitotic_cost_rate),
            ("mcr_fuzz", self.mcr_fuzz),
            ("avg_residence_time", self.avg_residence_time),
            ("residence_fuzz", self.residence_fuzz),
            ("g0_length", self.g0_length),
            ("g0_fuzz", self.g0_fuzz),
            ("g1sg2m_length", self.g1sg2m_length),
            ("g1sg2m_fuzz", self.g1sg2m_fuzz),
            ("max_initial_surplus", self.max_initial_surplus),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AgentError::InvalidClade {
                    reason: format!("{name} = {value} must be finite and non-negative"),
                });
            }
        }

        let positive = [
            ("photosynthetic_reduction", self.photosynthetic_reduction),
            ("initial_surplus_shape", self.initial_surplus_shape),
            ("initial_surplus_scale", self.initial_surplus_scale),
            ("deleterious_shape", self.mutation.deleterious_shape),
            ("deleterious_scale", self.mutation.deleterious_scale),
            ("beneficial_shape", self.mutation.beneficial_shape),
            ("beneficial_scale", self.mutation.beneficial_scale),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AgentError::InvalidClade {
                    reason: format!("{name} = {value} must be positive"),
                });
            }
        }
        Ok(())
    }

    /// Production rate adjusted for the row a symbiont lives in.
    ///
    /// Production falls off linearly from `rate` in row 0 to
    /// `rate / photosynthetic_reduction` in the last row. With a single row
    /// the rate is unchanged.
    pub fn row_adjusted_rate(&self, rate: f64, row: u32, rows: u32) -> f64 {
        let k = self.photosynthetic_reduction;
        let last_row = rows.saturating_sub(1);
        if last_row == 0 {
            return rate;
        }
        let fraction = f64::from(row) / f64::from(last_row);
        ((1.0 - k) / k).mul_add(fraction * rate, rate)
    }
}

/// All clades of a run with cumulative arrival proportions.
#[derive(Debug, Clone, PartialEq)]
pub struct CladeTable {
    clades: Vec<CladeConfig>,
    cumulative: Vec<f64>,
}

impl CladeTable {
    /// Build the table. The last cumulative proportion is forced to `1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidClade`] if `clades` is empty.
    pub fn new(clades: Vec<CladeConfig>) -> Result<Self, AgentError> {
        if clades.is_empty() {
            return Err(AgentError::InvalidClade {
                reason: "at least one clade is required".to_owned(),
            });
        }
        let mut running = 0.0;
        let mut cumulative: Vec<f64> = clades
            .iter()
            .map(|clade| {
                running += clade.proportion;
                running
            })
            .collect();
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Ok(Self { clades, cumulative })
    }

    /// Number of clades.
    pub fn len(&self) -> usize {
        self.clades.len()
    }

    /// Whether the table is empty (never true for a constructed table).
    pub fn is_empty(&self) -> bool {
        self.clades.is_empty()
    }

    /// Look up a clade.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownClade`] for an id past the table.
    pub fn get(&self, id: CladeId) -> Result<&CladeConfig, AgentError> {
        self.clades
            .get(id.index())
            .ok_or(AgentError::UnknownClade(id))
    }

    /// Clades with their ids, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (CladeId, &CladeConfig)> {
        self.clades
            .iter()
            .enumerate()
            .map(|(i, clade)| (CladeId(u32::try_from(i).unwrap_or(u32::MAX)), clade))
    }

    /// Cumulative arrival proportions, one per clade.
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Clade for a uniform draw `u` on `[0, 1)`: the first clade whose
    /// cumulative proportion exceeds `u`.
    pub fn select(&self, u: f64) -> CladeId {
        let index = self
            .cumulative
            .iter()
            .position(|bound| u < *bound)
            .unwrap_or_else(|| self.cumulative.len().saturating_sub(1));
        CladeId(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_proportion() -> f64 {
    0.5
}

const fn default_production_rate() -> f64 {
    1.15
}

const fn default_mitotic_cost_rate() -> f64 {
    24.0
}

const fn default_rate_fuzz() -> f64 {
    0.1
}

const fn default_photosynthetic_reduction() -> f64 {
    2.0
}

const fn default_avg_residence_time() -> f64 {
    30.0
}

const fn default_timing_fuzz() -> f64 {
    0.2
}

const fn default_g0_length() -> f64 {
    1.0
}

fn default_g1sg2m_length() -> f64 {
    1.0 / 24.0
}

const fn default_half() -> f64 {
    0.5
}

const fn default_one() -> f64 {
    1.0
}

const fn default_initial_surplus_shape() -> f64 {
    2.0
}

const fn default_initial_surplus_scale() -> f64 {
    0.5
}

const fn default_max_initial_surplus() -> f64 {
    5.0
}

const fn default_phenotypic_mutation_prob() -> f64 {
    0.1
}

const fn default_mutation_shape() -> f64 {
    2.0
}

fn default_deleterious_scale() -> f64 {
    0.839_15_f64.recip()
}

fn default_beneficial_scale() -> f64 {
    1.795_f64.recip()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn defaults_validate() {
        assert!(CladeConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let json = r#"{"name": "weak", "mitotic_cost_rate": 35.0, "mutation": {"deleterious_prob": 0.9}}"#;
        let clade: CladeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(clade.name, "weak");
        assert!((clade.mitotic_cost_rate - 35.0).abs() < EPS);
        assert!((clade.photosynthetic_production_rate - 1.15).abs() < EPS);
        assert!((clade.mutation.deleterious_prob - 0.9).abs() < EPS);
        assert!((clade.mutation.beneficial_scale - 1.0 / 1.795).abs() < EPS);
    }

    #[test]
    fn bad_probability_is_rejected() {
        let clade = CladeConfig {
            parent_eviction_prob: 1.5,
            ..CladeConfig::default()
        };
        assert!(matches!(
            clade.validate(),
            Err(AgentError::InvalidClade { .. })
        ));
    }

    #[test]
    fn zero_reduction_is_rejected() {
        let clade = CladeConfig {
            photosynthetic_reduction: 0.0,
            ..CladeConfig::default()
        };
        assert!(clade.validate().is_err());
    }

    #[test]
    fn row_adjustment_halves_bottom_row_with_k_two() {
        let clade = CladeConfig::default();
        assert!((clade.row_adjusted_rate(2.0, 0, 5) - 2.0).abs() < EPS);
        assert!((clade.row_adjusted_rate(2.0, 4, 5) - 1.0).abs() < EPS);
        assert!((clade.row_adjusted_rate(2.0, 2, 5) - 1.5).abs() < EPS);
        // A single row has no gradient.
        assert!((clade.row_adjusted_rate(2.0, 0, 1) - 2.0).abs() < EPS);
    }

    #[test]
    fn cumulative_proportions_end_at_one() {
        let clades = vec![
            CladeConfig {
                proportion: 0.3,
                ..CladeConfig::default()
            },
            CladeConfig {
                proportion: 0.69,
                ..CladeConfig::default()
            },
        ];
        let table = CladeTable::new(clades).unwrap();
        assert_eq!(table.len(), 2);
        assert!((table.cumulative().first().copied().unwrap() - 0.3).abs() < EPS);
        assert!((table.cumulative().last().copied().unwrap() - 1.0).abs() < EPS);
        assert_eq!(table.select(0.0), CladeId(0));
        assert_eq!(table.select(0.29), CladeId(0));
        assert_eq!(table.select(0.3), CladeId(1));
        assert_eq!(table.select(0.999), CladeId(1));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(CladeTable::new(Vec::new()).is_err());
    }

    #[test]
    fn unknown_clade_lookup_fails() {
        let table = CladeTable::new(vec![CladeConfig::default()]).unwrap();
        assert!(table.get(CladeId(0)).is_ok());
        assert!(matches!(
            table.get(CladeId(1)),
            Err(AgentError::UnknownClade(_))
        ));
    }
}
