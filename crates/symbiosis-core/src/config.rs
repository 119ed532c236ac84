//! Configuration loading and typed config structures for the Symbiosis simulation.
//!
//! The canonical configuration lives in `symbiosis-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every section and every field may be omitted; defaults reproduce the
//! reference two-clade run on a 10x10 single-level sponge.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use symbiosis_agents::CladeConfig;
use symbiosis_types::{GridDimensions, Placement, Topology};

/// Proportions must sum to one within this tolerance.
const PROPORTION_TOLERANCE: f64 = 1e-6;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an impossible run.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Run-level settings: seed, horizon, arrivals, initial population.
    #[serde(default)]
    pub run: RunConfig,

    /// Sponge lattice.
    #[serde(default)]
    pub grid: GridConfig,

    /// Output files.
    #[serde(default)]
    pub output: OutputConfig,

    /// Clade parameter bundles; proportions must sum to one.
    #[serde(default = "default_clades")]
    pub clades: Vec<CladeConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            grid: GridConfig::default(),
            output: OutputConfig::default(),
            clades: default_clades(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Check that the configuration describes a runnable simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.run.max_simulated_time.is_finite() || self.run.max_simulated_time <= 0.0 {
            return Err(invalid(format!(
                "max_simulated_time {} must be positive",
                self.run.max_simulated_time
            )));
        }
        if self.run.arrivals_enabled
            && (!self.run.mean_time_between_arrivals.is_finite()
                || self.run.mean_time_between_arrivals <= 0.0)
        {
            return Err(invalid(format!(
                "mean_time_between_arrivals {} must be positive",
                self.run.mean_time_between_arrivals
            )));
        }

        let grid = &self.grid;
        if grid.levels == 0 || grid.rows == 0 || grid.cols == 0 {
            return Err(invalid(format!(
                "grid {} has an empty axis",
                grid.dimensions()
            )));
        }
        if grid.capacity_per_cell == 0 {
            return Err(invalid("capacity_per_cell must be at least 1".to_owned()));
        }
        if !grid.host_cell_demand.is_finite() || grid.host_cell_demand < 0.0 {
            return Err(invalid(format!(
                "host_cell_demand {} must be non-negative",
                grid.host_cell_demand
            )));
        }
        if !grid.host_cell_demand_fuzz.is_finite() || grid.host_cell_demand_fuzz < 0.0 {
            return Err(invalid(format!(
                "host_cell_demand_fuzz {} must be non-negative",
                grid.host_cell_demand_fuzz
            )));
        }

        if self.clades.is_empty() {
            return Err(invalid("at least one clade is required".to_owned()));
        }
        for (i, clade) in self.clades.iter().enumerate() {
            clade
                .validate()
                .map_err(|e| invalid(format!("clade {i} ({}): {e}", clade.name)))?;
        }
        let total: f64 = self.clades.iter().map(|c| c.proportion).sum();
        if (total - 1.0).abs() > PROPORTION_TOLERANCE {
            return Err(invalid(format!(
                "clade proportions sum to {total}, expected 1"
            )));
        }
        if self.run.initial_placement == Placement::Quadrant && self.clades.len() != 2 {
            return Err(invalid(format!(
                "quadrant placement needs exactly two clades, found {}",
                self.clades.len()
            )));
        }
        Ok(())
    }
}

const fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    /// Seed shared by every random stream (default: 5551212).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Horizon in simulated days (default: 365).
    #[serde(default = "default_max_simulated_time")]
    pub max_simulated_time: f64,

    /// Whether symbionts keep arriving from the pool (default: true).
    #[serde(default = "default_true")]
    pub arrivals_enabled: bool,

    /// Mean days between pool arrivals (default: 1.0).
    #[serde(default = "default_mean_time_between_arrivals")]
    pub mean_time_between_arrivals: f64,

    /// Symbionts placed at time zero (default: 20).
    #[serde(default = "default_initial_symbionts")]
    pub initial_symbionts: u32,

    /// How the initial symbionts are laid out (default: randomize).
    #[serde(default)]
    pub initial_placement: Placement,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_simulated_time: default_max_simulated_time(),
            arrivals_enabled: true,
            mean_time_between_arrivals: default_mean_time_between_arrivals(),
            initial_symbionts: default_initial_symbionts(),
            initial_placement: Placement::default(),
        }
    }
}

/// Sponge lattice settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    /// Stacked levels (default: 1).
    #[serde(default = "default_levels")]
    pub levels: u32,

    /// Rows per level (default: 10).
    #[serde(default = "default_side")]
    pub rows: u32,

    /// Columns per row (default: 10).
    #[serde(default = "default_side")]
    pub cols: u32,

    /// Square or hex neighborhoods (default: square).
    #[serde(default)]
    pub topology: Topology,

    /// Symbionts one host cell can hold (default: 5).
    #[serde(default = "default_capacity_per_cell")]
    pub capacity_per_cell: u32,

    /// Mean photosynthate demand of a host cell per day (default: 1.0).
    #[serde(default = "default_host_cell_demand")]
    pub host_cell_demand: f64,

    /// Fuzz on the per-cell demand (default: 0.1).
    #[serde(default = "default_host_cell_demand_fuzz")]
    pub host_cell_demand_fuzz: f64,
}

impl GridConfig {
    /// Lattice extent.
    pub const fn dimensions(&self) -> GridDimensions {
        GridDimensions::new(self.levels, self.rows, self.cols)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            rows: default_side(),
            cols: default_side(),
            topology: Topology::default(),
            capacity_per_cell: default_capacity_per_cell(),
            host_cell_demand: default_host_cell_demand(),
            host_cell_demand_fuzz: default_host_cell_demand_fuzz(),
        }
    }
}

/// Output file settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Whether to write exit records (default: true).
    #[serde(default = "default_true")]
    pub write_exit_records: bool,

    /// JSON-lines file receiving one record per symbiont.
    #[serde(default = "default_exit_records_path")]
    pub exit_records: PathBuf,

    /// Whether to write the population time series (default: true).
    #[serde(default = "default_true")]
    pub write_population: bool,

    /// Tab-separated daily population file.
    #[serde(default = "default_population_path")]
    pub population: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            write_exit_records: true,
            exit_records: default_exit_records_path(),
            write_population: true,
            population: default_population_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_seed() -> u64 {
    5_551_212
}

const fn default_max_simulated_time() -> f64 {
    365.0
}

const fn default_mean_time_between_arrivals() -> f64 {
    1.0
}

const fn default_initial_symbionts() -> u32 {
    20
}

const fn default_levels() -> u32 {
    1
}

const fn default_side() -> u32 {
    10
}

const fn default_capacity_per_cell() -> u32 {
    5
}

const fn default_host_cell_demand() -> f64 {
    1.0
}

const fn default_host_cell_demand_fuzz() -> f64 {
    0.1
}

fn default_exit_records_path() -> PathBuf {
    PathBuf::from("symbionts.jsonl")
}

fn default_population_path() -> PathBuf {
    PathBuf::from("population.tsv")
}

fn default_clades() -> Vec<CladeConfig> {
    vec![
        CladeConfig {
            name: "clade-1".to_owned(),
            ..CladeConfig::default()
        },
        CladeConfig {
            name: "clade-2".to_owned(),
            ..CladeConfig::default()
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.run.seed, 5_551_212);
        assert_eq!(config.grid.dimensions(), GridDimensions::new(1, 10, 10));
        assert_eq!(config.clades.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
run:
  seed: 7
  max_simulated_time: 30.0
  arrivals_enabled: false
  initial_symbionts: 8
  initial_placement: quadrant

grid:
  levels: 2
  rows: 6
  cols: 4
  topology: hex
  capacity_per_cell: 3
  host_cell_demand: 0.8

output:
  exit_records: "out/exits.jsonl"
  write_population: false

clades:
  - name: "strong"
    proportion: 0.25
    photosynthetic_production_rate: 1.4
  - name: "weak"
    proportion: 0.75
    mitotic_cost_rate: 30.0
    mutation:
      phenotypic_mutation_prob: 0.0
"#;
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.run.seed, 7);
        assert!(!config.run.arrivals_enabled);
        assert_eq!(config.run.initial_placement, Placement::Quadrant);
        assert_eq!(config.grid.topology, Topology::Hex);
        assert_eq!(config.grid.dimensions(), GridDimensions::new(2, 6, 4));
        assert_eq!(config.grid.host_cell_demand_fuzz, 0.1);
        assert_eq!(config.output.exit_records, PathBuf::from("out/exits.jsonl"));
        assert!(config.output.write_exit_records);
        assert!(!config.output.write_population);
        assert_eq!(config.clades.len(), 2);
        assert_eq!(config.clades[1].mitotic_cost_rate, 30.0);
        assert_eq!(config.clades[1].mutation.phenotypic_mutation_prob, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn invalid_yaml_returns_error() {
        let result = SimulationConfig::parse("run: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn proportions_must_sum_to_one() {
        let mut config = SimulationConfig::default();
        config.clades[0].proportion = 0.9;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn quadrant_needs_two_clades() {
        let mut config = SimulationConfig::default();
        config.run.initial_placement = Placement::Quadrant;
        config.clades.truncate(1);
        config.clades[0].proportion = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_and_empty_axes_are_rejected() {
        let mut config = SimulationConfig::default();
        config.grid.capacity_per_cell = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.grid.rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_clade_probability_is_rejected() {
        let mut config = SimulationConfig::default();
        config.clades[1].g0_escape_prob = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_horizon_is_rejected() {
        let mut config = SimulationConfig::default();
        config.run.max_simulated_time = 0.0;
        assert!(config.validate().is_err());
    }
}
