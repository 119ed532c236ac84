//! Symbiont life cycle for the Symbiosis simulation.
//!
//! This crate owns everything about an individual symbiont: the clade
//! parameters it is drawn from, its photosynthate bank and the projection
//! that decides whether it survives to its next milestone, the mutation
//! applied to a child's inherited traits, and the exit record written when
//! it leaves.
//!
//! # Modules
//!
//! - [`config`] -- [`CladeConfig`] parameter bundles and the [`CladeTable`]
//! - [`error`] -- Error types for symbiont operations
//! - [`exit`] -- Exit record construction
//! - [`mutation`] -- Gamma-sized phenotypic mutation at division
//! - [`projector`] -- Linear bank projection and shortfall resolution
//! - [`symbiont`] -- The [`Symbiont`] with its clocks, lineage and history

pub mod config;
pub mod error;
pub mod exit;
pub mod mutation;
pub mod projector;
pub mod symbiont;

pub use config::{CladeConfig, CladeTable, MutationConfig};
pub use error::AgentError;
pub use mutation::{Mutation, divfuzz};
pub use projector::{BANK_TOLERANCE, Budget, Projection, Shortfall, project, resolve_shortfall};
pub use symbiont::{History, LifeClocks, Lineage, MilestoneCheck, Site, Symbiont};
