//! agglo-sim library.
//!
//! Seeded property campaigns over the canonicalizer and the partition
//! comparator. Every seed deterministically produces one random merge
//! sequence and one random partition; the oracle then derives variants of
//! both and checks that the core answers consistently.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod campaign;
pub mod generate;
pub mod oracle;
pub mod rng;

use agglo_core::{Label, MergeRecord, Vocabulary};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::generate::{random_merges, random_partition};
use crate::rng::DeterministicRng;

/// Parameters for one seeded case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Leaves in the generated dendrogram.
    pub leaves: usize,
    /// Items in the generated partition.
    pub items: usize,
    /// Upper bound on distinct cluster labels.
    pub clusters: usize,
    /// Variants the oracle derives per invariance check.
    pub variants: usize,
    /// Probability (percent) that a record's sides are exchanged in a variant.
    pub swap_percent: u8,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            leaves: 64,
            items: 48,
            clusters: 6,
            variants: 4,
            swap_percent: 50,
        }
    }
}

/// Generated inputs for one seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub seed: u64,
    pub leaves: usize,
    pub merges: Vec<MergeRecord>,
    pub vocab: Vocabulary,
    pub labels: Vec<Label>,
}

/// Builds the case for a [`SimulationConfig`].
#[derive(Debug)]
pub struct Simulator {
    config: SimulationConfig,
    rng: DeterministicRng,
}

impl Simulator {
    /// # Errors
    ///
    /// Returns an error when the dendrogram would have fewer than two leaves
    /// or the partition has no items or clusters.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.leaves < 2 {
            bail!("leaves must be >= 2");
        }
        if config.items == 0 {
            bail!("items must be > 0");
        }
        if config.clusters == 0 {
            bail!("clusters must be > 0");
        }
        if config.swap_percent > 100 {
            bail!("swap_percent must be <= 100");
        }
        let rng = DeterministicRng::new(config.seed);
        Ok(Self { config, rng })
    }

    /// Generate the merge sequence and partition for this seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated vocabulary is rejected.
    pub fn run(&mut self) -> Result<SimulationResult> {
        let merges = random_merges(&mut self.rng, self.config.leaves);
        let labels = random_partition(&mut self.rng, self.config.items, self.config.clusters);
        let vocab = Vocabulary::new((0..self.config.items).map(|item| format!("w{item:04}")))?;
        tracing::debug!(
            seed = self.config.seed,
            leaves = self.config.leaves,
            items = self.config.items,
            "generated case"
        );
        Ok(SimulationResult {
            seed: self.config.seed,
            leaves: self.config.leaves,
            merges,
            vocab,
            labels,
        })
    }
}
