//! Campaign runner for deterministic simulation campaigns.
//!
//! Executes many seeds, collecting pass/fail results and identifying the
//! first failing seed for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::oracle::{CanonicalOracle, InvariantViolation, OracleResult};
use crate::rng::DeterministicRng;
use crate::{SimulationConfig, SimulationResult, Simulator};

/// Campaign-level configuration controlling how many seeds to run and
/// what case parameters to use for each seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Range of seeds to execute, e.g., `0..100`.
    pub seed_range: Range<u64>,
    pub leaves: usize,
    pub items: usize,
    pub clusters: usize,
    /// Variants per invariance check.
    pub variants: usize,
    /// Side-swap probability for isomorphic variants (percent, 0–100).
    pub swap_percent: u8,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        Self {
            seed_range: 0..100,
            leaves: sim.leaves,
            items: sim.items,
            clusters: sim.clusters,
            variants: sim.variants,
            swap_percent: sim.swap_percent,
        }
    }
}

impl CampaignConfig {
    /// Build a [`SimulationConfig`] for a specific seed.
    #[must_use]
    pub const fn sim_config_for_seed(&self, seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            leaves: self.leaves,
            items: self.items,
            clusters: self.clusters,
            variants: self.variants,
            swap_percent: self.swap_percent,
        }
    }

    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.leaves < 2 {
            bail!("leaves must be >= 2");
        }
        if self.items == 0 {
            bail!("items must be > 0");
        }
        if self.clusters == 0 {
            bail!("clusters must be > 0");
        }
        if self.variants == 0 {
            bail!("variants must be > 0");
        }
        if self.swap_percent > 100 {
            bail!("swap_percent must be <= 100");
        }
        Ok(())
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    /// Invariant violations found.
    pub violations: Vec<String>,
}

/// Aggregate report produced by a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    /// First seed that failed (for prioritized replay).
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Detailed trace produced by replaying a single seed.
#[derive(Debug, Clone)]
pub struct DetailedTrace {
    pub result: SimulationResult,
    /// Canonical rendering of the generated dendrogram, when it canonicalizes.
    pub canonical: Option<String>,
    pub fingerprint: Option<String>,
    pub oracle: OracleResult,
}

impl DetailedTrace {
    /// Oracle violations rendered for display.
    #[must_use]
    pub fn violation_messages(&self) -> Vec<String> {
        self.oracle.violations.iter().map(format_violation).collect()
    }
}

/// Run a full campaign across all seeds in the config.
///
/// # Errors
///
/// Returns an error if config validation fails or a case cannot be
/// generated.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut seeds_run = 0_usize;
    let mut seeds_passed = 0_usize;
    let mut first_failure: Option<u64> = None;
    let mut failures = Vec::new();

    for seed in config.seed_range.clone() {
        seeds_run += 1;

        match run_single_seed(seed, config)? {
            Ok(()) => {
                seeds_passed += 1;
            }
            Err(violations) => {
                tracing::warn!(seed, violations = violations.len(), "seed failed");
                if first_failure.is_none() {
                    first_failure = Some(seed);
                }
                failures.push(SeedFailure {
                    seed,
                    violations: violations.iter().map(format_violation).collect(),
                });
            }
        }
    }

    tracing::info!(seeds_run, seeds_passed, "campaign finished");
    Ok(CampaignReport {
        seeds_run,
        seeds_passed,
        first_failure,
        failures,
    })
}

/// Run a single seed and return Ok(()) on pass, Err(violations) on failure.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the case itself cannot be generated. The
/// inner `Result` distinguishes pass from invariant violations.
pub fn run_single_seed(
    seed: u64,
    config: &CampaignConfig,
) -> Result<std::result::Result<(), Vec<InvariantViolation>>> {
    let (_, oracle) = generate_and_check(seed, config)?;
    if oracle.passed {
        Ok(Ok(()))
    } else {
        Ok(Err(oracle.violations))
    }
}

/// Replay a single seed with full details for debugging.
///
/// # Errors
///
/// Returns an error when config validation or case generation fails.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    config.validate()?;
    let (result, oracle) = generate_and_check(seed, config)?;
    let tree = agglo_core::canonicalize(result.leaves, &result.merges).ok();
    Ok(DetailedTrace {
        canonical: tree.as_ref().map(ToString::to_string),
        fingerprint: tree.as_ref().map(agglo_core::CanonicalTree::fingerprint),
        result,
        oracle,
    })
}

fn generate_and_check(
    seed: u64,
    config: &CampaignConfig,
) -> Result<(SimulationResult, OracleResult)> {
    let mut simulator = Simulator::new(config.sim_config_for_seed(seed))?;
    let result = simulator.run()?;

    // Oracle draws come from a separate stream so the case itself does not
    // depend on how many variants are checked.
    let mut oracle_rng = DeterministicRng::new(seed.wrapping_add(0xDEAD));
    let oracle = CanonicalOracle::check_all(
        &result,
        &mut oracle_rng,
        config.variants,
        config.swap_percent,
    );
    Ok((result, oracle))
}

/// Format an invariant violation into a human-readable string.
fn format_violation(v: &InvariantViolation) -> String {
    match v {
        InvariantViolation::Rejected { check, error } => {
            format!("Rejected: {check} check could not canonicalize valid input ({error})")
        }
        InvariantViolation::LeafCount { expected, actual } => {
            format!("LeafCount: expected {expected} leaves, canonical form has {actual}")
        }
        InvariantViolation::OrderInvariance { variant, offset } => {
            format!("OrderInvariance: side-swapped variant {variant} diverges at {offset:?}")
        }
        InvariantViolation::Isomorphism { variant, offset } => {
            format!("Isomorphism: renumbered variant {variant} diverges at {offset:?}")
        }
        InvariantViolation::Insensitive { leaf_a, leaf_b } => {
            format!("Insensitive: swapping leaves {leaf_a} and {leaf_b} left the tree unchanged")
        }
        InvariantViolation::RoundTrip { offset } => {
            format!("RoundTrip: parsed fixture diverges at {offset:?}")
        }
        InvariantViolation::RenameInvariance { mismatch_count } => {
            format!("RenameInvariance: renamed labels produced {mismatch_count} mismatches")
        }
        InvariantViolation::FullDisagreement {
            items,
            mismatch_count,
            groups,
        } => {
            format!(
                "FullDisagreement: {items} items gave {mismatch_count} mismatches \
                 in {groups} groups (expected {items} in 1)"
            )
        }
        InvariantViolation::SingleMove {
            item,
            expected,
            actual,
        } => {
            format!("SingleMove: moving item {item} gave {actual} mismatches, expected {expected}")
        }
    }
}
