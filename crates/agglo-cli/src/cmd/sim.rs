//! `agglo sim`: deterministic property campaigns.
//!
//! `agglo sim run`: execute a campaign across many seeds.
//! `agglo sim replay`: replay a single seed with the generated case.

use std::io::Write;
use std::process;

use agglo_core::Label;
use agglo_sim::campaign::{CampaignConfig, replay_seed, run_campaign};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section};

/// Failures listed before truncating.
const FAILURE_SAMPLES: usize = 5;

/// Top-level arguments for `agglo sim`.
#[derive(Args, Debug)]
pub struct SimArgs {
    #[command(subcommand)]
    pub command: SimCommand,
}

/// Simulation subcommands.
#[derive(Subcommand, Debug)]
pub enum SimCommand {
    #[command(
        about = "Run a property campaign across multiple seeds",
        long_about = "Generate random merge sequences and partitions per seed and check that\n\
                      canonicalization and partition comparison hold their invariants.\n\
                      Reports pass/fail per seed and identifies the first failure for replay.",
        after_help = "EXAMPLES:\n    # Run 100 seeds with defaults\n    agglo sim run --seeds 100\n\n\
                      # Larger trees\n    agglo sim run --seeds 200 --leaves 512 --variants 8\n\n\
                      # Machine-readable output\n    agglo sim run --seeds 100 --format json"
    )]
    Run(SimRunArgs),

    #[command(
        about = "Replay a single seed",
        long_about = "Replay a specific seed to see the generated case, its canonical form,\n\
                      and violation details. Use after a campaign failure to debug.",
        after_help = "EXAMPLES:\n    # Replay seed 42\n    agglo sim replay --seed 42\n\n\
                      # Include the merge records and labels\n    agglo sim replay --seed 42 --format json"
    )]
    Replay(SimReplayArgs),
}

/// Case parameters shared by `run` and `replay`.
#[derive(Args, Debug, Clone)]
pub struct CaseArgs {
    /// Leaves per generated dendrogram.
    #[arg(long, default_value = "64")]
    pub leaves: usize,

    /// Items per generated partition.
    #[arg(long, default_value = "48")]
    pub items: usize,

    /// Maximum distinct cluster labels.
    #[arg(long, default_value = "6")]
    pub clusters: usize,

    /// Variants per invariance check.
    #[arg(long, default_value = "4")]
    pub variants: usize,

    /// Probability (percent) of exchanging record sides in a variant.
    #[arg(long, default_value = "50")]
    pub swap_percent: u8,
}

impl CaseArgs {
    fn campaign_config(&self, seed_start: u64, seeds: u64) -> CampaignConfig {
        CampaignConfig {
            seed_range: seed_start..seed_start.saturating_add(seeds),
            leaves: self.leaves,
            items: self.items,
            clusters: self.clusters,
            variants: self.variants,
            swap_percent: self.swap_percent,
        }
    }
}

#[derive(Args, Debug)]
pub struct SimRunArgs {
    /// Number of seeds to run.
    #[arg(long, default_value = "100")]
    pub seeds: u64,

    /// Starting seed value.
    #[arg(long, default_value = "0")]
    pub seed_start: u64,

    #[command(flatten)]
    pub case: CaseArgs,
}

#[derive(Args, Debug)]
pub struct SimReplayArgs {
    /// Seed to replay.
    #[arg(long)]
    pub seed: u64,

    #[command(flatten)]
    pub case: CaseArgs,
}

/// JSON output for `agglo sim run`.
#[derive(Debug, Serialize)]
struct RunOutput {
    seeds_run: usize,
    seeds_passed: usize,
    seeds_failed: usize,
    first_failure: Option<u64>,
    all_passed: bool,
    failures: Vec<FailureOutput>,
}

#[derive(Debug, Serialize)]
struct FailureOutput {
    seed: u64,
    violations: Vec<String>,
}

/// JSON output for `agglo sim replay`.
#[derive(Debug, Serialize)]
struct ReplayOutput {
    seed: u64,
    leaves: usize,
    items: usize,
    canonical: Option<String>,
    fingerprint: Option<String>,
    merges: Vec<(usize, usize)>,
    labels: Vec<Label>,
    oracle_passed: bool,
    violations: Vec<String>,
}

/// Execute `agglo sim run`. Exits with status 1 when any seed fails.
///
/// # Errors
///
/// Fails when the campaign parameters are invalid.
pub fn run_sim_run(args: &SimRunArgs, output: OutputMode) -> Result<()> {
    let config = args.case.campaign_config(args.seed_start, args.seeds);
    let report = run_campaign(&config)?;

    let out = RunOutput {
        seeds_run: report.seeds_run,
        seeds_passed: report.seeds_passed,
        seeds_failed: report.failures.len(),
        first_failure: report.first_failure,
        all_passed: report.all_passed(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureOutput {
                seed: f.seed,
                violations: f.violations.clone(),
            })
            .collect(),
    };

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    match output {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut w, &out)?;
            writeln!(w)?;
        }
        OutputMode::Text => {
            writeln!(
                w,
                "campaign seeds_run={} leaves={} items={} variants={}",
                out.seeds_run, args.case.leaves, args.case.items, args.case.variants
            )?;
            writeln!(
                w,
                "results passed={} failed={} all_passed={}",
                out.seeds_passed, out.seeds_failed, out.all_passed
            )?;
            for failure in out.failures.iter().take(FAILURE_SAMPLES) {
                writeln!(
                    w,
                    "failure seed={} violations={}",
                    failure.seed,
                    failure.violations.len()
                )?;
            }
            if out.failures.len() > FAILURE_SAMPLES {
                writeln!(
                    w,
                    "failures_truncated count={}",
                    out.failures.len() - FAILURE_SAMPLES
                )?;
            }
            if let Some(seed) = out.first_failure {
                writeln!(w, "hint replay_seed={seed}")?;
            }
        }
        OutputMode::Pretty => {
            pretty_section(&mut w, "Simulation Campaign")?;
            pretty_kv(&mut w, "Seeds", out.seeds_run.to_string())?;
            pretty_kv(&mut w, "Leaves", args.case.leaves.to_string())?;
            pretty_kv(&mut w, "Items", args.case.items.to_string())?;
            pretty_kv(
                &mut w,
                "Results",
                format!("{} passed / {} failed", out.seeds_passed, out.seeds_failed),
            )?;

            match out.first_failure {
                None => pretty_kv(&mut w, "Status", "all seeds passed")?,
                Some(first) => {
                    pretty_kv(
                        &mut w,
                        "Status",
                        format!("{} failures (first at seed {first})", out.seeds_failed),
                    )?;
                    writeln!(w)?;
                    pretty_section(&mut w, "Failure Samples")?;
                    for failure in out.failures.iter().take(FAILURE_SAMPLES) {
                        writeln!(w, "seed {:<8}", failure.seed)?;
                        for violation in &failure.violations {
                            writeln!(w, "  - {violation}")?;
                        }
                    }
                    if out.failures.len() > FAILURE_SAMPLES {
                        writeln!(
                            w,
                            "... and {} more failures",
                            out.failures.len() - FAILURE_SAMPLES
                        )?;
                    }
                    writeln!(w)?;
                    pretty_kv(
                        &mut w,
                        "Replay",
                        format!(
                            "agglo sim replay --seed {first} --leaves {} --items {}",
                            args.case.leaves, args.case.items
                        ),
                    )?;
                }
            }
        }
    }
    w.flush()?;
    drop(w);

    // Exit code 1 on any failure for CI integration
    if !report.all_passed() {
        process::exit(1);
    }
    Ok(())
}

/// Execute `agglo sim replay`. Exits with status 1 when the seed fails.
///
/// # Errors
///
/// Fails when the case parameters are invalid.
pub fn run_sim_replay(args: &SimReplayArgs, output: OutputMode) -> Result<()> {
    let config = args.case.campaign_config(args.seed, 1);
    let trace = replay_seed(args.seed, &config)?;

    let out = ReplayOutput {
        seed: args.seed,
        leaves: trace.result.leaves,
        items: trace.result.labels.len(),
        canonical: trace.canonical.clone(),
        fingerprint: trace.fingerprint.clone(),
        merges: trace
            .result
            .merges
            .iter()
            .map(|record| (record.left, record.right))
            .collect(),
        labels: trace.result.labels.clone(),
        oracle_passed: trace.oracle.passed,
        violations: trace.violation_messages(),
    };

    let stdout = std::io::stdout();
    let mut w = stdout.lock();
    match output {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut w, &out)?;
            writeln!(w)?;
        }
        OutputMode::Text => {
            writeln!(
                w,
                "replay seed={} leaves={} items={} oracle_passed={}",
                out.seed, out.leaves, out.items, out.oracle_passed
            )?;
            if let Some(fingerprint) = &out.fingerprint {
                writeln!(w, "fingerprint={fingerprint}")?;
            }
            for violation in &out.violations {
                writeln!(w, "violation={violation}")?;
            }
        }
        OutputMode::Pretty => {
            pretty_section(&mut w, &format!("Replay Seed {}", out.seed))?;
            pretty_kv(&mut w, "Leaves", out.leaves.to_string())?;
            pretty_kv(&mut w, "Items", out.items.to_string())?;
            pretty_kv(
                &mut w,
                "Fingerprint",
                out.fingerprint.as_deref().unwrap_or("(rejected)"),
            )?;
            pretty_kv(&mut w, "Oracle", out.oracle_passed.to_string())?;

            if !out.oracle_passed {
                writeln!(w)?;
                pretty_section(&mut w, "Invariant Violations")?;
                for violation in &out.violations {
                    writeln!(w, "- {violation}")?;
                }
            }
        }
    }
    w.flush()?;
    drop(w);

    if !trace.oracle.passed {
        process::exit(1);
    }
    Ok(())
}
