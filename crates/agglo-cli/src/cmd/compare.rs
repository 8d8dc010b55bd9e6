//! `agglo compare`: divergence between two flat partitions of one vocabulary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use agglo_core::config::ProjectConfig;
use agglo_core::io::{load_labels, load_vocabulary};
use agglo_core::{
    CanonicalCluster, DisagreementGroup, DisagreementPair, Label, Vocabulary, compare_partitions,
};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `agglo compare`.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Embedding text file whose first column is the vocabulary.
    #[arg(long)]
    pub vocab: PathBuf,

    /// Read at most this many vocabulary lines.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Labels from the first engine (`token cluster_id` table or one label per line).
    #[arg(long)]
    pub left: PathBuf,

    /// Labels from the second engine.
    #[arg(long)]
    pub right: PathBuf,

    /// Disagreement pairs to list. Defaults to `[compare] max_pairs`.
    #[arg(long)]
    pub max_pairs: Option<usize>,
}

#[derive(Debug, Serialize)]
struct CompareOutput<'a> {
    items: usize,
    clusters_left: usize,
    clusters_right: usize,
    mismatch_count: usize,
    equivalent: bool,
    pairs_total: usize,
    pairs: Vec<&'a DisagreementPair>,
    groups: &'a [DisagreementGroup],
}

fn load_side(path: &Path, vocab: &Vocabulary) -> Result<Vec<Label>> {
    load_labels(path, vocab).with_context(|| format!("loading labels from {}", path.display()))
}

/// Execute `agglo compare`. Exits with status 1 when the partitions diverge.
///
/// # Errors
///
/// Fails when an input cannot be loaded or the label tables do not align
/// with the vocabulary.
pub fn run_compare(args: &CompareArgs, output: OutputMode, project: &ProjectConfig) -> Result<()> {
    let vocab = load_vocabulary(&args.vocab, args.limit.or(project.vocab.limit))
        .with_context(|| format!("loading vocabulary from {}", args.vocab.display()))?;
    let left = load_side(&args.left, &vocab)?;
    let right = load_side(&args.right, &vocab)?;
    let divergence = compare_partitions(&vocab, &left, &right)?;
    tracing::debug!(
        items = divergence.items,
        mismatches = divergence.mismatch_count,
        "compared partitions"
    );

    let max_pairs = args.max_pairs.unwrap_or(project.compare.max_pairs);
    let (clusters_left, clusters_right) = divergence.cluster_counts();
    let out = CompareOutput {
        items: divergence.items,
        clusters_left,
        clusters_right,
        mismatch_count: divergence.mismatch_count,
        equivalent: divergence.is_equivalent(),
        pairs_total: divergence.disagreements.len(),
        pairs: divergence.disagreements.iter().take(max_pairs).collect(),
        groups: &divergence.groups,
    };
    let show_tokens = project.compare.show_tokens;

    render_mode(
        output,
        &out,
        |out, w| {
            writeln!(
                w,
                "items={} clusters={}/{} mismatches={} pairs={} groups={}",
                out.items,
                out.clusters_left,
                out.clusters_right,
                out.mismatch_count,
                out.pairs_total,
                out.groups.len()
            )?;
            for pair in &out.pairs {
                writeln!(
                    w,
                    "pair {}\t{}",
                    describe(&pair.left, show_tokens),
                    describe(&pair.right, show_tokens)
                )?;
            }
            write_truncation(w, out)
        },
        |out, w| {
            pretty_section(w, "Partition Divergence")?;
            pretty_kv(w, "Items", out.items.to_string())?;
            pretty_kv(
                w,
                "Clusters",
                format!("{} left / {} right", out.clusters_left, out.clusters_right),
            )?;
            pretty_kv(w, "Mismatches", out.mismatch_count.to_string())?;
            if out.equivalent {
                return pretty_kv(w, "Status", "equivalent");
            }
            pretty_kv(
                w,
                "Status",
                format!(
                    "{} disagreement pairs in {} groups",
                    out.pairs_total,
                    out.groups.len()
                ),
            )?;
            writeln!(w)?;
            pretty_section(w, "Disagreement Pairs")?;
            for pair in &out.pairs {
                writeln!(w, "left   {}", describe(&pair.left, show_tokens))?;
                writeln!(w, "right  {}", describe(&pair.right, show_tokens))?;
                writeln!(w)?;
            }
            write_truncation(w, out)
        },
    )?;

    if !divergence.is_equivalent() {
        std::io::stdout().flush()?;
        process::exit(1);
    }
    Ok(())
}

fn describe(cluster: &CanonicalCluster, show_tokens: bool) -> String {
    if show_tokens {
        format!("({})", cluster.tokens().join(", "))
    } else {
        format!("<{} tokens>", cluster.len())
    }
}

fn write_truncation(w: &mut dyn Write, out: &CompareOutput<'_>) -> std::io::Result<()> {
    if out.pairs_total > out.pairs.len() {
        writeln!(
            w,
            "... and {} more pairs (raise --max-pairs)",
            out.pairs_total - out.pairs.len()
        )?;
    }
    Ok(())
}
