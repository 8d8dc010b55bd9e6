//! `agglo canon`: print the canonical serialization of a merge sequence.

use std::io::Write;
use std::path::{Path, PathBuf};

use agglo_core::config::ProjectConfig;
use agglo_core::io::{load_merges, load_vocabulary};
use agglo_core::{CanonicalTree, MergeRecord, Vocabulary, canonicalize};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `agglo canon`.
#[derive(Args, Debug)]
pub struct CanonArgs {
    /// Merge records, text (`left right` per line) or JSON.
    #[arg(long)]
    pub merges: PathBuf,

    /// Number of leaves. Defaults to the record count plus one.
    #[arg(long)]
    pub leaves: Option<usize>,

    /// Embedding text file whose first column names the leaves.
    #[arg(long)]
    pub vocab: Option<PathBuf>,

    /// Read at most this many vocabulary lines.
    #[arg(long, requires = "vocab")]
    pub limit: Option<usize>,

    /// Print leaves as vocabulary tokens instead of indices.
    #[arg(long, requires = "vocab")]
    pub tokens: bool,
}

#[derive(Debug, Serialize)]
struct CanonOutput {
    leaves: usize,
    merges: usize,
    canonical: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rendered: Option<String>,
    fingerprint: String,
}

/// Load merge records from `path` and canonicalize them.
///
/// Shared with `agglo golden`.
pub fn canonical_from_file(
    path: &Path,
    leaves: Option<usize>,
) -> Result<(CanonicalTree, Vec<MergeRecord>)> {
    let records =
        load_merges(path).with_context(|| format!("loading merges from {}", path.display()))?;
    let leaves = leaves.unwrap_or(records.len() + 1);
    let tree = canonicalize(leaves, &records)
        .with_context(|| format!("canonicalizing {}", path.display()))?;
    tracing::debug!(leaves, records = records.len(), "canonicalized merge sequence");
    Ok((tree, records))
}

/// Execute `agglo canon`.
///
/// # Errors
///
/// Fails when the merge or vocabulary files cannot be loaded or the merge
/// sequence is invalid.
pub fn run_canon(args: &CanonArgs, output: OutputMode, project: &ProjectConfig) -> Result<()> {
    let (tree, records) = canonical_from_file(&args.merges, args.leaves)?;

    let vocab: Option<Vocabulary> = args
        .vocab
        .as_deref()
        .map(|path| {
            load_vocabulary(path, args.limit.or(project.vocab.limit))
                .with_context(|| format!("loading vocabulary from {}", path.display()))
        })
        .transpose()?;
    if let Some(vocab) = vocab.as_ref().filter(|v| v.len() < tree.leaf_count()) {
        tracing::warn!(
            vocabulary = vocab.len(),
            leaves = tree.leaf_count(),
            "vocabulary is shorter than the leaf set; extra leaves render as indices"
        );
    }

    let out = CanonOutput {
        leaves: tree.leaf_count(),
        merges: records.len(),
        canonical: tree.to_string(),
        rendered: vocab.as_ref().map(|vocab| tree.render_with(vocab)),
        fingerprint: tree.fingerprint(),
    };
    let show_tokens = args.tokens;

    render_mode(
        output,
        &out,
        |out, w| {
            let line = match &out.rendered {
                Some(rendered) if show_tokens => rendered,
                _ => &out.canonical,
            };
            writeln!(w, "{line}")
        },
        |out, w| {
            pretty_section(w, "Canonical Dendrogram")?;
            pretty_kv(w, "Leaves", out.leaves.to_string())?;
            pretty_kv(w, "Merges", out.merges.to_string())?;
            pretty_kv(w, "Fingerprint", &out.fingerprint)?;
            writeln!(w)?;
            writeln!(w, "{}", out.canonical)?;
            if let Some(rendered) = out.rendered.as_ref().filter(|_| show_tokens) {
                writeln!(w)?;
                writeln!(w, "{rendered}")?;
            }
            Ok(())
        },
    )
}
