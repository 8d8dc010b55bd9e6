//! `agglo golden`: write and check canonical dendrogram fixtures.
//!
//! `agglo golden write`: canonicalize merges and store the fixture.
//! `agglo golden check`: canonicalize merges and compare against the fixture.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use agglo_core::CanonicalTree;
use agglo_core::config::ProjectConfig;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cmd::canon::canonical_from_file;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Characters of context shown on each side of a mismatch.
const EXCERPT_WIDTH: usize = 24;

/// Top-level arguments for `agglo golden`.
#[derive(Args, Debug)]
pub struct GoldenArgs {
    #[command(subcommand)]
    pub command: GoldenCommand,
}

#[derive(Subcommand, Debug)]
pub enum GoldenCommand {
    #[command(
        about = "Write a golden fixture",
        long_about = "Canonicalize a merge sequence and write the result as a golden fixture.",
        after_help = "EXAMPLES:\n    # Write fixtures/ward.golden\n    agglo golden write --merges ward_children.txt --name ward\n\n\
                      # Write into a custom directory\n    agglo golden write --merges ward.json --name ward --dir testdata"
    )]
    Write(GoldenFileArgs),

    #[command(
        about = "Check merges against a golden fixture",
        long_about = "Canonicalize a merge sequence and compare it with a stored fixture.\n\
                      Exits with status 1 and reports the first differing byte offset on mismatch.",
        after_help = "EXAMPLES:\n    # Check against fixtures/ward.golden\n    agglo golden check --merges ward_children.txt --name ward\n\n\
                      # Machine-readable output\n    agglo golden check --merges ward.json --name ward --format json"
    )]
    Check(GoldenFileArgs),
}

#[derive(Args, Debug)]
pub struct GoldenFileArgs {
    /// Merge records, text (`left right` per line) or JSON.
    #[arg(long)]
    pub merges: PathBuf,

    /// Number of leaves. Defaults to the record count plus one.
    #[arg(long)]
    pub leaves: Option<usize>,

    /// Fixture name, without extension.
    #[arg(long)]
    pub name: String,

    /// Fixture directory. Defaults to `[fixtures] dir` from agglo.toml.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl GoldenFileArgs {
    fn fixture_path(&self, project_root: &Path, project: &ProjectConfig) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(format!("{}.{}", self.name, project.fixtures.extension)),
            None => project.fixtures.path_for(project_root, &self.name),
        }
    }
}

#[derive(Debug, Serialize)]
struct WriteOutput {
    name: String,
    path: PathBuf,
    leaves: usize,
    fingerprint: String,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    name: String,
    path: PathBuf,
    matched: bool,
    leaves: usize,
    expected_fingerprint: String,
    actual_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_difference: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_excerpt: Option<String>,
}

/// Execute `agglo golden write`.
///
/// # Errors
///
/// Fails when the merges cannot be canonicalized or the fixture cannot be written.
pub fn run_golden_write(
    args: &GoldenFileArgs,
    output: OutputMode,
    project_root: &Path,
    project: &ProjectConfig,
) -> Result<()> {
    let (tree, _) = canonical_from_file(&args.merges, args.leaves)?;
    let path = args.fixture_path(project_root, project);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, format!("{tree}\n"))
        .with_context(|| format!("writing fixture {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote golden fixture");

    let out = WriteOutput {
        name: args.name.clone(),
        path,
        leaves: tree.leaf_count(),
        fingerprint: tree.fingerprint(),
    };
    render_mode(
        output,
        &out,
        |out, w| writeln!(w, "wrote {} leaves={}", out.path.display(), out.leaves),
        |out, w| {
            pretty_section(w, "Golden Fixture")?;
            pretty_kv(w, "Name", &out.name)?;
            pretty_kv(w, "Path", out.path.display().to_string())?;
            pretty_kv(w, "Leaves", out.leaves.to_string())?;
            pretty_kv(w, "Fingerprint", &out.fingerprint)
        },
    )
}

/// Execute `agglo golden check`. Exits with status 1 on mismatch.
///
/// # Errors
///
/// Fails when the merges cannot be canonicalized, or the fixture is missing
/// or is not a canonical dendrogram.
pub fn run_golden_check(
    args: &GoldenFileArgs,
    output: OutputMode,
    project_root: &Path,
    project: &ProjectConfig,
) -> Result<()> {
    let (actual, _) = canonical_from_file(&args.merges, args.leaves)?;
    let path = args.fixture_path(project_root, project);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading fixture {}", path.display()))?;
    let expected: CanonicalTree = text
        .trim_end()
        .parse()
        .with_context(|| format!("parsing fixture {}", path.display()))?;

    let first_difference = expected.first_divergence(&actual);
    let (expected_text, actual_text) = (expected.to_string(), actual.to_string());
    let out = CheckOutput {
        name: args.name.clone(),
        path,
        matched: first_difference.is_none(),
        leaves: actual.leaf_count(),
        expected_fingerprint: expected.fingerprint(),
        actual_fingerprint: actual.fingerprint(),
        first_difference,
        expected_excerpt: first_difference.map(|offset| excerpt(&expected_text, offset)),
        actual_excerpt: first_difference.map(|offset| excerpt(&actual_text, offset)),
    };
    if let Some(offset) = first_difference {
        tracing::warn!(offset, fixture = %args.name, "golden fixture mismatch");
    }

    render_mode(
        output,
        &out,
        |out, w| match out.first_difference {
            None => writeln!(w, "ok {}", out.name),
            Some(offset) => {
                writeln!(w, "mismatch {} offset={offset}", out.name)?;
                writeln!(w, "expected {}", out.expected_excerpt.as_deref().unwrap_or(""))?;
                writeln!(w, "actual   {}", out.actual_excerpt.as_deref().unwrap_or(""))
            }
        },
        |out, w| {
            pretty_section(w, "Golden Check")?;
            pretty_kv(w, "Fixture", out.path.display().to_string())?;
            pretty_kv(w, "Leaves", out.leaves.to_string())?;
            match out.first_difference {
                None => pretty_kv(w, "Status", "match"),
                Some(offset) => {
                    pretty_kv(w, "Status", format!("MISMATCH at byte {offset}"))?;
                    pretty_kv(w, "Expected", out.expected_excerpt.as_deref().unwrap_or(""))?;
                    pretty_kv(w, "Actual", out.actual_excerpt.as_deref().unwrap_or(""))?;
                    pretty_kv(w, "Hint", "agglo golden write regenerates the fixture")
                }
            }
        },
    )?;

    if !out.matched {
        std::io::stdout().flush()?;
        process::exit(1);
    }
    Ok(())
}

/// Up to [`EXCERPT_WIDTH`] bytes either side of `offset`, clamped to char
/// boundaries.
fn excerpt(text: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(EXCERPT_WIDTH).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = offset.saturating_add(EXCERPT_WIDTH).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    let prefix = if start > 0 { "…" } else { "" };
    let suffix = if end < text.len() { "…" } else { "" };
    format!("{prefix}{}{suffix}", &text[start..end])
}
