#![forbid(unsafe_code)]

mod cmd;
mod output;

use agglo_core::config::{ProjectConfig, load_project_config, load_user_config};
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit status for errors (mismatches and divergences exit with 1).
const EXIT_ERROR: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "agglo: canonical dendrogram fixtures and partition divergence checks",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Dendrograms",
        about = "Print the canonical form of a merge sequence",
        long_about = "Canonicalize a merge sequence (numpy children_ dump, scipy linkage rows,\n\
                      or JSON) and print its order-independent serialization.",
        after_help = "EXAMPLES:\n    # Canonical form with leaf indices\n    agglo canon --merges ward_children.txt\n\n\
                      # Leaves named by an embedding file\n    agglo canon --merges ward_children.txt --vocab glove.txt --limit 1000 --tokens\n\n\
                      # Emit machine-readable output\n    agglo canon --merges ward.json --format json"
    )]
    Canon(cmd::canon::CanonArgs),

    #[command(
        next_help_heading = "Dendrograms",
        about = "Write or check golden fixtures"
    )]
    Golden(cmd::golden::GoldenArgs),

    #[command(
        next_help_heading = "Partitions",
        about = "Compare two flat partitions",
        long_about = "Compare two cluster assignments of the same vocabulary by membership.\n\
                      Exits with status 1 when they disagree on any item.",
        after_help = "EXAMPLES:\n    # Compare two label tables\n    agglo compare --vocab glove.txt --left ours.tsv --right sklearn.tsv\n\n\
                      # Only the first 5000 vocabulary lines, list 50 pairs\n    agglo compare --vocab glove.txt --limit 5000 --left a.txt --right b.txt --max-pairs 50"
    )]
    Compare(cmd::compare::CompareArgs),

    #[command(
        next_help_heading = "Development",
        about = "Deterministic property campaigns"
    )]
    Sim(cmd::sim::SimArgs),

    #[command(
        next_help_heading = "Development",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    agglo completions bash\n\n    # Generate zsh completions\n    agglo completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("AGGLO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "agglo=debug,info"
        } else if quiet {
            "error"
        } else {
            "agglo=info,warn"
        })
    });

    let format = env::var("AGGLO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user_config = load_user_config().unwrap_or_else(|err| {
        tracing::warn!("ignoring user config: {err:#}");
        agglo_core::config::UserConfig::default()
    });
    let output = output::resolve_output_mode(cli.format, cli.json, user_config.output.as_deref());

    if let Err(err) = run(cli.command, output) {
        output::render_error(output, &CliError::from(&err))?;
        process::exit(EXIT_ERROR);
    }
    Ok(())
}

/// Project root and its `agglo.toml`, for commands that read project settings.
fn project_config() -> anyhow::Result<(PathBuf, ProjectConfig)> {
    let project_root = env::current_dir()?;
    let project = load_project_config(&project_root)?;
    Ok((project_root, project))
}

fn run(command: Commands, output: OutputMode) -> anyhow::Result<()> {
    match command {
        Commands::Canon(args) => {
            let (_, project) = project_config()?;
            cmd::canon::run_canon(&args, output, &project)
        }
        Commands::Golden(args) => {
            let (project_root, project) = project_config()?;
            match args.command {
                cmd::golden::GoldenCommand::Write(ref file) => {
                    cmd::golden::run_golden_write(file, output, &project_root, &project)
                }
                cmd::golden::GoldenCommand::Check(ref file) => {
                    cmd::golden::run_golden_check(file, output, &project_root, &project)
                }
            }
        }
        Commands::Compare(args) => {
            let (_, project) = project_config()?;
            cmd::compare::run_compare(&args, output, &project)
        }
        Commands::Sim(args) => match args.command {
            cmd::sim::SimCommand::Run(ref run) => cmd::sim::run_sim_run(run, output),
            cmd::sim::SimCommand::Replay(ref replay) => cmd::sim::run_sim_replay(replay, output),
        },
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["agglo", "canon", "--merges", "m.txt", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["agglo", "--format", "text", "canon", "--merges", "m.txt"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn quiet_flag_parsed() {
        let cli = Cli::parse_from(["agglo", "-q", "sim", "run"]);
        assert!(cli.quiet);
    }

    #[test]
    fn tokens_requires_vocab() {
        let result = Cli::try_parse_from(["agglo", "canon", "--merges", "m.txt", "--tokens"]);
        assert!(result.is_err());
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["agglo", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["agglo", "canon", "--merges", "m.txt"],
            vec!["agglo", "golden", "write", "--merges", "m.txt", "--name", "x"],
            vec!["agglo", "golden", "check", "--merges", "m.txt", "--name", "x"],
            vec![
                "agglo", "compare", "--vocab", "v.txt", "--left", "a", "--right", "b",
            ],
            vec!["agglo", "sim", "run", "--seeds", "3"],
            vec!["agglo", "sim", "replay", "--seed", "3"],
            vec!["agglo", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
