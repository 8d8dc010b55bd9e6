#![forbid(unsafe_code)]

use agglo_sim::campaign::{CampaignConfig, run_campaign};
use anyhow::Result;

fn main() -> Result<()> {
    let report = run_campaign(&CampaignConfig::default())?;

    println!(
        "campaign complete: seeds={} passed={} first_failure={:?}",
        report.seeds_run, report.seeds_passed, report.first_failure
    );
    for failure in &report.failures {
        for violation in &failure.violations {
            println!("  seed {}: {violation}", failure.seed);
        }
    }

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
