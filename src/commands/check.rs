//! # Check Command Implementation
//!
//! Fetches remote metadata for every declared mirror and reports, without
//! touching the working tree:
//!
//! - mirrors behind their upstream, with the commit count (and, for vendors,
//!   the outputs the next sync would regenerate),
//! - mirrors whose upstream distance is unknown (offline, no tracking branch),
//! - declared mirrors that are not initialized,
//! - vendor outputs that no longer match their mirror's checked-out commit.
//!
//! `--format json` prints the same report as JSON for scripts.

use anyhow::Result;
use clap::{Args, ValueEnum};

use skill_sync::output::emoji;
use skill_sync::reconciler::{CheckReport, Reconciler, StaleReason};

use super::Context;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Report mirrors behind upstream and outputs out of date
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Execute the `check` command.
pub fn execute(ctx: &Context, args: CheckArgs) -> Result<()> {
    let registry = ctx.load_registry()?;
    ctx.require_git(&registry)?;

    let fs = ctx.filesystem();
    let git = ctx.git();

    let spinner = match args.format {
        ReportFormat::Text => ctx.out.spinner("Fetching remote changes..."),
        ReportFormat::Json => indicatif::ProgressBar::hidden(),
    };
    let report = Reconciler::new(&registry, &git, &fs).check();
    spinner.finish_and_clear();
    let report = report?;

    match args.format {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Text => print_text(ctx, &report),
    }
    Ok(())
}

fn print_text(ctx: &Context, report: &CheckReport) {
    let out = &ctx.out;

    for warning in &report.warnings {
        println!("{} {}", emoji(out, "⚠️", "[WARN]"), warning);
    }

    if report.is_up_to_date() {
        println!("{} All mirrors are up to date", emoji(out, "✅", "[OK]"));
        return;
    }

    if !report.updates.is_empty() {
        println!("{}", out.heading("Updates available:"));
        for update in &report.updates {
            let outputs = if update.outputs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", update.outputs.join(", "))
            };
            println!(
                "  {} {} ({}){}: {} commit(s) behind",
                emoji(out, "🔄", "[UPD]"),
                update.name,
                update.kind,
                outputs,
                update.behind
            );
        }
    }

    if !report.unknown_upstream.is_empty() {
        println!("{}", out.heading("Upstream unknown:"));
        ctx.list(("❓", "[?]"), &report.unknown_upstream);
    }

    if !report.not_initialized.is_empty() {
        println!("{}", out.heading("Not initialized (run `skill-sync init`):"));
        ctx.list(("➕", "[NEW]"), &report.not_initialized);
    }

    if !report.stale_outputs.is_empty() {
        println!("{}", out.heading("Outputs out of date (run `skill-sync sync`):"));
        for stale in &report.stale_outputs {
            let reason = match stale.reason {
                StaleReason::NotGenerated => "not generated yet",
                StaleReason::MissingProvenance => "no provenance record",
                StaleReason::RevisionChanged => "mirror moved since last sync",
            };
            println!(
                "  {} skills/{} {}",
                emoji(out, "📦", "[STALE]"),
                stale.output,
                out.dim(reason)
            );
        }
    }
}
