//! # Cleanup Command Implementation
//!
//! Removes everything the registry no longer mentions: registered mirrors
//! that are not declared, then directories under `skills/` that are neither a
//! source name, a vendor mapping output nor a manual entry. Each batch is
//! confirmed separately unless `--yes` is given.

use anyhow::Result;

use skill_sync::output::emoji;
use skill_sync::reconciler::{Outcome, Reconciler};

use super::Context;

/// Execute the `cleanup` command.
pub fn execute(ctx: &Context) -> Result<()> {
    let registry = ctx.load_registry()?;

    let fs = ctx.filesystem();
    let git = ctx.git();
    let prompt = ctx.prompt();

    let report = match Reconciler::new(&registry, &git, &fs).cleanup(prompt.as_ref())? {
        Outcome::Completed(report) => report,
        Outcome::Cancelled => {
            ctx.cancelled();
            return Ok(());
        }
    };

    if report.is_clean() {
        println!(
            "{} Everything is clean, no unused mirrors or outputs found",
            emoji(&ctx.out, "✨", "[OK]")
        );
        return Ok(());
    }

    if !report.removed_mirrors.is_empty() {
        println!("{}", ctx.out.heading("Removed mirrors:"));
        ctx.list(("🗑️", "[DEL]"), &report.removed_mirrors);
    }
    if !report.removed_outputs.is_empty() {
        println!("{}", ctx.out.heading("Removed outputs:"));
        let paths: Vec<String> = report
            .removed_outputs
            .iter()
            .map(|name| format!("skills/{}", name))
            .collect();
        ctx.list(("🗑️", "[DEL]"), &paths);
    }
    if !report.kept.is_empty() {
        println!("{}", ctx.out.heading("Kept:"));
        ctx.list(("⚠️", "[WARN]"), &report.kept);
    }

    ctx.finish(&report.failures)
}
