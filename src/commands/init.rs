//! # Init Command Implementation
//!
//! Brings the set of registered mirrors in line with the registry:
//!
//! 1. Mirrors registered in `.gitmodules` but not declared are listed and,
//!    after confirmation, deregistered and deleted.
//! 2. Declared mirrors that are not registered are offered in a multi-select
//!    (all pre-selected) and added with `git submodule add`.
//!
//! With `--yes` both steps run without prompting.

use anyhow::Result;

use skill_sync::output::emoji;
use skill_sync::reconciler::{Outcome, Reconciler};

use super::Context;

/// Execute the `init` command.
pub fn execute(ctx: &Context) -> Result<()> {
    let registry = ctx.load_registry()?;
    ctx.require_git(&registry)?;

    let fs = ctx.filesystem();
    let git = ctx.git();
    let prompt = ctx.prompt();

    let report = match Reconciler::new(&registry, &git, &fs).initialize(prompt.as_ref())? {
        Outcome::Completed(report) => report,
        Outcome::Cancelled => {
            ctx.cancelled();
            return Ok(());
        }
    };

    if !report.removed.is_empty() {
        println!("{}", ctx.out.heading("Removed mirrors:"));
        ctx.list(("🗑️", "[DEL]"), &report.removed);
    }
    if !report.kept.is_empty() {
        println!("{}", ctx.out.heading("Kept undeclared mirrors:"));
        ctx.list(("⚠️", "[WARN]"), &report.kept);
    }

    if report.all_present() {
        println!(
            "{} All mirrors already initialized",
            emoji(&ctx.out, "✅", "[OK]")
        );
    } else {
        if !report.checked_out.is_empty() {
            println!("{}", ctx.out.heading("Checked out registered mirrors:"));
            ctx.list(("📥", "[CHECKOUT]"), &report.checked_out);
        }
        if !report.added.is_empty() {
            println!("{}", ctx.out.heading("Added mirrors:"));
            ctx.list(("➕", "[ADD]"), &report.added);
        }
        if !report.skipped.is_empty() {
            println!("{}", ctx.out.heading("Not selected:"));
            ctx.list(("⏭️", "[SKIP]"), &report.skipped);
        }
        if !report.already_present.is_empty() {
            println!(
                "{} Already initialized: {}",
                emoji(&ctx.out, "ℹ️", "[INFO]"),
                report.already_present.join(", ")
            );
        }
    }

    ctx.finish(&report.failures)
}
