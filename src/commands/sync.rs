//! # Sync Command Implementation
//!
//! Updates every registered mirror to its upstream tip (merging, never
//! discarding local commits) and then regenerates each vendor output from
//! its mapped sub-resource. Every regenerated output receives a `SYNC.md`
//! provenance sidecar and, when the mirror has one, its license.
//!
//! Manual outputs and source mirrors' outputs are never written.

use anyhow::Result;

use skill_sync::output::emoji;
use skill_sync::reconciler::Reconciler;

use super::Context;

/// Execute the `sync` command.
pub fn execute(ctx: &Context) -> Result<()> {
    let registry = ctx.load_registry()?;
    ctx.require_git(&registry)?;

    let fs = ctx.filesystem();
    let git = ctx.git();

    let report = Reconciler::new(&registry, &git, &fs).synchronize()?;

    if !report.updated.is_empty() {
        println!("{}", ctx.out.heading("Updated mirrors:"));
        ctx.list(("🔄", "[UPD]"), &report.updated);
    }

    if !report.not_initialized.is_empty() {
        println!(
            "{} Not initialized (run `skill-sync init`): {}",
            emoji(&ctx.out, "⚠️", "[WARN]"),
            report.not_initialized.join(", ")
        );
    }

    if !report.regenerated.is_empty() {
        println!("{}", ctx.out.heading("Synced outputs:"));
        for output in &report.regenerated {
            println!(
                "  {} {} -> skills/{} {}",
                emoji(&ctx.out, "📦", "[SYNC]"),
                output.source_path,
                output.output,
                ctx.out.dim(&format!(
                    "({} files, {})",
                    output.files,
                    output.revision.as_deref().map_or("unknown", |r| &r[..r.len().min(12)])
                ))
            );
        }
    }

    for skipped in &report.skipped {
        println!(
            "{} Skipped {}: {}",
            emoji(&ctx.out, "⏭️", "[SKIP]"),
            skipped.item,
            skipped.reason
        );
    }

    ctx.finish(&report.failures)
}
