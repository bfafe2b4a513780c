//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use crate::commands::{self, Context};
use skill_sync::defaults::DEFAULT_CONFIG_FILENAME;
use skill_sync::output::OutputConfig;
use skill_sync::prompt::{Prompt, TerminalPrompt};

/// skill-sync - Keep skill mirrors and generated skills in step with the registry
#[derive(Parser, Debug)]
#[command(name = "skill-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute; without one an interactive menu is shown
    #[command(subcommand)]
    command: Option<Commands>,

    /// Accept every confirmation and select every item without prompting
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Working-tree root containing sources/, vendor/ and skills/
    #[arg(
        short = 'C',
        long = "root",
        global = true,
        value_name = "DIR",
        env = "SKILL_SYNC_ROOT",
        default_value = "."
    )]
    root: PathBuf,

    /// Registry file, relative to the root unless absolute
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "SKILL_SYNC_CONFIG",
        default_value = DEFAULT_CONFIG_FILENAME
    )]
    config: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Register missing mirrors and remove undeclared ones
    Init,
    /// Update mirrors to upstream and regenerate vendor outputs
    Sync,
    /// Report mirrors behind upstream and outputs out of date
    Check(commands::check::CheckArgs),
    /// Remove undeclared mirrors and outputs
    Cleanup,
}

/// Entries of the interactive menu, in display order.
const MENU: &[(&str, &str)] = &[
    ("sync", "Sync mirrors - update mirrors and regenerate vendor outputs"),
    ("init", "Init mirrors - add missing mirrors"),
    ("check", "Check updates - see available upstream changes"),
    ("cleanup", "Cleanup - remove unused mirrors and outputs"),
];

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let context = Context {
            root: self.root,
            config_path: self.config,
            yes: self.yes,
            out: OutputConfig::from_env_and_flag(&self.color),
        };

        let command = match self.command {
            Some(command) => command,
            None => match choose_from_menu(&context)? {
                Some(command) => command,
                None => {
                    context.cancelled();
                    return Ok(());
                }
            },
        };

        match command {
            Commands::Init => commands::init::execute(&context),
            Commands::Sync => commands::sync::execute(&context),
            Commands::Check(args) => commands::check::execute(&context, args),
            Commands::Cleanup => commands::cleanup::execute(&context),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // a second init (tests driving execute twice) keeps the first logger
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn choose_from_menu(context: &Context) -> Result<Option<Commands>> {
    if context.yes {
        bail!(
            "A command is required when using --yes\n  Available commands: {}",
            MENU.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
        );
    }

    let labels: Vec<String> = MENU.iter().map(|(_, label)| label.to_string()).collect();
    let choice = TerminalPrompt::new().select("What would you like to do?", &labels)?;
    Ok(choice.and_then(|index| match MENU.get(index).map(|(name, _)| *name) {
        Some("sync") => Some(Commands::Sync),
        Some("init") => Some(Commands::Init),
        Some("check") => Some(Commands::Check(commands::check::CheckArgs::default())),
        Some("cleanup") => Some(Commands::Cleanup),
        _ => None,
    }))
}
