//! Confirmation and selection capability.
//!
//! Every destructive reconciler step asks a [`Prompt`] first. Each method
//! returns `Ok(None)` when the user cancels (Esc / `q` / Ctrl-C in the
//! terminal backend), which the reconciler turns into a clean abort.
//!
//! - [`TerminalPrompt`] asks on the terminal with `dialoguer`.
//! - [`AutoConfirm`] backs the `--yes` flag: every confirmation is accepted
//!   and every multi-select takes all items.

use dialoguer::{theme::ColorfulTheme, Confirm, MultiSelect, Select};

use crate::error::{Error, Result};

pub trait Prompt {
    /// Ask a yes/no question. `None` means cancelled.
    fn confirm(&self, message: &str) -> Result<Option<bool>>;

    /// Pick any subset of `items` (all pre-selected). `None` means cancelled.
    fn multi_select(&self, message: &str, items: &[String]) -> Result<Option<Vec<usize>>>;

    /// Pick exactly one of `items`. `None` means cancelled.
    fn select(&self, message: &str, items: &[String]) -> Result<Option<usize>>;
}

/// Non-interactive prompt used when confirmations are overridden.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Prompt for AutoConfirm {
    fn confirm(&self, _message: &str) -> Result<Option<bool>> {
        Ok(Some(true))
    }

    fn multi_select(&self, _message: &str, items: &[String]) -> Result<Option<Vec<usize>>> {
        Ok(Some((0..items.len()).collect()))
    }

    fn select(&self, message: &str, _items: &[String]) -> Result<Option<usize>> {
        Err(Error::NonInteractive {
            action: message.to_string(),
        })
    }
}

/// Interactive prompt on the controlling terminal.
#[derive(Default)]
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<Option<bool>> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(true)
            .interact_opt()?)
    }

    fn multi_select(&self, message: &str, items: &[String]) -> Result<Option<Vec<usize>>> {
        let defaults = vec![true; items.len()];
        Ok(MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .defaults(&defaults)
            .interact_opt()?)
    }

    fn select(&self, message: &str, items: &[String]) -> Result<Option<usize>> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact_opt()?)
    }
}
