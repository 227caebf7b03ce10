//! Progress and prompt surface for the wizard
//!
//! Steps report progress and ask questions through the `WizardUi` trait so
//! the same steps run under the terminal frontend or a test harness.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Raised when the user dismisses a modal prompt
#[derive(Debug, Error)]
#[error("operation cancelled by user")]
pub struct Cancelled;

#[async_trait]
pub trait WizardUi: Send + Sync {
    /// Show a progress message
    fn report(&self, message: &str);

    /// Show a blocking warning with a single action; returns false when the
    /// user dismisses it
    async fn warn_modal(&self, message: &str, action: &str) -> anyhow::Result<bool>;

    /// Ask the user to pick one of `items`; returns the chosen index
    async fn pick(&self, prompt: &str, items: &[String]) -> anyhow::Result<usize>;
}

/// Terminal frontend: progress to stderr, prompts over stdin
pub struct TerminalUi;

#[async_trait]
impl WizardUi for TerminalUi {
    fn report(&self, message: &str) {
        tracing::info!("{}", message);
        eprintln!("{}", message);
    }

    async fn warn_modal(&self, message: &str, action: &str) -> anyhow::Result<bool> {
        eprintln!("Warning: {}", message);
        eprint!("{} [y/N]: ", action);
        io::stderr().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(matches!(line.trim(), "y" | "Y" | "yes"))
    }

    async fn pick(&self, prompt: &str, items: &[String]) -> anyhow::Result<usize> {
        eprintln!("{}", prompt);
        for (i, item) in items.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, item);
        }
        eprint!("Enter a number (1-{}): ", items.len());
        io::stderr().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let choice: usize = line.trim().parse()?;
        if choice == 0 || choice > items.len() {
            anyhow::bail!("selection out of range: {}", choice);
        }
        Ok(choice - 1)
    }
}
