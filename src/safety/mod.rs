//! Safety Module
//!
//! Human-in-the-loop confirmation and guardrails for the destructive
//! clone options (`clean_all`, `overwrite`).

mod removal;

pub use removal::{is_dangerous_removal, remove_tree};

use std::io::{self, BufRead, Write};

/// Asks a human before an irreversible step.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Prompts on the terminal. Enter or `y` continues, anything else declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [Enter/y to continue, n to abort] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes"),
        }
    }
}

/// Fixed answer, for scripted runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmation for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
