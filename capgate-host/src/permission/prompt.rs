//! Recovery dialog presentation
//!
//! When a capability is already denied, the user is shown a two-button
//! dialog offering to open system settings. [`RecoveryPresenter`] is the
//! seam a UI layer implements to show that dialog.

use async_trait::async_trait;
use capgate_api::Capability;
use std::io::{self, BufRead, IsTerminal, Write};
use thiserror::Error;

use crate::recording::Recorder;

/// Error type for prompt operations
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt dismissed without a choice")]
    Dismissed,

    #[error("Non-interactive environment")]
    NonInteractive,

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Prompt task failed: {0}")]
    Task(String),
}

/// Button chosen in the recovery dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryChoice {
    /// Dismiss; nothing happens
    #[default]
    Deny,
    /// Open system settings
    Allow,
}

impl RecoveryChoice {
    pub fn opens_settings(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Fully resolved dialog content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPrompt {
    pub capability: Capability,
    pub title: String,
    pub description: String,
    pub deny_label: String,
    pub allow_label: String,
}

impl RecoveryPrompt {
    /// Plain-text rendering used by terminal presenters
    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n\n[d] {}   [a] {}",
            self.title, self.description, self.deny_label, self.allow_label
        )
    }
}

/// Shows the recovery dialog and reports the user's choice
///
/// ```rust
/// use async_trait::async_trait;
/// use capgate::permission::{PromptError, RecoveryChoice, RecoveryPresenter, RecoveryPrompt};
///
/// struct AlwaysOpenSettings;
///
/// #[async_trait]
/// impl RecoveryPresenter for AlwaysOpenSettings {
///     async fn present(&self, _prompt: &RecoveryPrompt) -> Result<RecoveryChoice, PromptError> {
///         Ok(RecoveryChoice::Allow)
///     }
///
///     fn is_interactive(&self) -> bool {
///         false
///     }
/// }
/// ```
#[async_trait]
pub trait RecoveryPresenter: Send + Sync {
    async fn present(&self, prompt: &RecoveryPrompt) -> Result<RecoveryChoice, PromptError>;

    fn is_interactive(&self) -> bool;
}

// ============================================================================
// Terminal Presenter
// ============================================================================

/// Prints the dialog to stdout and reads the answer from stdin
#[derive(Debug, Default)]
pub struct TerminalRecoveryPresenter;

impl TerminalRecoveryPresenter {
    pub fn new() -> Self {
        Self
    }
}

fn parse_choice(input: &str) -> RecoveryChoice {
    match input.trim().to_lowercase().as_str() {
        "a" | "allow" | "y" | "yes" => RecoveryChoice::Allow,
        // Anything else, including an empty line, dismisses
        _ => RecoveryChoice::Deny,
    }
}

fn read_choice(rendered: &str) -> Result<RecoveryChoice, PromptError> {
    let mut stdout = io::stdout();
    writeln!(stdout)?;
    writeln!(stdout, "{}", rendered)?;
    write!(stdout, "> ")?;
    stdout.flush()?;

    let mut input = String::new();
    let read = io::stdin().lock().read_line(&mut input)?;
    if read == 0 {
        return Err(PromptError::Dismissed);
    }
    Ok(parse_choice(&input))
}

#[async_trait]
impl RecoveryPresenter for TerminalRecoveryPresenter {
    async fn present(&self, prompt: &RecoveryPrompt) -> Result<RecoveryChoice, PromptError> {
        if !self.is_interactive() {
            return Err(PromptError::NonInteractive);
        }

        let rendered = prompt.render();
        tokio::task::spawn_blocking(move || read_choice(&rendered))
            .await
            .map_err(|e| PromptError::Task(e.to_string()))?
    }

    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal() && io::stdout().is_terminal()
    }
}

// ============================================================================
// Auto Presenter
// ============================================================================

/// Answers every dialog with a fixed choice
#[derive(Debug, Default)]
pub struct AutoRecoveryPresenter {
    choice: RecoveryChoice,
}

impl AutoRecoveryPresenter {
    pub fn always_allow() -> Self {
        Self {
            choice: RecoveryChoice::Allow,
        }
    }

    pub fn always_deny() -> Self {
        Self {
            choice: RecoveryChoice::Deny,
        }
    }
}

#[async_trait]
impl RecoveryPresenter for AutoRecoveryPresenter {
    async fn present(&self, prompt: &RecoveryPrompt) -> Result<RecoveryChoice, PromptError> {
        tracing::info!(
            capability = %prompt.capability,
            choice = ?self.choice,
            "{}",
            prompt.title
        );
        Ok(self.choice)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Recording Presenter (for testing)
// ============================================================================

/// Records every dialog and answers with a fixed choice
#[derive(Default)]
pub struct RecordingRecoveryPresenter {
    prompts: Recorder<RecoveryPrompt>,
    choice: RecoveryChoice,
}

impl RecordingRecoveryPresenter {
    pub fn new(choice: RecoveryChoice) -> Self {
        Self {
            prompts: Recorder::new(),
            choice,
        }
    }

    pub fn prompts(&self) -> Vec<RecoveryPrompt> {
        self.prompts.items()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn clear(&self) {
        self.prompts.clear();
    }

    /// Wait until `count` dialogs have been shown
    pub async fn wait_for(&self, count: usize) {
        self.prompts.wait_for(count).await
    }
}

#[async_trait]
impl RecoveryPresenter for RecordingRecoveryPresenter {
    async fn present(&self, prompt: &RecoveryPrompt) -> Result<RecoveryChoice, PromptError> {
        self.prompts.push(prompt.clone());
        Ok(self.choice)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> RecoveryPrompt {
        RecoveryPrompt {
            capability: Capability::Camera,
            title: "Camera access needed".into(),
            description: "Open settings".into(),
            deny_label: "Not now".into(),
            allow_label: "Open Settings".into(),
        }
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("a\n"), RecoveryChoice::Allow);
        assert_eq!(parse_choice(" Yes "), RecoveryChoice::Allow);
        assert_eq!(parse_choice("d"), RecoveryChoice::Deny);
        assert_eq!(parse_choice(""), RecoveryChoice::Deny);
        assert!(RecoveryChoice::Allow.opens_settings());
        assert!(!RecoveryChoice::default().opens_settings());
    }

    #[test]
    fn test_render() {
        let rendered = prompt().render();
        assert!(rendered.starts_with("Camera access needed\nOpen settings"));
        assert!(rendered.contains("[a] Open Settings"));
        assert!(rendered.contains("[d] Not now"));
    }

    #[tokio::test]
    async fn test_auto_presenter() {
        let allow = AutoRecoveryPresenter::always_allow();
        assert_eq!(allow.present(&prompt()).await.unwrap(), RecoveryChoice::Allow);

        let deny = AutoRecoveryPresenter::always_deny();
        assert_eq!(deny.present(&prompt()).await.unwrap(), RecoveryChoice::Deny);
        assert!(!deny.is_interactive());
    }

    #[tokio::test]
    async fn test_recording_presenter() {
        let presenter = RecordingRecoveryPresenter::new(RecoveryChoice::Allow);
        presenter.present(&prompt()).await.unwrap();
        presenter.present(&prompt()).await.unwrap();

        presenter.wait_for(2).await;
        assert_eq!(presenter.prompt_count(), 2);
        assert_eq!(presenter.prompts()[0].capability, Capability::Camera);

        presenter.clear();
        assert_eq!(presenter.prompt_count(), 0);
    }
}
