//! Permission resolution for device capabilities
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PermissionOracle                        │
//! │  ┌────────────────────┐      ┌─────────────────────────────┐ │
//! │  │ PermissionProvider │      │       DenialRecovery        │ │
//! │  │                    │      │  ┌──────────┐ ┌──────────┐  │ │
//! │  │ - status           │      │  │Presenter │ │ Settings │  │ │
//! │  │ - request          │      │  │          │ │ Launcher │  │ │
//! │  └────────────────────┘      │  └──────────┘ └──────────┘  │ │
//! │                              └─────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Status | Oracle result | Side effect |
//! |--------|---------------|-------------|
//! | Granted | `true` | none |
//! | Undetermined | answer of one OS prompt | OS prompt |
//! | Denied | `false` | recovery dialog, not awaited |
//!
//! ## Presenters
//!
//! - `TerminalRecoveryPresenter`: asks on stdin/stdout
//! - `AutoRecoveryPresenter`: fixed answer, logged
//! - `RecordingRecoveryPresenter`: records dialogs (testing)

pub mod oracle;
pub mod prompt;
pub mod recovery;
pub mod settings;

pub use oracle::PermissionOracle;
pub use prompt::{AutoRecoveryPresenter, RecordingRecoveryPresenter, TerminalRecoveryPresenter};
pub use prompt::{PromptError, RecoveryChoice, RecoveryPresenter, RecoveryPrompt};
pub use recovery::{AlertKeys, DenialRecovery};
pub use settings::{RecordingSettingsLauncher, SettingsLauncher, TracingSettingsLauncher};
