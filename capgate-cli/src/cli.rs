//! Command-line definition

use capgate::{Capability, PermissionStatus, PickerOverrides};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::tracing_support::LogFormat;

/// Run permission-gated device actions against a simulated device
#[derive(Debug, Parser)]
#[command(name = "capgate", version, propagate_version = true)]
pub struct Cli {
    /// Gate configuration (JSON)
    #[arg(long, global = true, env = "CAPGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Simulated device profile (JSON)
    #[arg(long, global = true, env = "CAPGATE_DEVICE")]
    pub device: Option<PathBuf>,

    /// Override a permission status, e.g. `--status camera=denied`
    #[arg(long = "status", value_name = "CAPABILITY=STATUS", global = true)]
    pub statuses: Vec<StatusOverride>,

    /// Photo library directory
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t, global = true)]
    pub log_format: LogFormat,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download an image and save it to the library
    SaveUrl { url: String },

    /// Decode a base64 image and save it to the library
    SavePayload {
        /// Base64 payload; `-` reads it from stdin
        payload: String,
    },

    /// Print an image as a base64 data URL
    ToBase64 { url: String },

    /// Pick an image from the gallery or the camera
    Pick(PickArgs),

    /// Read the current position
    Locate,

    /// List the most recent photos
    Recents,

    /// Print the recent photos every time the library changes
    Watch {
        /// Coalesce changes arriving within this many milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Do not list once before waiting for changes
        #[arg(long)]
        no_initial: bool,
    },
}

#[derive(Debug, Args)]
pub struct PickArgs {
    /// Take a photo instead of choosing one from the gallery
    #[arg(long)]
    pub camera: bool,

    /// Compression quality, 0 to 1
    #[arg(long)]
    pub quality: Option<f32>,

    /// Skip the crop/edit step
    #[arg(long)]
    pub no_editing: bool,

    /// Include base64 data in the result
    #[arg(long)]
    pub base64: bool,
}

impl PickArgs {
    pub fn overrides(&self) -> PickerOverrides {
        PickerOverrides {
            quality: self.quality,
            allows_editing: self.no_editing.then_some(false),
            base64: self.base64.then_some(true),
            ..PickerOverrides::default()
        }
    }
}

/// `capability=status` pair from `--status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOverride {
    pub capability: Capability,
    pub status: PermissionStatus,
}

impl FromStr for StatusOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (capability, status) = s
            .split_once('=')
            .ok_or_else(|| format!("expected CAPABILITY=STATUS, got '{}'", s))?;
        let capability = Capability::from_name(capability.trim()).ok_or_else(|| {
            let names: Vec<&str> = Capability::ALL.iter().map(|c| c.as_str()).collect();
            format!(
                "unknown capability '{}' (expected one of: {})",
                capability,
                names.join(", ")
            )
        })?;
        let status = PermissionStatus::from_name(status.trim())
            .ok_or_else(|| format!("unknown status '{}'", status))?;
        Ok(Self { capability, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_override() {
        let parsed: StatusOverride = "camera=denied".parse().unwrap();
        assert_eq!(parsed.capability, Capability::Camera);
        assert_eq!(parsed.status, PermissionStatus::Denied);

        assert!("camera".parse::<StatusOverride>().is_err());
        assert!("microphone=granted".parse::<StatusOverride>().is_err());
        assert!("camera=maybe".parse::<StatusOverride>().is_err());
    }

    #[test]
    fn test_parse_command_line() {
        let cli = Cli::try_parse_from([
            "capgate",
            "--status",
            "media_library=granted",
            "--status",
            "foreground_location=undetermined",
            "-vv",
            "pick",
            "--camera",
            "--quality",
            "0.5",
        ])
        .unwrap();

        assert_eq!(cli.statuses.len(), 2);
        assert_eq!(cli.verbose, 2);
        let Command::Pick(args) = cli.command else {
            panic!("expected pick");
        };
        assert!(args.camera);
        let overrides = args.overrides();
        assert_eq!(overrides.quality, Some(0.5));
        assert_eq!(overrides.allows_editing, None);
    }

    #[test]
    fn test_watch_flags() {
        let cli =
            Cli::try_parse_from(["capgate", "watch", "--debounce-ms", "200", "--no-initial"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::Watch {
                debounce_ms: Some(200),
                no_initial: true
            }
        ));
    }

    #[test]
    fn test_verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
