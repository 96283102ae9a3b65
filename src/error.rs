use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::context::DoneReason;
use crate::options::Subcommand;

#[derive(Debug, Error)]
pub enum MuncherError {
    #[error("paper-muncher binary not found: {}{}", binary.display(), os_detail(source))]
    NotFound {
        binary: PathBuf,
        /// Set when the OS refused to start the binary, empty for lookup misses.
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("failed to start paper-muncher at {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("paper-muncher {subcommand} failed: {status}: {stderr}")]
    Failed {
        subcommand: Subcommand,
        status: ExitStatus,
        stderr: String,
    },

    #[error("paper-muncher {subcommand} terminated: {reason}: {stderr}")]
    Cancelled {
        subcommand: Subcommand,
        reason: DoneReason,
        stderr: String,
    },

    #[error("paper-muncher {subcommand} stream error: {source}")]
    Io {
        subcommand: Subcommand,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot determine paper-muncher version: {0}")]
    Version(String),

    #[error("paper-muncher {found} is too old, {required} or newer is required")]
    UnsupportedVersion {
        found: semver::Version,
        required: semver::Version,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MuncherError {
    /// Standard error captured from the subprocess, if this failure carries any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } | Self::Cancelled { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// True when the binary itself could not be found, as opposed to a run that failed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn os_detail(source: &Option<std::io::Error>) -> String {
    match source {
        Some(e) => format!(": {}", e),
        None => String::new(),
    }
}
