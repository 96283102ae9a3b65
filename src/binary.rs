//! Binary Discovery - Locating and probing paper-muncher
//!
//! Lookup order: `PAPER_MUNCHER_BIN`, then `PATH`, then the install prefix.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use semver::Version;
use tokio::process::Command;

use crate::context::Context;
use crate::error::MuncherError;
use crate::MIN_BINARY_VERSION;

pub const BINARY_ENV_VAR: &str = "PAPER_MUNCHER_BIN";
pub const FALLBACK_BINARY: &str = "/opt/paper-muncher/bin/paper-muncher";

#[cfg(windows)]
pub const BINARY_NAME: &str = "paper-muncher.exe";
#[cfg(not(windows))]
pub const BINARY_NAME: &str = "paper-muncher";

/// Path to a paper-muncher executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    path: PathBuf,
}

impl Binary {
    /// Uses `path` as-is, without any lookup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the binary from the environment.
    pub fn locate() -> Result<Self, MuncherError> {
        if let Some(path) = env::var_os(BINARY_ENV_VAR).filter(|v| !v.is_empty()) {
            tracing::debug!(path = ?path, "using {BINARY_ENV_VAR}");
            return Ok(Self::new(path));
        }

        if let Some(path) = env::var_os("PATH").and_then(|p| find_in_path(BINARY_NAME, &p)) {
            tracing::debug!(path = %path.display(), "found paper-muncher in PATH");
            return Ok(Self::new(path));
        }

        let fallback = Path::new(FALLBACK_BINARY);
        if is_executable(fallback) {
            tracing::debug!(path = %fallback.display(), "using fallback install path");
            return Ok(Self::new(fallback));
        }

        Err(MuncherError::NotFound {
            binary: PathBuf::from(BINARY_NAME),
            source: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `--version` and parses the first `X.Y.Z` token of its output.
    pub async fn version(&self, ctx: &Context) -> Result<Version, MuncherError> {
        let mut command = Command::new(&self.path);
        command
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| self.spawn_error(e))?;

        let output = tokio::select! {
            output = child.wait_with_output() => output,
            reason = ctx.done() => {
                return Err(MuncherError::Version(reason.to_string()));
            }
        };
        let output = output.map_err(|e| MuncherError::Version(e.to_string()))?;

        if !output.status.success() {
            return Err(MuncherError::Version(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout)
            .ok_or_else(|| MuncherError::Version(format!("unrecognized output: {}", stdout.trim())))
    }

    /// Fails unless the binary reports at least the minimum supported version.
    pub async fn check(&self, ctx: &Context) -> Result<Version, MuncherError> {
        let found = self.version(ctx).await?;
        let required = min_version();
        if found < required {
            return Err(MuncherError::UnsupportedVersion { found, required });
        }
        Ok(found)
    }

    pub async fn is_usable(&self, ctx: &Context) -> bool {
        match self.check(ctx).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "cannot use paper-muncher"
                );
                false
            }
        }
    }

    pub(crate) fn spawn_error(&self, source: std::io::Error) -> MuncherError {
        if source.kind() == std::io::ErrorKind::NotFound {
            MuncherError::NotFound {
                binary: self.path.clone(),
                source: Some(source),
            }
        } else {
            MuncherError::Spawn {
                binary: self.path.clone(),
                source,
            }
        }
    }
}

pub fn min_version() -> Version {
    // Constant literal, checked by test_min_version_parses
    Version::parse(MIN_BINARY_VERSION).unwrap_or_else(|_| Version::new(0, 1, 2))
}

fn find_in_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn parse_version(output: &str) -> Option<Version> {
    output
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .map(|token| token.trim_start_matches('v'))
        .find_map(|token| Version::parse(token).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_version_parses() {
        assert!(Version::parse(MIN_BINARY_VERSION).is_ok());
        assert_eq!(min_version(), Version::new(0, 1, 2));
    }

    #[test]
    fn test_parse_version_variants() {
        assert_eq!(parse_version("paper-muncher 0.2.1\n"), Some(Version::new(0, 2, 1)));
        assert_eq!(parse_version("v1.0.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(parse_version("paper-muncher (0.1.2)"), Some(Version::new(0, 1, 2)));
        assert_eq!(parse_version("no version here"), None);
    }

    #[test]
    fn test_spawn_not_found_maps_to_not_found() {
        let binary = Binary::new("/nonexistent/paper-muncher");
        let err = binary.spawn_error(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert!(matches!(err, MuncherError::NotFound { source: Some(_), .. }));

        let err = binary.spawn_error(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(err, MuncherError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_path_requires_executable() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let plain = first.path().join(BINARY_NAME);
        std::fs::write(&plain, "not executable").unwrap();

        let runnable = second.path().join(BINARY_NAME);
        std::fs::write(&runnable, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&runnable, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path_var = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(find_in_path(BINARY_NAME, &path_var), Some(runnable));
    }

    #[test]
    fn test_find_in_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path_var = env::join_paths([dir.path()]).unwrap();
        assert_eq!(find_in_path(BINARY_NAME, &path_var), None);
    }
}
