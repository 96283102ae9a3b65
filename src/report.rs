//! Invocation Reports
//!
//! A reproducible record of one paper-muncher run: what was asked for and a
//! digest of what came back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use crate::context::Context;
use crate::error::MuncherError;
use crate::hashing::{canonical_hash, HashingWriter};
use crate::options::{Invocation, Subcommand};
use crate::runner::PaperMuncher;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationReport {
    pub id: String,
    pub subcommand: Subcommand,
    pub args: Vec<String>,
    pub binary: String,
    #[serde(default)]
    pub binary_version: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_bytes: u64,
    pub output_sha256: String,
    /// Identical option sets always hash the same.
    pub invocation_hash: String,
}

#[derive(Serialize)]
struct HashedInvocation<'a> {
    subcommand: Subcommand,
    args: &'a [String],
}

/// Hash of the subcommand and its full argument list.
pub fn invocation_hash<I>(invocation: &I) -> Result<String, serde_json::Error>
where
    I: Invocation + ?Sized,
{
    let args = invocation.args();
    canonical_hash(&HashedInvocation {
        subcommand: invocation.subcommand(),
        args: &args,
    })
}

impl PaperMuncher {
    /// Same as [`PaperMuncher::run`], and returns a report of the run on success.
    pub async fn run_reported<I, R, W>(
        &self,
        ctx: &Context,
        input: R,
        output: W,
        invocation: &I,
        binary_version: Option<semver::Version>,
    ) -> Result<InvocationReport, MuncherError>
    where
        I: Invocation + ?Sized,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let invocation_hash = invocation_hash(invocation)?;
        let started_at = Utc::now();

        let mut sink = HashingWriter::new(output);
        self.run(ctx, input, &mut sink, invocation).await?;
        let (_, output_bytes, output_sha256) = sink.finish();

        Ok(InvocationReport {
            id: Uuid::new_v4().to_string(),
            subcommand: invocation.subcommand(),
            args: invocation.args(),
            binary: self.binary().path().display().to_string(),
            binary_version: binary_version.map(|v| v.to_string()),
            started_at,
            finished_at: Utc::now(),
            output_bytes,
            output_sha256,
            invocation_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{PrintOptions, RenderOptions};

    #[test]
    fn test_invocation_hash_stable() {
        let a = PrintOptions::default().paper("A3");
        let b = PrintOptions::default()
            .orientation("landscape")
            .paper("A3")
            .orientation("portrait");
        assert_eq!(invocation_hash(&a).unwrap(), invocation_hash(&b).unwrap());
    }

    #[test]
    fn test_invocation_hash_depends_on_subcommand_and_args() {
        let print = invocation_hash(&PrintOptions::default()).unwrap();
        let render = invocation_hash(&RenderOptions::default()).unwrap();
        let png = invocation_hash(&RenderOptions::default().format("image/png")).unwrap();
        assert_ne!(print, render);
        assert_ne!(render, png);
    }
}
