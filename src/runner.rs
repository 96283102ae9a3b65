//! Runner - Single entry point for spawning paper-muncher
//!
//! stdin is fed from the caller's reader, stdout is copied into the caller's
//! writer and stderr is kept in memory for the error message. All three run
//! concurrently so a full pipe can never stall the child.

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::binary::Binary;
use crate::context::{Context, DoneReason};
use crate::error::MuncherError;
use crate::options::{Invocation, PrintOptions, RenderOptions};

/// Handle on a located paper-muncher binary.
#[derive(Debug, Clone)]
pub struct PaperMuncher {
    binary: Binary,
}

enum Outcome {
    Exited {
        fed: io::Result<()>,
        pumped: io::Result<u64>,
        drained: io::Result<usize>,
        status: io::Result<std::process::ExitStatus>,
    },
    Done(DoneReason),
}

impl PaperMuncher {
    pub fn new(binary: Binary) -> Self {
        Self { binary }
    }

    /// Resolves the binary through [`Binary::locate`].
    pub fn locate() -> Result<Self, MuncherError> {
        Ok(Self::new(Binary::locate()?))
    }

    pub fn binary(&self) -> &Binary {
        &self.binary
    }

    /// Converts HTML from `input` into a printable document written to `output`.
    pub async fn print<R, W>(
        &self,
        ctx: &Context,
        input: R,
        output: W,
        options: PrintOptions,
    ) -> Result<(), MuncherError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run(ctx, input, output, &options).await
    }

    /// Converts HTML from `input` into an image written to `output`.
    pub async fn render<R, W>(
        &self,
        ctx: &Context,
        input: R,
        output: W,
        options: RenderOptions,
    ) -> Result<(), MuncherError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run(ctx, input, output, &options).await
    }

    /// Spawns the binary for `invocation` and waits for it to exit or for `ctx` to finish.
    ///
    /// A zero exit status is success whatever was written to `output`.
    pub async fn run<I, R, W>(
        &self,
        ctx: &Context,
        mut input: R,
        mut output: W,
        invocation: &I,
    ) -> Result<(), MuncherError>
    where
        I: Invocation + ?Sized,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let subcommand = invocation.subcommand();
        let args = invocation.args();

        if let Some(reason) = ctx.is_done() {
            return Err(MuncherError::Cancelled {
                subcommand,
                reason,
                stderr: String::new(),
            });
        }

        tracing::debug!(
            binary = %self.binary.path().display(),
            args = ?args,
            "spawning paper-muncher"
        );

        let mut child = Command::new(self.binary.path())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.binary.spawn_error(e))?;

        let (mut stdin, mut stdout, mut stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
                _ => {
                    return Err(MuncherError::Io {
                        subcommand,
                        source: io::Error::new(io::ErrorKind::Other, "child pipes unavailable"),
                    })
                }
            };

        let mut captured = Vec::new();
        let captured_ref = &mut captured;

        // Each future owns its pipe so the pipe closes as soon as that side is finished.
        let feed = async move {
            let result = match tokio::io::copy(&mut input, &mut stdin).await {
                Ok(_) => stdin.shutdown().await,
                Err(e) => Err(e),
            };
            drop(stdin);
            ignore_broken_pipe(result)
        };
        let pump = async move {
            let copied = tokio::io::copy(&mut stdout, &mut output).await?;
            output.flush().await?;
            Ok::<_, io::Error>(copied)
        };
        let drain = async move { stderr.read_to_end(captured_ref).await };

        let outcome = {
            let child = &mut child;
            let exchange = async move {
                let (fed, pumped, drained) = tokio::join!(feed, pump, drain);
                let status = child.wait().await;
                Outcome::Exited {
                    fed,
                    pumped,
                    drained,
                    status,
                }
            };

            tokio::select! {
                outcome = exchange => outcome,
                reason = ctx.done() => Outcome::Done(reason),
            }
        };

        match outcome {
            Outcome::Done(reason) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(%subcommand, error = %e, "failed to kill paper-muncher");
                }
                let stderr = String::from_utf8_lossy(&captured).into_owned();
                tracing::warn!(%subcommand, %reason, "paper-muncher terminated before exit");
                Err(MuncherError::Cancelled {
                    subcommand,
                    reason,
                    stderr,
                })
            }
            Outcome::Exited {
                fed,
                pumped,
                drained,
                status,
            } => {
                let io_error = |source: io::Error| MuncherError::Io { subcommand, source };
                let status = status.map_err(io_error)?;
                let stderr = String::from_utf8_lossy(&captured).into_owned();

                if !status.success() {
                    tracing::warn!(
                        %subcommand,
                        %status,
                        stderr = %stderr.trim(),
                        "paper-muncher failed"
                    );
                    return Err(MuncherError::Failed {
                        subcommand,
                        status,
                        stderr,
                    });
                }

                fed.map_err(io_error)?;
                let written = pumped.map_err(io_error)?;
                drained.map_err(io_error)?;

                tracing::debug!(%subcommand, written, "paper-muncher finished");
                Ok(())
            }
        }
    }
}

/// A child may exit without reading all of stdin; its exit status decides the outcome.
fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Locates the binary and runs `paper-muncher print`.
pub async fn print<R, W>(
    ctx: &Context,
    input: R,
    output: W,
    options: PrintOptions,
) -> Result<(), MuncherError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    PaperMuncher::locate()?.print(ctx, input, output, options).await
}

/// Locates the binary and runs `paper-muncher render`.
pub async fn render<R, W>(
    ctx: &Context,
    input: R,
    output: W,
    options: RenderOptions,
) -> Result<(), MuncherError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    PaperMuncher::locate()?.render(ctx, input, output, options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_pipe_is_not_an_error() {
        let broken = Err(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(ignore_broken_pipe(broken).is_ok());

        let other = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(ignore_broken_pipe(other).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let muncher = PaperMuncher::new(Binary::new("/nonexistent/dir/paper-muncher"));
        let mut output = Vec::new();
        let err = muncher
            .print(
                &Context::background(),
                &b"<html></html>"[..],
                &mut output,
                PrintOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_done_context_does_not_spawn() {
        let muncher = PaperMuncher::new(Binary::new("/nonexistent/dir/paper-muncher"));
        let ctx = Context::background();
        ctx.cancel();
        let err = muncher
            .render(&ctx, &b""[..], tokio::io::sink(), RenderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MuncherError::Cancelled {
                reason: DoneReason::Cancelled,
                ..
            }
        ));
    }
}
