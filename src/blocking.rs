//! Blocking Interface
//!
//! Same contract as [`crate::runner`] for callers without a tokio runtime.
//! Each call builds a private current-thread runtime and returns once the
//! subprocess has exited or the context has finished.
//!
//! Must not be called from within an async runtime. The reader is drained on
//! a helper thread, so a reader that never returns keeps the call from
//! returning even after cancellation.

use std::io::{self, Read, Write};
use std::thread;

use tokio::io::duplex;
use tokio::runtime::{Builder, Handle};
use tokio_util::io::SyncIoBridge;

use crate::context::Context;
use crate::error::MuncherError;
use crate::options::{Invocation, PrintOptions, RenderOptions};
use crate::runner::PaperMuncher;

const BRIDGE_CAPACITY: usize = 64 * 1024;

/// Locates the binary and runs `paper-muncher print`.
pub fn print<R, W>(
    ctx: &Context,
    input: R,
    output: W,
    options: PrintOptions,
) -> Result<(), MuncherError>
where
    R: Read + Send,
    W: Write + Send,
{
    run(&PaperMuncher::locate()?, ctx, input, output, &options)
}

/// Locates the binary and runs `paper-muncher render`.
pub fn render<R, W>(
    ctx: &Context,
    input: R,
    output: W,
    options: RenderOptions,
) -> Result<(), MuncherError>
where
    R: Read + Send,
    W: Write + Send,
{
    run(&PaperMuncher::locate()?, ctx, input, output, &options)
}

/// Blocking [`PaperMuncher::run`].
///
/// `input` is read and `output` written on helper threads, joined before returning.
pub fn run<I, R, W>(
    muncher: &PaperMuncher,
    ctx: &Context,
    mut input: R,
    mut output: W,
    invocation: &I,
) -> Result<(), MuncherError>
where
    I: Invocation + ?Sized,
    R: Read + Send,
    W: Write + Send,
{
    let subcommand = invocation.subcommand();
    let io_error = |source: io::Error| MuncherError::Io { subcommand, source };

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(io_error)?;
    let handle: Handle = runtime.handle().clone();

    let (child_input, mut input_side) = duplex(BRIDGE_CAPACITY);
    let (mut output_side, child_output) = duplex(BRIDGE_CAPACITY);

    thread::scope(|scope| {
        let feed_handle = handle.clone();
        let feeder = scope.spawn(move || {
            let mut bridge = SyncIoBridge::new_with_handle(&mut input_side, feed_handle);
            // The runner drops its end once the child has exited.
            match io::copy(&mut input, &mut bridge) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        });
        let collector = scope.spawn(move || {
            let mut bridge = SyncIoBridge::new_with_handle(&mut output_side, handle);
            io::copy(&mut bridge, &mut output)?;
            output.flush()
        });

        let result = runtime.block_on(muncher.run(ctx, child_input, child_output, invocation));

        let fed = join(feeder);
        let collected = join(collector);

        result?;
        fed.map_err(io_error)?;
        collected.map_err(io_error)?;
        Ok(())
    })
}

fn join(handle: thread::ScopedJoinHandle<'_, io::Result<()>>) -> io::Result<()> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "bridge thread panicked")))
}
