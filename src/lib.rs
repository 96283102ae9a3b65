//! Paper Muncher bindings
//!
//! Thin wrapper around the `paper-muncher` executable:
//! 1. Options are plain records with defaults
//! 2. Records serialize to a fixed argv
//! 3. The binary runs once per call, fed through stdin, answering on stdout
//!
//! All layout and rendering happens inside the binary.

pub mod binary;
pub mod blocking;
pub mod context;
pub mod error;
pub mod hashing;
pub mod options;
pub mod report;
pub mod runner;
pub mod telemetry;

pub use binary::Binary;
pub use context::{Context, DoneReason};
pub use error::MuncherError;
pub use options::{Invocation, PrintOptions, RenderOptions, Subcommand};
pub use report::InvocationReport;
pub use runner::{print, render, PaperMuncher};

pub const BINDING_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_BINARY_VERSION: &str = "0.1.2";
