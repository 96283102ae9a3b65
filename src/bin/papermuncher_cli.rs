//! papermuncher CLI - print and render through paper-muncher
//!
//! Commands: print, render, version
//! Document bytes go to --output (stdout by default), JSON reports and errors
//! go to stdout when the document does not, stderr otherwise.
//! Returns 1 on setup errors, 2 when paper-muncher itself fails.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite};

use papermuncher::{
    binary::min_version, telemetry::init_tracing, Binary, Context, Invocation, MuncherError,
    PaperMuncher, PrintOptions, RenderOptions,
};

#[derive(Parser)]
#[command(name = "papermuncher-cli")]
#[command(about = "Paper Muncher CLI - HTML to PDF and images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the paper-muncher binary (default: $PAPER_MUNCHER_BIN, then PATH)
    #[arg(long, global = true)]
    bin: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print HTML to PDF or PostScript
    Print {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        geometry: GeometryArgs,

        /// Paper size, e.g. A4
        #[arg(long)]
        paper: Option<String>,

        /// portrait or landscape
        #[arg(long)]
        orientation: Option<String>,
    },

    /// Render HTML to a bitmap or PNG
    Render {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        geometry: GeometryArgs,

        /// Draw box outlines instead of content
        #[arg(long)]
        wireframe: bool,
    },

    /// Check the installed paper-muncher version
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Input HTML file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Output file, `-` for stdout
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// JSON file with options, overridden by flags
    #[arg(long)]
    options: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Emit a JSON invocation report
    #[arg(long)]
    report: bool,

    /// Allow insecure transports
    #[arg(long)]
    unsecure: bool,

    /// Forward --verbose to paper-muncher
    #[arg(long)]
    verbose: bool,
}

#[derive(Args)]
struct GeometryArgs {
    #[arg(long)]
    scale: Option<String>,

    #[arg(long)]
    density: Option<String>,

    #[arg(long)]
    width: Option<String>,

    #[arg(long)]
    height: Option<String>,

    /// Output MIME type
    #[arg(long)]
    format: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("warn");
    let cli = Cli::parse();

    let binary = match cli.bin {
        Some(path) => Binary::new(path),
        None => match Binary::locate() {
            Ok(b) => b,
            Err(e) => {
                eprintln!("{}", error_json(&e));
                return ExitCode::FAILURE;
            }
        },
    };
    let muncher = PaperMuncher::new(binary);

    match cli.command {
        Commands::Version => version(&muncher).await,

        Commands::Print {
            run,
            geometry,
            paper,
            orientation,
        } => {
            let mut options: PrintOptions = match load_options(run.options.as_deref()).await {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("{}", error_message_json(&format!("Invalid options: {}", e)));
                    return ExitCode::FAILURE;
                }
            };
            overlay(&mut options.scale, geometry.scale);
            overlay(&mut options.density, geometry.density);
            overlay(&mut options.width, geometry.width);
            overlay(&mut options.height, geometry.height);
            overlay(&mut options.format, geometry.format);
            overlay(&mut options.paper, paper);
            overlay(&mut options.orientation, orientation);
            options.unsecure |= run.unsecure;
            options.verbose |= run.verbose;

            execute(&muncher, &run, &options).await
        }

        Commands::Render {
            run,
            geometry,
            wireframe,
        } => {
            let mut options: RenderOptions = match load_options(run.options.as_deref()).await {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("{}", error_message_json(&format!("Invalid options: {}", e)));
                    return ExitCode::FAILURE;
                }
            };
            overlay(&mut options.scale, geometry.scale);
            overlay(&mut options.density, geometry.density);
            overlay(&mut options.width, geometry.width);
            overlay(&mut options.height, geometry.height);
            overlay(&mut options.format, geometry.format);
            options.wireframe |= wireframe;
            options.unsecure |= run.unsecure;
            options.verbose |= run.verbose;

            execute(&muncher, &run, &options).await
        }
    }
}

async fn version(muncher: &PaperMuncher) -> ExitCode {
    let ctx = Context::with_timeout(Duration::from_secs(10));
    let binary = muncher.binary();

    match binary.version(&ctx).await {
        Ok(found) => {
            let supported = found >= min_version();
            let output = serde_json::json!({
                "binary": binary.path().display().to_string(),
                "version": found.to_string(),
                "minimum": min_version().to_string(),
                "supported": supported,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            if supported {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            println!("{}", error_json(&e));
            ExitCode::FAILURE
        }
    }
}

async fn execute<I: Invocation>(muncher: &PaperMuncher, run: &RunArgs, options: &I) -> ExitCode {
    let ctx = match run.timeout {
        Some(secs) => Context::with_timeout(Duration::from_secs(secs)),
        None => Context::background(),
    };

    let token = ctx.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received; terminating paper-muncher");
            token.cancel();
        }
    });

    let input = match open_input(&run.input).await {
        Ok(i) => i,
        Err(e) => {
            let message = format!("Cannot read {}: {}", run.input.display(), e);
            eprintln!("{}", error_message_json(&message));
            return ExitCode::FAILURE;
        }
    };
    let output = match open_output(&run.output).await {
        Ok(o) => o,
        Err(e) => {
            let message = format!("Cannot write {}: {}", run.output.display(), e);
            eprintln!("{}", error_message_json(&message));
            return ExitCode::FAILURE;
        }
    };
    let to_stdout = is_stdio(&run.output);

    let result = if run.report {
        let version = muncher.binary().version(&ctx).await.ok();
        muncher
            .run_reported(&ctx, input, output, options, version)
            .await
            .map(Some)
    } else {
        muncher.run(&ctx, input, output, options).await.map(|_| None)
    };

    match result {
        Ok(Some(report)) => {
            let output = serde_json::json!({
                "success": true,
                "report": report,
            });
            let text = serde_json::to_string_pretty(&output).unwrap_or_default();
            if to_stdout {
                eprintln!("{}", text);
            } else {
                println!("{}", text);
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", error_json(&e));
            match e {
                MuncherError::NotFound { .. } | MuncherError::Spawn { .. } => ExitCode::FAILURE,
                _ => ExitCode::from(2),
            }
        }
    }
}

async fn load_options<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, String> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn overlay(field: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

async fn open_input(path: &Path) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    if is_stdio(path) {
        Ok(Box::new(tokio::io::stdin()))
    } else {
        Ok(Box::new(File::open(path).await?))
    }
}

async fn open_output(path: &Path) -> std::io::Result<Box<dyn AsyncWrite + Unpin + Send>> {
    if is_stdio(path) {
        Ok(Box::new(tokio::io::stdout()))
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(Box::new(File::create(path).await?))
    }
}

fn error_json(e: &MuncherError) -> String {
    let output = serde_json::json!({
        "success": false,
        "error": e.to_string(),
        "not_found": e.is_not_found(),
        "stderr": e.stderr(),
    });
    serde_json::to_string(&output).unwrap_or_else(|_| e.to_string())
}

fn error_message_json(message: &str) -> String {
    let output = serde_json::json!({
        "success": false,
        "error": message,
    });
    serde_json::to_string(&output).unwrap_or_else(|_| message.to_string())
}
