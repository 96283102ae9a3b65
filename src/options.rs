//! Option Records - Configuration to argv
//!
//! Each operation has its own record. Empty strings are omitted from the
//! argument list, booleans only appear when set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker passed for both the input and the output: stdin and stdout.
pub const STDIO_MARKER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subcommand {
    Print,
    Render,
}

impl Subcommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the runner can turn into a paper-muncher command line.
pub trait Invocation {
    fn subcommand(&self) -> Subcommand;
    fn args(&self) -> Vec<String>;
}

/// Options for `paper-muncher print` (PDF / PostScript output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    pub scale: String,
    pub density: String,
    pub width: String,
    pub height: String,
    pub paper: String,
    pub orientation: String,
    pub format: String,
    pub unsecure: bool,
    pub verbose: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            scale: "1x".to_string(),
            density: "1x".to_string(),
            width: String::new(),
            height: String::new(),
            paper: "A4".to_string(),
            orientation: "portrait".to_string(),
            format: "application/pdf".to_string(),
            unsecure: false,
            verbose: false,
        }
    }
}

impl PrintOptions {
    /// Scale factor, e.g. `2x`
    pub fn scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = scale.into();
        self
    }

    /// Density, e.g. `96dpi`
    pub fn density(mut self, density: impl Into<String>) -> Self {
        self.density = density.into();
        self
    }

    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = width.into();
        self
    }

    pub fn height(mut self, height: impl Into<String>) -> Self {
        self.height = height.into();
        self
    }

    /// Paper size name, e.g. `A3` or `letter`
    pub fn paper(mut self, paper: impl Into<String>) -> Self {
        self.paper = paper.into();
        self
    }

    /// `portrait` or `landscape`
    pub fn orientation(mut self, orientation: impl Into<String>) -> Self {
        self.orientation = orientation.into();
        self
    }

    /// Output MIME type, e.g. `application/postscript`
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Allow the binary to fetch over insecure transports
    pub fn unsecure(mut self, unsecure: bool) -> Self {
        self.unsecure = unsecure;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Invocation for PrintOptions {
    fn subcommand(&self) -> Subcommand {
        Subcommand::Print
    }

    fn args(&self) -> Vec<String> {
        let mut args = ArgList::new(Subcommand::Print);
        args.value("--scale", &self.scale);
        args.value("--density", &self.density);
        args.value("--width", &self.width);
        args.value("--height", &self.height);
        args.value("--paper", &self.paper);
        args.value("--orientation", &self.orientation);
        args.value("--format", &self.format);
        args.flag("--unsecure", self.unsecure);
        args.flag("--verbose", self.verbose);
        args.finish()
    }
}

/// Options for `paper-muncher render` (bitmap / PNG output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub scale: String,
    pub density: String,
    pub width: String,
    pub height: String,
    pub format: String,
    pub wireframe: bool,
    pub unsecure: bool,
    pub verbose: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: "96dpi".to_string(),
            density: "96dpi".to_string(),
            width: "800px".to_string(),
            height: "600px".to_string(),
            format: "image/bmp".to_string(),
            wireframe: false,
            unsecure: false,
            verbose: false,
        }
    }
}

impl RenderOptions {
    pub fn scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn density(mut self, density: impl Into<String>) -> Self {
        self.density = density.into();
        self
    }

    /// Viewport width, e.g. `1024px`
    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = width.into();
        self
    }

    /// Viewport height, e.g. `768px`
    pub fn height(mut self, height: impl Into<String>) -> Self {
        self.height = height.into();
        self
    }

    /// Output MIME type, e.g. `image/png`
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Paint box outlines instead of content
    pub fn wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn unsecure(mut self, unsecure: bool) -> Self {
        self.unsecure = unsecure;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Invocation for RenderOptions {
    fn subcommand(&self) -> Subcommand {
        Subcommand::Render
    }

    fn args(&self) -> Vec<String> {
        let mut args = ArgList::new(Subcommand::Render);
        args.value("--scale", &self.scale);
        args.value("--density", &self.density);
        args.value("--width", &self.width);
        args.value("--height", &self.height);
        args.value("--format", &self.format);
        args.flag("--wireframe", self.wireframe);
        args.flag("--unsecure", self.unsecure);
        args.flag("--verbose", self.verbose);
        args.finish()
    }
}

struct ArgList {
    args: Vec<String>,
}

impl ArgList {
    fn new(subcommand: Subcommand) -> Self {
        let args = [subcommand.as_str(), STDIO_MARKER, "-o", STDIO_MARKER]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self { args }
    }

    fn value(&mut self, flag: &str, value: &str) {
        if !value.is_empty() {
            self.args.push(flag.to_string());
            self.args.push(value.to_string());
        }
    }

    fn flag(&mut self, flag: &str, enabled: bool) {
        if enabled {
            self.args.push(flag.to_string());
        }
    }

    fn finish(self) -> Vec<String> {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[rustfmt::skip]
    fn test_print_args_full() {
        let options = PrintOptions::default()
            .scale("2x")
            .density("96dpi")
            .width("800px")
            .height("600px")
            .paper("A3")
            .orientation("landscape")
            .format("application/postscript")
            .unsecure(true)
            .verbose(true);

        let expected = vec![
            "print", "-", "-o", "-",
            "--scale", "2x",
            "--density", "96dpi",
            "--width", "800px",
            "--height", "600px",
            "--paper", "A3",
            "--orientation", "landscape",
            "--format", "application/postscript",
            "--unsecure",
            "--verbose",
        ];
        assert_eq!(options.args(), expected);
    }

    #[test]
    #[rustfmt::skip]
    fn test_render_args_full() {
        let options = RenderOptions::default()
            .scale("192dpi")
            .density("144dpi")
            .width("1024px")
            .height("768px")
            .format("image/png")
            .wireframe(true)
            .unsecure(true)
            .verbose(true);

        let expected = vec![
            "render", "-", "-o", "-",
            "--scale", "192dpi",
            "--density", "144dpi",
            "--width", "1024px",
            "--height", "768px",
            "--format", "image/png",
            "--wireframe",
            "--unsecure",
            "--verbose",
        ];
        assert_eq!(options.args(), expected);
    }

    #[test]
    #[rustfmt::skip]
    fn test_print_defaults() {
        let args = PrintOptions::default().args();
        assert_eq!(
            args,
            vec![
                "print", "-", "-o", "-",
                "--scale", "1x",
                "--density", "1x",
                "--paper", "A4",
                "--orientation", "portrait",
                "--format", "application/pdf",
            ]
        );
    }

    #[test]
    #[rustfmt::skip]
    fn test_render_defaults() {
        let args = RenderOptions::default().args();
        assert_eq!(
            args,
            vec![
                "render", "-", "-o", "-",
                "--scale", "96dpi",
                "--density", "96dpi",
                "--width", "800px",
                "--height", "600px",
                "--format", "image/bmp",
            ]
        );
    }

    #[test]
    fn test_empty_fields_omitted() {
        let options = PrintOptions::default()
            .scale("")
            .density("")
            .paper("")
            .orientation("")
            .format("");
        assert_eq!(options.args(), vec!["print", "-", "-o", "-"]);

        let options = RenderOptions::default()
            .scale("")
            .density("")
            .width("")
            .height("")
            .format("");
        assert_eq!(options.args(), vec!["render", "-", "-o", "-"]);
    }

    #[test]
    fn test_last_write_wins() {
        let options = RenderOptions::default()
            .format("image/png")
            .wireframe(true)
            .format("image/bmp")
            .wireframe(false);
        let args = options.args();
        assert_eq!(args.iter().filter(|a| *a == "--format").count(), 1);
        assert!(args.contains(&"image/bmp".to_string()));
        assert!(!args.contains(&"--wireframe".to_string()));
    }

    #[test]
    fn test_boolean_flags_have_no_value() {
        let args = PrintOptions::default().unsecure(true).args();
        let pos = args.iter().position(|a| a == "--unsecure").unwrap();
        assert_eq!(pos, args.len() - 1);
    }

    #[test]
    fn test_partial_json_overlays_defaults() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"format": "image/png", "wireframe": true}"#).unwrap();
        assert_eq!(options.format, "image/png");
        assert!(options.wireframe);
        assert_eq!(options.width, "800px");
        assert_eq!(options.subcommand(), Subcommand::Render);
    }
}
