use std::path::PathBuf;

use clap::{Args, Parser, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the tessera binary.
#[derive(Debug, Parser)]
#[command(
    name = "tessera",
    version,
    about = "Run the snippets embedded in a markdown report and weave their output into HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TESSERA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Markdown document to weave; standard input when omitted.
    #[arg(short = 'i', long = "input", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Where to write the HTML document; standard output when omitted.
    #[arg(short = 'o', long = "output", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: WeaveOverrides,

    /// Arguments exposed to snippets as `argv`.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub argv: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct WeaveOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle syntax highlighting of block sources.
    #[arg(
        long = "highlight",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub highlight: Option<bool>,

    /// Override the highlighting theme.
    #[arg(long = "theme", value_name = "NAME")]
    pub theme: Option<String>,

    /// Toggle the MathJax include in the generated document.
    #[arg(
        long = "mathjax",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub mathjax: Option<bool>,

    /// Override the default figure width in pixels.
    #[arg(long = "plot-width", value_name = "PIXELS")]
    pub plot_width: Option<u32>,

    /// Override the default figure height in pixels.
    #[arg(long = "plot-height", value_name = "PIXELS")]
    pub plot_height: Option<u32>,
}
