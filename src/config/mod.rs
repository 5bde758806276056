//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

use std::str::FromStr;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use syntect::highlighting::ThemeSet;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, WeaveOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tessera";
pub const DEFAULT_THEME: &str = "InspiredGitHub";
/// Syntect token used to highlight snippet source. Snippets share JavaScript's
/// braces, `//` comments, `let` and `=>`, so its grammar colours them closest.
pub const DEFAULT_LANGUAGE: &str = "js";
pub const DEFAULT_TITLE: &str = "Untitled";
pub use tessera_script::figure::{
    DEFAULT_HEIGHT as DEFAULT_PLOT_HEIGHT, DEFAULT_WIDTH as DEFAULT_PLOT_WIDTH,
};
pub const MAX_PLOT_DIMENSION: u32 = 4096;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub plot: PlotSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Highlight block sources with syntect; plain escaped `<pre>` otherwise.
    pub highlight: bool,
    pub theme: String,
    /// Syntax token block sources are highlighted as.
    pub language: String,
    pub mathjax: bool,
    /// Title used when the document has no heading.
    pub default_title: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            highlight: true,
            theme: DEFAULT_THEME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            mathjax: true,
            default_title: DEFAULT_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLOT_WIDTH,
            height: DEFAULT_PLOT_HEIGHT,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("TESSERA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    plot: RawPlotSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &WeaveOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(highlight) = overrides.highlight {
            self.render.highlight = Some(highlight);
        }
        if let Some(theme) = overrides.theme.as_ref() {
            self.render.theme = Some(theme.clone());
        }
        if let Some(mathjax) = overrides.mathjax {
            self.render.mathjax = Some(mathjax);
        }
        if let Some(width) = overrides.plot_width {
            self.plot.width = Some(u64::from(width));
        }
        if let Some(height) = overrides.plot_height {
            self.plot.height = Some(u64::from(height));
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            plot,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;
        let plot = build_plot_settings(plot)?;

        Ok(Self {
            logging,
            render,
            plot,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let theme = non_empty(render.theme, "render.theme", DEFAULT_THEME)?;
    let themes = ThemeSet::load_defaults();
    if !themes.themes.contains_key(&theme) {
        let known = themes.themes.keys().cloned().collect::<Vec<_>>().join(", ");
        return Err(LoadError::invalid(
            "render.theme",
            format!("unknown theme `{theme}` (known: {known})"),
        ));
    }

    let language = non_empty(render.language, "render.language", DEFAULT_LANGUAGE)?;
    let default_title = non_empty(render.default_title, "render.default_title", DEFAULT_TITLE)?;

    Ok(RenderSettings {
        highlight: render.highlight.unwrap_or(true),
        theme,
        language,
        mathjax: render.mathjax.unwrap_or(true),
        default_title,
    })
}

fn build_plot_settings(plot: RawPlotSettings) -> Result<PlotSettings, LoadError> {
    Ok(PlotSettings {
        width: dimension(plot.width.unwrap_or(u64::from(DEFAULT_PLOT_WIDTH)), "plot.width")?,
        height: dimension(
            plot.height.unwrap_or(u64::from(DEFAULT_PLOT_HEIGHT)),
            "plot.height",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    highlight: Option<bool>,
    theme: Option<String>,
    language: Option<String>,
    mathjax: Option<bool>,
    default_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPlotSettings {
    width: Option<u64>,
    height: Option<u64>,
}

fn non_empty(
    value: Option<String>,
    key: &'static str,
    default: &str,
) -> Result<String, LoadError> {
    match value {
        None => Ok(default.to_string()),
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(LoadError::invalid(key, "must not be empty"));
            }
            Ok(trimmed.to_string())
        }
    }
}

fn dimension(value: u64, key: &'static str) -> Result<u32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    if value > u64::from(MAX_PLOT_DIMENSION) {
        return Err(LoadError::invalid(
            key,
            format!("must be at most {MAX_PLOT_DIMENSION}"),
        ));
    }
    u32::try_from(value).map_err(|_| LoadError::invalid(key, "value exceeds supported range"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
