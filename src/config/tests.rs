use std::path::Path;

use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert!(settings.render.highlight);
    assert!(settings.render.mathjax);
    assert_eq!(settings.render.theme, DEFAULT_THEME);
    assert_eq!(settings.render.language, DEFAULT_LANGUAGE);
    assert_eq!(settings.render.default_title, "Untitled");
    assert_eq!(settings.plot, PlotSettings::default());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.render.theme = Some("base16-ocean.dark".to_string());
    raw.plot.width = Some(800);

    let overrides = WeaveOverrides {
        log_level: Some("debug".to_string()),
        theme: Some("Solarized (light)".to_string()),
        plot_width: Some(320),
        highlight: Some(false),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.render.theme, "Solarized (light)");
    assert!(!settings.render.highlight);
    assert_eq!(settings.plot.width, 320);
    assert_eq!(settings.plot.height, DEFAULT_PLOT_HEIGHT);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = WeaveOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn unknown_theme_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.theme = Some("no-such-theme".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown theme");
    assert!(matches!(err, LoadError::Invalid { key: "render.theme", .. }));
}

#[test]
fn plot_dimensions_are_bounded() {
    let mut raw = RawSettings::default();
    raw.plot.height = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero height");
    assert!(matches!(err, LoadError::Invalid { key: "plot.height", .. }));

    let mut raw = RawSettings::default();
    raw.plot.width = Some(u64::from(MAX_PLOT_DIMENSION) + 1);
    let err = Settings::from_raw(raw).expect_err("oversized width");
    assert!(matches!(err, LoadError::Invalid { key: "plot.width", .. }));
}

#[test]
fn blank_default_title_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.default_title = Some("   ".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn parse_input_output_and_trailing_arguments() {
    let args = CliArgs::parse_from([
        "tessera",
        "-i",
        "report.md",
        "--output",
        "report.html",
        "--highlight",
        "off",
        "data.csv",
        "--fast",
    ]);

    assert_eq!(args.input.as_deref(), Some(Path::new("report.md")));
    assert_eq!(args.output.as_deref(), Some(Path::new("report.html")));
    assert_eq!(args.overrides.highlight, Some(false));
    assert_eq!(args.argv, ["data.csv", "--fast"]);
}

#[test]
fn parse_without_arguments_reads_stdin() {
    let args = CliArgs::parse_from(["tessera"]);
    assert!(args.input.is_none());
    assert!(args.output.is_none());
    assert!(args.argv.is_empty());
}

#[test]
fn config_file_layer_is_applied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("weave.toml");
    std::fs::write(
        &path,
        "[render]\ndefault_title = \"Report\"\nmathjax = false\n\n[plot]\nwidth = 300\n",
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "tessera",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "--plot-width",
        "200",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.render.default_title, "Report");
    assert!(!settings.render.mathjax);
    assert_eq!(settings.plot.width, 200);
}

#[test]
fn missing_config_file_is_an_error() {
    let args = CliArgs::parse_from(["tessera", "--config-file", "/nonexistent/tessera.toml"]);
    assert!(matches!(load(&args), Err(LoadError::Build(_))));
}
