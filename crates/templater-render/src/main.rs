/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Command-line renderer for templater templates
 */

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use templater::{
    FormData, LocaleStrings, TemplateContext, TemplateError, TemplateLoader, Templater,
    TemplaterConfig, render_report,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "templater-render")]
#[command(about = "Render a named template with JSON data")]
struct Args {
    /// Template name, resolved as TEMPLATE_DIR/NAME.EXTENSION
    #[arg(value_name = "NAME")]
    name: String,

    /// YAML configuration file (template-dir, extension, globals)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to load templates from (overrides the configuration)
    #[arg(short = 'd', long, value_name = "DIR")]
    template_dir: Option<PathBuf>,

    /// Template file extension (overrides the configuration)
    #[arg(short, long, value_name = "EXT")]
    extension: Option<String>,

    /// JSON object with template variables
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// JSON object with localization strings
    #[arg(long, value_name = "FILE")]
    strings: Option<PathBuf>,

    /// JSON object with submitted form values
    #[arg(long, value_name = "FILE")]
    form: Option<PathBuf>,

    /// Write output here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output (-v for debug logging, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;
    let templater = Templater::from_config(&config);

    let data: TemplateContext = read_json_or_default(args.data.as_deref(), "data")?;
    let strings: LocaleStrings = read_json_or_default(args.strings.as_deref(), "strings")?;
    let form: Option<FormData> = args
        .form
        .as_deref()
        .map(|path| read_json(path, "form"))
        .transpose()?;

    let rendered = match &form {
        Some(form) => templater.render_with_form(&args.name, &strings, &data, form),
        None => templater.render(&args.name, &strings, &data),
    };

    let output = match rendered {
        Ok(output) => output,
        Err(err) => {
            print_error(&templater, &err);
            std::process::exit(1);
        }
    };

    match &args.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("Failed to write output: {:?}", path))?,
        None => print!("{output}"),
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "templater=info".into()),
        1 => "templater=debug".into(),
        _ => "templater=trace".into(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Configuration file (if any) with command-line overrides applied.
fn load_config(args: &Args) -> Result<TemplaterConfig> {
    let mut config = match &args.config {
        Some(path) => TemplaterConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration: {:?}", path))?,
        None => TemplaterConfig::default(),
    };
    if let Some(dir) = &args.template_dir {
        config.template_dir = dir.clone();
    }
    if let Some(extension) = &args.extension {
        config.extension = extension.clone();
    }
    tracing::debug!(
        template_dir = %config.template_dir.display(),
        extension = %config.extension,
        globals = config.globals.len(),
        "configuration"
    );
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {what} file: {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid {what} JSON in {:?}", path))
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: Option<&Path>, what: &str) -> Result<T> {
    path.map_or_else(|| Ok(T::default()), |path| read_json(path, what))
}

/// Print a template error, with an annotated source snippet when it has a
/// location.
fn print_error<L: TemplateLoader>(templater: &Templater<L>, err: &TemplateError) {
    let report = err
        .template()
        .filter(|_| err.offset().is_some())
        .and_then(|name| templater.loader().load(name).ok())
        .and_then(|source| render_report(err, &source));

    match report {
        Some(report) => eprint!("{report}"),
        None => eprintln!("Error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_minimal() {
        let args = Args::try_parse_from(["templater-render", "index"]).unwrap();
        assert_eq!(args.name, "index");
        assert!(args.config.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "templater-render",
            "page",
            "--config",
            "templater.yml",
            "-d",
            "views",
            "-e",
            "html",
            "--data",
            "data.json",
            "--strings",
            "en.json",
            "--form",
            "post.json",
            "-o",
            "out.html",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.name, "page");
        assert_eq!(args.template_dir, Some(PathBuf::from("views")));
        assert_eq!(args.extension.as_deref(), Some("html"));
        assert_eq!(args.form, Some(PathBuf::from("post.json")));
        assert_eq!(args.output, Some(PathBuf::from("out.html")));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_args_require_name() {
        assert!(Args::try_parse_from(["templater-render"]).is_err());
    }

    #[test]
    fn test_overrides_apply_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("templater.yml");
        fs::write(&config_path, "template-dir: views\nextension: html\n").unwrap();

        let args = Args::try_parse_from([
            "templater-render",
            "page",
            "--config",
            config_path.to_str().unwrap(),
            "--extension",
            "htm",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.template_dir, PathBuf::from("views"));
        assert_eq!(config.extension, "htm");
    }

    #[test]
    fn test_read_json_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"name": "World", "n": 3}"#).unwrap();

        let data: TemplateContext = read_json(&path, "data").unwrap();
        assert_eq!(data.len(), 2);

        let strings: LocaleStrings = read_json_or_default(None, "strings").unwrap();
        assert_eq!(strings.get("anything"), None);

        fs::write(&path, "not json").unwrap();
        let err = read_json::<TemplateContext>(&path, "data").unwrap_err();
        assert!(err.to_string().contains("Invalid data JSON"));
    }
}
