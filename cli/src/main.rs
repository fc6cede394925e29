mod config;
mod export;
mod watch;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use interpreter::Interpreter;
use marp::bootstrap::{BootstrapOption, Bootstrapper, validate_output_path};
use marp::{PipelineError, Processor};

use crate::config::Config;
use crate::export::Exporter;

#[derive(Parser)]
#[command(name = "marputils", version, about = "Preprocessor for Marp presentations")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to ./marputils.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a starter presentation
    Bootstrap(BootstrapArgs),

    /// Execute code blocks, substitute variables and expand tags
    Process(ProcessArgs),
}

#[derive(clap::Args)]
struct BootstrapArgs {
    /// Markdown file to create
    output: PathBuf,

    #[arg(long)]
    title: String,

    #[arg(long)]
    subtitle: Option<String>,

    #[arg(long)]
    event: Option<String>,

    #[arg(long)]
    date: Option<String>,

    /// Header text (defaults to a link to the title slide)
    #[arg(long)]
    header: Option<String>,

    /// Footer text (defaults to the event and date)
    #[arg(long)]
    footer: Option<String>,

    /// Built-in theme name
    #[arg(long)]
    theme: Option<String>,

    /// Custom theme stylesheet; its `@theme` name overrides --theme
    #[arg(long)]
    theme_path: Option<PathBuf>,

    /// Section name. Repeatable.
    #[arg(long = "section")]
    sections: Vec<String>,

    /// Extra frontmatter variable as KEY=VALUE. Repeatable.
    #[arg(long = "var", value_parser = parse_key_value)]
    variables: Vec<(String, String)>,

    /// Optional slide features. Repeatable.
    #[arg(long = "option", value_enum)]
    options: Vec<OptionArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OptionArg {
    Paginate,
    Header,
    Footer,
    TableOfContents,
    ImgCenter,
}

impl From<OptionArg> for BootstrapOption {
    fn from(option: OptionArg) -> Self {
        match option {
            OptionArg::Paginate => BootstrapOption::Paginate,
            OptionArg::Header => BootstrapOption::Header,
            OptionArg::Footer => BootstrapOption::Footer,
            OptionArg::TableOfContents => BootstrapOption::TableOfContents,
            OptionArg::ImgCenter => BootstrapOption::ImgCenter,
        }
    }
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Presentation to process
    #[arg(long)]
    path: PathBuf,

    /// Destination (defaults to build.md next to the input)
    #[arg(long)]
    out_path: Option<PathBuf>,

    /// Keep running and reprocess whenever the input changes
    #[arg(long)]
    watch: bool,

    /// Also render the processed deck to this PDF with marp-cli
    #[arg(long)]
    export: Option<PathBuf>,

    /// Allow raw HTML in the exported deck
    #[arg(long)]
    html: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Bootstrap(args) => do_bootstrap(args),
        Command::Process(args) => do_process(args, &config, color_choice),
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

/// `RUST_LOG` when set, otherwise `info`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn do_bootstrap(args: BootstrapArgs) -> Result<()> {
    validate_output_path(&args.output)?;

    let mut bootstrapper = Bootstrapper::new(args.title);
    bootstrapper.subtitle = args.subtitle;
    bootstrapper.event = args.event;
    bootstrapper.date = args.date;
    bootstrapper.header = args.header;
    bootstrapper.footer = args.footer;
    if let Some(theme) = args.theme {
        bootstrapper.theme = theme;
    }
    if let Some(theme_path) = &args.theme_path {
        bootstrapper = bootstrapper.with_theme_file(theme_path)?;
    }
    bootstrapper.sections = args.sections;
    bootstrapper.variables.extend(args.variables);
    bootstrapper.options = args.options.into_iter().map(Into::into).collect();

    bootstrapper.bootstrap(&args.output)?;
    Ok(())
}

fn do_process(args: ProcessArgs, config: &Config, color_choice: ColorChoice) -> Result<()> {
    let out_path = args
        .out_path
        .clone()
        .unwrap_or_else(|| config.default_out_path(&args.path));

    // Locate the renderer before touching any file.
    let export = match &args.export {
        Some(pdf) => Some((
            Exporter::locate(&config.export.binary, args.html || config.export.html)?,
            pdf.clone(),
        )),
        None => None,
    };

    let processor = Processor::new(Interpreter);
    let run_once = || -> Result<()> {
        processor.process_file(&args.path, &out_path)?;
        if let Some((exporter, pdf)) = &export {
            exporter.export(&out_path, pdf)?;
        }
        Ok(())
    };

    if !args.watch {
        return run_once().map_err(|e| report(e, &args.path, color_choice));
    }

    if let Err(e) = run_once() {
        error!("{:#}", report(e, &args.path, color_choice));
    }
    watch::watch(
        &args.path,
        Duration::from_millis(config.watch.debounce_ms),
        || {
            if let Err(e) = run_once() {
                let e = report(e, &args.path, color_choice);
                warn!("{:#}; still watching", e);
            }
        },
    )
}

/// Render pipeline errors that point into the source as a diagnostic.
///
/// Returns the error with the diagnostic already printed folded into a
/// short summary, so callers only log a one-liner.
fn report(error: anyhow::Error, path: &Path, color_choice: ColorChoice) -> anyhow::Error {
    let Some(pipeline_error) = error.downcast_ref::<PipelineError>() else {
        return error;
    };
    if pipeline_error.span().is_none() {
        return error;
    }
    let Ok(source) = std::fs::read_to_string(path) else {
        return error;
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source);
    let diagnostic = pipeline_error.to_diagnostic(file_id);
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);

    anyhow::anyhow!("processing '{}' failed", path.display())
}

/// Parse a `KEY=VALUE` argument.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            parse_key_value("speaker=Ferris the Crab"),
            Ok(("speaker".to_string(), "Ferris the Crab".to_string()))
        );
        assert_eq!(
            parse_key_value("url=a=b"),
            Ok(("url".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn process_flags_parse() {
        let cli = Cli::try_parse_from([
            "marputils",
            "--no-color",
            "process",
            "--path",
            "deck.md",
            "--watch",
            "--export",
            "deck.pdf",
        ])
        .unwrap();
        assert!(cli.no_color);
        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.path, PathBuf::from("deck.md"));
                assert!(args.watch);
                assert_eq!(args.export, Some(PathBuf::from("deck.pdf")));
                assert!(args.out_path.is_none());
            }
            Command::Bootstrap(_) => panic!("expected process"),
        }
    }

    #[test]
    fn bootstrap_options_use_kebab_case() {
        let cli = Cli::try_parse_from([
            "marputils",
            "bootstrap",
            "talk.md",
            "--title",
            "Talk",
            "--option",
            "table-of-contents",
            "--option",
            "img-center",
            "--var",
            "speaker=Ferris",
        ])
        .unwrap();
        match cli.command {
            Command::Bootstrap(args) => {
                assert_eq!(args.options.len(), 2);
                assert_eq!(args.variables, vec![("speaker".into(), "Ferris".into())]);
            }
            Command::Process(_) => panic!("expected bootstrap"),
        }
    }
}
