mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use config::{Config, OutputFormat};
use viewer::properties::{PropertyIcon, PropertyPanel, PropertyValueView};
use viewer::{Activation, NoteView, Player, RenderedNote, Renderer};
use watchless::fetch::FetchResult;

const SUBCOMMANDS: &[&str] = &["render", "seek", "check", "test", "help"];

#[derive(Parser)]
#[command(name = "watchless", version, about = "Render video-summary notes")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./watchless.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a note to an outline or JSON
    Render(RenderArgs),

    /// Activate a control of a rendered note against a console player
    Seek(SeekArgs),

    /// Report notes that render, but probably not as intended
    Check(CheckArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Markdown note file
    file: PathBuf,

    /// Read the file as a summarization service response instead of a note
    #[arg(long)]
    fetch_json: bool,
}

#[derive(clap::Args)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Emit JSON regardless of the configured format
    #[arg(long)]
    json: bool,

    /// Output the properties panel only
    #[arg(long)]
    properties: bool,

    /// Dump the parsed document instead of the render tree
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct SeekArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Control id, as shown by `render`
    control: usize,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Markdown note file
    file: PathBuf,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() -> ExitCode {
    // `watchless note.md` is shorthand for `watchless render note.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = first_positional(&args) {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.no_color);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Index of the first argument that is neither a flag nor a flag's value.
fn first_positional(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => i += 2,
            arg if arg.starts_with('-') => i += 1,
            _ => return Some(i),
        }
    }
    None
}

fn init_logging(verbose: bool, no_color: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    let renderer = Renderer::new(config.player.clone());

    match cli.command {
        Command::Render(args) => {
            let format = if args.json {
                OutputFormat::Json
            } else {
                config.output.format
            };
            do_render(&args, &renderer, format)?;
        }
        Command::Seek(args) => do_seek(&args, renderer)?,
        Command::Check(args) => return do_check(&args.file, cli.no_color),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                return Ok(ExitCode::SUCCESS);
            }
            let code = test_runner::run_tests(&args.path, cli.no_color, &args.category);
            return Ok(if code == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}

/// Load the source into a fresh view, going through the fetch contract when
/// asked to.
fn load_view(source: &SourceArgs, renderer: Renderer) -> anyhow::Result<NoteView> {
    let text = read_file(&source.file)?;
    let mut view = NoteView::new(renderer);
    if source.fetch_json {
        let note = FetchResult::from_json(&text)
            .with_context(|| format!("'{}' is not a fetch result", source.file.display()))?
            .into_note()?;
        view.load_fetched(note);
    } else {
        view.load(&text);
    }
    Ok(view)
}

fn do_render(args: &RenderArgs, renderer: &Renderer, format: OutputFormat) -> anyhow::Result<()> {
    if args.ast {
        let text = read_file(&args.source.file)?;
        let note = if args.source.fetch_json {
            let fetched = FetchResult::from_json(&text)?.into_note()?;
            watchless::Note::parse(&fetched.summary)
        } else {
            watchless::Note::parse(&text)
        };
        println!("{:#?}", note);
        return Ok(());
    }

    let view = load_view(&args.source, renderer.clone())?;
    let Some(rendered) = view.rendered() else {
        bail!("nothing was rendered");
    };

    match (format, args.properties) {
        (OutputFormat::Json, true) => {
            println!("{}", serde_json::to_string_pretty(&rendered.properties)?);
        }
        (OutputFormat::Json, false) => {
            let json = serde_json::json!({
                "title": view.title(),
                "properties": rendered.properties,
                "tree": rendered.tree,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        (OutputFormat::Outline, true) => print_properties(rendered.properties.as_ref()),
        (OutputFormat::Outline, false) => print_outline(view.title(), rendered),
    }
    Ok(())
}

fn print_properties(panel: Option<&PropertyPanel>) {
    let Some(panel) = panel else {
        println!("(no properties)");
        return;
    };
    for row in &panel.rows {
        let value = match &row.value {
            PropertyValueView::Pills(items) => items
                .iter()
                .map(|item| format!("({item})"))
                .collect::<Vec<_>>()
                .join(" "),
            PropertyValueView::InternalLink(link) => format!("{link} (internal)"),
            PropertyValueView::Plain(text) if row.icon == PropertyIcon::LinkSource => {
                match watchless::video::video_id_from_url(text) {
                    Some(id) => format!("{text} (video {id})"),
                    None => text.clone(),
                }
            }
            PropertyValueView::Plain(text) => text.clone(),
        };
        println!("{} [{:?}]: {}", row.key, row.icon, value);
    }
}

fn print_outline(title: Option<&str>, rendered: &RenderedNote) {
    if let Some(title) = title {
        println!("title: {title}");
    }
    if rendered.properties.is_some() {
        println!("properties:");
        print_properties(rendered.properties.as_ref());
        println!();
    }
    print!("{}", rendered.tree);
}

/// Prints every call it receives.
struct ConsolePlayer;

impl Player for ConsolePlayer {
    fn seek_to(&mut self, seconds: u64, allow_seek_ahead: bool) {
        println!(
            "player: seek_to {} ({}, allow_seek_ahead={allow_seek_ahead})",
            seconds,
            watchless::timecode::format_timestamp(seconds)
        );
    }

    fn play(&mut self) {
        println!("player: play");
    }
}

fn do_seek(args: &SeekArgs, renderer: Renderer) -> anyhow::Result<()> {
    let mut view = load_view(&args.source, renderer)?;
    view.mount_player(Box::new(ConsolePlayer));
    match view.activate(args.control)? {
        Activation::Seek { seconds } => {
            println!("seeked to {seconds}s; navigation suppressed");
        }
        Activation::Navigate { href } => println!("navigate to {href}"),
    }
    Ok(())
}

fn do_check(path: &Path, no_color: bool) -> anyhow::Result<ExitCode> {
    let source = read_file(path)?;
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source.clone());

    let findings = watchless::lint::check(&source, file_id);
    if findings.is_empty() {
        eprintln!("ok: {} has no findings", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for finding in &findings {
        term::emit_to_write_style(&mut writer.lock(), &config, &files, &finding.to_diagnostic())
            .context("cannot write diagnostic")?;
    }
    eprintln!("{} finding(s) in {}", findings.len(), path.display());
    Ok(ExitCode::SUCCESS)
}
