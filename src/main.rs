use anyhow::{Result, anyhow};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use colored::*;
use log::{Level, LevelFilter};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use embedme_lib::config::ProjectConfig;
use embedme_lib::embed::{EmbedOptions, Embedder, OnInvalid, OsFileSystem, OutputMode, SystemShell};
use embedme_lib::exit_codes::exit;
use embedme_lib::file_processor::{discover_sources, filter_ignored, process_sources};

#[derive(Parser, Debug)]
#[command(
    name = "embedme",
    author,
    version,
    about = "Embed source files and command output into markdown code blocks",
    long_about = None
)]
struct Cli {
    /// Markdown documents to process, relative to the working directory.
    /// With --glob these are glob patterns.
    #[arg(required = false)]
    sources: Vec<String>,

    /// Exit with code 1 if any document would change, without writing
    #[arg(long, env = "EMBEDME_VERIFY")]
    verify: bool,

    /// Compute the embedded documents but never write them
    #[arg(long, env = "EMBEDME_DRY_RUN")]
    dry_run: bool,

    /// Print the embedded documents to stdout instead of writing them
    #[arg(long, env = "EMBEDME_STDOUT")]
    stdout: bool,

    /// Write the embedded documents to this file (concatenated if several)
    #[arg(short, long, env = "EMBEDME_OUTPUT")]
    output: Option<PathBuf>,

    /// Working directory: sources, commands and ignore files are relative to it
    #[arg(short = 'C', long = "directory", visible_alias = "cwd", env = "EMBEDME_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Base directory for file directives, searched before the working directory
    #[arg(long, visible_alias = "source", alias = "root", env = "EMBEDME_BASE_PATH")]
    base: Option<PathBuf>,

    /// Treat sources as glob patterns (`--glob=false` overrides the config file)
    #[arg(
        long,
        env = "EMBEDME_GLOB",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    glob: Option<bool>,

    /// Do not log anything
    #[arg(long, env = "EMBEDME_SILENT")]
    silent: bool,

    /// Colorize log output
    #[arg(
        long,
        env = "EMBEDME_COLOR",
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    color: bool,

    /// Disable colored log output
    #[arg(long)]
    no_color: bool,

    /// Colorize log output even when stderr is not a terminal
    #[arg(long, env = "EMBEDME_FORCE_COLOR")]
    force_color: bool,

    /// Omit the directive comment from embedded blocks (requires --stdout)
    #[arg(long, env = "EMBEDME_STRIP_EMBED_COMMENT")]
    strip_embed_comment: bool,

    /// Fail on directives that cannot be parsed instead of skipping the block
    /// (`--strict=false` overrides the config file)
    #[arg(
        long,
        env = "EMBEDME_STRICT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    strict: Option<bool>,

    /// Kill commands that run longer than this many milliseconds (0 disables)
    #[arg(long, env = "EMBEDME_TIMEOUT")]
    timeout: Option<u64>,

    /// Configuration file path (defaults to .embedme.toml in the working directory)
    #[arg(long, env = "EMBEDME_CONFIG")]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        if self.verify {
            OutputMode::Verify
        } else if self.stdout {
            OutputMode::Stdout
        } else if let Some(output) = &self.output {
            OutputMode::File(output.clone())
        } else if self.dry_run {
            OutputMode::DryRun
        } else {
            OutputMode::Write
        }
    }

    /// Settings given on the command line, layered over the config file.
    fn config_overrides(&self) -> ProjectConfig {
        ProjectConfig {
            base: self.base.clone(),
            glob: self.glob,
            strict: self.strict,
            timeout: self.timeout,
            ignore_files: None,
            shell: None,
        }
    }
}

fn init_logging(cli: &Cli) {
    if !cli.color || cli.no_color {
        colored::control::set_override(false);
    }
    if cli.force_color {
        colored::control::set_override(true);
    }

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.silent {
        builder.filter_level(LevelFilter::Off);
    } else if cli.verbose {
        builder
            .filter_level(LevelFilter::Info)
            .filter_module("embedme", LevelFilter::Debug)
            .filter_module("embedme_lib", LevelFilter::Debug);
    }

    builder
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let message = record.args().to_string();
            let line = match record.level() {
                Level::Error => format!("{} {}", "error:".red().bold(), message.red()),
                Level::Warn => message.yellow().to_string(),
                Level::Info => message,
                Level::Debug | Level::Trace => message.dimmed().to_string(),
            };
            writeln!(buf, "{line}")
        })
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();
    log::info!("{}", format!("embedme v{}", env!("CARGO_PKG_VERSION")).magenta());

    let working_dir = match &cli.directory {
        Some(dir) => std::path::absolute(dir).map_err(|e| anyhow!("invalid directory {}: {e}", dir.display()))?,
        None => std::env::current_dir().map_err(|e| anyhow!("failed to determine the current directory: {e}"))?,
    };
    if !working_dir.is_dir() {
        anyhow::bail!("working directory {} does not exist", working_dir.display());
    }

    let (file_config, config_path) = ProjectConfig::load(cli.config.as_deref(), &working_dir)?;
    if let Some(path) = &config_path {
        log::debug!("Using config {}", path.display());
    }
    let settings = file_config.merged_with(cli.config_overrides());

    let mut options = EmbedOptions::new(&working_dir);
    options.mode = cli.output_mode();
    options.strip_embed_comment = cli.strip_embed_comment;
    options.base = settings.base.clone();
    options.on_invalid = if settings.strict.unwrap_or(false) {
        OnInvalid::Fail
    } else {
        OnInvalid::Warn
    };

    let shell = SystemShell::new(settings.timeout.unwrap_or(0)).with_shell(settings.shell.clone().unwrap_or_default());
    let embedder = Embedder::new(&options, &OsFileSystem, &shell)?;

    let sources = discover_sources(&cli.sources, &working_dir, settings.glob.unwrap_or(false))?;
    if sources.is_empty() {
        log::warn!("no files matched your input");
        return Ok(());
    }
    if sources.len() > 1 && matches!(options.mode, OutputMode::Stdout | OutputMode::File(_)) {
        log::warn!("more than one file matched: results will be concatenated");
    }

    match options.mode {
        OutputMode::Verify => log::info!("Verifying..."),
        OutputMode::DryRun => log::info!("Doing a dry run..."),
        OutputMode::Stdout => log::info!("Writing to stdout..."),
        OutputMode::File(_) | OutputMode::Write => log::info!("Embedding..."),
    }

    let (sources, skipped) = filter_ignored(sources, &working_dir, &settings.ignore_files());
    for ignored in &skipped {
        log::info!("Skipped {} files ignored in {}", ignored.count, ignored.ignore_file);
    }
    if sources.is_empty() {
        log::warn!("All matching files were ignored");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = process_sources(&embedder, &sources, &mut out)?;
    log::debug!(
        "{} document(s), {} changed, {} written",
        summary.documents,
        summary.changed,
        summary.written
    );

    log::info!("{}", format!("done in {:.2?}", start.elapsed()).magenta());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(cli) {
        // Error messages already include their causes
        log::error!("{err}");
        exit::failure();
    }
    exit::success();
}
