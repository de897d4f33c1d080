use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use yw_cnv::config::{self, ConverterConfig};
use yw_cnv::error::YwError;
use yw_cnv::xref::CrossReferences;
use yw_cnv::{convert, output};

#[derive(Parser)]
#[command(name = "yw-cnv")]
#[command(about = "Read, merge, split and write yWriter 7 projects")]
#[command(long_about = "\
Read, merge, split and write yWriter 7 projects

A project is a single .yw7 XML file. While yWriter has a project open it
places a novel.yw7.lock file next to it; every command that reads or writes
refuses to run while that file exists. Every write keeps the previous
version as novel.yw7.bak.

Dividers inside scene text are turned into structure by 'split' and
'import':

  # Title|Description      new part
  ## Title|Description     new chapter
  ### Title|Description    new scene

Settings are read from yw-cnv.toml in the current directory, or from the
file given with --config. Run 'yw-cnv gen-config' for a documented stock
config. Log output is controlled by RUST_LOG or [log] level.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./yw-cnv.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a project and show its structure
    Check {
        file: PathBuf,
        /// Print the project model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Split scenes at divider lines and write the project back
    Split { file: PathBuf },
    /// Merge an edited project into a base project
    Import {
        incoming: PathBuf,
        base: PathBuf,
        /// Keep divider lines as plain text
        #[arg(long)]
        no_split: bool,
    },
    /// Show which scenes use each character, location, item and tag
    Xref { file: PathBuf },
    /// Find project files below a directory
    List {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Print a stock yw-cnv.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log.level);

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<YwError>() {
                Some(err) => eprintln!("{}", config.messages.describe(err)),
                None => eprintln!("Error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &ConverterConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Check { file, json } => {
            let project = convert::read_project(&file, config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&project)?);
            } else {
                output::print_project_summary(&project, &file);
            }
        }
        Command::Split { file } => {
            let outcome = convert::split_file(&file, config)?;
            output::print_split_outcome(&outcome);
        }
        Command::Import {
            incoming,
            base,
            no_split,
        } => {
            let outcome = convert::import(&incoming, &base, config, !no_split)?;
            output::print_import_outcome(&outcome);
        }
        Command::Xref { file } => {
            let project = convert::read_project(&file, config)?;
            let xref = CrossReferences::generate(&project);
            output::print_xref(&project, &xref);
        }
        Command::List { dir } => {
            let entries = convert::find_projects(&dir, config);
            output::print_project_list(&entries, &dir);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// An explicit `--config` must exist; otherwise the working directory is
/// searched.
fn load_config(path: Option<&Path>) -> Result<ConverterConfig, config::ConfigError> {
    match path {
        Some(path) if !path.is_file() => Err(config::ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        ))),
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Logs go to stderr. `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
