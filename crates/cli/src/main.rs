mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, cmd_build, cmd_cache_clear, cmd_cache_show};
use fnpack_lib::consts::DEFAULT_MANIFEST;
use output::OutputFormat;

/// fnpack - incremental builds for serverless functions
#[derive(Parser)]
#[command(name = "fnpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the functions manifest
  #[arg(short, long, global = true, env = "FNPACK_MANIFEST", default_value = DEFAULT_MANIFEST)]
  manifest: PathBuf,

  /// Local cache file (default: .fnpack/cache.json next to the manifest)
  #[arg(long, global = true, env = "FNPACK_CACHE")]
  cache: Option<PathBuf>,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile every function and package the ones that changed
  Build(BuildArgs),

  /// Inspect or reset the build cache
  Cache {
    #[command(subcommand)]
    command: CacheCommands,
  },
}

#[derive(Subcommand)]
enum CacheCommands {
  /// List recorded digests
  Show,

  /// Remove all recorded digests
  Clear,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build(args) => {
      if !cmd_build(&cli.manifest, cli.cache, &args, cli.format)? {
        std::process::exit(1);
      }
      Ok(())
    }
    Commands::Cache { command } => match command {
      CacheCommands::Show => cmd_cache_show(&cli.manifest, cli.cache, cli.format),
      CacheCommands::Clear => cmd_cache_clear(&cli.manifest, cli.cache, cli.format),
    },
  }
}
