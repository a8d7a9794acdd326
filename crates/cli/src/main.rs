mod cmd;
mod logging;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use gmapmaker_lib::CodePage;
use gmapmaker_lib::config::parse_data_age;
use gmapmaker_lib::stage::DownloadMode;

use cmd::{cmd_areas, cmd_build, cmd_info};

/// Builds Garmin maps from OpenStreetMap data.
#[derive(Parser)]
#[command(name = "gmapmaker")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// No messages on stdout
  #[arg(short, long, global = true)]
  quiet: bool,

  /// Also write a debug log to FILE (default: gmapmaker.log)
  #[arg(short, long, global = true, value_name = "FILE", num_args = 0..=1)]
  logging: Option<Option<String>>,

  /// Settings file (default: $GMAPMAKER_CONFIG, ./gmapmaker.toml, then the user config dir)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Args)]
struct BuildArgs {
  /// Id of the area to build, see `gmapmaker areas`
  #[arg(short, long)]
  area: String,

  /// Code page of the map: a number, `unicode` or `ascii`
  #[arg(short, long, default_value = "1250")]
  code_page: CodePage,

  /// When to download fresh map data: force, skip or auto
  #[arg(short, long, default_value = "auto")]
  download: DownloadMode,

  /// Maximum age of local map data in auto mode, e.g. 12h, 1d, 2m
  #[arg(long, default_value = "1d", value_parser = parse_data_age)]
  maximum_data_age: Duration,

  /// Use this map number instead of the area's
  #[arg(long)]
  map_number: Option<u32>,

  /// Extra text in the map name
  #[arg(long)]
  suffix: Option<String>,

  /// Crop the map data by the area polygon
  #[arg(short = 'r', long)]
  crop: bool,

  /// Build from the unsplit data (only for very small areas)
  #[arg(long)]
  no_split: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the map for one area
  Build(BuildArgs),

  /// List the areas that can be built
  Areas {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show platform and settings information
  Info {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let log_file = cli.logging.as_ref().map(|value| logging::log_file_path(value.as_deref()));
  logging::init(cli.verbose, cli.quiet, log_file)?;

  let config = cli.config.as_deref();
  let result = match cli.command {
    Commands::Build(args) => cmd_build(&args, config, cli.quiet),
    Commands::Areas { json } => cmd_areas(config, json),
    Commands::Info { json } => cmd_info(config, json),
  };

  if let Err(e) = result {
    output::print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
  Ok(())
}
