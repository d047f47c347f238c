use clap::{Parser, Subcommand};
mod download;
mod merge;
mod taxprof;

use std::path::PathBuf;
use sylph_tax::config::load_config;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "sylph-tax: incorporate taxonomy into sylph's output",
    long_about = None
)]
struct Args {
    /// Do not read or write the config file. Pre-built taxonomies then need --taxonomy-dir
    #[arg(long, global = true)]
    no_config: bool,

    /// Directory holding the downloaded taxonomy metadata files (overrides the config)
    #[arg(long, global = true)]
    taxonomy_dir: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Integrate taxonomy information with sylph's output
    Taxprof(taxprof::Args),
    /// Download taxonomy metadata files for the pre-built sylph databases
    Download(download::Args),
    /// Merge multiple sylphmpa reports into a single TSV table
    Merge(merge::Args),
}

fn dispatch(args: Args) -> anyhow::Result<()> {
    let taxonomy_dir = args.taxonomy_dir.as_deref();

    match args.cmd {
        Commands::Taxprof(cmd_args) => {
            let config = load_config(args.no_config)?;
            taxprof::run(cmd_args, config.as_ref(), taxonomy_dir)?;
        }
        Commands::Download(cmd_args) => {
            let mut config = load_config(args.no_config)?;
            download::run(cmd_args, config.as_mut(), taxonomy_dir)?;
        }
        Commands::Merge(cmd_args) => {
            merge::run(cmd_args)?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    if let Err(e) = dispatch(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
