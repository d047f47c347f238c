use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use sylph_tax::config::{load_config, resolve_taxonomy_dir, JsonConfig};
use sylph_tax::report::OutputMode;
use sylph_tax::taxonomy::requires_taxonomy_dir;
use sylph_tax::taxprof::{self, TaxprofOptions};

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Integrate taxonomy information with sylph's output",
    long_about = "Integrate taxonomy information with sylph's output.
Writes one <prefix><sample>.sylphmpa report per sample found in the sylph results."
)]
pub struct Args {
    /// sylph output file(s)
    #[arg(required = true, num_args = 1..)]
    pub sylph_results: Vec<PathBuf>,

    /// Pre-built database names (e.g. GTDB_r220) or custom metadata files
    #[arg(short = 't', long, required = true, num_args = 1..)]
    pub taxonomy_metadata: Vec<String>,

    /// Prefix prepended to every output file, e.g. `out/` or `run1_`
    #[arg(short, long, default_value = "")]
    pub output_prefix: String,

    /// Add a viral host column to the output (for viral metadata with host annotations)
    #[arg(long, conflicts_with = "pavian")]
    pub annotate_virus_hosts: bool,

    /// Output a MetaPhlAn-like profile readable by Pavian
    #[arg(long)]
    pub pavian: bool,

    /// Name outputs after the full sample path (`/` replaced by `_`) instead of the basename
    #[arg(long)]
    pub add_folder_information: bool,

    /// Overwrite existing output files
    #[arg(long)]
    pub overwrite: bool,
}

impl From<Args> for TaxprofOptions {
    fn from(item: Args) -> Self {
        let mode = if item.pavian {
            OutputMode::Pavian
        } else if item.annotate_virus_hosts {
            OutputMode::VirusHosts
        } else {
            OutputMode::Default
        };
        Self {
            sylph_results: item.sylph_results,
            taxonomy_metadata: item.taxonomy_metadata,
            output_prefix: item.output_prefix,
            mode,
            add_folder_information: item.add_folder_information,
            overwrite: item.overwrite,
        }
    }
}

pub fn run(args: Args, config: Option<&JsonConfig>, taxonomy_dir: Option<&Path>) -> Result<()> {
    let needed = requires_taxonomy_dir(&args.taxonomy_metadata);
    let taxonomy_dir = resolve_taxonomy_dir(taxonomy_dir, config, needed)?;

    let options = TaxprofOptions::from(args);
    let written = taxprof::run(&options, taxonomy_dir.as_deref())
        .context("taxprof failed")?;
    log::info!("{} sylphmpa report(s) written", written.len());
    Ok(())
}

#[allow(dead_code)]
fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let result = load_config(false)
        .map_err(anyhow::Error::from)
        .and_then(|config| run(args, config.as_ref(), None));
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
