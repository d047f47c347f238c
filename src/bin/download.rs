use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use sylph_tax::config::{download_destination, load_config, JsonConfig};
use sylph_tax::metadata::METADATA_FILE_URLS;
use tokio::runtime::Builder;
use zenodo::Downloader;

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Download taxonomy metadata files for the pre-built sylph databases",
    long_about = "Download taxonomy metadata files for the pre-built sylph databases.
Unless --no-config is set, the destination is remembered as the taxonomy directory."
)]
pub struct Args {
    /// Directory the metadata files are downloaded to
    #[arg(long)]
    pub download_to: Option<PathBuf>,
}

async fn async_run(dest: &Path) -> Result<Vec<PathBuf>> {
    let downloader = Downloader::new(dest)?;
    downloader.download_all(METADATA_FILE_URLS).await
}

fn download_to(dest: &Path) -> Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create runtime")?;
    let files = runtime
        .block_on(async_run(dest))
        .with_context(|| format!("Downloading taxonomy metadata to {}", dest.display()))?;
    log::info!(
        "DOWNLOAD: {} taxonomy metadata files have been downloaded to {}.",
        files.len(),
        dest.display()
    );
    Ok(())
}

pub fn run(args: Args, config: Option<&mut JsonConfig>, taxonomy_dir: Option<&Path>) -> Result<()> {
    let dest = download_destination(args.download_to.as_deref(), taxonomy_dir);

    let config = match config {
        Some(config) => config,
        None => {
            let dest = dest.ok_or_else(|| {
                anyhow::anyhow!(
                    "--taxonomy-dir is required when --no-config is set. Please specify a directory using --taxonomy-dir or --download-to."
                )
            })?;
            return download_to(&dest);
        }
    };

    match config.taxonomy_dir() {
        Some(dir) => log::info!(
            "DOWNLOAD: Current taxonomy location is set to {}.",
            dir.display()
        ),
        None => log::info!("DOWNLOAD: No taxonomy location is currently set."),
    }

    match dest {
        Some(dest) => {
            download_to(&dest)?;
            config.set_taxonomy_dir(&dest)?;
            log::info!(
                "DOWNLOAD: {} has been updated with the new taxonomy directory.",
                config.path().display()
            );
        }
        None => log::info!(
            "DOWNLOAD: No download directory specified. Please specify a directory using the --download-to option."
        ),
    }
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
        .and_then(|mut config| run(args, config.as_mut(), None));
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
