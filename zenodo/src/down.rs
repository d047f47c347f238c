use crate::client::retry_client;
use crate::utils::{create_data_dir, get_last_segment_of_url, target_path};
use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::time::{timeout, Duration};

/// A body that delivers nothing for this long is treated as a failed download.
const STALL_TIMEOUT: Duration = Duration::from_secs(60);

fn get_content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value_str| u64::from_str(value_str).ok())
}

fn progress_bar(total: Option<u64>, name: &str) -> ProgressBar {
    let (bar, template) = match total {
        Some(len) => (
            ProgressBar::new(len),
            "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ),
        None => (
            ProgressBar::new_spinner(),
            "{spinner:.green} {msg} [{elapsed_precise}] {bytes}",
        ),
    };
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    bar.set_style(style);
    bar.set_message(name.to_string());
    bar
}

async fn fetch(client: &ClientWithMiddleware, url: &str, output_file: &Path) -> Result<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to send request")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("{} returned HTTP {}", url, status));
    }

    let progress = progress_bar(
        get_content_length(&response),
        get_last_segment_of_url(url),
    );

    let mut file = File::create(output_file)
        .await
        .with_context(|| format!("Failed to create {:?}", output_file))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = timeout(STALL_TIMEOUT, stream.next())
        .await
        .context("Download stalled")?
    {
        let chunk = chunk.context("Error while reading chunk")?;
        file.write_all(&chunk)
            .await
            .context("Error while writing to file")?;
        written += chunk.len() as u64;
        progress.set_position(written);
    }
    file.flush().await?;

    progress.finish_with_message(format!("{} done", get_last_segment_of_url(url)));
    Ok(written)
}

/// Downloads `url` into `dir` with `client`, keeping the url's file name.
///
/// A failed transfer never leaves a partial file behind.
pub async fn download_file_with(
    client: &ClientWithMiddleware,
    url: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let output_file = target_path(dir, url)?;
    log::info!("Downloading {} ...", get_last_segment_of_url(url));

    match fetch(client, url, &output_file).await {
        Ok(bytes) => {
            log::debug!("{} bytes written to {:?}", bytes, output_file);
            Ok(output_file)
        }
        Err(e) => {
            if output_file.exists() {
                let _ = fs::remove_file(&output_file).await;
            }
            Err(e.context(format!("Error downloading {}", url)))
        }
    }
}

/// Same as [`download_file_with`] using the shared retrying client.
pub async fn download_file(url: &str, dir: &Path) -> Result<PathBuf> {
    download_file_with(retry_client(), url, dir).await
}

/// Fetches a fixed list of urls into one directory, strictly one after another.
pub struct Downloader {
    dest: PathBuf,
}

impl Downloader {
    pub fn new<P: AsRef<Path>>(dest: P) -> Result<Self> {
        let dest = create_data_dir(dest)?;
        Ok(Self { dest })
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Stops at the first failure; files fetched before it stay on disk.
    pub async fn download_all(&self, urls: &[&str]) -> Result<Vec<PathBuf>> {
        let mut downloaded = Vec::with_capacity(urls.len());
        for url in urls {
            let path = download_file(url, &self.dest).await?;
            downloaded.push(path);
        }
        Ok(downloaded)
    }
}
