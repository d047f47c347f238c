use anyhow::{anyhow, Result};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

/// Last path segment of a url, e.g. the file name of a record file.
pub fn get_last_segment_of_url(url: &str) -> &str {
    url.trim_end_matches('/').split('/').last().unwrap_or("")
}

/// Creates `dirname` (and parents) when missing and returns it as a `PathBuf`.
pub fn create_data_dir<P: AsRef<Path>>(dirname: P) -> Result<PathBuf> {
    let path = dirname.as_ref().to_path_buf();
    if path.exists() && !path.is_dir() {
        return Err(anyhow!("{:?} exists and is not a directory", path));
    }
    if !path.exists() {
        create_dir_all(&path)?;
    }
    Ok(path)
}

/// Local destination for `url` inside `dir`.
pub fn target_path(dir: &Path, url: &str) -> Result<PathBuf> {
    let name = get_last_segment_of_url(url);
    if name.is_empty() {
        return Err(anyhow!("cannot derive a file name from url {}", url));
    }
    Ok(dir.join(name))
}
