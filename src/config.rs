use crate::errors::{Error, Result};
use crate::metadata::TAXONOMY_CONFIG_ENV;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Stored value meaning "no taxonomy directory configured".
pub const UNSET_DIR: &str = "NONE";

const CONFIG_DIR: &str = "sylph-tax";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub taxonomy_dir: String,
    /// Keys this version does not know about, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            taxonomy_dir: UNSET_DIR.to_string(),
            extra: Map::new(),
        }
    }
}

/// Default config location: `$SYLPH_TAXONOMY_CONFIG`, else
/// `~/.config/sylph-tax/config.json`.
pub fn config_location() -> PathBuf {
    match std::env::var_os(TAXONOMY_CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILE_NAME),
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// A config file on disk together with its parsed content.
#[derive(Debug)]
pub struct JsonConfig {
    path: PathBuf,
    config: Config,
}

impl JsonConfig {
    /// Loads the config at `path`, writing a default one first if it does not exist
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the json file
    ///
    /// # Returns
    ///
    /// The loaded config, or `ConfigIo`/`ConfigParse`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| Error::ConfigIo {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        if !path.exists() {
            let config = Self {
                path: path.clone(),
                config: Config::default(),
            };
            config.save()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path).map_err(io_err)?;
        let config: Config = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.clone(),
            source,
        })?;

        let current = env!("CARGO_PKG_VERSION");
        let stored = config.version.as_deref().unwrap_or("");
        if major(stored) != major(current) {
            log::warn!(
                "Config file version at {:?} is different than sylph-tax version: {} != {} -- sylph-tax has had major updates since the initial run. Check the CHANGELOG to ensure database compatibility. Update the config file version to {} to suppress this message.",
                path,
                stored,
                current,
                current
            );
        }

        Ok(Self { path, config })
    }

    /// Loads the config from `config_location()`.
    pub fn load_default() -> Result<Self> {
        Self::load(config_location())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured taxonomy directory, `None` while it is `NONE`.
    pub fn taxonomy_dir(&self) -> Option<PathBuf> {
        if self.config.taxonomy_dir == UNSET_DIR {
            None
        } else {
            Some(PathBuf::from(&self.config.taxonomy_dir))
        }
    }

    /// Records `dir` (made absolute) as the taxonomy directory and saves the file.
    pub fn set_taxonomy_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let absolute = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };
        self.config.taxonomy_dir = absolute.to_string_lossy().into_owned();
        self.save()
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.config).map_err(|source| {
            Error::ConfigParse {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(|source| Error::ConfigIo {
            path: self.path.clone(),
            source,
        })
    }
}

/// The default config, or `None` under `--no-config`.
pub fn load_config(no_config: bool) -> Result<Option<JsonConfig>> {
    if no_config {
        Ok(None)
    } else {
        JsonConfig::load_default().map(Some)
    }
}

/// Picks the taxonomy directory used for pre-built databases
///
/// # Arguments
///
/// * `cli_dir` - `--taxonomy-dir`, which always wins
/// * `config` - Loaded config, `None` under `--no-config`
/// * `needed` - Whether any pre-built database was requested
///
/// # Returns
///
/// The directory, `None` when not needed and unknown, or
/// `TaxonomyDirRequired` / `TaxonomyDirUnset` when needed and unknown
pub fn resolve_taxonomy_dir(
    cli_dir: Option<&Path>,
    config: Option<&JsonConfig>,
    needed: bool,
) -> Result<Option<PathBuf>> {
    if let Some(dir) = cli_dir {
        return Ok(Some(dir.to_path_buf()));
    }
    let configured = config.and_then(JsonConfig::taxonomy_dir);
    match (configured, needed) {
        (Some(dir), _) => Ok(Some(dir)),
        (None, false) => Ok(None),
        (None, true) if config.is_none() => Err(Error::TaxonomyDirRequired),
        (None, true) => Err(Error::TaxonomyDirUnset),
    }
}

/// `--download-to` if given, else `--taxonomy-dir`.
pub fn download_destination(download_to: Option<&Path>, cli_dir: Option<&Path>) -> Option<PathBuf> {
    download_to.or(cli_dir).map(Path::to_path_buf)
}
