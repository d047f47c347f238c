use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every fatal condition of a run. Advisory conditions (unresolvable
/// identifiers, extra result columns) are logged, never returned.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Metadata file {0:?} not found")]
    MissingMetadataFile(PathBuf),

    #[error("Malformed metadata line {line} in {path:?}: expected at least 2 tab-separated columns")]
    MalformedMetadataLine { path: PathBuf, line: usize },

    #[error("--taxonomy-dir is required when --no-config is set and using pre-built taxonomies. Please specify a directory using --taxonomy-dir, or provide custom taxonomy file paths directly")]
    TaxonomyDirRequired,

    #[error("No taxonomy directory has been configured. Please run 'sylph-tax download --download-to <directory>' first, or specify --taxonomy-dir")]
    TaxonomyDirUnset,

    #[error("Could not read sylph results file {path:?}: {source}")]
    ResultsUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed sylph results file {path:?} (line {line}): {reason}")]
    MalformedResultRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Output file {path:?} for sample {sample} {reason}, which would overwrite it. Consider --add-folder-information to disambiguate sample files")]
    OutputCollision {
        path: PathBuf,
        sample: String,
        reason: &'static str,
    },

    #[error("Malformed report {path:?}: {reason}")]
    MalformedReport { path: PathBuf, reason: String },

    #[error("Sample {sample} appears in more than one report ({path:?})")]
    DuplicateSample { sample: String, path: PathBuf },

    #[error("Config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config file {path:?} is not valid: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
