use crate::errors::{Error, Result};
use crate::metadata;
use crate::utils::{has_gzip_suffix, open_text};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Rank tag of the synthesized strain level appended to every lineage.
pub const STRAIN_TAG: &str = "t__";

/// Resolves one database specifier to a concrete metadata file
///
/// # Arguments
///
/// * `specifier` - A pre-built database name or a path to a metadata file
/// * `taxonomy_dir` - Directory holding the downloaded pre-built files
///
/// # Returns
///
/// The file path and whether the file must be read as gzip
pub fn resolve_specifier(specifier: &str, taxonomy_dir: Option<&Path>) -> Result<(PathBuf, bool)> {
    match metadata::metadata_file(specifier) {
        Some(file_name) => {
            let dir = taxonomy_dir.ok_or(Error::TaxonomyDirUnset)?;
            Ok((dir.join(file_name), true))
        }
        None => {
            let path = PathBuf::from(specifier);
            let gzipped = has_gzip_suffix(&path);
            Ok((path, gzipped))
        }
    }
}

/// Whether any specifier names a pre-built database, which lives in the
/// taxonomy directory.
pub fn requires_taxonomy_dir<S: AsRef<str>>(specifiers: &[S]) -> bool {
    specifiers
        .iter()
        .any(|s| metadata::is_prebuilt(s.as_ref()))
}

/// Merged accession -> lineage mapping built from one or more metadata files.
#[derive(Debug, Default)]
pub struct TaxonomyMap {
    lineages: HashMap<String, String>,
    annotations: HashMap<String, String>,
    sources: Vec<String>,
    files: Vec<PathBuf>,
    viral_warnings: usize,
}

impl TaxonomyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every specifier in order. Later files win on accession collisions.
    ///
    /// # Arguments
    ///
    /// * `specifiers` - Pre-built database names and/or metadata file paths
    /// * `taxonomy_dir` - Directory of the downloaded pre-built files, if any
    ///
    /// # Returns
    ///
    /// The merged map, or the first missing/malformed file error
    pub fn load<S: AsRef<str>>(specifiers: &[S], taxonomy_dir: Option<&Path>) -> Result<Self> {
        let mut taxonomy = Self::new();

        for specifier in specifiers {
            let specifier = specifier.as_ref();
            let (path, gzipped) = resolve_specifier(specifier, taxonomy_dir)?;

            if metadata::is_prebuilt(specifier)
                && metadata::is_viral(specifier)
                && taxonomy.viral_warnings == 0
            {
                log::warn!(
                    "the UHGV taxonomy output format differs slightly from prokaryotic taxonomies. Taxonomic ranks may be skipped (e.g., Family -> Species rather than Family -> Genus -> Species)"
                );
                taxonomy.viral_warnings += 1;
            }

            if !path.exists() {
                return Err(Error::MissingMetadataFile(path));
            }

            let count = taxonomy.add_file(&path, gzipped)?;
            log::debug!("{} accessions read from {:?}", count, path);
            taxonomy.sources.push(specifier.to_string());
        }

        Ok(taxonomy)
    }

    /// Reads one tab-separated metadata file into the map
    ///
    /// # Arguments
    ///
    /// * `path` - Metadata file: accession, lineage, optional annotation
    /// * `gzipped` - Whether to decompress while reading
    ///
    /// # Returns
    ///
    /// The number of entries read
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, gzipped: bool) -> Result<usize> {
        let path = path.as_ref();
        let reader = open_text(path, gzipped)?;
        let mut count = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split('\t');
            let accession = fields.next().unwrap_or_default();
            let lineage = fields.next().ok_or_else(|| Error::MalformedMetadataLine {
                path: path.to_path_buf(),
                line: idx + 1,
            })?;
            self.insert(accession, lineage, fields.next());
            count += 1;
        }

        self.files.push(path.to_path_buf());
        Ok(count)
    }

    /// Stores `lineage` (without strain level) for `accession`, tagging it with
    /// the accession's strain level.
    pub fn insert(&mut self, accession: &str, lineage: &str, annotation: Option<&str>) {
        let tagged = format!("{};{}{}", lineage.trim_end(), STRAIN_TAG, accession);
        if let Some(annotation) = annotation {
            self.annotations
                .insert(accession.to_string(), annotation.trim_end().to_string());
        }
        self.lineages.insert(accession.to_string(), tagged);
    }

    pub fn lineage(&self, accession: &str) -> Option<&str> {
        self.lineages.get(accession).map(String::as_str)
    }

    pub fn annotation(&self, accession: &str) -> Option<&str> {
        self.annotations.get(accession).map(String::as_str)
    }

    /// Specifiers loaded, in command line order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Resolved metadata files, in load order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Skipped-rank advisories logged while loading viral databases.
    pub fn viral_warnings(&self) -> usize {
        self.viral_warnings
    }

    pub fn len(&self) -> usize {
        self.lineages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    /// `['GTDB_r220', 'custom.tsv']`, as written into report headers.
    pub fn sources_label(&self) -> String {
        let quoted: Vec<String> = self.sources.iter().map(|s| format!("'{}'", s)).collect();
        format!("[{}]", quoted.join(", "))
    }
}
