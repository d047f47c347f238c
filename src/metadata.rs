//! Pre-built taxonomy metadata shipped for the public sylph databases.
//!
//! Each symbolic database name maps to one gzip-compressed metadata file,
//! and each file name to the record it is downloaded from.

/// Environment variable that overrides the config file location.
pub const TAXONOMY_CONFIG_ENV: &str = "SYLPH_TAXONOMY_CONFIG";

/// Database names containing one of these markers use the viral rank
/// hierarchy, where ranks may be skipped (family -> species).
pub const VIRAL_MARKERS: &[&str] = &["UHGV"];

/// Remote location of every pre-built metadata file, in download order.
pub const METADATA_FILE_URLS: &[&str] = &[
    "https://zenodo.org/records/14320496/files/fungi_refseq_2024-07-25_metadata.tsv.gz",
    "https://zenodo.org/records/14320496/files/gtdb_r214_metadata.tsv.gz",
    "https://zenodo.org/records/14320496/files/gtdb_r220_metadata.tsv.gz",
    "https://zenodo.org/records/14320496/files/IMGVR_4.1_metadata.tsv.gz",
    "https://zenodo.org/records/14320496/files/ocean_dna_metadata.tsv.gz",
    "https://zenodo.org/records/14320496/files/soil_smag_metadata.tsv.gz",
    "https://zenodo.org/records/14320496/files/tara_SMAGs_metadata.tsv.gz",
    "https://zenodo.org/records/15314244/files/gtdb_r226_metadata.tsv.gz",
    "https://zenodo.org/records/15670321/files/uhgv_default_metadata.tsv.gz",
    "https://zenodo.org/records/15670321/files/uhgv_ictv_metadata.tsv.gz",
];

/// Symbolic database name -> metadata file name.
pub const NAME_TO_METADATA_FILE: &[(&str, &str)] = &[
    ("FungiRefSeq-2024-07-25", "fungi_refseq_2024-07-25_metadata.tsv.gz"),
    ("GTDB_r214", "gtdb_r214_metadata.tsv.gz"),
    ("GTDB_r220", "gtdb_r220_metadata.tsv.gz"),
    ("GTDB_r226", "gtdb_r226_metadata.tsv.gz"),
    ("IMGVR_4.1", "IMGVR_4.1_metadata.tsv.gz"),
    ("UHGV_default", "uhgv_default_metadata.tsv.gz"),
    ("UHGV_ictv", "uhgv_ictv_metadata.tsv.gz"),
    ("OceanDNA", "ocean_dna_metadata.tsv.gz"),
    ("SoilSMAG", "soil_smag_metadata.tsv.gz"),
    ("TaraEukaryoticSMAG", "tara_SMAGs_metadata.tsv.gz"),
];

/// Metadata file name registered under `name`, if `name` is a pre-built database.
pub fn metadata_file(name: &str) -> Option<&'static str> {
    NAME_TO_METADATA_FILE
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, file)| *file)
}

pub fn is_prebuilt(name: &str) -> bool {
    metadata_file(name).is_some()
}

/// Download url of a registered metadata file name.
pub fn metadata_url(file_name: &str) -> Option<&'static str> {
    METADATA_FILE_URLS
        .iter()
        .find(|url| url.rsplit('/').next() == Some(file_name))
        .copied()
}

pub fn is_viral(name: &str) -> bool {
    VIRAL_MARKERS.iter().any(|marker| name.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(metadata_file("GTDB_r220"), Some("gtdb_r220_metadata.tsv.gz"));
        assert_eq!(metadata_file("gtdb_r220"), None);
        assert!(is_prebuilt("IMGVR_4.1"));
        assert!(!is_prebuilt("my_taxonomy.tsv"));
    }

    #[test]
    fn test_every_file_has_exactly_one_url() {
        assert!(!METADATA_FILE_URLS.is_empty());
        for (name, file) in NAME_TO_METADATA_FILE {
            let matching = METADATA_FILE_URLS
                .iter()
                .filter(|url| url.ends_with(file))
                .count();
            assert_eq!(matching, 1, "{} -> {}", name, file);
            assert!(metadata_url(file).is_some());
        }
    }

    #[test]
    fn test_viral_markers() {
        assert!(is_viral("UHGV_default"));
        assert!(is_viral("UHGV_ictv"));
        assert!(!is_viral("IMGVR_4.1"));
        assert!(!is_viral("GTDB_r226"));
    }
}
