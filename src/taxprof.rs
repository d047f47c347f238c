//! The `taxprof` pipeline: results files in, one `.sylphmpa` per sample out.

use crate::errors::Result;
use crate::profile::{profile_sample, read_results};
use crate::report::{OutputMode, ReportWriter};
use crate::taxonomy::TaxonomyMap;
use std::path::{Path, PathBuf};

/// Options of a profiling run.
#[derive(Debug, Clone, Default)]
pub struct TaxprofOptions {
    pub sylph_results: Vec<PathBuf>,
    pub taxonomy_metadata: Vec<String>,
    pub output_prefix: String,
    pub mode: OutputMode,
    pub add_folder_information: bool,
    pub overwrite: bool,
}

/// Runs the whole profile conversion
///
/// # Arguments
///
/// * `options` - Inputs, outputs and layout
/// * `taxonomy_dir` - Directory of pre-built metadata files, if known
///
/// # Returns
///
/// Paths of the written reports, in processing order. Stops at the first
/// fatal error; reports written before it stay on disk.
pub fn run(options: &TaxprofOptions, taxonomy_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    log::info!("Reading metadata: {:?} ...", options.taxonomy_metadata);
    let taxonomy = TaxonomyMap::load(&options.taxonomy_metadata, taxonomy_dir)?;

    let mut writer = ReportWriter::new(
        &options.output_prefix,
        options.add_folder_information,
        options.overwrite,
        options.mode,
    );
    let mut written = Vec::new();

    for results in &options.sylph_results {
        log::info!("Processing sylph output file: {}", results.display());
        let table = read_results(results)?;
        for (sample, rows) in &table.samples {
            let profile = profile_sample(&taxonomy, sample, rows);
            written.push(writer.write_sample(sample, &taxonomy, &profile)?);
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::fs;

    const HEADER: &str = "Sample_file\tGenome_file\tTaxonomic_abundance\tSequence_abundance\tAdjusted_ANI\tEff_cov\tContig_name";

    fn setup(dir: &Path, rows: &str) -> (PathBuf, PathBuf) {
        let metadata = dir.join("custom.tsv");
        fs::write(
            &metadata,
            "TEST123\td__Bacteria;p__Proteobacteria\nOTHER\td__Bacteria;p__Firmicutes\n",
        )
        .unwrap();
        let results = dir.join("results.tsv");
        fs::write(&results, format!("{}\n{}", HEADER, rows)).unwrap();
        (metadata, results)
    }

    fn options(metadata: &Path, results: &Path, prefix: String) -> TaxprofOptions {
        TaxprofOptions {
            sylph_results: vec![results.to_path_buf()],
            taxonomy_metadata: vec![metadata.to_string_lossy().into_owned()],
            output_prefix: prefix,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_genome_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let (metadata, results) = setup(
            tmp.path(),
            "reads/s1.fq\tdb/TEST123.fna\t100\t100\t99.1\t2.5\tcontig1\n",
        );
        let prefix = format!("{}/", tmp.path().display());
        let written = run(&options(&metadata, &results, prefix), None).unwrap();
        assert_eq!(written, vec![tmp.path().join("s1.fq.sylphmpa")]);

        let report = fs::read_to_string(&written[0]).unwrap();
        let clades: Vec<&str> = report
            .lines()
            .skip(2)
            .map(|line| line.split('\t').next().unwrap())
            .collect();
        assert_eq!(
            clades,
            vec![
                "d__Bacteria",
                "d__Bacteria|p__Proteobacteria",
                "d__Bacteria|p__Proteobacteria|t__TEST123",
            ]
        );
        assert!(report.contains("d__Bacteria|p__Proteobacteria|t__TEST123\t100.0\t100.0\t99.1\t2.5\n"));
    }

    #[test]
    fn test_samples_sorted_and_rerun_needs_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let (metadata, results) = setup(
            tmp.path(),
            "b.fq\tTEST123.fna\t100\t100\t99\t1\tc\n\
             a.fq\tOTHER.fa\t100\t100\t98\t1\tc\n",
        );
        let prefix = format!("{}/out_", tmp.path().display());
        let mut opts = options(&metadata, &results, prefix);

        let written = run(&opts, None).unwrap();
        assert_eq!(
            written,
            vec![
                tmp.path().join("out_a.fq.sylphmpa"),
                tmp.path().join("out_b.fq.sylphmpa"),
            ]
        );
        let first = fs::read(&written[0]).unwrap();

        assert!(matches!(
            run(&opts, None).unwrap_err(),
            Error::OutputCollision { .. }
        ));

        opts.overwrite = true;
        run(&opts, None).unwrap();
        assert_eq!(fs::read(&written[0]).unwrap(), first);
    }

    #[test]
    fn test_colliding_basenames_abort_before_second_file() {
        let tmp = tempfile::tempdir().unwrap();
        let (metadata, results) = setup(
            tmp.path(),
            "run1/s.fq\tTEST123.fna\t100\t100\t99\t1\tc\n\
             run2/s.fq\tOTHER.fa\t100\t100\t98\t1\tc\n",
        );
        let prefix = format!("{}/", tmp.path().display());
        let mut opts = options(&metadata, &results, prefix);
        assert!(matches!(
            run(&opts, None).unwrap_err(),
            Error::OutputCollision { .. }
        ));
        let report = fs::read_to_string(tmp.path().join("s.fq.sylphmpa")).unwrap();
        assert!(report.contains("t__TEST123"));
        assert!(!report.contains("t__OTHER"));

        opts.add_folder_information = true;
        opts.output_prefix = format!("{}/f_", tmp.path().display());
        let written = run(&opts, None).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("f_run1_s.fq.sylphmpa"));
    }

    #[test]
    fn test_prebuilt_without_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let (_, results) = setup(tmp.path(), "s.fq\tTEST123.fna\t100\t100\t99\t1\tc\n");
        let opts = TaxprofOptions {
            sylph_results: vec![results],
            taxonomy_metadata: vec!["GTDB_r220".to_string()],
            ..Default::default()
        };
        assert!(matches!(run(&opts, None).unwrap_err(), Error::TaxonomyDirUnset));
    }
}
