use crate::errors::{Error, Result};
use crate::resolve::{placeholder_lineage, resolve_lineage, Identifiers};
use crate::taxonomy::{TaxonomyMap, STRAIN_TAG};
use crate::utils::open_file;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Label used for empty ranks of a lineage (`d__Bacteria;;g__X`).
pub const UNKNOWN_RANK: &str = "UNKNOWN";

const SAMPLE_FILE: &str = "Sample_file";
const GENOME_FILE: &str = "Genome_file";
const CONTIG_NAME: &str = "Contig_name";
const ADJUSTED_ANI: &str = "Adjusted_ANI";
const SEQUENCE_ABUNDANCE: &str = "Sequence_abundance";
const TAXONOMIC_ABUNDANCE: &str = "Taxonomic_abundance";
/// `Eff_cov` is preferred; older sylph versions only report `True_cov`.
const COVERAGE_COLUMNS: &[&str] = &["Eff_cov", "True_cov"];

/// One line of a sylph profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub sample_file: String,
    pub genome_file: String,
    pub contig_name: String,
    pub adjusted_ani: f64,
    pub sequence_abundance: f64,
    pub taxonomic_abundance: f64,
    pub coverage: f64,
}

struct ColumnIndex {
    sample_file: usize,
    genome_file: usize,
    contig_name: usize,
    adjusted_ani: usize,
    sequence_abundance: usize,
    taxonomic_abundance: usize,
    coverage: usize,
}

impl ColumnIndex {
    fn from_header(header: &[&str], path: &Path) -> Result<Self> {
        let find = |name: &str| header.iter().position(|column| *column == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| Error::MalformedResultRow {
                path: path.to_path_buf(),
                line: 1,
                reason: format!("missing required column {}", name),
            })
        };

        let coverage = COVERAGE_COLUMNS
            .iter()
            .find_map(|name| find(*name))
            .ok_or_else(|| Error::MalformedResultRow {
                path: path.to_path_buf(),
                line: 1,
                reason: format!("missing coverage column ({})", COVERAGE_COLUMNS.join(" or ")),
            })?;

        Ok(Self {
            sample_file: require(SAMPLE_FILE)?,
            genome_file: require(GENOME_FILE)?,
            contig_name: require(CONTIG_NAME)?,
            adjusted_ani: require(ADJUSTED_ANI)?,
            sequence_abundance: require(SEQUENCE_ABUNDANCE)?,
            taxonomic_abundance: require(TAXONOMIC_ABUNDANCE)?,
            coverage,
        })
    }
}

/// Rows of one results file grouped by sample, samples in lexicographic order.
#[derive(Debug)]
pub struct ResultsTable {
    pub path: PathBuf,
    pub samples: BTreeMap<String, Vec<ResultRow>>,
}

fn parse_number(value: &str, column: &str, path: &Path, line: usize) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| Error::MalformedResultRow {
        path: path.to_path_buf(),
        line,
        reason: format!("{} value {:?} is not a number", column, value),
    })
}

/// Reads a sylph profile TSV
///
/// # Arguments
///
/// * `path` - The sylph output file
///
/// # Returns
///
/// The rows grouped by `Sample_file`, or `ResultsUnreadable` /
/// `MalformedResultRow` on structural problems
pub fn read_results<P: AsRef<Path>>(path: P) -> Result<ResultsTable> {
    let path = path.as_ref();
    let unreadable = |source| Error::ResultsUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(open_file(path).map_err(unreadable)?);
    let mut lines = reader.lines();

    let header_line = match lines.next() {
        Some(line) => line.map_err(unreadable)?,
        None => {
            return Err(Error::MalformedResultRow {
                path: path.to_path_buf(),
                line: 1,
                reason: "empty file".to_string(),
            })
        }
    };
    let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
    let num_cols = header.len();
    let columns = ColumnIndex::from_header(&header, path)?;

    let mut samples: BTreeMap<String, Vec<ResultRow>> = BTreeMap::new();
    let mut warned_extra = false;

    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line.map_err(unreadable)?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() > num_cols && !warned_extra {
            log::warn!(
                "there is an extra tab, probably in the contig fasta id used for sylph's database. Removing all columns after the first {}.",
                num_cols
            );
            warned_extra = true;
        }
        if fields.len() < num_cols {
            return Err(Error::MalformedResultRow {
                path: path.to_path_buf(),
                line: line_no,
                reason: format!("expected {} columns, found {}", num_cols, fields.len()),
            });
        }

        let row = ResultRow {
            sample_file: fields[columns.sample_file].to_string(),
            genome_file: fields[columns.genome_file].to_string(),
            contig_name: fields[columns.contig_name].to_string(),
            adjusted_ani: parse_number(fields[columns.adjusted_ani], ADJUSTED_ANI, path, line_no)?,
            sequence_abundance: parse_number(
                fields[columns.sequence_abundance],
                SEQUENCE_ABUNDANCE,
                path,
                line_no,
            )?,
            taxonomic_abundance: parse_number(
                fields[columns.taxonomic_abundance],
                TAXONOMIC_ABUNDANCE,
                path,
                line_no,
            )?,
            coverage: parse_number(fields[columns.coverage], "coverage", path, line_no)?,
        };
        samples.entry(row.sample_file.clone()).or_default().push(row);
    }

    Ok(ResultsTable {
        path: path.to_path_buf(),
        samples,
    })
}

/// ANI and coverage of the genome behind a strain-level clade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrainStats {
    pub ani: f64,
    pub coverage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbundanceRecord {
    pub relative_abundance: f64,
    pub sequence_abundance: f64,
    /// Only set on keys containing the strain tag.
    pub strain: Option<StrainStats>,
}

/// Number of ranks in a pipe-joined clade key.
pub fn clade_depth(clade: &str) -> usize {
    clade.split('|').count()
}

/// Per-clade abundances of one sample, kept in first-seen order.
#[derive(Debug, Default)]
pub struct SampleProfile {
    index: HashMap<String, usize>,
    clades: Vec<(String, AbundanceRecord)>,
    unresolved: usize,
}

impl SampleProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation to every prefix of `lineage`.
    pub fn add_lineage(
        &mut self,
        lineage: &str,
        relative_abundance: f64,
        sequence_abundance: f64,
        stats: StrainStats,
    ) {
        let mut clade = String::with_capacity(lineage.len() + 16);
        for level in lineage.split(';') {
            let level = if level.is_empty() { UNKNOWN_RANK } else { level };
            if !clade.is_empty() {
                clade.push('|');
            }
            clade.push_str(level);

            let pos = match self.index.get(&clade) {
                Some(&pos) => pos,
                None => {
                    self.clades.push((clade.clone(), AbundanceRecord::default()));
                    self.index.insert(clade.clone(), self.clades.len() - 1);
                    self.clades.len() - 1
                }
            };
            let record = &mut self.clades[pos].1;
            record.relative_abundance += relative_abundance;
            record.sequence_abundance += sequence_abundance;
            if clade.contains(STRAIN_TAG) {
                record.strain = Some(stats);
            }
        }
    }

    pub fn get(&self, clade: &str) -> Option<&AbundanceRecord> {
        self.index.get(clade).map(|&pos| &self.clades[pos].1)
    }

    pub fn len(&self) -> usize {
        self.clades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clades.is_empty()
    }

    /// Rows that fell back to the placeholder lineage.
    pub fn unresolved(&self) -> usize {
        self.unresolved
    }

    /// Clades by ascending depth, then descending relative abundance.
    /// Equal abundances keep first-seen order.
    pub fn sorted_clades(&self) -> Vec<(&str, &AbundanceRecord)> {
        let mut by_depth: BTreeMap<usize, Vec<(&str, &AbundanceRecord)>> = BTreeMap::new();
        for (clade, record) in &self.clades {
            by_depth
                .entry(clade_depth(clade))
                .or_default()
                .push((clade.as_str(), record));
        }

        let mut sorted = Vec::with_capacity(self.clades.len());
        for (_, mut clades) in by_depth {
            clades.sort_by(|a, b| b.1.relative_abundance.total_cmp(&a.1.relative_abundance));
            sorted.extend(clades);
        }
        sorted
    }
}

/// Aggregates the rows of one sample over the taxonomy
///
/// # Arguments
///
/// * `taxonomy` - Merged accession -> lineage map
/// * `sample` - Sample identifier, used in diagnostics
/// * `rows` - All rows of the sample, in file order
///
/// # Returns
///
/// The per-clade abundances of the sample
pub fn profile_sample(taxonomy: &TaxonomyMap, sample: &str, rows: &[ResultRow]) -> SampleProfile {
    let mut profile = SampleProfile::new();

    for row in rows {
        let lineage = match resolve_lineage(taxonomy, &row.genome_file, &row.contig_name) {
            Some(lineage) => Cow::Borrowed(lineage),
            None => {
                if profile.unresolved == 0 {
                    let ids = Identifiers::file_form(&row.genome_file, &row.contig_name);
                    log::warn!(
                        "No taxonomy information found for entry {} and contig {} in metadata files ({:?}) of sample {}. Did you use the correct database and taxonomies? Assigning default taxonomy",
                        ids.genome,
                        ids.contig,
                        taxonomy.files(),
                        sample
                    );
                }
                profile.unresolved += 1;
                Cow::Owned(placeholder_lineage(&row.genome_file, &row.contig_name))
            }
        };

        profile.add_lineage(
            &lineage,
            row.taxonomic_abundance,
            row.sequence_abundance,
            StrainStats {
                ani: row.adjusted_ani,
                coverage: row.coverage,
            },
        );
    }

    if profile.unresolved > 1 {
        log::warn!(
            "{} rows of sample {} were assigned the default taxonomy",
            profile.unresolved,
            sample
        );
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Sample_file\tGenome_file\tTaxonomic_abundance\tSequence_abundance\tAdjusted_ANI\tEff_cov\tContig_name";

    fn stats(ani: f64, coverage: f64) -> StrainStats {
        StrainStats { ani, coverage }
    }

    fn row(sample: &str, genome: &str, tax: f64, seq: f64, ani: f64) -> ResultRow {
        ResultRow {
            sample_file: sample.to_string(),
            genome_file: genome.to_string(),
            contig_name: "contig1 desc".to_string(),
            adjusted_ani: ani,
            sequence_abundance: seq,
            taxonomic_abundance: tax,
            coverage: 1.5,
        }
    }

    fn write_results(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("results.tsv");
        std::fs::write(&path, format!("{}\n{}", HEADER, body)).unwrap();
        path
    }

    #[test]
    fn test_one_key_per_rank() {
        let mut profile = SampleProfile::new();
        profile.add_lineage("d__B;p__P;c__C;t__G1", 10.0, 5.0, stats(99.0, 2.0));
        assert_eq!(profile.len(), 4);
        let depths: Vec<usize> = profile
            .sorted_clades()
            .iter()
            .map(|(clade, _)| clade_depth(clade))
            .collect();
        assert_eq!(depths, vec![1, 2, 3, 4]);
        assert_eq!(profile.get("d__B|p__P").unwrap().strain, None);
        assert_eq!(
            profile.get("d__B|p__P|c__C|t__G1").unwrap().strain,
            Some(stats(99.0, 2.0))
        );
    }

    #[test]
    fn test_shared_prefix_sums_but_strain_is_last_write() {
        let mut profile = SampleProfile::new();
        profile.add_lineage("d__B;p__P;t__G1", 30.0, 20.0, stats(98.0, 1.0));
        profile.add_lineage("d__B;p__P;t__G2", 10.0, 5.0, stats(97.0, 3.0));

        let phylum = profile.get("d__B|p__P").unwrap();
        assert_eq!(phylum.relative_abundance, 40.0);
        assert_eq!(phylum.sequence_abundance, 25.0);
        assert_eq!(phylum.strain, None);

        let g1 = profile.get("d__B|p__P|t__G1").unwrap();
        assert_eq!(g1.relative_abundance, 30.0);
        assert_eq!(g1.strain, Some(stats(98.0, 1.0)));

        profile.add_lineage("d__B;p__P;t__G1", 5.0, 5.0, stats(96.0, 4.0));
        let g1 = profile.get("d__B|p__P|t__G1").unwrap();
        assert_eq!(g1.relative_abundance, 35.0);
        assert_eq!(g1.strain, Some(stats(96.0, 4.0)));
    }

    #[test]
    fn test_empty_rank_is_unknown() {
        let mut profile = SampleProfile::new();
        profile.add_lineage("d__B;;g__X;t__G", 1.0, 1.0, stats(95.0, 1.0));
        assert!(profile.get("d__B|UNKNOWN").is_some());
        assert!(profile.get("d__B|UNKNOWN|g__X|t__G").is_some());
    }

    #[test]
    fn test_sorted_descending_within_depth() {
        let mut profile = SampleProfile::new();
        profile.add_lineage("d__A;t__1", 1.0, 1.0, stats(95.0, 1.0));
        profile.add_lineage("d__B;t__2", 7.0, 1.0, stats(95.0, 1.0));
        profile.add_lineage("d__C;t__3", 3.0, 1.0, stats(95.0, 1.0));
        profile.add_lineage("d__D;t__4", 3.0, 1.0, stats(95.0, 1.0));

        let order: Vec<&str> = profile.sorted_clades().iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![
                "d__B", "d__C", "d__D", "d__A", "d__B|t__2", "d__C|t__3", "d__D|t__4", "d__A|t__1"
            ]
        );
    }

    #[test]
    fn test_ancestor_contains_descendants() {
        let mut profile = SampleProfile::new();
        profile.add_lineage("d__B;p__P;t__G1", 12.5, 1.0, stats(95.0, 1.0));
        profile.add_lineage("d__B;p__Q;t__G2", 7.5, 1.0, stats(95.0, 1.0));
        let root = profile.get("d__B").unwrap().relative_abundance;
        for (clade, record) in profile.sorted_clades() {
            if clade.starts_with("d__B") {
                assert!(root >= record.relative_abundance);
            }
        }
        assert_eq!(root, 20.0);
    }

    #[test]
    fn test_profile_sample_with_unresolved_rows() {
        let mut taxonomy = TaxonomyMap::new();
        taxonomy.insert("TEST123", "d__Bacteria;p__Proteobacteria", None);
        let rows = vec![
            row("s.fq", "TEST123.fna", 60.0, 50.0, 98.5),
            row("s.fq", "db/missing.fna", 40.0, 50.0, 96.0),
        ];

        let profile = profile_sample(&taxonomy, "s.fq", &rows);
        assert_eq!(profile.unresolved(), 1);
        assert!(profile.get("d__Bacteria|p__Proteobacteria|t__TEST123").is_some());
        let placeholder = profile
            .get("NO_TAXONOMY|t__missing.fna:contig1")
            .unwrap();
        assert_eq!(placeholder.relative_abundance, 40.0);
        assert_eq!(placeholder.strain.unwrap().ani, 96.0);
    }

    #[test]
    fn test_read_results_groups_samples() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_results(
            tmp.path(),
            "b.fq\tg1.fna\t60\t50\t98.5\t3.2\tc1 x\n\
             a.fq\tg2.fna\t100\t100\t97\t1.0\tc2\n\
             b.fq\tg3.fna\t40\t50\t96.1\t0.5\tc3\n",
        );

        let table = read_results(&path).unwrap();
        let samples: Vec<&String> = table.samples.keys().collect();
        assert_eq!(samples, vec!["a.fq", "b.fq"]);
        let b = &table.samples["b.fq"];
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].genome_file, "g1.fna");
        assert_eq!(b[0].contig_name, "c1 x");
        assert_eq!(b[0].taxonomic_abundance, 60.0);
        assert_eq!(b[0].coverage, 3.2);
        assert_eq!(b[1].genome_file, "g3.fna");
    }

    #[test]
    fn test_true_cov_fallback_and_extra_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("old.tsv");
        std::fs::write(
            &path,
            "Sample_file\tGenome_file\tTaxonomic_abundance\tSequence_abundance\tAdjusted_ANI\tTrue_cov\tContig_name\n\
             s.fq\tg.fna\t100\t100\t99\t4.5\tname\twith tab\n",
        )
        .unwrap();
        let table = read_results(&path).unwrap();
        let row = &table.samples["s.fq"][0];
        assert_eq!(row.coverage, 4.5);
        assert_eq!(row.contig_name, "name");
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.tsv");
        std::fs::write(
            &path,
            "Sample_file\tGenome_file\tTaxonomic_abundance\tEff_cov\tContig_name\ns\tg\t1\t1\tc\n",
        )
        .unwrap();
        let err = read_results(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedResultRow { line: 1, .. }));
    }

    #[test]
    fn test_short_row_and_bad_number() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_results(tmp.path(), "s.fq\tg.fna\t1\n");
        assert!(matches!(
            read_results(&path).unwrap_err(),
            Error::MalformedResultRow { line: 2, .. }
        ));

        let path = write_results(tmp.path(), "s.fq\tg.fna\tabc\t1\t99\t1\tc\n");
        assert!(matches!(
            read_results(&path).unwrap_err(),
            Error::MalformedResultRow { line: 2, .. }
        ));
    }

    #[test]
    fn test_unreadable_results() {
        let err = read_results("/no/such/results.tsv").unwrap_err();
        assert!(matches!(err, Error::ResultsUnreadable { .. }));
    }
}
