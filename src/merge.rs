//! Joins one column of several `.sylphmpa` reports into a clade x sample table.

use crate::errors::{Error, Result};
use crate::report::NOT_AVAILABLE;
use crate::utils::{format_float, open_file};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const CLADE_NAME: &str = "clade_name";

/// Report column carried into the merged table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeColumn {
    #[default]
    RelativeAbundance,
    SequenceAbundance,
    Ani,
    Coverage,
}

impl MergeColumn {
    /// Header of the column inside a report.
    pub fn header_name(&self) -> &'static str {
        match self {
            MergeColumn::RelativeAbundance => "relative_abundance",
            MergeColumn::SequenceAbundance => "sequence_abundance",
            MergeColumn::Ani => "ANI (if strain-level)",
            MergeColumn::Coverage => "Coverage (if strain-level)",
        }
    }
}

/// One report reduced to the selected column.
#[derive(Debug)]
pub struct ReportColumn {
    pub sample: String,
    pub values: HashMap<String, f64>,
}

fn malformed(path: &Path, reason: String) -> Error {
    Error::MalformedReport {
        path: path.to_path_buf(),
        reason,
    }
}

/// Reads the sample name and one column of a report
///
/// # Arguments
///
/// * `path` - A `.sylphmpa` file
/// * `column` - Column to keep
///
/// # Returns
///
/// The sample name (second field of the first line) and clade -> value,
/// with `NA` read as 0
pub fn read_report_column<P: AsRef<Path>>(path: P, column: MergeColumn) -> Result<ReportColumn> {
    let path = path.as_ref();
    let reader = BufReader::new(open_file(path)?);
    let mut lines = reader.lines();

    let first = lines
        .next()
        .transpose()?
        .ok_or_else(|| malformed(path, "empty report".to_string()))?;
    let sample = first
        .split('\t')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| malformed(path, "first line has no sample name".to_string()))?
        .to_string();

    let mut header: Option<(usize, usize)> = None;
    let mut values = HashMap::new();

    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();

        let (clade_idx, value_idx) = match header {
            Some(indices) => indices,
            None => {
                let find = |name: &str| fields.iter().position(|field| *field == name);
                let clade_idx = find(CLADE_NAME)
                    .ok_or_else(|| malformed(path, format!("missing column {}", CLADE_NAME)))?;
                let value_idx = find(column.header_name()).ok_or_else(|| {
                    malformed(path, format!("missing column {}", column.header_name()))
                })?;
                header = Some((clade_idx, value_idx));
                continue;
            }
        };

        let line_no = idx + 2;
        let clade = fields.get(clade_idx).ok_or_else(|| {
            malformed(path, format!("line {} has no {}", line_no, CLADE_NAME))
        })?;
        let raw = fields.get(value_idx).copied().unwrap_or(NOT_AVAILABLE);
        let value = if raw == NOT_AVAILABLE || raw.is_empty() {
            0.0
        } else {
            raw.parse::<f64>().map_err(|_| {
                malformed(path, format!("line {}: {:?} is not a number", line_no, raw))
            })?
        };
        values.insert(clade.to_string(), value);
    }

    if header.is_none() {
        return Err(malformed(path, format!("missing column {}", CLADE_NAME)));
    }

    Ok(ReportColumn { sample, values })
}

/// Outer join of several report columns, clades in lexicographic order.
#[derive(Debug, Default)]
pub struct MergedTable {
    pub samples: Vec<String>,
    pub rows: BTreeMap<String, Vec<f64>>,
}

/// Merges the chosen column of every report
///
/// # Arguments
///
/// * `files` - Reports in output column order
/// * `column` - Column to merge
///
/// # Returns
///
/// The joined table with gaps filled by 0, or `DuplicateSample` when two
/// reports carry the same sample name
pub fn merge_reports<P: AsRef<Path>>(files: &[P], column: MergeColumn) -> Result<MergedTable> {
    let mut table = MergedTable::default();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for (pos, file) in files.iter().enumerate() {
        let path = file.as_ref();
        let report = read_report_column(path, column)?;
        if seen.contains_key(&report.sample) {
            return Err(Error::DuplicateSample {
                sample: report.sample,
                path: path.to_path_buf(),
            });
        }
        seen.insert(report.sample.clone(), path.to_path_buf());
        table.samples.push(report.sample);

        for (clade, value) in report.values {
            let row = table
                .rows
                .entry(clade)
                .or_insert_with(|| vec![0.0; files.len()]);
            row[pos] = value;
        }
    }

    Ok(table)
}

impl MergedTable {
    /// Writes the table as TSV with a `clade_name` header column.
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write!(writer, "{}", CLADE_NAME)?;
        for sample in &self.samples {
            write!(writer, "\t{}", sample)?;
        }
        writeln!(writer)?;

        for (clade, values) in &self.rows {
            write!(writer, "{}", clade)?;
            for value in values {
                write!(writer, "\t{}", format_float(*value))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_tsv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &str = "clade_name\trelative_abundance\tsequence_abundance\tANI (if strain-level)\tCoverage (if strain-level)";

    fn write_report(dir: &Path, name: &str, sample: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut content = format!("#SampleID\t{}\tTaxonomies_used:['GTDB_r220']\n{}\n", sample, COLUMNS);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_outer_join_sorted_with_zero_fill() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_report(
            tmp.path(),
            "a.sylphmpa",
            "s_a",
            &[
                "d__Bacteria\t100.0\t90.0\tNA\tNA",
                "d__Bacteria|t__G1\t100.0\t90.0\t98.0\t1.5",
            ],
        );
        let b = write_report(
            tmp.path(),
            "b.sylphmpa",
            "s_b",
            &[
                "d__Bacteria\t60.0\t50.0\tNA\tNA",
                "d__Archaea\t40.0\t50.0\tNA\tNA",
            ],
        );

        let table = merge_reports(&[a.clone(), b.clone()], MergeColumn::RelativeAbundance).unwrap();
        let mut out = Vec::new();
        table.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "clade_name\ts_a\ts_b\n\
d__Archaea\t0.0\t40.0\n\
d__Bacteria\t100.0\t60.0\n\
d__Bacteria|t__G1\t100.0\t0.0\n"
        );

        let ani = merge_reports(&[a, b], MergeColumn::Ani).unwrap();
        assert_eq!(ani.rows["d__Bacteria"], vec![0.0, 0.0]);
        assert_eq!(ani.rows["d__Bacteria|t__G1"], vec![98.0, 0.0]);
    }

    #[test]
    fn test_coverage_column() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_report(
            tmp.path(),
            "a.sylphmpa",
            "s_a",
            &["d__B|t__G\t100.0\t100.0\t97.0\t2.25"],
        );
        let column = read_report_column(&a, MergeColumn::Coverage).unwrap();
        assert_eq!(column.sample, "s_a");
        assert_eq!(column.values["d__B|t__G"], 2.25);
    }

    #[test]
    fn test_duplicate_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_report(tmp.path(), "a.sylphmpa", "same", &["d__B\t1.0\t1.0\tNA\tNA"]);
        let b = write_report(tmp.path(), "b.sylphmpa", "same", &["d__B\t1.0\t1.0\tNA\tNA"]);
        assert!(matches!(
            merge_reports(&[a, b], MergeColumn::RelativeAbundance).unwrap_err(),
            Error::DuplicateSample { .. }
        ));
    }

    #[test]
    fn test_pavian_report_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("p.sylphmpa");
        std::fs::write(
            &path,
            "#mpa_v3_sylphmock#SampleID\ts\tTaxonomies_used:[]\n#clade_name\tplaceholder\trelative_abundance\tplaceholder2\nd__B\t0\t100.0\t\n",
        )
        .unwrap();
        assert!(matches!(
            read_report_column(&path, MergeColumn::RelativeAbundance).unwrap_err(),
            Error::MalformedReport { .. }
        ));
    }
}
