use crate::errors::{Error, Result};
use crate::profile::{clade_depth, AbundanceRecord, SampleProfile, UNKNOWN_RANK};
use crate::taxonomy::{TaxonomyMap, STRAIN_TAG};
use crate::utils::{format_float, trim_file_path};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// File name suffix of every profile written.
pub const REPORT_SUFFIX: &str = ".sylphmpa";

/// Leading marker Pavian uses to recognise MetaPhlAn-like input.
pub const PAVIAN_MARKER: &str = "#mpa_v3_sylphmock";

/// Written in ANI/coverage/host columns of clades above strain level.
pub const NOT_AVAILABLE: &str = "NA";

const DEFAULT_COLUMNS: &str =
    "clade_name\trelative_abundance\tsequence_abundance\tANI (if strain-level)\tCoverage (if strain-level)";
const VIRUS_HOST_COLUMN: &str = "Virus_host (if viral)";
const PAVIAN_COLUMNS: &str = "#clade_name\tplaceholder\trelative_abundance\tplaceholder2";

/// Layout of the report body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Default,
    /// Default columns plus the host annotation of viral genomes.
    VirusHosts,
    /// MetaPhlAn v3 lookalike for the Pavian viewer.
    Pavian,
}

/// Report file stem of a sample
///
/// # Arguments
///
/// * `sample` - Sample identifier as written by sylph (usually a path)
/// * `add_folder_information` - Keep directories, joined with `_`
///
/// # Returns
///
/// The basename of the sample, or the whole path with `/` replaced by `_`
pub fn output_name(sample: &str, add_folder_information: bool) -> String {
    if add_folder_information {
        sample.split('/').collect::<Vec<_>>().join("_")
    } else {
        trim_file_path(sample).to_string()
    }
}

/// `0|0|0` style placeholder taxid for a clade of `depth` ranks.
pub fn pavian_taxid(depth: usize) -> String {
    let mut taxid = String::from("0");
    for _ in 1..depth {
        taxid.push_str("|0");
    }
    taxid
}

/// Host lineage of the genome behind a strain-level clade, empty ranks as `UNKNOWN`.
pub fn virus_host(taxonomy: &TaxonomyMap, clade: &str) -> String {
    let accession = clade.rsplit(STRAIN_TAG).next().unwrap_or(clade);
    match taxonomy.annotation(accession) {
        Some(host) => host
            .split(';')
            .map(|rank| if rank.is_empty() { UNKNOWN_RANK } else { rank })
            .collect::<Vec<_>>()
            .join(";"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Prints one clade line of a report
///
/// # Arguments
///
/// * `writer` - The report being written
/// * `mode` - Column layout
/// * `clade` - Pipe-joined clade key
/// * `record` - Abundances of the clade
/// * `taxonomy` - Source of viral host annotations
///
/// # Returns
///
/// An io::Result indicating success or failure of the write operation
fn print_sylphmpa_report_line<W: Write>(
    writer: &mut W,
    mode: OutputMode,
    clade: &str,
    record: &AbundanceRecord,
    taxonomy: &TaxonomyMap,
) -> io::Result<()> {
    let relative = format_float(record.relative_abundance);
    if mode == OutputMode::Pavian {
        return writeln!(
            writer,
            "{}\t{}\t{}\t",
            clade,
            pavian_taxid(clade_depth(clade)),
            relative
        );
    }

    write!(
        writer,
        "{}\t{}\t{}",
        clade,
        relative,
        format_float(record.sequence_abundance)
    )?;

    match (&record.strain, mode) {
        (Some(stats), OutputMode::VirusHosts) => writeln!(
            writer,
            "\t{}\t{}\t{}",
            format_float(stats.ani),
            format_float(stats.coverage),
            virus_host(taxonomy, clade)
        ),
        (Some(stats), _) => writeln!(
            writer,
            "\t{}\t{}",
            format_float(stats.ani),
            format_float(stats.coverage)
        ),
        (None, OutputMode::VirusHosts) => writeln!(
            writer,
            "\t{na}\t{na}\t{na}",
            na = NOT_AVAILABLE
        ),
        (None, _) => writeln!(writer, "\t{na}\t{na}", na = NOT_AVAILABLE),
    }
}

/// Writes the complete report of one sample
///
/// # Arguments
///
/// * `writer` - Destination of the report
/// * `sample` - Sample identifier for the header line
/// * `taxonomy` - Loaded metadata, for the header and host annotations
/// * `profile` - Aggregated abundances of the sample
/// * `mode` - Column layout
///
/// # Returns
///
/// An io::Result indicating success or failure of the operation
pub fn report_sylphmpa<W: Write>(
    writer: &mut W,
    sample: &str,
    taxonomy: &TaxonomyMap,
    profile: &SampleProfile,
    mode: OutputMode,
) -> io::Result<()> {
    if mode == OutputMode::Pavian {
        write!(writer, "{}", PAVIAN_MARKER)?;
    }
    writeln!(
        writer,
        "#SampleID\t{}\tTaxonomies_used:{}",
        sample,
        taxonomy.sources_label()
    )?;

    match mode {
        OutputMode::Default => writeln!(writer, "{}", DEFAULT_COLUMNS)?,
        OutputMode::VirusHosts => writeln!(writer, "{}\t{}", DEFAULT_COLUMNS, VIRUS_HOST_COLUMN)?,
        OutputMode::Pavian => writeln!(writer, "{}", PAVIAN_COLUMNS)?,
    }

    for (clade, record) in profile.sorted_clades() {
        print_sylphmpa_report_line(writer, mode, clade, record, taxonomy)?;
    }
    Ok(())
}

/// Places sample reports on disk and refuses to clobber them unless told to.
#[derive(Debug)]
pub struct ReportWriter {
    output_prefix: String,
    add_folder_information: bool,
    overwrite: bool,
    mode: OutputMode,
    claimed: HashSet<PathBuf>,
}

impl ReportWriter {
    pub fn new(
        output_prefix: &str,
        add_folder_information: bool,
        overwrite: bool,
        mode: OutputMode,
    ) -> Self {
        Self {
            output_prefix: output_prefix.to_string(),
            add_folder_information,
            overwrite,
            mode,
            claimed: HashSet::new(),
        }
    }

    /// `<prefix><sample name>.sylphmpa`; the prefix is prepended verbatim.
    pub fn output_path(&self, sample: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}{}{}",
            self.output_prefix,
            output_name(sample, self.add_folder_information),
            REPORT_SUFFIX
        ))
    }

    /// Reserves the report path of `sample` for this run.
    pub fn claim(&mut self, sample: &str) -> Result<PathBuf> {
        let path = self.output_path(sample);
        if !self.overwrite {
            if self.claimed.contains(&path) {
                return Err(Error::OutputCollision {
                    path,
                    sample: sample.to_string(),
                    reason: "is shared with another sample",
                });
            }
            if path.exists() {
                return Err(Error::OutputCollision {
                    path,
                    sample: sample.to_string(),
                    reason: "already exists",
                });
            }
        }
        self.claimed.insert(path.clone());
        Ok(path)
    }

    /// Claims the sample's path and writes its report there.
    pub fn write_sample(
        &mut self,
        sample: &str,
        taxonomy: &TaxonomyMap,
        profile: &SampleProfile,
    ) -> Result<PathBuf> {
        let path = self.claim(sample)?;
        log::info!("Writing output to: {} ...", path.display());

        let mut writer = BufWriter::new(File::create(&path)?);
        report_sylphmpa(&mut writer, sample, taxonomy, profile, self.mode)?;
        writer.flush()?;
        Ok(path)
    }
}
