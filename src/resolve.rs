//! Mapping of sylph's genome file / contig name fields onto metadata accessions.
//!
//! Databases are sketched from very different sources (NCBI assemblies named
//! `GCF_..._ASM..._genomic.fna.gz`, IMG/VR contigs named `UViG|...`, plain
//! MAG fasta files), so a row is matched by trying an ordered list of
//! candidate keys until one is present in the taxonomy.

use crate::taxonomy::{TaxonomyMap, STRAIN_TAG};
use crate::utils::trim_file_path;

/// Lineage assigned to rows whose identifiers match no metadata entry.
pub const NO_TAXONOMY: &str = "NO_TAXONOMY";

/// Fasta extensions cut off the genome key, tried in this order.
const FASTA_EXTENSIONS: &[&str] = &[".fa", ".fasta", ".fna"];

/// Accession candidates derived from one result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers<'a> {
    pub genome: &'a str,
    pub contig: &'a str,
}

/// `path/GCF_000123_ASM456_genomic.fna` -> `GCF_000123`.
pub fn genome_file_to_gcf_acc(file_name: &str) -> &str {
    let base = trim_file_path(file_name);
    let marker = if file_name.contains("ASM") {
        "_ASM"
    } else {
        "_genomic"
    };
    base.split(marker).next().unwrap_or(base)
}

/// `IMGVR_UViG_123|other_info` -> `IMGVR_UViG_123`.
pub fn contig_to_imgvr_acc(contig_name: &str) -> &str {
    let first = contig_name.split(' ').next().unwrap_or(contig_name);
    first.split('|').next().unwrap_or(first)
}

/// First whitespace-delimited token of a fasta header.
pub fn trim_contig_name(contig_name: &str) -> &str {
    contig_name.split_whitespace().next().unwrap_or("")
}

impl<'a> Identifiers<'a> {
    /// Accession-shaped identifiers (assembly accession, IMG/VR contig id).
    pub fn accession_form(genome_file: &'a str, contig_name: &'a str) -> Self {
        Self {
            genome: genome_file_to_gcf_acc(genome_file),
            contig: contig_to_imgvr_acc(contig_name),
        }
    }

    /// File-shaped identifiers (basename, first header token).
    pub fn file_form(genome_file: &'a str, contig_name: &'a str) -> Self {
        Self {
            genome: trim_file_path(genome_file),
            contig: trim_contig_name(contig_name),
        }
    }
}

type Candidate = fn(&Identifiers) -> Option<String>;

fn genome_key(ids: &Identifiers) -> Option<String> {
    Some(ids.genome.to_string())
}

fn gzipped_genome_key(ids: &Identifiers) -> Option<String> {
    Some(format!("{}.gz", ids.genome))
}

fn contig_key(ids: &Identifiers) -> Option<String> {
    Some(ids.contig.to_string())
}

fn truncate_extension(ids: &Identifiers, extension: &str) -> Option<String> {
    ids.genome
        .find(extension)
        .map(|pos| ids.genome[..pos].to_string())
}

fn without_fa(ids: &Identifiers) -> Option<String> {
    truncate_extension(ids, FASTA_EXTENSIONS[0])
}

fn without_fasta(ids: &Identifiers) -> Option<String> {
    truncate_extension(ids, FASTA_EXTENSIONS[1])
}

fn without_fna(ids: &Identifiers) -> Option<String> {
    truncate_extension(ids, FASTA_EXTENSIONS[2])
}

/// Keys taken from the identifiers as they are.
const DIRECT: &[Candidate] = &[genome_key, gzipped_genome_key, contig_key];

/// Genome keys with a fasta extension cut off.
const TRUNCATED: &[Candidate] = &[without_fa, without_fasta, without_fna];

/// Stages of the lookup. Every form is tried within a stage before the next stage.
const STAGES: &[&[Candidate]] = &[DIRECT, TRUNCATED];

/// Keys tried for one row, in lookup order: direct keys of the accession
/// form then the file form, then truncated genome keys of both forms.
pub fn candidate_keys(genome_file: &str, contig_name: &str) -> Vec<String> {
    let forms = [
        Identifiers::accession_form(genome_file, contig_name),
        Identifiers::file_form(genome_file, contig_name),
    ];
    STAGES
        .iter()
        .flat_map(|stage| {
            forms.iter().flat_map(move |ids| {
                stage.iter().filter_map(move |candidate| candidate(ids))
            })
        })
        .collect()
}

/// Finds the lineage of a result row; the first candidate key present wins.
pub fn resolve_lineage<'t>(
    taxonomy: &'t TaxonomyMap,
    genome_file: &str,
    contig_name: &str,
) -> Option<&'t str> {
    candidate_keys(genome_file, contig_name)
        .iter()
        .find_map(|key| taxonomy.lineage(key))
}

/// Lineage for a row nothing matched: `NO_TAXONOMY;t__<genome>:<contig>`.
pub fn placeholder_lineage(genome_file: &str, contig_name: &str) -> String {
    let ids = Identifiers::file_form(genome_file, contig_name);
    format!("{};{}{}:{}", NO_TAXONOMY, STRAIN_TAG, ids.genome, ids.contig)
}
