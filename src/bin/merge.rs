use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use sylph_tax::merge::{merge_reports, MergeColumn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Column {
    #[value(name = "relative_abundance")]
    RelativeAbundance,
    #[value(name = "sequence_abundance")]
    SequenceAbundance,
    #[value(name = "ANI")]
    Ani,
    #[value(name = "Coverage")]
    Coverage,
}

impl From<Column> for MergeColumn {
    fn from(item: Column) -> Self {
        match item {
            Column::RelativeAbundance => MergeColumn::RelativeAbundance,
            Column::SequenceAbundance => MergeColumn::SequenceAbundance,
            Column::Ani => MergeColumn::Ani,
            Column::Coverage => MergeColumn::Coverage,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Merge multiple sylphmpa reports into a single TSV table"
)]
pub struct Args {
    /// .sylphmpa files to merge
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Column to merge
    #[arg(long, value_enum, default_value = "relative_abundance")]
    pub column: Column,

    /// Output file
    #[arg(short, long, required = true)]
    pub output: PathBuf,
}

pub fn run(args: Args) -> Result<()> {
    let table = merge_reports(&args.files, args.column.into())
        .context("Merging sylphmpa reports")?;
    table
        .write_to(&args.output)
        .with_context(|| format!("Writing {}", args.output.display()))?;
    log::info!("Merged data written to {}", args.output.display());
    Ok(())
}

#[allow(dead_code)]
fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
