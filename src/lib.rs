#![allow(non_snake_case)]

pub mod error;
pub mod params;

pub mod align;
pub mod context;
pub mod genome;
pub mod index;
pub mod io;
pub mod mapq;
pub mod reads;
pub mod stats;

use log::info;

use crate::genome::Genome;
use crate::index::GenomeIndex;
use crate::params::{Parameters, RunMode};

/// Top-level dispatcher. Called from `main()` after CLI parsing.
pub fn run(params: &Parameters) -> anyhow::Result<()> {
    params.validate()?;

    info!("ruSNAP v{}", env!("CARGO_PKG_VERSION"));
    info!("runMode: {}", params.run_mode);

    match params.run_mode {
        RunMode::BuildIndex => build_index(params),
        RunMode::Single | RunMode::Paired => {
            context::run_alignment(params)?;
            Ok(())
        }
    }
}

fn build_index(params: &Parameters) -> anyhow::Result<()> {
    info!("indexDir: {}", params.index_dir.display());
    info!(
        "genomeFastaFiles: {:?}",
        params
            .genome_fasta_files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
    );
    info!("seedLen: {}", params.seed_len);

    let genome = Genome::from_fasta(&params.genome_fasta_files)?;
    let index = GenomeIndex::build(genome, params.seed_len)?;
    index.write(&params.index_dir)?;

    info!("Index build complete!");
    Ok(())
}
