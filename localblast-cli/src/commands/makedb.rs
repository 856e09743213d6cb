//! Makedb command implementation - build a BLAST database from FASTA

use anyhow::{Context, Result};
use localblast_core::{BlastRunner, DbType};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::CliError;

pub fn execute(config: &Config, input: PathBuf, db_type: DbType, out: Option<PathBuf>) -> Result<()> {
    log::info!("Building {} database from {}", db_type.as_arg(), input.display());

    if !input.exists() {
        return Err(CliError::file_not_found(input).into());
    }

    let runner = BlastRunner::new(config.blast.bin_dir.clone());
    let db = runner
        .make_blast_db(&input, db_type, out.as_deref())
        .context("Failed to build BLAST database")?;

    log::info!("Database written to: {}", db.display());
    println!("{}", db.display());

    Ok(())
}
