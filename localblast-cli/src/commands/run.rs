//! Run command implementation - search a query against a local database

use anyhow::{Context, Result};
use localblast_core::{BlastJob, BlastParams, BlastProgram, BlastRunner, QuerySequence, ReportFormat};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::CliError;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    program: BlastProgram,
    db: PathBuf,
    query: PathBuf,
    evalue: Option<f64>,
    max_target_seqs: Option<u32>,
    format: Option<ReportFormat>,
    out: Option<PathBuf>,
    keep: bool,
    json: bool,
) -> Result<()> {
    log::info!("Starting {} search", program);
    log::info!("Database: {}", db.display());
    log::info!("Query file: {}", query.display());

    if !query.exists() {
        return Err(CliError::file_not_found(query).into());
    }

    let sequence = QuerySequence::read_file(&query)?;
    log::info!(
        "Query {} has {} residues",
        sequence.title.as_deref().unwrap_or("(untitled)"),
        sequence.len()
    );

    let mut params = build_params(config, program, db, query, evalue, max_target_seqs);
    params.format = format.unwrap_or(params.format);
    log::debug!("Requesting {} report", params.format);
    let layout = &config.report.columns;
    let runner = BlastRunner::new(config.blast.bin_dir.clone());

    let cleanup = config.general.cleanup && !keep;
    let job = BlastJob::new(&config.general.working_dir, cleanup)?;
    log::debug!("Job {} in {}", job.id(), config.general.working_dir.display());

    let run = runner
        .run_query(&params, layout, &sequence, &job)
        .with_context(|| format!("{} search failed", program))?;

    if let Some(out) = &out {
        std::fs::copy(&run.report_file, out)
            .with_context(|| format!("Failed to copy report to {}", out.display()))?;
        log::info!("Report written to: {}", out.display());
    }
    if !cleanup {
        log::info!("Job files kept in: {}", config.general.working_dir.display());
    }

    log::info!(
        "Search finished in {:.2}s: {} hits, {} segment pairs",
        run.runtime_seconds,
        run.stats.total_hits,
        run.stats.total_segments
    );

    super::print_searches(&run.searches, json)
}

/// Search parameters from configuration, with command-line overrides.
fn build_params(
    config: &Config,
    program: BlastProgram,
    db: PathBuf,
    query: PathBuf,
    evalue: Option<f64>,
    max_target_seqs: Option<u32>,
) -> BlastParams {
    let mut params = BlastParams::new(program, db, query);
    params.evalue = evalue.or(config.blast.evalue);
    params.max_target_seqs = max_target_seqs.or(config.blast.max_target_seqs);
    params.threads = Some(config.blast.threads);
    params.format = config.report.format;
    params.extra_args = config.blast.extra_args.clone();
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        config.blast.evalue = Some(10.0);
        config.blast.max_target_seqs = Some(500);
        config.blast.threads = 2;
        config.blast.extra_args = vec!["-seg".to_string(), "no".to_string()];
        config.report.format = ReportFormat::Json;

        let params = build_params(
            &config,
            BlastProgram::Blastp,
            PathBuf::from("db"),
            PathBuf::from("q.fasta"),
            Some(1e-5),
            None,
        );

        assert_eq!(params.evalue, Some(1e-5));
        assert_eq!(params.max_target_seqs, Some(500));
        assert_eq!(params.threads, Some(2));
        assert_eq!(params.extra_args, vec!["-seg", "no"]);
        assert_eq!(params.format, ReportFormat::Json);
    }

    #[test]
    fn test_missing_query_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(
            &Config::default(),
            BlastProgram::Blastn,
            dir.path().join("db"),
            dir.path().join("missing.fasta"),
            None,
            None,
            None,
            None,
            false,
            false,
        )
        .unwrap_err();

        assert!(matches!(
            CliError::from_anyhow(&err),
            CliError::FileNotFound { .. }
        ));
    }
}
