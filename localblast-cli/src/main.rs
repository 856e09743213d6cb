use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use anyhow::Result;

mod config;
mod commands;
mod error;

use config::Config;
use error::{print_error_and_exit, CliError};
use commands::segments::SegmentView;
use localblast_core::{BlastProgram, DbType, ReportFormat, SeqPos};

#[derive(Parser)]
#[command(name = "localblast")]
#[command(about = "LocalBlast - local BLAST+ searches with hit coverage")]
#[command(version)]
#[command(long_about = "
LocalBlast runs BLAST+ against local databases and summarizes every hit by how
much of the query and of the subject its segment pairs cover.

Examples:
  localblast makedb --input proteins.fasta --dbtype prot
  localblast run --program blastp --db proteins --query query.fasta
  localblast summary --report hits.tsv --columns '6 std qlen slen'
  localblast run --program blastn --db genomes --query q.fa --format json --out hits.json
  localblast segments --report hits.json --hit 2 --alignment
  localblast config --example > localblast.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a query sequence against a BLAST database
    Run {
        /// BLAST program to run
        #[arg(short, long, default_value = "blastp")]
        program: ProgramType,

        /// Database path (as given to makeblastdb -out)
        #[arg(long, required = true)]
        db: PathBuf,

        /// Query FASTA file; only the first record is searched
        #[arg(long, required = true)]
        query: PathBuf,

        /// Expectation value threshold (overrides configuration)
        #[arg(long)]
        evalue: Option<f64>,

        /// Maximum number of aligned sequences (overrides configuration)
        #[arg(long)]
        max_target_seqs: Option<u32>,

        /// Report format to request (overrides configuration)
        #[arg(long)]
        format: Option<FormatType>,

        /// Copy the report to this path
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Keep the job directory instead of deleting it
        #[arg(long)]
        keep: bool,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize hits of an existing report
    Summary {
        /// Tabular (-outfmt 6 or 7) or JSON (-outfmt 15) report, optionally gzip-compressed
        #[arg(short, long, required = true)]
        report: PathBuf,

        /// Report format (defaults to json for .json files, else the configured format)
        #[arg(long)]
        format: Option<FormatType>,

        /// Column layout of the report (defaults to the configured layout)
        #[arg(long)]
        columns: Option<String>,

        /// Query length, for reports without a qlen column
        #[arg(long)]
        query_length: Option<SeqPos>,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the segment pairs of one hit
    Segments {
        /// Tabular (-outfmt 6 or 7) or JSON (-outfmt 15) report, optionally gzip-compressed
        #[arg(short, long, required = true)]
        report: PathBuf,

        /// Report format (defaults to json for .json files, else the configured format)
        #[arg(long)]
        format: Option<FormatType>,

        /// 1-based hit rank
        #[arg(long, default_value = "1")]
        hit: usize,

        /// Column layout of the report (defaults to the configured layout)
        #[arg(long)]
        columns: Option<String>,

        /// Query id, when the report holds several searches
        #[arg(long)]
        query_id: Option<String>,

        /// Print aligned sequences as FASTA
        #[arg(long, conflicts_with = "alignment")]
        fasta: bool,

        /// Print pairwise alignments with their midlines
        #[arg(long)]
        alignment: bool,
    },

    /// Build a BLAST database from a FASTA file
    Makedb {
        /// Input FASTA file
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// Molecule type of the sequences
        #[arg(long, default_value = "nucl")]
        dbtype: DbKind,

        /// Database path (defaults to the input path without extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Print an example configuration file instead
        #[arg(long)]
        example: bool,

        /// Write the configuration to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ProgramType {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
}

impl From<ProgramType> for BlastProgram {
    fn from(program: ProgramType) -> Self {
        match program {
            ProgramType::Blastn => BlastProgram::Blastn,
            ProgramType::Blastp => BlastProgram::Blastp,
            ProgramType::Blastx => BlastProgram::Blastx,
            ProgramType::Tblastn => BlastProgram::Tblastn,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatType {
    /// -outfmt 6 with the configured columns
    Tabular,
    /// -outfmt 15, with midlines and search messages
    Json,
}

impl From<FormatType> for ReportFormat {
    fn from(format: FormatType) -> Self {
        match format {
            FormatType::Tabular => ReportFormat::Tabular,
            FormatType::Json => ReportFormat::Json,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DbKind {
    Nucl,
    Prot,
}

impl From<DbKind> for DbType {
    fn from(kind: DbKind) -> Self {
        match kind {
            DbKind::Nucl => DbType::Nucleotide,
            DbKind::Prot => DbType::Protein,
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            program,
            db,
            query,
            evalue,
            max_target_seqs,
            format,
            out,
            keep,
            json,
        } => {
            commands::run::execute(
                &config,
                program.into(),
                db,
                query,
                evalue,
                max_target_seqs,
                format.map(Into::into),
                out,
                keep,
                json,
            )?;
        }

        Commands::Summary {
            report,
            format,
            columns,
            query_length,
            json,
        } => {
            commands::summary::execute(&config, report, format.map(Into::into), columns, query_length, json)?;
        }

        Commands::Segments {
            report,
            format,
            hit,
            columns,
            query_id,
            fasta,
            alignment,
        } => {
            let view = if fasta {
                SegmentView::Fasta
            } else if alignment {
                SegmentView::Alignment
            } else {
                SegmentView::Table
            };
            commands::segments::execute(&config, report, format.map(Into::into), hit, columns, query_id, view)?;
        }

        Commands::Makedb { input, dbtype, out } => {
            commands::makedb::execute(&config, input, dbtype.into(), out)?;
        }

        Commands::Config { example, output } => {
            let config = if example {
                Config::example()
            } else {
                config
            };
            match output {
                Some(path) => {
                    config.save_to_file(&path)?;
                    log::info!("Configuration written to: {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = execute(cli) {
        log::debug!("Command failed: {:?}", err);
        print_error_and_exit(&CliError::from_anyhow(&err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "localblast", "run", "--program", "blastn", "--db", "genomes", "--query", "q.fasta",
            "--evalue", "1e-5", "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run { program, db, evalue, keep, .. } => {
                assert_eq!(BlastProgram::from(program), BlastProgram::Blastn);
                assert_eq!(db, PathBuf::from("genomes"));
                assert_eq!(evalue, Some(1e-5));
                assert!(!keep);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_makedb_defaults() {
        let cli = Cli::try_parse_from(["localblast", "makedb", "--input", "seqs.fa"]).unwrap();
        match cli.command {
            Commands::Makedb { dbtype, out, .. } => {
                assert_eq!(DbType::from(dbtype), DbType::Nucleotide);
                assert!(out.is_none());
            }
            _ => panic!("expected makedb command"),
        }
    }

    #[test]
    fn test_parse_segments_alignment() {
        let cli = Cli::try_parse_from([
            "localblast", "segments", "--report", "hits.json", "--hit", "2", "--alignment", "--format", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Segments { hit, alignment, fasta, format, .. } => {
                assert_eq!(hit, 2);
                assert!(alignment);
                assert!(!fasta);
                assert_eq!(format.map(ReportFormat::from), Some(ReportFormat::Json));
            }
            _ => panic!("expected segments command"),
        }

        assert!(Cli::try_parse_from([
            "localblast", "segments", "--report", "hits.json", "--alignment", "--fasta",
        ])
        .is_err());
    }

    #[test]
    fn test_run_requires_db() {
        assert!(Cli::try_parse_from(["localblast", "run", "--query", "q.fasta"]).is_err());
    }
}
