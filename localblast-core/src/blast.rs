//! Invocation of the BLAST+ command-line tools.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;

use crate::query::QuerySequence;
use crate::report::{ReportFormat, ReportLayout, ReportStats};
use crate::types::Search;

#[derive(Debug, Error)]
pub enum BlastError {
    #[error("{tool} not found (searched {searched})")]
    ToolNotFound { tool: String, searched: String },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("{tool} reported success but wrote no report at {path}")]
    MissingReport { tool: String, path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlastProgram {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
}

impl BlastProgram {
    pub fn binary_name(&self) -> &'static str {
        match self {
            BlastProgram::Blastn => "blastn",
            BlastProgram::Blastp => "blastp",
            BlastProgram::Blastx => "blastx",
            BlastProgram::Tblastn => "tblastn",
        }
    }

    /// Database type the program searches against.
    pub fn db_type(&self) -> DbType {
        match self {
            BlastProgram::Blastn | BlastProgram::Tblastn => DbType::Nucleotide,
            BlastProgram::Blastp | BlastProgram::Blastx => DbType::Protein,
        }
    }
}

impl fmt::Display for BlastProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

impl FromStr for BlastProgram {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "blastn" => Ok(BlastProgram::Blastn),
            "blastp" => Ok(BlastProgram::Blastp),
            "blastx" => Ok(BlastProgram::Blastx),
            "tblastn" => Ok(BlastProgram::Tblastn),
            _ => Err(anyhow!(
                "Unknown program: {}. Available programs: blastn, blastp, blastx, tblastn",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbType {
    #[serde(rename = "nucl")]
    Nucleotide,
    #[serde(rename = "prot")]
    Protein,
}

impl DbType {
    pub fn as_arg(&self) -> &'static str {
        match self {
            DbType::Nucleotide => "nucl",
            DbType::Protein => "prot",
        }
    }
}

impl FromStr for DbType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nucl" | "nucleotide" => Ok(DbType::Nucleotide),
            "prot" | "protein" => Ok(DbType::Protein),
            _ => Err(anyhow!("Unknown database type: {} (expected nucl or prot)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastParams {
    pub program: BlastProgram,
    pub db: PathBuf,
    pub query: PathBuf,
    pub evalue: Option<f64>,
    pub max_target_seqs: Option<u32>,
    pub threads: Option<usize>,
    #[serde(default)]
    pub format: ReportFormat,
    pub extra_args: Vec<String>,
}

impl BlastParams {
    pub fn new(program: BlastProgram, db: impl Into<PathBuf>, query: impl Into<PathBuf>) -> Self {
        Self {
            program,
            db: db.into(),
            query: query.into(),
            evalue: None,
            max_target_seqs: None,
            threads: None,
            format: ReportFormat::default(),
            extra_args: Vec::new(),
        }
    }

    pub fn to_args(&self, layout: &ReportLayout, out: &Path) -> Vec<String> {
        let mut args = vec![
            "-db".to_string(),
            self.db.display().to_string(),
            "-query".to_string(),
            self.query.display().to_string(),
            "-out".to_string(),
            out.display().to_string(),
            "-outfmt".to_string(),
            self.format.outfmt(layout),
        ];

        if let Some(evalue) = self.evalue {
            args.push("-evalue".to_string());
            args.push(evalue.to_string());
        }

        if let Some(max_target_seqs) = self.max_target_seqs {
            args.push("-max_target_seqs".to_string());
            args.push(max_target_seqs.to_string());
        }

        if let Some(threads) = self.threads {
            args.push("-num_threads".to_string());
            args.push(threads.to_string());
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Scratch files of one search. With cleanup enabled they live in a
/// temporary directory removed on drop.
pub struct BlastJob {
    id: String,
    dir: PathBuf,
    _temp: Option<TempDir>,
}

impl BlastJob {
    pub fn new(working_dir: &Path, cleanup: bool) -> Result<Self> {
        std::fs::create_dir_all(working_dir).with_context(|| {
            format!("Failed to create working directory: {}", working_dir.display())
        })?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let id = format!("job-{}-{}", std::process::id(), nanos);

        if cleanup {
            let temp = tempfile::Builder::new()
                .prefix("localblast-")
                .tempdir_in(working_dir)?;
            Ok(Self {
                id,
                dir: temp.path().to_path_buf(),
                _temp: Some(temp),
            })
        } else {
            Ok(Self {
                id,
                dir: working_dir.to_path_buf(),
                _temp: None,
            })
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query_path(&self) -> PathBuf {
        self.dir.join(format!("{}.fas", self.id))
    }

    pub fn report_path(&self, format: ReportFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", self.id, format.extension()))
    }
}

#[derive(Debug, Clone)]
pub struct BlastRun {
    pub report_file: PathBuf,
    pub searches: Vec<Search>,
    pub stats: ReportStats,
    pub runtime_seconds: f64,
}

pub struct BlastRunner {
    bin_dir: Option<PathBuf>,
}

impl BlastRunner {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    /// Locates `tool` in the configured directory, falling back to `PATH`.
    pub fn resolve(&self, tool: &str) -> Result<PathBuf, BlastError> {
        if let Some(dir) = &self.bin_dir {
            let candidate = dir.join(format!("{}{}", tool, std::env::consts::EXE_SUFFIX));
            if candidate.is_file() {
                return Ok(candidate);
            }
            log::warn!("{} not found in {}, searching PATH", tool, dir.display());
        }

        which::which(tool).map_err(|_| BlastError::ToolNotFound {
            tool: tool.to_string(),
            searched: match &self.bin_dir {
                Some(dir) => format!("{} and PATH", dir.display()),
                None => "PATH".to_string(),
            },
        })
    }

    pub fn version(&self, program: BlastProgram) -> Result<String> {
        let binary = self.resolve(program.binary_name())?;
        let output = Command::new(binary).arg("-version").output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("unknown").trim().to_string())
    }

    /// Runs a search writing the report to `out`, then reads it back in
    /// `params.format`; `layout` names the columns of tabular output.
    pub fn run(&self, params: &BlastParams, layout: &ReportLayout, out: &Path) -> Result<BlastRun> {
        let tool = params.program.binary_name();
        let binary = self.resolve(tool)?;
        let start_time = Instant::now();

        let mut cmd = Command::new(&binary);
        cmd.args(params.to_args(layout, out));
        log::info!("Running {}: {:?}", tool, cmd);

        let output = cmd
            .output()
            .with_context(|| format!("Failed to start {}", binary.display()))?;
        let runtime_seconds = start_time.elapsed().as_secs_f64();

        if !output.status.success() {
            return Err(BlastError::ToolFailed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        if !out.is_file() {
            return Err(BlastError::MissingReport {
                tool: tool.to_string(),
                path: out.to_path_buf(),
            }
            .into());
        }

        let searches = params.format.read_file(layout, out)?;
        let stats = ReportStats::compute(&searches);
        log::info!(
            "{} finished in {:.2}s: {} hits, {} segment pairs",
            tool,
            runtime_seconds,
            stats.total_hits,
            stats.total_segments
        );

        Ok(BlastRun {
            report_file: out.to_path_buf(),
            searches,
            stats,
            runtime_seconds,
        })
    }

    /// Writes `query` into `job` and searches it. Searches missing a query
    /// length (layouts without `qlen`) take it from the query sequence.
    pub fn run_query(
        &self,
        params: &BlastParams,
        layout: &ReportLayout,
        query: &QuerySequence,
        job: &BlastJob,
    ) -> Result<BlastRun> {
        let query_path = job.query_path();
        query.write_fasta(&query_path, job.id())?;

        let mut params = params.clone();
        params.query = query_path;

        let mut run = self.run(&params, layout, &job.report_path(params.format))?;
        for search in &mut run.searches {
            search.query_length.get_or_insert(query.len());
        }
        Ok(run)
    }

    /// Builds a BLAST database from a FASTA file. Without `output` the
    /// database sits next to the input, named after it minus its extension.
    pub fn make_blast_db(&self, input: &Path, db_type: DbType, output: Option<&Path>) -> Result<PathBuf> {
        let binary = self.resolve("makeblastdb")?;
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_db_path(input));

        let mut cmd = Command::new(&binary);
        cmd.arg("-in")
            .arg(input)
            .arg("-dbtype")
            .arg(db_type.as_arg())
            .arg("-out")
            .arg(&output);
        log::info!("Running makeblastdb: {:?}", cmd);

        let result = cmd
            .output()
            .with_context(|| format!("Failed to start {}", binary.display()))?;
        if !result.status.success() {
            return Err(BlastError::ToolFailed {
                tool: "makeblastdb".to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(output)
    }
}

pub fn default_db_path(input: &Path) -> PathBuf {
    input.with_extension("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_parsing() {
        assert_eq!("BLASTP".parse::<BlastProgram>().unwrap(), BlastProgram::Blastp);
        assert_eq!(BlastProgram::Tblastn.to_string(), "tblastn");
        assert_eq!(BlastProgram::Blastx.db_type(), DbType::Protein);
        assert!("megablast".parse::<BlastProgram>().is_err());
    }

    #[test]
    fn test_db_type_parsing() {
        assert_eq!("prot".parse::<DbType>().unwrap(), DbType::Protein);
        assert_eq!("Nucleotide".parse::<DbType>().unwrap().as_arg(), "nucl");
        assert!("rna".parse::<DbType>().is_err());
    }

    #[test]
    fn test_to_args() {
        let mut params = BlastParams::new(BlastProgram::Blastp, "db/swissprot", "q.fas");
        params.evalue = Some(1e-5);
        params.threads = Some(4);
        params.extra_args = vec!["-seg".to_string(), "no".to_string()];

        let layout: ReportLayout = "qseqid sseqid qstart qend sstart send".parse().unwrap();
        let args = params.to_args(&layout, Path::new("out.tsv"));
        assert_eq!(
            args,
            vec![
                "-db", "db/swissprot", "-query", "q.fas", "-out", "out.tsv",
                "-outfmt", "6 qseqid sseqid qstart qend sstart send",
                "-evalue", "0.00001", "-num_threads", "4", "-seg", "no",
            ]
        );

        params.format = ReportFormat::Json;
        let args = params.to_args(&layout, Path::new("out.json"));
        assert_eq!(args[6..8], ["-outfmt", "15"]);
    }

    #[test]
    fn test_default_db_path() {
        assert_eq!(default_db_path(Path::new("data/proteins.fasta")), PathBuf::from("data/proteins"));
        assert_eq!(default_db_path(Path::new("genome")), PathBuf::from("genome"));
    }

    #[test]
    fn test_job_paths() -> Result<()> {
        let root = tempfile::tempdir()?;
        let job = BlastJob::new(root.path(), true)?;
        let query = job.query_path();
        assert!(query.starts_with(root.path()));
        assert!(query.to_string_lossy().ends_with(".fas"));
        assert_ne!(job.query_path(), job.report_path(ReportFormat::Tabular));
        assert!(job.report_path(ReportFormat::Json).to_string_lossy().ends_with(".json"));

        let dir = query.parent().unwrap().to_path_buf();
        assert!(dir.is_dir());
        drop(job);
        assert!(!dir.exists());
        Ok(())
    }

    #[test]
    fn test_missing_tool() {
        let runner = BlastRunner::new(Some(PathBuf::from("/nonexistent/blast/bin")));
        let err = runner.resolve("localblast-no-such-tool").unwrap_err();
        assert!(matches!(err, BlastError::ToolNotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/blast/bin and PATH"));
    }
}
