//! Configuration handling for the LocalBlast CLI
//!
//! Supports loading configuration from localblast.toml files with CLI argument overrides.

use anyhow::{Result, Context};
use localblast_core::{ReportFormat, ReportLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "localblast.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub blast: BlastConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory for query and report files of each search
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Delete job files once the report has been read
    #[serde(default = "default_true")]
    pub cleanup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastConfig {
    /// Directory holding the BLAST+ binaries; PATH is searched when unset
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,

    /// Expectation value threshold
    #[serde(default)]
    pub evalue: Option<f64>,

    /// Maximum number of aligned sequences to keep
    #[serde(default)]
    pub max_target_seqs: Option<u32>,

    /// Threads passed to -num_threads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Additional arguments appended to every search
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report format requested by `run` ("tabular" or "json")
    #[serde(default)]
    pub format: ReportFormat,
    /// Tabular column layout, in BLAST -outfmt specifier syntax
    #[serde(default)]
    pub columns: ReportLayout,
}

// Default value functions
fn default_working_dir() -> PathBuf { std::env::temp_dir().join("localblast") }
fn default_true() -> bool { true }
fn default_threads() -> usize { num_cpus::get() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            cleanup: true,
        }
    }
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            evalue: None,
            max_target_seqs: None,
            threads: default_threads(),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Example configuration with every optional setting filled in
    pub fn example() -> Self {
        let mut config = Self::default();
        config.blast.bin_dir = Some(PathBuf::from("/opt/ncbi-blast/bin"));
        config.blast.evalue = Some(10.0);
        config.blast.max_target_seqs = Some(500);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.general.cleanup);
        assert!(config.blast.bin_dir.is_none());
        assert!(config.blast.threads >= 1);
        assert_eq!(config.report.columns, ReportLayout::default());
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.general.cleanup = false;
        config.blast.evalue = Some(1e-5);
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(config.general.working_dir, loaded_config.general.working_dir);
        assert!(!loaded_config.general.cleanup);
        assert_eq!(loaded_config.blast.evalue, Some(1e-5));
        assert_eq!(config.report.columns, loaded_config.report.columns);

        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str(
            "[blast]\nbin_dir = \"/usr/local/ncbi/bin\"\n\n[report]\ncolumns = \"6 std qlen slen\"\n",
        )?;
        assert_eq!(config.blast.bin_dir, Some(PathBuf::from("/usr/local/ncbi/bin")));
        assert!(config.general.cleanup);
        assert_eq!(config.report.columns.columns().len(), 14);
        assert_eq!(config.report.format, ReportFormat::Tabular);

        let config: Config = toml::from_str("[report]\nformat = \"json\"\n")?;
        assert_eq!(config.report.format, ReportFormat::Json);
        assert_eq!(config.report.columns, ReportLayout::default());
        Ok(())
    }

    #[test]
    fn test_invalid_columns_rejected() {
        let result: Result<Config, _> = toml::from_str("[report]\ncolumns = \"qseqid sseqid\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example().to_toml()?;
        assert!(example.contains("[general]"));
        assert!(example.contains("[blast]"));
        assert!(example.contains("[report]"));
        assert!(example.contains("bin_dir"));
        assert!(example.contains("format = \"tabular\""));
        Ok(())
    }
}
