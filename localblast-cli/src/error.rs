//! Error handling for the LocalBlast CLI

use localblast_core::{BlastError, LocationError, ReportError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for LocalBlast CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid report: {message}")]
    InvalidReport { message: String },

    #[error("External tool error: {tool} - {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    General { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_report<S: Into<String>>(message: S) -> Self {
        Self::InvalidReport { message: message.into() }
    }

    pub fn external_tool<S: Into<String>>(tool: S, message: S) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Classifies an error bubbled up from a command by the first cause the
    /// CLI knows how to give advice for.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let message = format!("{:#}", error);

        for cause in error.chain() {
            if let Some(cli) = cause.downcast_ref::<CliError>() {
                return match cli {
                    CliError::FileNotFound { path } => Self::file_not_found(path.clone()),
                    _ => Self::General { message },
                };
            }
            if let Some(blast) = cause.downcast_ref::<BlastError>() {
                let tool = match blast {
                    BlastError::ToolNotFound { tool, .. }
                    | BlastError::ToolFailed { tool, .. }
                    | BlastError::MissingReport { tool, .. } => tool.clone(),
                };
                return Self::external_tool(tool, message);
            }
            if cause.downcast_ref::<ReportError>().is_some() {
                return Self::invalid_report(message);
            }
            if cause.downcast_ref::<LocationError>().is_some() {
                return Self::validation(message);
            }
            if cause.downcast_ref::<toml::de::Error>().is_some() {
                return Self::config(message);
            }
            if cause.downcast_ref::<std::io::Error>().is_some() {
                return Self::io(message);
            }
        }

        Self::General { message }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::InvalidReport { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that the report was written with -outfmt 6, 7 or 15\n\
                 • Pass --format json for JSON reports not ending in .json\n\
                 • Pass --columns with the same specifiers given to -outfmt\n\
                 • Ensure the file is not truncated"
            );
        }

        CliError::ExternalTool { tool, .. } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Install BLAST+: https://blast.ncbi.nlm.nih.gov/doc/blast-help/downloadblastdata.html\n\
                 • Ensure {} is in your PATH, or set [blast] bin_dir in {}\n\
                 • Check that the database was built with makeblastdb for the right molecule type",
                tool,
                crate::config::DEFAULT_CONFIG_FILE
            ));
        }

        CliError::Config { .. } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check your {} configuration file\n\
                 • Use 'localblast config --example' to generate a sample configuration",
                crate::config::DEFAULT_CONFIG_FILE
            ));
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("report.tsv"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }

    #[test]
    fn test_classify_missing_tool() {
        let err = anyhow::Error::new(BlastError::ToolNotFound {
            tool: "blastp".to_string(),
            searched: "PATH".to_string(),
        })
        .context("Search failed");

        let cli_err = CliError::from_anyhow(&err);
        assert!(matches!(&cli_err, CliError::ExternalTool { tool, .. } if tool == "blastp"));
        assert!(format_error_with_suggestions(&cli_err).contains("Install BLAST+"));
    }

    #[test]
    fn test_classify_report_error() {
        let result: anyhow::Result<()> = Err(ReportError::UnknownColumn("foo".to_string()))
            .context("Invalid --columns");
        let cli_err = CliError::from_anyhow(&result.unwrap_err());
        assert!(matches!(cli_err, CliError::InvalidReport { .. }));
        assert!(cli_err.to_string().contains("Unknown column specifier: foo"));
    }

    #[test]
    fn test_classify_json_report_error() {
        let err = localblast_core::JsonReportParser::parse_str("[").unwrap_err();
        let cli_err = CliError::from_anyhow(&err);
        assert!(matches!(cli_err, CliError::InvalidReport { .. }));
        assert!(format_error_with_suggestions(&cli_err).contains("--format json"));
    }

    #[test]
    fn test_classify_unknown() {
        let cli_err = CliError::from_anyhow(&anyhow::anyhow!("something odd"));
        assert_eq!(cli_err.to_string(), "something odd");
    }
}
