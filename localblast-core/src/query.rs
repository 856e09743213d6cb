//! Query sequence input.
//!
//! Only the first FASTA record of a file is searched; its header line becomes
//! the job title.

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::SeqPos;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Query contains no sequence")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySequence {
    pub title: Option<String>,
    /// Residues with line breaks removed.
    pub sequence: String,
}

impl QuerySequence {
    /// Parses pasted text. Text starting with a `>` header is read as FASTA;
    /// anything else is taken as a bare sequence.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('>') {
            return Self::parse_reader(trimmed.as_bytes());
        }

        let sequence: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if sequence.is_empty() {
            return Err(QueryError::Empty.into());
        }
        Ok(Self { title: None, sequence })
    }

    /// Reads the first record of a FASTA file, gzip-compressed when the name
    /// ends in `.gz`.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let query = if path.to_string_lossy().ends_with(".gz") {
            let file = File::open(path)
                .with_context(|| format!("Failed to open query: {}", path.display()))?;
            Self::parse_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            parse_fastx_file(path)
                .map_err(|e| anyhow::Error::from(QueryError::Parse(e.to_string())))
                .and_then(Self::first_record)
        };
        query.with_context(|| format!("Invalid query file: {}", path.display()))
    }

    /// Reads the first record of FASTA data from any readable source
    pub fn parse_reader<R: Read + Send>(reader: R) -> Result<Self> {
        let fastx_reader = parse_fastx_reader(reader).map_err(|e| QueryError::Parse(e.to_string()))?;
        Self::first_record(fastx_reader)
    }

    fn first_record(mut reader: Box<dyn FastxReader + '_>) -> Result<Self> {
        let query = match reader.next() {
            Some(record) => {
                let record = record.map_err(|e| QueryError::Parse(e.to_string()))?;
                let title = String::from_utf8_lossy(record.id()).trim().to_string();
                QuerySequence {
                    title: (!title.is_empty()).then_some(title),
                    sequence: String::from_utf8_lossy(&record.seq())
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect(),
                }
            }
            None => return Err(QueryError::Empty.into()),
        };

        if query.sequence.is_empty() {
            return Err(QueryError::Empty.into());
        }
        if reader.next().is_some() {
            log::debug!("Ignoring records after the first in query input");
        }

        Ok(query)
    }

    pub fn len(&self) -> SeqPos {
        self.sequence.len() as SeqPos
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Writes a single-record FASTA file, titled `fallback_title` when the
    /// query has no header.
    pub fn write_fasta<P: AsRef<Path>>(&self, path: P, fallback_title: &str) -> Result<()> {
        let mut file = fs::File::create(path.as_ref())
            .with_context(|| format!("Failed to create query file: {}", path.as_ref().display()))?;
        let title = self.title.as_deref().unwrap_or(fallback_title);
        writeln!(file, ">{}", title)?;
        for chunk in self.sequence.as_bytes().chunks(60) {
            file.write_all(chunk)?;
            writeln!(file)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_first_record_only() {
        let query = QuerySequence::parse(">sp|P69905 Hemoglobin alpha\nMVLSPADKTN\nVKAAWGKVGA\n>second\nMKKK\n").unwrap();
        assert_eq!(query.title.as_deref(), Some("sp|P69905 Hemoglobin alpha"));
        assert_eq!(query.sequence, "MVLSPADKTNVKAAWGKVGA");
        assert_eq!(query.len(), 20);
    }

    #[test]
    fn test_parse_bare_sequence() {
        let query = QuerySequence::parse("acgt acgt\nacgt\n").unwrap();
        assert_eq!(query.title, None);
        assert_eq!(query.sequence, "acgtacgtacgt");
    }

    #[test]
    fn test_parse_empty() {
        assert!(QuerySequence::parse(">only header\n").is_err());
        assert!(QuerySequence::parse("").is_err());
        assert!(QuerySequence::parse(" \n\t\n").is_err());
    }

    #[test]
    fn test_write_fasta_roundtrip() -> Result<()> {
        let query = QuerySequence::parse(&"A".repeat(130))?;
        let file = NamedTempFile::new()?;
        query.write_fasta(file.path(), "blastp #1")?;

        let text = fs::read_to_string(file.path())?;
        assert!(text.starts_with(">blastp #1\n"));
        assert_eq!(text.lines().count(), 4);

        let back = QuerySequence::read_file(file.path())?;
        assert_eq!(back.title.as_deref(), Some("blastp #1"));
        assert_eq!(back.sequence, query.sequence);
        Ok(())
    }

    #[test]
    fn test_read_gzipped_query() -> Result<()> {
        let file = tempfile::Builder::new().suffix(".fa.gz").tempfile()?;
        {
            let mut encoder = GzEncoder::new(file.reopen()?, Compression::default());
            write!(encoder, ">q1 kinase fragment\nMKVL\nAGHE\n>q2\nMMMM\n")?;
            encoder.finish()?;
        }

        let query = QuerySequence::read_file(file.path())?;
        assert_eq!(query.title.as_deref(), Some("q1 kinase fragment"));
        assert_eq!(query.sequence, "MKVLAGHE");
        Ok(())
    }

    #[test]
    fn test_read_missing_file() {
        assert!(QuerySequence::read_file("/nonexistent/query.fasta").is_err());
    }
}
