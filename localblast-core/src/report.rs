//! BLAST tabular report reader
//!
//! Tabular output (`-outfmt 6` / `7`) is one tab-separated line per segment
//! pair. The column set is chosen by the `-outfmt` specifier string, so the
//! reader is driven by a [`ReportLayout`] naming the columns in order.
//! All rows sharing a query and subject form one hit, wherever they appear
//! in the file.
//!
//! [`ReportFormat`] picks between this reader and the JSON one in
//! [`crate::json_report`].

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::json_report::JsonReportParser;
use crate::span::SeqPos;
use crate::types::{Hit, Search, SegmentPair};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid report line: insufficient fields (expected {expected}, got {actual})")]
    InsufficientFields { expected: usize, actual: usize },
    #[error("Invalid {column} value: {value}")]
    InvalidNumber { column: Column, value: String },
    #[error("Empty {0} field")]
    EmptyField(Column),
    #[error("Unknown column specifier: {0}")]
    UnknownColumn(String),
    #[error("Report layout is missing required column: {0}")]
    MissingColumn(Column),
    #[error("Invalid JSON report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown report format: {0}")]
    UnknownFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A BLAST tabular format specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    QuerySeqId,
    QueryLength,
    SubjectSeqId,
    SubjectAccession,
    SubjectTitle,
    SubjectLength,
    QueryStart,
    QueryEnd,
    SubjectStart,
    SubjectEnd,
    EValue,
    BitScore,
    Score,
    AlignLength,
    Identical,
    PercentIdentity,
    Positive,
    Mismatch,
    GapOpen,
    Gaps,
    QuerySeq,
    SubjectSeq,
}

const REQUIRED_COLUMNS: [Column; 6] = [
    Column::QuerySeqId,
    Column::SubjectSeqId,
    Column::QueryStart,
    Column::QueryEnd,
    Column::SubjectStart,
    Column::SubjectEnd,
];

impl Column {
    pub fn specifier(&self) -> &'static str {
        match self {
            Column::QuerySeqId => "qseqid",
            Column::QueryLength => "qlen",
            Column::SubjectSeqId => "sseqid",
            Column::SubjectAccession => "sacc",
            Column::SubjectTitle => "stitle",
            Column::SubjectLength => "slen",
            Column::QueryStart => "qstart",
            Column::QueryEnd => "qend",
            Column::SubjectStart => "sstart",
            Column::SubjectEnd => "send",
            Column::EValue => "evalue",
            Column::BitScore => "bitscore",
            Column::Score => "score",
            Column::AlignLength => "length",
            Column::Identical => "nident",
            Column::PercentIdentity => "pident",
            Column::Positive => "positive",
            Column::Mismatch => "mismatch",
            Column::GapOpen => "gapopen",
            Column::Gaps => "gaps",
            Column::QuerySeq => "qseq",
            Column::SubjectSeq => "sseq",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.specifier())
    }
}

impl FromStr for Column {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column = match s {
            "qseqid" => Column::QuerySeqId,
            "qlen" => Column::QueryLength,
            "sseqid" => Column::SubjectSeqId,
            "sacc" => Column::SubjectAccession,
            "stitle" => Column::SubjectTitle,
            "slen" => Column::SubjectLength,
            "qstart" => Column::QueryStart,
            "qend" => Column::QueryEnd,
            "sstart" => Column::SubjectStart,
            "send" => Column::SubjectEnd,
            "evalue" => Column::EValue,
            "bitscore" => Column::BitScore,
            "score" => Column::Score,
            "length" => Column::AlignLength,
            "nident" => Column::Identical,
            "pident" => Column::PercentIdentity,
            "positive" => Column::Positive,
            "mismatch" => Column::Mismatch,
            "gapopen" => Column::GapOpen,
            "gaps" => Column::Gaps,
            "qseq" => Column::QuerySeq,
            "sseq" => Column::SubjectSeq,
            other => return Err(ReportError::UnknownColumn(other.to_string())),
        };
        Ok(column)
    }
}

/// Ordered column set of a tabular report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportLayout {
    columns: Vec<Column>,
}

impl ReportLayout {
    pub fn new(columns: Vec<Column>) -> Result<Self, ReportError> {
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains(c)) {
            return Err(ReportError::MissingColumn(*missing));
        }
        Ok(Self { columns })
    }

    /// BLAST's `std` column set: no sequence lengths, so coverage ratios
    /// are unavailable with it.
    pub fn standard() -> Self {
        Self {
            columns: vec![
                Column::QuerySeqId,
                Column::SubjectSeqId,
                Column::PercentIdentity,
                Column::AlignLength,
                Column::Mismatch,
                Column::GapOpen,
                Column::QueryStart,
                Column::QueryEnd,
                Column::SubjectStart,
                Column::SubjectEnd,
                Column::EValue,
                Column::BitScore,
            ],
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn contains(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// The `-outfmt` argument producing this layout.
    pub fn to_outfmt(&self) -> String {
        let mut outfmt = String::from("6");
        for column in &self.columns {
            outfmt.push(' ');
            outfmt.push_str(column.specifier());
        }
        outfmt
    }
}

/// Columns requested by the runner: everything the hit table needs.
impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            columns: vec![
                Column::QuerySeqId,
                Column::QueryLength,
                Column::SubjectSeqId,
                Column::SubjectAccession,
                Column::SubjectLength,
                Column::QueryStart,
                Column::QueryEnd,
                Column::SubjectStart,
                Column::SubjectEnd,
                Column::EValue,
                Column::BitScore,
                Column::Score,
                Column::AlignLength,
                Column::Identical,
                Column::Positive,
                Column::Gaps,
                Column::QuerySeq,
                Column::SubjectSeq,
                Column::SubjectTitle,
            ],
        }
    }
}

impl FromStr for ReportLayout {
    type Err = ReportError;

    /// Accepts `"qseqid sseqid ..."`, with an optional leading `6`/`7`
    /// format number and `std` as shorthand for the standard twelve columns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut columns = Vec::new();
        for (i, token) in s.split_whitespace().enumerate() {
            match token {
                "6" | "7" if i == 0 => {}
                "std" => columns.extend(ReportLayout::standard().columns),
                other => columns.push(other.parse()?),
            }
        }
        ReportLayout::new(columns)
    }
}

impl TryFrom<String> for ReportLayout {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReportLayout> for String {
    fn from(layout: ReportLayout) -> Self {
        layout.to_outfmt()
    }
}

/// Output format requested from BLAST and read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `-outfmt 6` with the configured columns.
    #[default]
    Tabular,
    /// `-outfmt 15`, which adds midlines, query titles and search messages.
    Json,
}

impl ReportFormat {
    /// Guesses the format from a file name, ignoring a trailing `.gz`.
    pub fn detect<P: AsRef<Path>>(path: P) -> Self {
        let name = path.as_ref().to_string_lossy().to_lowercase();
        let stem = name.strip_suffix(".gz").unwrap_or(&name);
        if stem.ends_with(".json") {
            ReportFormat::Json
        } else {
            ReportFormat::Tabular
        }
    }

    /// The `-outfmt` argument for this format.
    pub fn outfmt(&self, layout: &ReportLayout) -> String {
        match self {
            ReportFormat::Tabular => layout.to_outfmt(),
            ReportFormat::Json => "15".to_string(),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Tabular => "tsv",
            ReportFormat::Json => "json",
        }
    }

    /// Reads a report file; the layout only applies to tabular reports.
    pub fn read_file<P: AsRef<Path>>(&self, layout: &ReportLayout, path: P) -> Result<Vec<Search>> {
        match self {
            ReportFormat::Tabular => TabularParser::new(layout.clone()).parse_file(path),
            ReportFormat::Json => JsonReportParser::parse_file(path),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Tabular => f.write_str("tabular"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tabular" | "6" | "7" => Ok(ReportFormat::Tabular),
            "json" | "15" => Ok(ReportFormat::Json),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

/// One parsed report line.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub query_id: String,
    pub query_length: Option<SeqPos>,
    pub subject_id: String,
    pub subject_accession: Option<String>,
    pub subject_title: Option<String>,
    pub subject_length: Option<SeqPos>,
    pub segment: SegmentPair,
}

fn parse_number<T: FromStr>(column: Column, value: &str) -> Result<T, ReportError> {
    value.trim().parse::<T>().map_err(|_| ReportError::InvalidNumber {
        column,
        value: value.to_string(),
    })
}

/// Reader for BLAST tabular reports
pub struct TabularParser {
    layout: ReportLayout,
}

impl TabularParser {
    pub fn new(layout: ReportLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// Parse a single report line. The segment index is left at 0; grouping
    /// assigns ranks.
    pub fn parse_line(&self, line: &str) -> Result<ReportRow, ReportError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let expected = self.layout.columns.len();
        if fields.len() < expected {
            return Err(ReportError::InsufficientFields {
                expected,
                actual: fields.len(),
            });
        }

        let mut row = ReportRow {
            query_id: String::new(),
            query_length: None,
            subject_id: String::new(),
            subject_accession: None,
            subject_title: None,
            subject_length: None,
            segment: SegmentPair::new(0, 0, 0, 0, 0),
        };
        let mut percent_identity = None;

        for (&column, &value) in self.layout.columns.iter().zip(fields.iter()) {
            let segment = &mut row.segment;
            match column {
                Column::QuerySeqId => row.query_id = value.trim().to_string(),
                Column::QueryLength => row.query_length = Some(parse_number(column, value)?),
                Column::SubjectSeqId => row.subject_id = value.trim().to_string(),
                Column::SubjectAccession => row.subject_accession = Some(value.trim().to_string()),
                Column::SubjectTitle => row.subject_title = Some(value.trim().to_string()),
                Column::SubjectLength => row.subject_length = Some(parse_number(column, value)?),
                Column::QueryStart => segment.query_from = parse_number(column, value)?,
                Column::QueryEnd => segment.query_to = parse_number(column, value)?,
                Column::SubjectStart => segment.hit_from = parse_number(column, value)?,
                Column::SubjectEnd => segment.hit_to = parse_number(column, value)?,
                Column::EValue => segment.evalue = parse_number(column, value)?,
                Column::BitScore => segment.bit_score = parse_number(column, value)?,
                Column::Score => segment.score = parse_number(column, value)?,
                Column::AlignLength => segment.align_len = parse_number(column, value)?,
                Column::Identical => segment.identity = parse_number(column, value)?,
                Column::PercentIdentity => percent_identity = Some(parse_number::<f64>(column, value)?),
                Column::Positive => segment.positive = parse_number(column, value)?,
                Column::Gaps => segment.gaps = parse_number(column, value)?,
                Column::QuerySeq => segment.query_seq = Some(value.trim().to_string()),
                Column::SubjectSeq => segment.hit_seq = Some(value.trim().to_string()),
                Column::Mismatch | Column::GapOpen => {}
            }
        }

        // `std` layouts carry pident but not nident.
        if let Some(pident) = percent_identity {
            if !self.layout.contains(Column::Identical) {
                row.segment.identity = (pident * row.segment.align_len as f64 / 100.0).round() as i64;
            }
        }

        if row.query_id.is_empty() {
            return Err(ReportError::EmptyField(Column::QuerySeqId));
        }
        if row.subject_id.is_empty() {
            return Err(ReportError::EmptyField(Column::SubjectSeqId));
        }

        Ok(row)
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Search>> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open report: {}", path.as_ref().display()))?;
        let path_str = path.as_ref().to_string_lossy();

        if path_str.ends_with(".gz") {
            let decoder = GzDecoder::new(file);
            self.parse_reader(BufReader::new(decoder))
        } else {
            self.parse_reader(BufReader::new(file))
        }
    }

    /// Parse report data from any BufRead source
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Vec<Search>> {
        let mut rows = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;

            // Skip empty lines and outfmt 7 comment headers
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            match self.parse_line(&line) {
                Ok(row) => rows.push(row),
                Err(e) => return Err(anyhow!("Error parsing line {}: {}", line_num + 1, e)),
            }
        }

        log::debug!("Parsed {} report rows", rows.len());
        Ok(group_rows(rows))
    }
}

/// Groups rows into searches per query and hits per subject, keeping the
/// order in which each first appears.
pub fn group_rows(rows: Vec<ReportRow>) -> Vec<Search> {
    let mut searches: Vec<Search> = Vec::new();
    let mut search_index: HashMap<String, usize> = HashMap::new();
    let mut hit_index: HashMap<(usize, String), usize> = HashMap::new();

    for row in rows {
        let s = *search_index.entry(row.query_id.clone()).or_insert_with(|| {
            searches.push(Search::new(row.query_id.clone()));
            searches.len() - 1
        });
        let search = &mut searches[s];
        if search.query_length.is_none() {
            search.query_length = row.query_length;
        }

        let h = *hit_index.entry((s, row.subject_id.clone())).or_insert_with(|| {
            let mut hit = Hit::new(search.hits.len() + 1, row.subject_id.clone());
            hit.accession = row.subject_accession.clone();
            hit.title = row.subject_title.clone();
            hit.length = row.subject_length;
            search.hits.push(hit);
            search.hits.len() - 1
        });
        let hit = &mut search.hits[h];

        let mut segment = row.segment;
        segment.index = hit.segments.len() + 1;
        hit.segments.push(segment);
    }

    searches
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_searches: usize,
    pub total_hits: usize,
    pub total_segments: usize,
    pub best_evalue: Option<f64>,
    pub best_bit_score: Option<f64>,
}

impl ReportStats {
    pub fn compute(searches: &[Search]) -> Self {
        let segments = searches
            .iter()
            .flat_map(|search| search.hits.iter())
            .flat_map(|hit| hit.segments.iter());

        let mut total_segments = 0;
        let mut best_evalue: Option<f64> = None;
        let mut best_bit_score: Option<f64> = None;
        for segment in segments {
            total_segments += 1;
            best_evalue = Some(best_evalue.map_or(segment.evalue, |e| e.min(segment.evalue)));
            best_bit_score = Some(best_bit_score.map_or(segment.bit_score, |b| b.max(segment.bit_score)));
        }

        ReportStats {
            total_searches: searches.len(),
            total_hits: searches.iter().map(|search| search.hits.len()).sum(),
            total_segments,
            best_evalue,
            best_bit_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const STD_REPORT: &str = "\
# BLASTP 2.15.0+
# Query: query1
# Fields: query acc.ver, subject acc.ver, % identity, alignment length, mismatches, gap opens, q. start, q. end, s. start, s. end, evalue, bit score
query1\tsubjA\t90.00\t50\t5\t0\t1\t50\t101\t150\t1e-20\t95.5
query1\tsubjA\t80.00\t31\t6\t0\t10\t40\t110\t140\t0.001\t41.0
query1\tsubjB\t75.00\t40\t10\t0\t61\t100\t1\t40\t1e-08\t60.2
query2\tsubjA\t100.00\t10\t0\t0\t1\t10\t1\t10\t0.5\t20.1
";

    #[test]
    fn test_layout_from_str() {
        let layout: ReportLayout = "6 qseqid sseqid qstart qend sstart send qlen".parse().unwrap();
        assert_eq!(layout.columns().len(), 7);
        assert!(layout.contains(Column::QueryLength));
        assert_eq!(layout.to_outfmt(), "6 qseqid sseqid qstart qend sstart send qlen");

        let std_layout: ReportLayout = "7 std slen".parse().unwrap();
        assert_eq!(std_layout.columns().len(), 13);
    }

    #[test]
    fn test_layout_rejects_unknown_and_incomplete() {
        assert!(matches!(
            "qseqid bogus".parse::<ReportLayout>(),
            Err(ReportError::UnknownColumn(c)) if c == "bogus"
        ));
        assert!(matches!(
            "qseqid sseqid qstart qend sstart".parse::<ReportLayout>(),
            Err(ReportError::MissingColumn(Column::SubjectEnd))
        ));
    }

    #[test]
    fn test_parse_std_report() {
        let parser = TabularParser::new(ReportLayout::standard());
        let searches = parser.parse_reader(Cursor::new(STD_REPORT)).unwrap();

        assert_eq!(searches.len(), 2);
        let first = &searches[0];
        assert_eq!(first.query_id, "query1");
        assert_eq!(first.query_length, None);
        assert_eq!(first.hits.len(), 2);
        assert_eq!(first.hits[0].id, "subjA");
        assert_eq!(first.hits[0].index, 1);
        assert_eq!(first.hits[0].segments.len(), 2);
        assert_eq!(first.hits[0].segments[1].index, 2);
        assert_eq!(first.hits[0].segments[0].identity, 45);
        assert_eq!(first.hits[1].index, 2);
        assert_eq!(searches[1].hits[0].id, "subjA");
    }

    #[test]
    fn test_parse_line_with_sequences() {
        let layout: ReportLayout = "qseqid qlen sseqid slen qstart qend sstart send qseq sseq".parse().unwrap();
        let parser = TabularParser::new(layout);
        let row = parser.parse_line("q\t300\ts\t200\t5\t8\t20\t17\tMKVL\tMKIL").unwrap();
        assert_eq!(row.query_length, Some(300));
        assert_eq!(row.subject_length, Some(200));
        assert_eq!(row.segment.query_span().len(), 4);
        assert_eq!(row.segment.hit_from, 20);
        assert_eq!(row.segment.hit_to, 17);
        assert_eq!(row.segment.query_seq.as_deref(), Some("MKVL"));
    }

    #[test]
    fn test_parse_line_errors() {
        let parser = TabularParser::new(ReportLayout::standard());
        assert!(matches!(
            parser.parse_line("q\ts\t90.0"),
            Err(ReportError::InsufficientFields { expected: 12, actual: 3 })
        ));
        let err = parser
            .parse_line("q\ts\t90.0\t50\t5\t0\tone\t50\t1\t50\t1e-5\t80")
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid qstart value: one");
        assert!(matches!(
            parser.parse_line("q\t \t90\t50\t5\t0\t1\t50\t1\t50\t1e-5\t80"),
            Err(ReportError::EmptyField(Column::SubjectSeqId))
        ));
    }

    #[test]
    fn test_parse_reader_reports_line_number() {
        let parser = TabularParser::new(ReportLayout::standard());
        let data = "q\ts\t90\t50\t5\t0\t1\t50\t1\t50\t1e-5\t80\nq\ts\tbad\n";
        let err = parser.parse_reader(Cursor::new(data)).unwrap_err();
        assert!(err.to_string().starts_with("Error parsing line 2"));
    }

    #[test]
    fn test_report_stats() {
        let parser = TabularParser::new(ReportLayout::standard());
        let searches = parser.parse_reader(Cursor::new(STD_REPORT)).unwrap();
        let stats = ReportStats::compute(&searches);
        assert_eq!(stats.total_searches, 2);
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.total_segments, 4);
        assert_eq!(stats.best_evalue, Some(1e-20));
        assert_eq!(stats.best_bit_score, Some(95.5));

        let empty = ReportStats::compute(&[]);
        assert_eq!(empty.total_hits, 0);
        assert_eq!(empty.best_evalue, None);
    }

    #[test]
    fn test_interleaved_rows_group_by_subject() {
        let report = "\
q1\tsubjA\t90.00\t10\t1\t0\t1\t10\t1\t10\t1e-5\t30.0
q1\tsubjB\t90.00\t10\t1\t0\t20\t29\t1\t10\t1e-4\t28.0
q2\tsubjA\t90.00\t10\t1\t0\t1\t10\t1\t10\t1e-3\t25.0
q1\tsubjA\t90.00\t10\t1\t0\t40\t49\t30\t39\t1e-2\t22.0
";
        let parser = TabularParser::new(ReportLayout::standard());
        let searches = parser.parse_reader(Cursor::new(report)).unwrap();

        assert_eq!(searches.len(), 2);
        let hits = &searches[0].hits;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "subjA");
        assert_eq!(hits[0].segments.len(), 2);
        assert_eq!(hits[0].segments[1].query_from, 40);
        assert_eq!(hits[0].segments[1].index, 2);
        assert_eq!(hits[1].id, "subjB");
        assert_eq!(searches[1].hits[0].segments.len(), 1);
    }

    #[test]
    fn test_report_format() {
        assert_eq!(ReportFormat::detect("hits.tsv"), ReportFormat::Tabular);
        assert_eq!(ReportFormat::detect("hits.JSON"), ReportFormat::Json);
        assert_eq!(ReportFormat::detect("run/hits.json.gz"), ReportFormat::Json);
        assert_eq!(ReportFormat::detect("hits.gz"), ReportFormat::Tabular);

        let layout = ReportLayout::standard();
        assert_eq!(ReportFormat::Json.outfmt(&layout), "15");
        assert_eq!(ReportFormat::Tabular.outfmt(&layout), layout.to_outfmt());
        assert_eq!(ReportFormat::default().extension(), "tsv");

        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("7".parse::<ReportFormat>().unwrap(), ReportFormat::Tabular);
        assert!(matches!("xml".parse::<ReportFormat>(), Err(ReportError::UnknownFormat(_))));
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }
}
