//! BLAST structured JSON report reader (`-outfmt 15`).
//!
//! Unlike tabular output this carries the alignment midline, the query title,
//! every hit description and the per-search message BLAST emits when nothing
//! matched.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;

use crate::report::{Column, ReportError};
use crate::span::SeqPos;
use crate::types::{Hit, Search, SegmentPair};

#[derive(Debug, Deserialize)]
struct JsonOutput {
    #[serde(rename = "BlastOutput2")]
    reports: Vec<JsonReportEntry>,
}

#[derive(Debug, Deserialize)]
struct JsonReportEntry {
    report: JsonReport,
}

#[derive(Debug, Deserialize)]
struct JsonReport {
    #[serde(default)]
    program: Option<String>,
    results: JsonResults,
}

#[derive(Debug, Deserialize)]
struct JsonResults {
    search: JsonSearch,
}

#[derive(Debug, Deserialize)]
struct JsonSearch {
    query_id: String,
    #[serde(default)]
    query_title: Option<String>,
    #[serde(default)]
    query_len: Option<SeqPos>,
    #[serde(default)]
    hits: Vec<JsonHit>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonHit {
    num: usize,
    #[serde(default)]
    description: Vec<JsonDescription>,
    #[serde(default)]
    len: Option<SeqPos>,
    #[serde(default)]
    hsps: Vec<JsonHsp>,
}

#[derive(Debug, Deserialize)]
struct JsonDescription {
    id: String,
    #[serde(default)]
    accession: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonHsp {
    num: usize,
    bit_score: f64,
    #[serde(default)]
    score: i64,
    evalue: f64,
    #[serde(default)]
    identity: i64,
    #[serde(default)]
    positive: i64,
    #[serde(default)]
    gaps: i64,
    query_from: SeqPos,
    query_to: SeqPos,
    hit_from: SeqPos,
    hit_to: SeqPos,
    #[serde(default)]
    align_len: i64,
    #[serde(default)]
    qseq: Option<String>,
    #[serde(default)]
    hseq: Option<String>,
    #[serde(default)]
    midline: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<JsonHsp> for SegmentPair {
    fn from(hsp: JsonHsp) -> Self {
        let mut segment = SegmentPair::new(hsp.num, hsp.query_from, hsp.query_to, hsp.hit_from, hsp.hit_to);
        segment.bit_score = hsp.bit_score;
        segment.score = hsp.score;
        segment.evalue = hsp.evalue;
        segment.identity = hsp.identity;
        segment.positive = hsp.positive;
        segment.gaps = hsp.gaps;
        segment.align_len = hsp.align_len;
        segment.query_seq = hsp.qseq;
        segment.hit_seq = hsp.hseq;
        segment.midline = hsp.midline;
        segment
    }
}

impl TryFrom<JsonHit> for Hit {
    type Error = ReportError;

    fn try_from(json: JsonHit) -> Result<Self, Self::Error> {
        // BLAST lists every database entry sharing the sequence; the first names the hit.
        let description = json
            .description
            .into_iter()
            .next()
            .ok_or(ReportError::EmptyField(Column::SubjectSeqId))?;
        if description.id.trim().is_empty() {
            return Err(ReportError::EmptyField(Column::SubjectSeqId));
        }

        let mut hit = Hit::new(json.num, description.id.trim());
        hit.accession = non_blank(description.accession);
        hit.title = non_blank(description.title);
        hit.length = json.len;
        hit.segments = json.hsps.into_iter().map(SegmentPair::from).collect();
        Ok(hit)
    }
}

/// Reader for BLAST single-file JSON reports
pub struct JsonReportParser;

impl JsonReportParser {
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Search>> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open report: {}", path.as_ref().display()))?;
        let path_str = path.as_ref().to_string_lossy();

        if path_str.ends_with(".gz") {
            Self::parse_reader(BufReader::new(GzDecoder::new(file)))
        } else {
            Self::parse_reader(BufReader::new(file))
        }
    }

    /// Parse report data from any readable source
    pub fn parse_reader<R: Read>(reader: R) -> Result<Vec<Search>> {
        let output: JsonOutput = serde_json::from_reader(reader).map_err(ReportError::Json)?;

        let mut searches = Vec::with_capacity(output.reports.len());
        for entry in output.reports {
            let JsonSearch {
                query_id,
                query_title,
                query_len,
                hits,
                message,
            } = entry.report.results.search;

            let mut search = Search::new(query_id);
            search.query_title = non_blank(query_title);
            search.query_length = query_len;
            search.message = non_blank(message);
            search.hits = hits
                .into_iter()
                .map(Hit::try_from)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Invalid hit in search {}", search.query_id))?;

            log::debug!(
                "{} search {}: {} hits",
                entry.report.program.as_deref().unwrap_or("BLAST"),
                search.query_id,
                search.hits.len()
            );
            searches.push(search);
        }

        Ok(searches)
    }

    pub fn parse_str(text: &str) -> Result<Vec<Search>> {
        Self::parse_reader(text.as_bytes())
    }
}
