use serde::{Deserialize, Serialize};

use crate::coverage::{AxisCoverage, CoverageTracker};
use crate::error::LocationResult;
use crate::span::{SeqPos, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl From<bool> for Strand {
    fn from(forward: bool) -> Self {
        if forward {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

/// One high-scoring segment pair (HSP) of a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPair {
    /// 1-based rank within the hit.
    pub index: usize,
    pub bit_score: f64,
    pub score: i64,
    pub evalue: f64,
    pub identity: i64,
    pub positive: i64,
    pub gaps: i64,
    pub query_from: SeqPos,
    pub query_to: SeqPos,
    pub hit_from: SeqPos,
    pub hit_to: SeqPos,
    pub align_len: i64,
    pub query_seq: Option<String>,
    pub hit_seq: Option<String>,
    pub midline: Option<String>,
}

impl SegmentPair {
    pub fn new(index: usize, query_from: SeqPos, query_to: SeqPos, hit_from: SeqPos, hit_to: SeqPos) -> Self {
        Self {
            index,
            bit_score: 0.0,
            score: 0,
            evalue: 0.0,
            identity: 0,
            positive: 0,
            gaps: 0,
            query_from,
            query_to,
            hit_from,
            hit_to,
            align_len: 0,
            query_seq: None,
            hit_seq: None,
            midline: None,
        }
    }

    pub fn query_span(&self) -> Span {
        Span::new(self.query_from, self.query_to)
    }

    pub fn hit_span(&self) -> Span {
        Span::new(self.hit_from, self.hit_to)
    }

    pub fn query_width(&self) -> SeqPos {
        self.query_span().len()
    }

    /// blastn reports minus-strand hits with `hit_from > hit_to`.
    pub fn hit_strand(&self) -> Strand {
        Strand::from(self.hit_from <= self.hit_to)
    }

    pub fn identity_ratio(&self) -> f64 {
        if self.align_len == 0 {
            0.0
        } else {
            self.identity as f64 / self.align_len as f64
        }
    }

    /// Score band used for colouring alignment tracks: 0 (< 40) up to 4 (>= 200).
    pub fn bit_score_level(&self) -> u8 {
        match self.bit_score {
            s if s < 40.0 => 0,
            s if s < 50.0 => 1,
            s if s < 80.0 => 2,
            s if s < 200.0 => 3,
            _ => 4,
        }
    }

    /// Both aligned sequences as a two-record FASTA block, if the report
    /// carried them.
    pub fn to_fasta(&self) -> Option<String> {
        let query_seq = self.query_seq.as_deref()?;
        let hit_seq = self.hit_seq.as_deref()?;
        Some(format!(
            ">Query:{}..{}\n{}\n>Hit:{}..{}\n{}",
            self.query_from, self.query_to, query_seq, self.hit_from, self.hit_to, hit_seq
        ))
    }

    /// Pairwise alignment in BLAST's text layout: query row, midline (when the
    /// report has one) and subject row, each sequence row framed by its
    /// coordinates.
    pub fn alignment_block(&self) -> Option<String> {
        let query_seq = self.query_seq.as_deref()?;
        let hit_seq = self.hit_seq.as_deref()?;
        let width = self.query_from.to_string().len().max(self.hit_from.to_string().len());

        let mut block = format!("Query  {:<width$}  {}  {}\n", self.query_from, query_seq, self.query_to);
        if let Some(midline) = &self.midline {
            block.push_str(&format!("       {:<width$}  {}\n", "", midline));
        }
        block.push_str(&format!("Sbjct  {:<width$}  {}  {}", self.hit_from, hit_seq, self.hit_to));
        Some(block)
    }
}

/// A database sequence matched by the query, with all of its segment pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// 1-based rank within the search.
    pub index: usize,
    pub id: String,
    pub accession: Option<String>,
    pub title: Option<String>,
    /// Subject sequence length, when the report includes it.
    pub length: Option<SeqPos>,
    pub segments: Vec<SegmentPair>,
}

impl Hit {
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            accession: None,
            title: None,
            length: None,
            segments: Vec::new(),
        }
    }

    pub fn segment(&self, index: usize) -> Option<&SegmentPair> {
        index.checked_sub(1).and_then(|i| self.segments.get(i))
    }

    /// Scores and coverage of this hit against a query of `query_length`.
    pub fn summarize(&self, query_length: Option<SeqPos>) -> LocationResult<HitSummary> {
        let mut query_cover = CoverageTracker::new();
        let mut hit_cover = CoverageTracker::new();
        let mut novel = Vec::with_capacity(self.segments.len());
        let mut max_bit_score = f64::MIN;
        let mut min_evalue = f64::MAX;

        for segment in &self.segments {
            novel.push(query_cover.add(segment.query_from, segment.query_to));
            hit_cover.add(segment.hit_from, segment.hit_to);
            max_bit_score = max_bit_score.max(segment.bit_score);
            min_evalue = min_evalue.min(segment.evalue);
        }

        Ok(HitSummary {
            max_bit_score,
            min_evalue,
            query: query_cover.summary(query_length)?,
            hit: hit_cover.summary(self.length)?,
            novel,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSummary {
    pub max_bit_score: f64,
    pub min_evalue: f64,
    pub query: AxisCoverage,
    pub hit: AxisCoverage,
    /// Per segment, whether it extended query coverage when it was added.
    pub novel: Vec<bool>,
}

impl HitSummary {
    pub fn query_cover(&self) -> Option<f64> {
        self.query.ratio
    }

    pub fn hit_cover(&self) -> Option<f64> {
        self.hit.ratio
    }
}

/// All hits reported for one query sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Search {
    pub query_id: String,
    pub query_title: Option<String>,
    pub query_length: Option<SeqPos>,
    /// Diagnostic BLAST attaches to the search, e.g. "No hits found".
    pub message: Option<String>,
    pub hits: Vec<Hit>,
}

impl Search {
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            query_title: None,
            query_length: None,
            message: None,
            hits: Vec::new(),
        }
    }

    pub fn hit(&self, index: usize) -> Option<&Hit> {
        index.checked_sub(1).and_then(|i| self.hits.get(i))
    }

    pub fn previous_hit(&self, hit: &Hit) -> Option<&Hit> {
        hit.index.checked_sub(1).and_then(|i| self.hit(i))
    }

    pub fn next_hit(&self, hit: &Hit) -> Option<&Hit> {
        self.hit(hit.index + 1)
    }

    pub fn segment_count(&self) -> usize {
        self.hits.iter().map(|hit| hit.segments.len()).sum()
    }

    pub fn summaries(&self) -> LocationResult<Vec<HitSummary>> {
        self.hits
            .iter()
            .map(|hit| hit.summarize(self.query_length))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: usize, q: (SeqPos, SeqPos), h: (SeqPos, SeqPos), bit_score: f64, evalue: f64) -> SegmentPair {
        let mut pair = SegmentPair::new(index, q.0, q.1, h.0, h.1);
        pair.bit_score = bit_score;
        pair.evalue = evalue;
        pair
    }

    #[test]
    fn test_bit_score_level() {
        let mut pair = SegmentPair::new(1, 1, 10, 1, 10);
        for (score, level) in [(10.0, 0), (40.0, 1), (49.9, 1), (50.0, 2), (120.0, 3), (200.0, 4)] {
            pair.bit_score = score;
            assert_eq!(pair.bit_score_level(), level, "bit score {}", score);
        }
    }

    #[test]
    fn test_identity_ratio_and_width() {
        let mut pair = SegmentPair::new(1, 20, 11, 5, 14);
        assert_eq!(pair.identity_ratio(), 0.0);
        pair.identity = 9;
        pair.align_len = 10;
        assert_eq!(pair.identity_ratio(), 0.9);
        assert_eq!(pair.query_width(), 10);
        assert_eq!(pair.hit_strand(), Strand::Forward);
        assert_eq!(SegmentPair::new(1, 1, 10, 30, 21).hit_strand(), Strand::Reverse);
    }

    #[test]
    fn test_to_fasta() {
        let mut pair = SegmentPair::new(1, 3, 6, 10, 13);
        assert_eq!(pair.to_fasta(), None);
        pair.query_seq = Some("MKVL".to_string());
        pair.hit_seq = Some("MKIL".to_string());
        assert_eq!(pair.to_fasta().unwrap(), ">Query:3..6\nMKVL\n>Hit:10..13\nMKIL");
    }

    #[test]
    fn test_alignment_block() {
        let mut pair = SegmentPair::new(1, 3, 6, 110, 113);
        assert_eq!(pair.alignment_block(), None);
        pair.query_seq = Some("MKVL".to_string());
        pair.hit_seq = Some("MKIL".to_string());
        assert_eq!(pair.alignment_block().unwrap(), "Query  3    MKVL  6\nSbjct  110  MKIL  113");

        pair.midline = Some("MK+L".to_string());
        let block = pair.alignment_block().unwrap();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "            MK+L");
        assert_eq!(lines[0].find("MKVL"), lines[1].find("MK+L"));
        assert_eq!(lines[2].find("MKIL"), lines[1].find("MK+L"));
    }

    #[test]
    fn test_summarize_hit() {
        let mut hit = Hit::new(1, "sp|P69905|HBA_HUMAN");
        hit.length = Some(200);
        hit.segments = vec![
            segment(1, (1, 50), (101, 150), 95.5, 1e-20),
            segment(2, (10, 40), (110, 140), 41.0, 1e-3),
            segment(3, (61, 100), (1, 40), 60.2, 1e-8),
        ];

        let summary = hit.summarize(Some(300)).unwrap();
        assert_eq!(summary.max_bit_score, 95.5);
        assert_eq!(summary.min_evalue, 1e-20);
        assert_eq!(summary.query.covered, 90);
        assert_eq!(summary.query_cover(), Some(0.3));
        assert_eq!(summary.hit.covered, 90);
        assert_eq!(summary.hit_cover(), Some(0.45));
        assert_eq!(summary.query.from, Some(1));
        assert_eq!(summary.query.to, Some(100));
        assert_eq!(summary.novel, vec![true, false, true]);
    }

    #[test]
    fn test_hit_navigation() {
        let mut search = Search::new("query1");
        search.hits = vec![Hit::new(1, "a"), Hit::new(2, "b"), Hit::new(3, "c")];

        let first = search.hit(1).unwrap();
        assert_eq!(search.previous_hit(first), None);
        assert_eq!(search.next_hit(first).unwrap().id, "b");
        let last = search.hit(3).unwrap();
        assert_eq!(search.next_hit(last), None);
        assert_eq!(search.previous_hit(last).unwrap().id, "b");
        assert!(search.hit(0).is_none());
    }
}
