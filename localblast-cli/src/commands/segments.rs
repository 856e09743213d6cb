//! Segments command implementation - list the segment pairs of one hit

use anyhow::{anyhow, Result};
use localblast_core::{Hit, HitSummary, ReportFormat, Search};
use std::path::PathBuf;

use crate::config::Config;

/// How the segment pairs of the chosen hit are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentView {
    Table,
    Fasta,
    Alignment,
}

pub fn execute(
    config: &Config,
    report: PathBuf,
    format: Option<ReportFormat>,
    hit_index: usize,
    columns: Option<String>,
    query_id: Option<String>,
    view: SegmentView,
) -> Result<()> {
    let format = super::resolve_format(config, format, &report);
    let layout = super::resolve_layout(config, columns.as_deref())?;
    let searches = super::load_searches(&report, &layout, format)?;
    let search = select_search(&searches, query_id.as_deref())?;

    let hit = search.hit(hit_index).ok_or_else(|| {
        anyhow!(
            "Hit {} out of range: {} has {} hits",
            hit_index,
            search.query_id,
            search.hits.len()
        )
    })?;

    match view {
        SegmentView::Fasta => {
            for segment in &hit.segments {
                match segment.to_fasta() {
                    Some(block) => println!("{}", block),
                    None => warn_no_sequences(segment.index, format),
                }
            }
            return Ok(());
        }
        SegmentView::Alignment => {
            if format == ReportFormat::Tabular {
                log::info!("Tabular reports carry no midline; use --format json for full alignments");
            }
            for segment in &hit.segments {
                if segment.query_seq.is_none() || segment.hit_seq.is_none() {
                    warn_no_sequences(segment.index, format);
                }
            }
            print!("{}", format_alignments(hit));
            return Ok(());
        }
        SegmentView::Table => {}
    }

    let summary = hit.summarize(search.query_length)?;
    print!("{}", format_segments(hit, &summary));

    if let Some(previous) = search.previous_hit(hit) {
        log::debug!("Previous hit: {} {}", previous.index, previous.id);
    }
    if let Some(next) = search.next_hit(hit) {
        log::debug!("Next hit: {} {}", next.index, next.id);
    }

    Ok(())
}

fn warn_no_sequences(segment: usize, format: ReportFormat) {
    match format {
        ReportFormat::Tabular => log::warn!(
            "Segment {} has no aligned sequences; add qseq and sseq to --columns",
            segment
        ),
        ReportFormat::Json => log::warn!("Segment {} has no aligned sequences", segment),
    }
}

fn select_search<'a>(searches: &'a [Search], query_id: Option<&str>) -> Result<&'a Search> {
    match query_id {
        Some(id) => searches
            .iter()
            .find(|s| s.query_id == id)
            .ok_or_else(|| anyhow!("Query {} not found in report", id)),
        None => {
            if searches.len() > 1 {
                log::warn!(
                    "Report holds {} searches; showing {} (use --query-id to choose)",
                    searches.len(),
                    searches[0].query_id
                );
            }
            searches.first().ok_or_else(|| anyhow!("Report holds no hits"))
        }
    }
}

/// Segment pairs of `hit` with positions, scores and whether each one
/// extended query coverage.
pub fn format_segments(hit: &Hit, summary: &HitSummary) -> String {
    let mut out = format!("Hit {}: {}", hit.index, hit.id);
    if let Some(title) = &hit.title {
        out.push(' ');
        out.push_str(title);
    }
    out.push('\n');

    out.push_str(&format!(
        "{:>4}  {:>15} {:>15} {:>6} {:>9} {:>10} {:>8}  {}\n",
        "#", "Query", "Hit", "Strand", "Bits", "E-value", "Ident", "New"
    ));
    for (segment, novel) in hit.segments.iter().zip(&summary.novel) {
        out.push_str(&format!(
            "{:>4}  {:>15} {:>15} {:>6} {:>9.1} {:>10.2e} {:>7.1}%  {}\n",
            segment.index,
            segment.query_span().to_string(),
            format!("{}..{}", segment.hit_from, segment.hit_to),
            char::from(segment.hit_strand()),
            segment.bit_score,
            segment.evalue,
            segment.identity_ratio() * 100.0,
            if *novel { "yes" } else { "no" }
        ));
    }

    out
}

/// Every segment pair of `hit` that carries its aligned sequences, in
/// BLAST's pairwise text layout.
pub fn format_alignments(hit: &Hit) -> String {
    let mut out = String::new();
    for segment in &hit.segments {
        if let Some(block) = segment.alignment_block() {
            out.push_str(&format!(
                "Segment {}: score {:.1} bits ({}), expect {:.2e}, identities {}/{}\n\n{}\n\n",
                segment.index,
                segment.bit_score,
                segment.score,
                segment.evalue,
                segment.identity,
                segment.align_len,
                block
            ));
        }
    }
    out
}
