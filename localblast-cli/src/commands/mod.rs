//! Command implementations for the LocalBlast CLI

pub mod run;
pub mod summary;
pub mod segments;
pub mod makedb;

use anyhow::{Context, Result};
use localblast_core::{HitSummary, ReportFormat, ReportLayout, Search, SeqPos};
use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::error::CliError;

/// Column layout from `--columns`, falling back to the configured one.
pub fn resolve_layout(config: &Config, columns: Option<&str>) -> Result<ReportLayout> {
    match columns {
        Some(spec) => spec
            .parse::<ReportLayout>()
            .with_context(|| format!("Invalid --columns value: {}", spec)),
        None => Ok(config.report.columns.clone()),
    }
}

/// Format from `--format`; otherwise `.json` reports are read as JSON and
/// anything else in the configured format.
pub fn resolve_format(config: &Config, format: Option<ReportFormat>, report: &Path) -> ReportFormat {
    format.unwrap_or_else(|| match ReportFormat::detect(report) {
        ReportFormat::Json => ReportFormat::Json,
        ReportFormat::Tabular => config.report.format,
    })
}

/// Reads every search in `report`.
pub fn load_searches(report: &Path, layout: &ReportLayout, format: ReportFormat) -> Result<Vec<Search>> {
    if !report.exists() {
        return Err(CliError::file_not_found(report.to_path_buf()).into());
    }

    log::info!("Reading {} report: {}", format, report.display());
    let searches = format
        .read_file(layout, report)
        .with_context(|| format!("Failed to read report: {}", report.display()))?;
    log::debug!("Report holds {} searches", searches.len());

    Ok(searches)
}

/// Applies a `--query-length` override to every search.
pub fn override_query_length(searches: &mut [Search], query_length: Option<SeqPos>) {
    if let Some(length) = query_length {
        for search in searches {
            if search.query_length.is_some_and(|l| l != length) {
                log::warn!(
                    "Overriding reported length {:?} of {} with {}",
                    search.query_length,
                    search.query_id,
                    length
                );
            }
            search.query_length = Some(length);
        }
    }
}

fn format_cover(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.0}%", r * 100.0),
        None => "-".to_string(),
    }
}

fn format_range(from: Option<SeqPos>, to: Option<SeqPos>) -> String {
    match (from, to) {
        (Some(f), Some(t)) => format!("{}..{}", f, t),
        _ => "-".to_string(),
    }
}

/// One line per hit: rank, id, best scores, coverage and query extent.
/// A search message from BLAST follows the table.
pub fn format_hit_table(search: &Search, summaries: &[HitSummary]) -> String {
    let mut out = format!("Query: {}", search.query_id);
    if let Some(title) = &search.query_title {
        out.push(' ');
        out.push_str(title);
    }
    out.push_str(&format!(
        " (length {})\n",
        search
            .query_length
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    ));
    out.push_str(&format!(
        "{:>4}  {:<24} {:>9} {:>10} {:>7} {:>7} {:>15} {:>5}\n",
        "#", "Hit", "Max bits", "E-value", "Q.cov", "H.cov", "Query range", "HSPs"
    ));

    for (hit, summary) in search.hits.iter().zip(summaries) {
        out.push_str(&format!(
            "{:>4}  {:<24} {:>9.1} {:>10.2e} {:>7} {:>7} {:>15} {:>5}\n",
            hit.index,
            hit.id,
            summary.max_bit_score,
            summary.min_evalue,
            format_cover(summary.query_cover()),
            format_cover(summary.hit_cover()),
            format_range(summary.query.from, summary.query.to),
            hit.segments.len()
        ));
    }

    if let Some(message) = &search.message {
        out.push_str(&format!("Message: {}\n", message));
    }

    out
}

#[derive(Serialize)]
struct HitEntry<'a> {
    index: usize,
    id: &'a str,
    title: Option<&'a str>,
    #[serde(flatten)]
    summary: &'a HitSummary,
}

#[derive(Serialize)]
struct SearchEntry<'a> {
    query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_title: Option<&'a str>,
    query_length: Option<SeqPos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    hits: Vec<HitEntry<'a>>,
}

/// Hit summaries of every search as pretty-printed JSON.
pub fn render_json(searches: &[Search]) -> Result<String> {
    let summaries = searches
        .iter()
        .map(|search| search.summaries())
        .collect::<Result<Vec<_>, _>>()?;

    let entries: Vec<SearchEntry> = searches
        .iter()
        .zip(&summaries)
        .map(|(search, summaries)| SearchEntry {
            query_id: &search.query_id,
            query_title: search.query_title.as_deref(),
            query_length: search.query_length,
            message: search.message.as_deref(),
            hits: search
                .hits
                .iter()
                .zip(summaries)
                .map(|(hit, summary)| HitEntry {
                    index: hit.index,
                    id: &hit.id,
                    title: hit.title.as_deref(),
                    summary,
                })
                .collect(),
        })
        .collect();

    serde_json::to_string_pretty(&entries).context("Failed to serialize hit summaries")
}

/// Prints the hit table of every search, or JSON when `json` is set.
pub fn print_searches(searches: &[Search], json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(searches)?);
        return Ok(());
    }

    if searches.is_empty() {
        println!("No hits found");
    }
    for search in searches {
        let summaries = search
            .summaries()
            .with_context(|| format!("Failed to summarize hits of {}", search.query_id))?;
        println!("{}", format_hit_table(search, &summaries));
    }

    Ok(())
}
