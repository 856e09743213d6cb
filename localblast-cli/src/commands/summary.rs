//! Summary command implementation - hit coverage table of an existing report

use anyhow::Result;
use localblast_core::{ReportFormat, ReportStats, SeqPos};
use std::path::PathBuf;

use crate::config::Config;

pub fn execute(
    config: &Config,
    report: PathBuf,
    format: Option<ReportFormat>,
    columns: Option<String>,
    query_length: Option<SeqPos>,
    json: bool,
) -> Result<()> {
    let format = super::resolve_format(config, format, &report);
    let layout = super::resolve_layout(config, columns.as_deref())?;
    let mut searches = super::load_searches(&report, &layout, format)?;
    super::override_query_length(&mut searches, query_length);

    let stats = ReportStats::compute(&searches);
    log::info!(
        "{} searches, {} hits, {} segment pairs",
        stats.total_searches,
        stats.total_hits,
        stats.total_segments
    );
    if let Some(best) = stats.best_evalue {
        log::debug!("Best e-value: {:e}", best);
    }

    for search in searches.iter().filter(|s| s.query_length.is_none()) {
        log::warn!(
            "No query length for {}; pass --query-length or add qlen to --columns for query coverage",
            search.query_id
        );
    }

    super::print_searches(&searches, json)
}
