use chrono::Datelike;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::reader::{self, DomainTables};
use crate::stats::{self, DomainDetails, DomainSummary};
use crate::table::{self, DimensionRow, MonthlyRow, TimeRow};

/// Transform one domain's raw export tables into its summary and the cleaned
/// detail tables retained for rendering. Absent tables propagate as `None`.
pub fn analyze_tables(domain: &str, tables: DomainTables) -> (DomainSummary, DomainDetails) {
    let time_series = tables.dates.map(|raw| table::clean_time_series(&raw));

    let (total_clicks, total_impressions, avg_ctr, avg_position) = match time_series.as_deref() {
        Some(rows) if !rows.is_empty() => {
            let clicks: u64 = rows.iter().map(|r| r.clicks).sum();
            let impressions: u64 = rows.iter().map(|r| r.impressions).sum();
            let position = rows.iter().map(|r| r.position).sum::<f64>() / rows.len() as f64;
            (clicks, impressions, stats::blended_ctr(clicks, impressions), position)
        }
        _ => (0, 0, 0.0, 0.0),
    };

    let details = DomainDetails {
        time_series,
        countries: tables.countries.map(|raw| table::clean_dimension(&raw)),
        devices: tables.devices.map(|raw| table::clean_dimension(&raw)),
        pages: tables
            .pages
            .map(|raw| table::sort_by_clicks_desc(table::clean_dimension(&raw))),
        queries: tables
            .queries
            .map(|raw| table::sort_by_clicks_desc(table::clean_dimension(&raw))),
    };

    let summary = DomainSummary {
        domain: domain.to_string(),
        total_clicks,
        total_impressions,
        avg_ctr,
        avg_position,
    };

    (summary, details)
}

/// Group time-series rows by calendar month: clicks and impressions are
/// summed, position averaged, and the monthly CTR recomputed from the
/// grouped sums rather than averaged from per-row percentages.
pub fn monthly_rollup(rows: &[TimeRow]) -> Vec<MonthlyRow> {
    let mut months: BTreeMap<(i32, u32), (u64, u64, f64, usize)> = BTreeMap::new();

    for row in rows {
        let entry = months
            .entry((row.date.year(), row.date.month()))
            .or_insert((0, 0, 0.0, 0));
        entry.0 += row.clicks;
        entry.1 += row.impressions;
        entry.2 += row.position;
        entry.3 += 1;
    }

    months
        .into_iter()
        .map(|((year, month), (clicks, impressions, position_sum, count))| MonthlyRow {
            month: format!("{year:04}-{month:02}"),
            clicks,
            impressions,
            ctr: stats::blended_ctr(clicks, impressions),
            position: position_sum / count as f64,
        })
        .collect()
}

/// Analyze one domain folder end to end and emit the diagnostic events the
/// report does not carry (monthly performance, top country, top-N share).
pub fn analyze_domain_folder(domain: &str, folder: &Path, top: usize) -> (DomainSummary, DomainDetails) {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "domain_analyzer",
        domain = domain,
        "Analyzing domain folder"
    );

    let tables = reader::load_domain_tables(folder);
    let (summary, details) = analyze_tables(domain, tables);

    if let Some(rows) = details.time_series.as_deref() {
        for month in monthly_rollup(rows) {
            debug!(
                action = "monthly",
                component = "domain_analyzer",
                domain = domain,
                month = month.month.as_str(),
                clicks = month.clicks,
                impressions = month.impressions,
                ctr = format!("{:.2}", month.ctr),
                position = format!("{:.2}", month.position),
                "Monthly performance"
            );
        }
    }

    if let Some(countries) = details.countries.as_deref() {
        let mut best: Option<&DimensionRow> = None;
        for row in countries {
            if best.map_or(true, |b| row.clicks > b.clicks) {
                best = Some(row);
            }
        }
        if let Some(country) = best {
            info!(
                action = "diagnostic",
                component = "domain_analyzer",
                domain = domain,
                country = country.label.as_str(),
                clicks = country.clicks,
                click_share = format!("{:.1}", country.click_share),
                "Top country by clicks"
            );
        }
    }

    if let Some(pages) = details.pages.as_deref() {
        info!(
            action = "diagnostic",
            component = "domain_analyzer",
            domain = domain,
            top = top,
            click_share = format!("{:.2}", leading_share(pages, top)),
            "Top pages share of all clicks"
        );
    }
    if let Some(queries) = details.queries.as_deref() {
        info!(
            action = "diagnostic",
            component = "domain_analyzer",
            domain = domain,
            top = top,
            click_share = format!("{:.2}", leading_share(queries, top)),
            "Top queries share of all clicks"
        );
    }

    info!(
        action = "complete",
        component = "domain_analyzer",
        domain = domain,
        total_clicks = summary.total_clicks,
        total_impressions = summary.total_impressions,
        avg_ctr = format!("{:.2}", summary.avg_ctr),
        avg_position = format!("{:.2}", summary.avg_position),
        duration_ms = start_time.elapsed().as_millis(),
        "Domain analysis completed"
    );

    (summary, details)
}

// Assumes rows are already sorted clicks-descending.
fn leading_share(rows: &[DimensionRow], n: usize) -> f64 {
    let total: u64 = rows.iter().map(|r| r.clicks).sum();
    if total == 0 {
        return 0.0;
    }
    let leading: u64 = rows.iter().take(n).map(|r| r.clicks).sum();
    leading as f64 / total as f64 * 100.0
}
