use chrono::{DateTime, Local};
use url::Url;

use crate::stats::{self, DomainDetails, DomainSummary, Distribution};
use crate::table::DimensionRow;

/// Intermediate document model: the synthesizer builds it, the HTML
/// renderer serializes it. Keeps the statistics testable without layout.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub generated_at: String,
    pub overview: Vec<Section>,
    pub domains: Vec<DomainReport>,
}

#[derive(Debug, Clone)]
pub enum Section {
    Cards { title: String, cards: Vec<MetricCard> },
    Stats { title: String, blocks: Vec<StatBlock> },
    Narrative { title: String, items: Vec<String> },
    Table(TableSection),
}

#[derive(Debug, Clone)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatBlock {
    pub title: String,
    pub entries: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct TableSection {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub sortable: bool,
    pub wide: bool,
}

#[derive(Debug, Clone)]
pub struct DomainReport {
    pub name: String,
    pub tables: Vec<TableSection>,
}

/// Assemble the full report document. An empty summary list omits the
/// aggregate sections entirely; per-domain tables are omitted individually
/// when their backing data is absent.
pub fn build_report(
    summaries: &[DomainSummary],
    details: &[(String, DomainDetails)],
    top: usize,
    generated_at: DateTime<Local>,
) -> Report {
    Report {
        title: "Search Console Analysis Report".to_string(),
        generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        overview: overview_sections(summaries),
        domains: details
            .iter()
            .map(|(name, detail)| domain_report(name, detail, top))
            .collect(),
    }
}

fn overview_sections(summaries: &[DomainSummary]) -> Vec<Section> {
    let clicks = stats::distribution(summaries, |s| s.total_clicks as f64);
    let impressions = stats::distribution(summaries, |s| s.total_impressions as f64);
    let ctr = stats::distribution(summaries, |s| s.avg_ctr);
    let position = stats::distribution(summaries, |s| s.avg_position);

    let (clicks, impressions, ctr, position) = match (clicks, impressions, ctr, position) {
        (Some(c), Some(i), Some(r), Some(p)) => (c, i, r, p),
        _ => return Vec::new(),
    };

    let overall_ctr = stats::blended_ctr(
        summaries.iter().map(|s| s.total_clicks).sum(),
        summaries.iter().map(|s| s.total_impressions).sum(),
    );

    vec![
        Section::Cards {
            title: "Overall Summary".to_string(),
            cards: metric_cards(&clicks, &impressions, &ctr, &position),
        },
        Section::Stats {
            title: "Aggregated Averages".to_string(),
            blocks: vec![
                count_block("Clicks", &clicks),
                count_block("Impressions", &impressions),
                ctr_block(&ctr, overall_ctr),
                position_block(&position),
            ],
        },
        Section::Narrative {
            title: "Key Insights".to_string(),
            items: insights(&clicks, &impressions, &ctr, &position),
        },
        Section::Table(comparison_table(summaries)),
    ]
}

fn metric_cards(
    clicks: &Distribution,
    impressions: &Distribution,
    ctr: &Distribution,
    position: &Distribution,
) -> Vec<MetricCard> {
    let card = |label: &str, value: String, note: Option<&str>| MetricCard {
        label: label.to_string(),
        value,
        note: note.map(str::to_string),
    };

    vec![
        card("Total Clicks", format!("{}", clicks.total as u64), None),
        card("Total Impressions", format!("{}", impressions.total as u64), None),
        card("Average CTR", format!("{:.2}%", ctr.mean), None),
        card("Average Position", format!("{:.2}", position.mean), None),
        card(
            "Best Performing Domain",
            clicks.max_domain.clone(),
            Some("(by clicks)"),
        ),
        card(
            "Best Performing Domain",
            ctr.max_domain.clone(),
            Some("(by CTR)"),
        ),
    ]
}

fn entry(label: &str, value: String) -> (String, String) {
    (label.to_string(), value)
}

fn count_block(title: &str, d: &Distribution) -> StatBlock {
    StatBlock {
        title: title.to_string(),
        entries: vec![
            entry("Average", format!("{:.1}", d.mean)),
            entry("Median", format!("{:.1}", d.median)),
            entry("Standard Deviation", format!("{:.1}", d.std_dev)),
            entry("25th Percentile", format!("{:.1}", d.p25)),
            entry("75th Percentile", format!("{:.1}", d.p75)),
            entry("90th Percentile", format!("{:.1}", d.p90)),
            entry("IQR", format!("{:.1}", d.iqr)),
            entry("Maximum", format!("{:.0} ({})", d.max, d.max_domain)),
            entry("Minimum", format!("{:.0} ({})", d.min, d.min_domain)),
            entry("Total", format!("{:.0}", d.total)),
        ],
    }
}

fn ctr_block(d: &Distribution, overall_ctr: f64) -> StatBlock {
    StatBlock {
        title: "CTR".to_string(),
        entries: vec![
            entry("Average", format!("{:.2}%", d.mean)),
            entry("Median", format!("{:.2}%", d.median)),
            entry("Standard Deviation", format!("{:.2}%", d.std_dev)),
            entry("25th Percentile", format!("{:.2}%", d.p25)),
            entry("75th Percentile", format!("{:.2}%", d.p75)),
            entry("90th Percentile", format!("{:.2}%", d.p90)),
            entry("Maximum", format!("{:.2}% ({})", d.max, d.max_domain)),
            entry("Minimum", format!("{:.2}% ({})", d.min, d.min_domain)),
            entry("Overall CTR", format!("{:.2}%", overall_ctr)),
        ],
    }
}

fn position_block(d: &Distribution) -> StatBlock {
    StatBlock {
        title: "Position".to_string(),
        entries: vec![
            entry("Average", format!("{:.2}", d.mean)),
            entry("Median", format!("{:.2}", d.median)),
            entry("Standard Deviation", format!("{:.2}", d.std_dev)),
            entry("25th Percentile", format!("{:.2}", d.p25)),
            entry("75th Percentile", format!("{:.2}", d.p75)),
            entry("90th Percentile", format!("{:.2}", d.p90)),
            entry("IQR", format!("{:.2}", d.iqr)),
            entry("Best (Lowest)", format!("{:.2} ({})", d.min, d.min_domain)),
            entry("Worst (Highest)", format!("{:.2} ({})", d.max, d.max_domain)),
        ],
    }
}

/// Threshold-driven narrative sentences, evaluated in fixed priority order,
/// followed by two unconditional closing sentences.
fn insights(
    clicks: &Distribution,
    impressions: &Distribution,
    ctr: &Distribution,
    position: &Distribution,
) -> Vec<String> {
    let mut items = Vec::new();

    if clicks.max > clicks.mean * 2.0 {
        items.push(format!(
            "The top-performing domain ({}) has {:.1}x more clicks than the average.",
            clicks.max_domain,
            clicks.max / clicks.mean
        ));
    }

    if clicks.median < clicks.mean * 0.8 {
        items.push(format!(
            "The median clicks ({:.1}) is significantly lower than the mean ({:.1}), \
             indicating that a few high-performing domains are skewing the average upward.",
            clicks.median, clicks.mean
        ));
    }

    if clicks.std_dev > clicks.mean {
        items.push(format!(
            "The high standard deviation in clicks ({:.1}) indicates substantial \
             variation in performance across domains.",
            clicks.std_dev
        ));
    }

    if ctr.iqr > ctr.mean * 0.5 {
        items.push(format!(
            "The wide interquartile range for CTR ({:.2}%) suggests significant \
             differences in engagement rates across domains.",
            ctr.iqr
        ));
    }

    if position.p25 < position.mean * 0.7 {
        items.push(format!(
            "25% of domains have an average position better than {:.2}, \
             significantly outperforming the overall average of {:.2}.",
            position.p25, position.mean
        ));
    }

    items.push(format!(
        "Overall, the domains receive an average of {:.1} clicks from {:.1} impressions.",
        clicks.mean, impressions.mean
    ));
    items.push(format!(
        "The average CTR across all domains is {:.2}%, with positions averaging {:.2}.",
        ctr.mean, position.mean
    ));

    items
}

fn comparison_table(summaries: &[DomainSummary]) -> TableSection {
    let mut ranked: Vec<&DomainSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| b.total_impressions.cmp(&a.total_impressions));

    TableSection {
        title: "Domain Comparison".to_string(),
        columns: ["Domain", "Clicks", "Impressions", "CTR", "Position"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: ranked
            .iter()
            .map(|s| {
                vec![
                    s.domain.clone(),
                    s.total_clicks.to_string(),
                    s.total_impressions.to_string(),
                    format!("{:.2}%", s.avg_ctr),
                    format!("{:.2}", s.avg_position),
                ]
            })
            .collect(),
        sortable: true,
        wide: true,
    }
}

fn domain_report(name: &str, details: &DomainDetails, top: usize) -> DomainReport {
    let mut tables = Vec::new();

    if let Some(devices) = details.devices.as_deref() {
        tables.push(device_table(devices));
    }
    if let Some(queries) = details.queries.as_deref() {
        tables.push(query_table(queries, top));
    }
    if let Some(pages) = details.pages.as_deref() {
        tables.push(page_table(pages, top));
    }

    DomainReport {
        name: name.to_string(),
        tables,
    }
}

fn device_table(devices: &[DimensionRow]) -> TableSection {
    TableSection {
        title: "Device Distribution".to_string(),
        columns: ["Device", "Clicks", "Click %"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: devices
            .iter()
            .map(|d| {
                vec![
                    d.label.clone(),
                    d.clicks.to_string(),
                    format!("{:.1}%", d.click_share),
                ]
            })
            .collect(),
        sortable: false,
        wide: false,
    }
}

fn query_table(queries: &[DimensionRow], top: usize) -> TableSection {
    TableSection {
        title: "Top Queries".to_string(),
        columns: ["Query", "Clicks", "Impressions"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: queries
            .iter()
            .take(top)
            .map(|q| {
                vec![
                    q.label.clone(),
                    q.clicks.to_string(),
                    q.impressions.to_string(),
                ]
            })
            .collect(),
        sortable: false,
        wide: false,
    }
}

fn page_table(pages: &[DimensionRow], top: usize) -> TableSection {
    TableSection {
        title: "Top Pages".to_string(),
        columns: ["Page", "Clicks", "Impressions", "CTR", "Position"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: pages
            .iter()
            .take(top)
            .map(|p| {
                vec![
                    page_label(&p.label),
                    p.clicks.to_string(),
                    p.impressions.to_string(),
                    format!("{:.2}%", p.ctr),
                    p.position.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")),
                ]
            })
            .collect(),
        sortable: false,
        wide: true,
    }
}

/// Page URLs render as their path (plus query) since the table already sits
/// under the domain's heading; anything that fails to parse stays as-is.
fn page_label(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let mut label = url.path().to_string();
            if let Some(query) = url.query() {
                label.push('?');
                label.push_str(query);
            }
            label
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(domain: &str, clicks: u64, impressions: u64, ctr: f64, position: f64) -> DomainSummary {
        DomainSummary {
            domain: domain.to_string(),
            total_clicks: clicks,
            total_impressions: impressions,
            avg_ctr: ctr,
            avg_position: position,
        }
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_summaries_omit_the_aggregate_sections() {
        let report = build_report(&[], &[], 10, fixed_now());
        assert!(report.overview.is_empty());
        assert!(report.domains.is_empty());
        assert_eq!(report.generated_at, "2025-06-01 12:00:00");
    }

    #[test]
    fn skew_insight_names_the_top_domain() {
        let summaries = vec![
            summary("a", 100, 1000, 1.0, 5.0),
            summary("b", 1000, 2000, 2.0, 5.0),
            summary("c", 120, 1500, 1.5, 5.0),
        ];
        let report = build_report(&summaries, &[], 10, fixed_now());

        let items = report
            .overview
            .iter()
            .find_map(|s| match s {
                Section::Narrative { items, .. } => Some(items),
                _ => None,
            })
            .unwrap();

        // max(1000) > 2 x mean(406.7) fires the multiplier insight for "b".
        assert!(items[0].contains("(b)"));
        assert!(items[0].contains("x more clicks"));
        // The two closing sentences always follow.
        assert!(items[items.len() - 2].starts_with("Overall, the domains receive"));
        assert!(items[items.len() - 1].starts_with("The average CTR across all domains"));
    }

    #[test]
    fn closers_are_present_even_without_triggered_insights() {
        // Identical domains: no threshold fires.
        let summaries = vec![
            summary("a", 100, 1000, 10.0, 5.0),
            summary("b", 100, 1000, 10.0, 5.0),
        ];
        let report = build_report(&summaries, &[], 10, fixed_now());
        let items = report
            .overview
            .iter()
            .find_map(|s| match s {
                Section::Narrative { items, .. } => Some(items),
                _ => None,
            })
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn comparison_table_sorted_by_impressions_descending() {
        let summaries = vec![
            summary("low", 10, 100, 10.0, 1.0),
            summary("high", 5, 9000, 0.1, 9.0),
            summary("mid", 7, 500, 1.4, 4.0),
        ];
        let report = build_report(&summaries, &[], 10, fixed_now());
        let table = report
            .overview
            .iter()
            .find_map(|s| match s {
                Section::Table(t) => Some(t),
                _ => None,
            })
            .unwrap();

        let order: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
        assert_eq!(table.rows[0][3], "0.10%");
        assert_eq!(table.rows[0][4], "9.00");
    }

    #[test]
    fn absent_device_table_is_omitted_but_others_render() {
        let dim = |label: &str, clicks: u64| DimensionRow {
            label: label.to_string(),
            clicks,
            impressions: clicks * 10,
            ctr: 10.0,
            position: None,
            click_share: 100.0,
            impression_share: 100.0,
        };
        let details = DomainDetails {
            queries: Some(vec![dim("query one", 5)]),
            pages: Some(vec![dim("https://example.com/page", 5)]),
            ..Default::default()
        };
        let report = build_report(&[], &[("example.com".to_string(), details)], 10, fixed_now());

        let titles: Vec<&str> = report.domains[0]
            .tables
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Top Queries", "Top Pages"]);
    }

    #[test]
    fn page_and_query_tables_cap_at_top_n() {
        let dim = |label: &str, clicks: u64| DimensionRow {
            label: label.to_string(),
            clicks,
            impressions: 1,
            ctr: 0.0,
            position: Some(3.0),
            click_share: 0.0,
            impression_share: 0.0,
        };
        let rows: Vec<DimensionRow> = (0..15).map(|i| dim(&format!("q{i}"), 100 - i)).collect();
        let details = DomainDetails {
            queries: Some(rows.clone()),
            pages: Some(rows),
            ..Default::default()
        };
        let report = build_report(&[], &[("d".to_string(), details)], 10, fixed_now());
        assert_eq!(report.domains[0].tables[0].rows.len(), 10);
        assert_eq!(report.domains[0].tables[1].rows.len(), 10);
    }

    #[test]
    fn page_labels_reduce_to_paths() {
        assert_eq!(page_label("https://example.com/blog/post?page=2"), "/blog/post?page=2");
        assert_eq!(page_label("https://example.com/"), "/");
        assert_eq!(page_label("not a url"), "not a url");
    }

    #[test]
    fn best_domain_cards_cover_clicks_and_ctr() {
        let summaries = vec![
            summary("clicky", 900, 1000, 1.0, 2.0),
            summary("converty", 10, 20, 50.0, 2.0),
        ];
        let report = build_report(&summaries, &[], 10, fixed_now());
        let cards = report
            .overview
            .iter()
            .find_map(|s| match s {
                Section::Cards { cards, .. } => Some(cards),
                _ => None,
            })
            .unwrap();

        let best: Vec<(&str, &str)> = cards
            .iter()
            .filter(|c| c.label == "Best Performing Domain")
            .map(|c| (c.value.as_str(), c.note.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(best, vec![("clicky", "(by clicks)"), ("converty", "(by CTR)")]);
    }
}
