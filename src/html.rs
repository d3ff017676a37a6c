//! Serializes the report document model into one self-contained HTML file
//! with embedded CSS and a small sorting script. No external assets.

use crate::report::{DomainReport, MetricCard, Report, Section, StatBlock, TableSection};

/// Render a report as a complete HTML document.
pub fn render(report: &Report) -> String {
    let overview: String = report.overview.iter().map(render_section).collect();
    let domains: String = report.domains.iter().map(render_domain).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        <header>
            <h1>{title}</h1>
            <div class="meta">Generated on: {generated}</div>
        </header>
{overview}{domains}        <footer>Generated by gsc-report</footer>
    </div>
    <script>{js}</script>
</body>
</html>"#,
        title = html_escape(&report.title),
        generated = html_escape(&report.generated_at),
        css = inline_css(),
        js = inline_javascript(),
        overview = overview,
        domains = domains,
    )
}

fn render_section(section: &Section) -> String {
    match section {
        Section::Cards { title, cards } => {
            let cards: String = cards.iter().map(render_card).collect();
            format!(
                r#"        <section class="section">
            <h2>{title}</h2>
            <div class="cards">
{cards}            </div>
        </section>
"#,
                title = html_escape(title),
                cards = cards,
            )
        }
        Section::Stats { title, blocks } => {
            let blocks: String = blocks.iter().map(render_stat_block).collect();
            format!(
                r#"        <section class="section">
            <h2>{title}</h2>
            <div class="stat-grid">
{blocks}            </div>
        </section>
"#,
                title = html_escape(title),
                blocks = blocks,
            )
        }
        Section::Narrative { title, items } => {
            let items: String = items
                .iter()
                .map(|item| format!("                <li>{}</li>\n", html_escape(item)))
                .collect();
            format!(
                r#"        <section class="section">
            <h2>{title}</h2>
            <ul class="insights">
{items}            </ul>
        </section>
"#,
                title = html_escape(title),
                items = items,
            )
        }
        Section::Table(table) => format!(
            r#"        <section class="section">
            <h2>{title}</h2>
{table}        </section>
"#,
            title = html_escape(&table.title),
            table = render_table(table),
        ),
    }
}

fn render_card(card: &MetricCard) -> String {
    let note = card
        .note
        .as_deref()
        .map(|n| format!("\n                    <p class=\"card-note\">{}</p>", html_escape(n)))
        .unwrap_or_default();

    format!(
        r#"                <div class="card">
                    <p class="card-label">{label}</p>
                    <p class="card-value">{value}</p>{note}
                </div>
"#,
        label = html_escape(&card.label),
        value = html_escape(&card.value),
        note = note,
    )
}

fn render_stat_block(block: &StatBlock) -> String {
    let rows: String = block
        .entries
        .iter()
        .map(|(label, value)| {
            format!(
                "                        <div class=\"stat-row\"><dt>{}</dt><dd>{}</dd></div>\n",
                html_escape(label),
                html_escape(value),
            )
        })
        .collect();

    format!(
        r#"                <div class="stat-block">
                    <h3>{title}</h3>
                    <dl>
{rows}                    </dl>
                </div>
"#,
        title = html_escape(&block.title),
        rows = rows,
    )
}

fn render_table(table: &TableSection) -> String {
    let class = if table.sortable { " class=\"sortable\"" } else { "" };
    let head: String = table
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", html_escape(c)))
        .collect();
    let body: String = table
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<td>{}</td>", html_escape(cell)))
                .collect();
            format!("                    <tr>{cells}</tr>\n")
        })
        .collect();

    format!(
        r#"            <div class="table-wrap">
            <table{class}>
                <thead>
                    <tr>{head}</tr>
                </thead>
                <tbody>
{body}                </tbody>
            </table>
            </div>
"#,
        class = class,
        head = head,
        body = body,
    )
}

fn render_domain(domain: &DomainReport) -> String {
    let tables: String = domain
        .tables
        .iter()
        .map(|table| {
            let wide = if table.wide { " wide" } else { "" };
            format!(
                r#"                <div class="table-block{wide}">
                    <h3>{title}</h3>
{table}                </div>
"#,
                wide = wide,
                title = html_escape(&table.title),
                table = render_table(table),
            )
        })
        .collect();

    format!(
        r#"        <section class="section domain">
            <h2>{name}</h2>
            <div class="domain-grid">
{tables}            </div>
        </section>
"#,
        name = html_escape(&domain.name),
        tables = tables,
    )
}

fn inline_css() -> &'static str {
    r#"
* {
    box-sizing: border-box;
    margin: 0;
    padding: 0;
}

body {
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    line-height: 1.6;
    color: #111827;
    background: #f9fafb;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 2rem;
}

header {
    margin-bottom: 2rem;
    padding-bottom: 1rem;
    border-bottom: 2px solid #e5e7eb;
}

header h1 {
    font-size: 2rem;
    font-weight: 700;
    margin-bottom: 0.5rem;
}

header .meta {
    color: #6b7280;
    font-size: 0.875rem;
}

.section {
    background: #ffffff;
    border-radius: 0.5rem;
    box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
    padding: 1.5rem;
    margin-bottom: 2rem;
}

.section h2 {
    font-size: 1.25rem;
    font-weight: 600;
    margin-bottom: 1rem;
}

.cards {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
    gap: 1rem;
}

.card {
    background: #f3f4f6;
    padding: 1rem;
    border-radius: 0.5rem;
    border-left: 4px solid #3b82f6;
}

.card-label {
    font-size: 0.875rem;
    font-weight: 500;
    color: #6b7280;
}

.card-value {
    font-size: 1.5rem;
    font-weight: 700;
}

.card-note {
    font-size: 0.75rem;
    color: #6b7280;
}

.stat-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
    gap: 1rem;
}

.stat-block {
    border: 1px solid #e5e7eb;
    border-radius: 0.5rem;
    padding: 1rem;
}

.stat-block h3 {
    font-size: 1rem;
    font-weight: 600;
    margin-bottom: 0.75rem;
}

.stat-row {
    display: flex;
    justify-content: space-between;
    font-size: 0.875rem;
    padding: 0.125rem 0;
}

.stat-row dt {
    color: #6b7280;
}

.stat-row dd {
    font-weight: 500;
}

.insights {
    list-style: disc;
    padding-left: 1.5rem;
    font-size: 0.875rem;
    color: #374151;
}

.insights li {
    margin-bottom: 0.25rem;
}

.table-wrap {
    overflow-x: auto;
}

table {
    width: 100%;
    border-collapse: collapse;
}

th {
    padding: 0.625rem 0.75rem;
    text-align: left;
    font-size: 0.75rem;
    font-weight: 600;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    color: #6b7280;
    background: #f9fafb;
    border-bottom: 2px solid #e5e7eb;
}

td {
    padding: 0.625rem 0.75rem;
    font-size: 0.875rem;
    border-bottom: 1px solid #e5e7eb;
}

tr:last-child td {
    border-bottom: none;
}

tbody tr:hover {
    background: #f3f4f6;
}

table.sortable th {
    cursor: pointer;
    user-select: none;
}

table.sortable th::after {
    content: ' \2195';
    opacity: 0.3;
}

table.sortable th.asc::after {
    content: ' \2191';
    opacity: 1;
}

table.sortable th.desc::after {
    content: ' \2193';
    opacity: 1;
}

.domain-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
    gap: 1.5rem;
}

.table-block.wide {
    grid-column: 1 / -1;
}

.table-block h3 {
    font-size: 1rem;
    font-weight: 600;
    margin-bottom: 0.5rem;
}

footer {
    padding-top: 1rem;
    border-top: 1px solid #e5e7eb;
    text-align: center;
    color: #6b7280;
    font-size: 0.875rem;
}

@media (max-width: 768px) {
    .container {
        padding: 1rem;
    }

    header h1 {
        font-size: 1.5rem;
    }
}
"#
}

fn inline_javascript() -> &'static str {
    r#"
(function() {
    document.addEventListener('DOMContentLoaded', function() {
        document.querySelectorAll('table.sortable').forEach(function(table) {
            var sorted = { column: -1, direction: 'desc' };

            table.querySelectorAll('th').forEach(function(th, index) {
                th.addEventListener('click', function() {
                    var direction = (sorted.column === index && sorted.direction === 'desc') ? 'asc' : 'desc';
                    sorted = { column: index, direction: direction };

                    table.querySelectorAll('th').forEach(function(header) {
                        header.classList.remove('asc', 'desc');
                    });
                    th.classList.add(direction);

                    var tbody = table.querySelector('tbody');
                    var rows = Array.from(tbody.querySelectorAll('tr'));
                    rows.sort(function(a, b) {
                        var av = a.cells[index].textContent.trim();
                        var bv = b.cells[index].textContent.trim();
                        var an = parseFloat(av.replace(/[%,]/g, ''));
                        var bn = parseFloat(bv.replace(/[%,]/g, ''));
                        if (!isNaN(an) && !isNaN(bn)) {
                            return direction === 'asc' ? an - bn : bn - an;
                        }
                        return direction === 'asc' ? av.localeCompare(bv) : bv.localeCompare(av);
                    });
                    rows.forEach(function(row) { tbody.appendChild(row); });
                });
            });
        });
    });
})();
"#
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_report;
    use crate::stats::{DomainDetails, DomainSummary};
    use crate::table::DimensionRow;
    use chrono::{DateTime, Local, TimeZone};

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn summary(domain: &str, clicks: u64, impressions: u64) -> DomainSummary {
        DomainSummary {
            domain: domain.to_string(),
            total_clicks: clicks,
            total_impressions: impressions,
            avg_ctr: 1.0,
            avg_position: 10.0,
        }
    }

    fn dim(label: &str, clicks: u64) -> DimensionRow {
        DimensionRow {
            label: label.to_string(),
            clicks,
            impressions: clicks * 20,
            ctr: 5.0,
            position: Some(4.0),
            click_share: 50.0,
            impression_share: 50.0,
        }
    }

    #[test]
    fn escapes_markup_in_cell_content() {
        assert_eq!(html_escape("<b>\"a\" & 'b'</b>"), "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;");
    }

    #[test]
    fn empty_report_renders_header_only() {
        let report = build_report(&[], &[], 10, fixed_now());
        let html = render(&report);

        assert!(html.contains("<h1>Search Console Analysis Report</h1>"));
        assert!(html.contains("Generated on: 2025-06-01 12:00:00"));
        assert!(!html.contains("Overall Summary"));
        assert!(!html.contains("Aggregated Averages"));
        assert!(!html.contains("class=\"section domain\""));
    }

    #[test]
    fn rendering_is_idempotent_for_a_fixed_timestamp() {
        let summaries = vec![summary("a.example", 100, 5000), summary("b.example", 300, 9000)];
        let details = vec![(
            "a.example".to_string(),
            DomainDetails {
                devices: Some(vec![dim("MOBILE", 60), dim("DESKTOP", 40)]),
                queries: Some(vec![dim("some query", 9)]),
                ..Default::default()
            },
        )];

        let first = render(&build_report(&summaries, &details, 10, fixed_now()));
        let second = render(&build_report(&summaries, &details, 10, fixed_now()));
        assert_eq!(first, second);
    }

    #[test]
    fn omitted_device_table_leaves_other_tables() {
        let details = vec![(
            "x.example".to_string(),
            DomainDetails {
                queries: Some(vec![dim("query", 3)]),
                pages: Some(vec![dim("https://x.example/p", 3)]),
                ..Default::default()
            },
        )];
        let html = render(&build_report(&[], &details, 10, fixed_now()));

        assert!(!html.contains("Device Distribution"));
        assert!(html.contains("Top Queries"));
        assert!(html.contains("Top Pages"));
        assert!(html.contains("<h2>x.example</h2>"));
    }

    #[test]
    fn comparison_table_is_marked_sortable() {
        let summaries = vec![summary("a", 1, 10), summary("b", 2, 20)];
        let html = render(&build_report(&summaries, &[], 10, fixed_now()));
        assert!(html.contains("<table class=\"sortable\">"));
    }
}
