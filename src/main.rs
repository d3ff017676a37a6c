use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

use gsc_report::stats::{self, DomainDetails, DomainSummary};
use gsc_report::{analyzer, html, reader, report, utils, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    match run(&args) {
        Ok(report_path) => {
            println!("HTML report generated: {}", report_path.display());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Report generation failed");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<PathBuf> {
    let total_start_time = Instant::now();
    info!(
        action = "start",
        component = "report_run",
        data_dir = ?args.data_dir,
        "Starting search performance analysis"
    );

    let folders = reader::discover_domains(&args.data_dir, args.filter.as_deref())?;
    if folders.is_empty() {
        warn!(
            action = "discover",
            component = "report_run",
            data_dir = ?args.data_dir,
            "No domain folders found"
        );
    }

    let workers = args
        .workers
        .unwrap_or_else(|| std::cmp::min(num_cpus::get(), 8));
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
    {
        warn!(
            action = "configure",
            component = "report_run",
            error = %e,
            "Thread pool already initialized"
        );
    }
    info!(
        action = "configure",
        component = "report_run",
        worker_count = workers,
        domain_count = folders.len(),
        "Analyzing domain folders"
    );

    // One task per domain folder; collect() keeps discovery order so the
    // aggregate computations see a deterministic snapshot.
    let results: Vec<(DomainSummary, DomainDetails)> = folders
        .par_iter()
        .map(|(name, path)| analyzer::analyze_domain_folder(name, path, args.top))
        .collect();

    let mut summaries = Vec::with_capacity(results.len());
    let mut details = Vec::with_capacity(results.len());
    for ((name, _), (summary, detail)) in folders.iter().zip(results) {
        summaries.push(summary);
        details.push((name.clone(), detail));
    }

    log_aggregate_summary(&summaries);

    let now = Local::now();
    let document = html::render(&report::build_report(&summaries, &details, args.top, now));

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", args.out_dir))?;
    let report_path = args.out_dir.join(format!(
        "search_console_report_{}.html",
        now.format("%Y%m%d_%H%M%S")
    ));
    fs::write(&report_path, document)
        .with_context(|| format!("Failed to write report to {:?}", report_path))?;

    info!(
        action = "complete",
        component = "report_run",
        path = ?report_path,
        duration_ms = total_start_time.elapsed().as_millis(),
        "Report written"
    );

    Ok(report_path)
}

fn log_aggregate_summary(summaries: &[DomainSummary]) {
    let clicks = stats::distribution(summaries, |s| s.total_clicks as f64);
    let ctr = stats::distribution(summaries, |s| s.avg_ctr);
    let position = stats::distribution(summaries, |s| s.avg_position);

    let (clicks, ctr, position) = match (clicks, ctr, position) {
        (Some(c), Some(r), Some(p)) => (c, r, p),
        _ => return,
    };

    let total_impressions: u64 = summaries.iter().map(|s| s.total_impressions).sum();
    info!(
        action = "summary",
        component = "report_run",
        total_clicks = utils::format_number(clicks.total as u64),
        total_impressions = utils::format_number(total_impressions),
        avg_ctr = format!("{:.2}", ctr.mean),
        avg_position = format!("{:.2}", position.mean),
        best_by_clicks = clicks.max_domain.as_str(),
        best_by_ctr = ctr.max_domain.as_str(),
        "Aggregate statistics across all domains"
    );
}
