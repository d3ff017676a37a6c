use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gsc-report",
    about = "Analyze Google Search Console exports and generate an HTML performance report",
    version,
    long_about = None
)]
pub struct Args {
    /// Directory containing one sub-folder of Search Console CSV exports per domain
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory the HTML report is written to
    #[arg(short, long, default_value = "reports")]
    pub out_dir: PathBuf,

    /// Regex applied to domain folder names; non-matching folders are skipped
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Number of rows shown in the per-domain query and page tables
    #[arg(short, long, default_value_t = 10)]
    pub top: usize,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
