use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::table::{RawDimensionRow, RawTimeRow};

pub const DATES_FILE: &str = "Dates.csv";
pub const COUNTRIES_FILE: &str = "Countries.csv";
pub const DEVICES_FILE: &str = "Devices.csv";
pub const PAGES_FILE: &str = "Pages.csv";
pub const QUERIES_FILE: &str = "Queries.csv";

/// The raw export tables of one domain. Each is `None` when the
/// corresponding file is missing or unreadable.
#[derive(Debug, Default)]
pub struct DomainTables {
    pub dates: Option<Vec<RawTimeRow>>,
    pub countries: Option<Vec<RawDimensionRow>>,
    pub devices: Option<Vec<RawDimensionRow>>,
    pub pages: Option<Vec<RawDimensionRow>>,
    pub queries: Option<Vec<RawDimensionRow>>,
}

pub fn load_domain_tables(folder: &Path) -> DomainTables {
    let start_time = Instant::now();

    let tables = DomainTables {
        dates: read_rows(folder, DATES_FILE),
        countries: read_rows(folder, COUNTRIES_FILE),
        devices: read_rows(folder, DEVICES_FILE),
        pages: read_rows(folder, PAGES_FILE),
        queries: read_rows(folder, QUERIES_FILE),
    };

    let loaded = [
        tables.dates.is_some(),
        tables.countries.is_some(),
        tables.devices.is_some(),
        tables.pages.is_some(),
        tables.queries.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    info!(
        action = "complete",
        component = "csv_reader",
        folder = ?folder,
        tables_loaded = loaded,
        duration_ms = start_time.elapsed().as_millis(),
        "Loaded export tables"
    );

    tables
}

/// Read one export file into typed rows. A missing or unreadable file is the
/// "table absent" state, never an error; malformed rows are skipped.
fn read_rows<T: DeserializeOwned>(folder: &Path, file: &str) -> Option<Vec<T>> {
    let path = folder.join(file);

    let mut reader = match csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&path)
    {
        Ok(reader) => reader,
        Err(e) => {
            if path.exists() {
                warn!(
                    action = "open",
                    component = "csv_reader",
                    file = file,
                    error = %e,
                    "Failed to open table file"
                );
            } else {
                debug!(
                    action = "skip",
                    component = "csv_reader",
                    file = file,
                    "Table file not present"
                );
            }
            return None;
        }
    };

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(
                    action = "parse",
                    component = "csv_reader",
                    file = file,
                    row = idx + 1,
                    error = %e,
                    "Skipping malformed row"
                );
            }
        }
    }

    Some(rows)
}

/// Each sub-directory of the data directory is one domain. Folders are
/// returned sorted by name so downstream ordering is deterministic across
/// platforms; an optional regex restricts which folders are analyzed.
pub fn discover_domains(data_dir: &Path, filter: Option<&str>) -> Result<Vec<(String, PathBuf)>> {
    let filter = filter
        .map(Regex::new)
        .transpose()
        .context("Invalid --filter regex")?;

    let mut folders = Vec::new();
    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory {:?}", data_dir))?;

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(re) = &filter {
            if !re.is_match(&name) {
                debug!(
                    action = "filter",
                    component = "discovery",
                    domain = name.as_str(),
                    "Skipping non-matching domain folder"
                );
                continue;
            }
        }
        folders.push((name, entry.path()));
    }

    folders.sort_by(|a, b| a.0.cmp(&b.0));

    info!(
        action = "complete",
        component = "discovery",
        domain_count = folders.len(),
        "Discovered domain folders"
    );
    Ok(folders)
}
