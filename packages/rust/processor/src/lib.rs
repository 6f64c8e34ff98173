//! Program record processing for ExecAdvisor.
//!
//! Turns scraped [`RawProgram`]s into cleaned, normalized [`ProgramRecord`]s,
//! removes duplicates, and computes dataset statistics.

pub mod normalize;
pub mod stats;

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument, warn};

use execadvisor_shared::{ExecAdvisorError, ProgramId, ProgramRecord, RawProgram, Result};

pub use normalize::{clean_field, clean_list, clean_text, normalize_costs, normalize_duration};
pub use stats::{ProgramStats, Range, generate_stats};

/// Clean and normalize a single raw record.
///
/// The derived `program_id` depends only on the URL, so running this twice
/// on the same input yields identical records.
pub fn process_program(raw: &RawProgram) -> ProgramRecord {
    let url = raw.url.trim().to_string();

    ProgramRecord {
        program_id: ProgramId::from_url(&url),
        name: clean_field(&raw.name),
        description: clean_field(&raw.description),
        duration: normalize_duration(&clean_text(&raw.duration)),
        curriculum: clean_list(&raw.curriculum),
        costs: normalize_costs(&clean_text(&raw.costs)),
        admission_requirements: clean_list(&raw.admission_requirements),
        schedules: clean_field(&raw.schedules),
        faculty: raw
            .faculty
            .iter()
            .filter_map(|f| {
                let name = clean_text(&f.name);
                (!name.is_empty()).then(|| execadvisor_shared::Faculty {
                    name,
                    title: clean_text(&f.title),
                })
            })
            .collect(),
        deadlines: clean_field(&raw.deadlines),
        language: clean_field(&raw.language),
        location: clean_field(&raw.location),
        url,
    }
}

/// Process a batch of raw records and drop duplicates.
#[instrument(skip_all, fields(input = raws.len()))]
pub fn process_all(raws: &[RawProgram]) -> Vec<ProgramRecord> {
    let processed: Vec<_> = raws.iter().map(process_program).collect();
    let records = deduplicate(processed);
    info!(input = raws.len(), output = records.len(), "processed programs");
    records
}

/// Keep the first record for each URL.
pub fn deduplicate(records: Vec<ProgramRecord>) -> Vec<ProgramRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// File IO
// ---------------------------------------------------------------------------

fn read_programs(path: &Path) -> Result<Vec<RawProgram>> {
    let raw = std::fs::read_to_string(path).map_err(|e| ExecAdvisorError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| {
        ExecAdvisorError::parse(format!("invalid program data in {}: {e}", path.display()))
    })
}

/// Load raw programs, falling back to the backup file.
///
/// The primary file is used unless it is missing, unreadable, unparsable, or
/// empty. If neither file yields records, an empty list is returned.
#[instrument(skip_all, fields(primary = %primary.display(), backup = %backup.display()))]
pub fn load_raw(primary: &Path, backup: &Path) -> Vec<RawProgram> {
    match read_programs(primary) {
        Ok(programs) if !programs.is_empty() => {
            info!(count = programs.len(), "loaded raw programs");
            return programs;
        }
        Ok(_) => warn!("primary data is empty, trying backup"),
        Err(e) => warn!(error = %e, "failed to load primary data, trying backup"),
    }

    match read_programs(backup) {
        Ok(programs) => {
            info!(count = programs.len(), "loaded backup programs");
            programs
        }
        Err(e) => {
            tracing::error!(error = %e, "no program data available");
            Vec::new()
        }
    }
}

/// Load previously processed records.
pub fn load_processed(path: &Path) -> Result<Vec<ProgramRecord>> {
    let raw = std::fs::read_to_string(path).map_err(|e| ExecAdvisorError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| {
        ExecAdvisorError::parse(format!("invalid processed data in {}: {e}", path.display()))
    })
}

/// Write processed records as pretty JSON, creating parent directories.
pub fn save_processed(records: &[ProgramRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExecAdvisorError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| ExecAdvisorError::Conversion(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ExecAdvisorError::io(path, e))?;
    info!(count = records.len(), path = %path.display(), "saved processed programs");
    Ok(())
}
