// 📤 Export - filtered candidate listing as CSV

use crate::db::{search_candidates, CandidateFilter};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::io::Write;

/// Write matching candidates to `out`. Returns the number of rows written.
pub fn write_candidates_csv<W: Write>(
    conn: &Connection,
    filter: &CandidateFilter,
    out: W,
) -> Result<usize> {
    let rows = search_candidates(conn, filter)?;

    // Header comes from the CandidateRow field order
    let mut writer = csv::Writer::from_writer(out);
    if rows.is_empty() {
        writer.write_record([
            "position_type",
            "position_number",
            "document_number",
            "full_name",
            "organization_code",
            "organization_name",
            "electoral_district",
            "department",
            "status",
        ])?;
    }
    for row in &rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    writer.flush()?;

    Ok(rows.len())
}
