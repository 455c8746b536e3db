// 📊 Reporting - human-readable summaries printed by the CLI
//
// Everything here only reads; counts come from ImportSummary, ScrapeStats or
// the store. Output goes to stdout; diagnostics go through tracing.

use crate::db::{
    count_candidates_by_district, count_candidates_by_position, count_candidates_without_district,
    count_organizations_with_status, count_rows, recent_import_runs, total_seats, Table,
};
use crate::entities::{positions, ElectoralDistrict, OrganizationStatus, SeedSummary};
use crate::fetch::ScrapeStats;
use crate::importer::ImportOutcome;
use anyhow::Result;
use rusqlite::Connection;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const TOP_DISTRICTS: usize = 10;

pub fn print_import_summary(outcome: &ImportOutcome, show_errors: usize) {
    let summary = &outcome.summary;

    println!("\n{}", RULE);
    println!("📥 IMPORT SUMMARY - {}", outcome.shape.name());
    println!("{}", RULE);
    println!("📄 Source: {}", outcome.source);
    println!("📊 Processed: {}", summary.processed);
    println!("✅ Created: {}", summary.created);
    println!("🔄 Updated: {}", summary.updated);
    println!("⏭️  Skipped: {}", summary.skipped);
    println!("❌ Errors: {}", summary.errors.len());
    if summary.stub_organizations > 0 {
        println!("🏛️  Organizations created from candidate records: {}", summary.stub_organizations);
    }

    if !summary.errors.is_empty() && show_errors > 0 {
        println!("\n❌ First {} errors:", show_errors.min(summary.errors.len()));
        for error in summary.errors.iter().take(show_errors) {
            println!(
                "  • record {} (DNI: {}, {}): {}",
                error.index,
                error.document_number.as_deref().unwrap_or("-"),
                error.name.as_deref().unwrap_or("sin nombre"),
                error.cause
            );
        }
    }

    if !summary.skips.is_empty() && show_errors > 0 {
        println!("\n⏭️  First {} skips:", show_errors.min(summary.skips.len()));
        for skip in summary.skips.iter().take(show_errors) {
            println!(
                "  • record {} (DNI: {}): {}",
                skip.index,
                skip.document_number.as_deref().unwrap_or("-"),
                skip.reason
            );
        }
    }

    if !summary.by_position.is_empty() {
        println!("\n👥 By position:");
        for (position, count) in &summary.by_position {
            println!("  {:<45} {:>6}", position, count);
        }
    }

    let top = summary.top_districts(TOP_DISTRICTS);
    if !top.is_empty() {
        println!("\n🗺️  Top {} districts:", top.len());
        for (district, count) in top {
            println!("  {:<45} {:>6}", district, count);
        }
    }
    println!("{}", RULE);
}

pub fn print_scrape_summary(title: &str, stats: &ScrapeStats, saved_to: Option<&str>) {
    println!("\n{}", RULE);
    println!("🔍 SCRAPE SUMMARY - {}", title);
    println!("{}", RULE);
    println!("✅ Units with candidates: {}", stats.units);
    println!("📊 Total candidates: {}", stats.candidates);
    println!("🌐 Requests: {}", stats.requests);
    println!("❌ Errors: {}", stats.errors.len());

    for error in &stats.errors {
        println!("  • {}: {}", error.unit, error.error);
    }

    let mut per_unit = stats.per_unit.clone();
    per_unit.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    if !per_unit.is_empty() {
        println!("\n🗺️  Top units:");
        for (unit, count) in per_unit.iter().take(TOP_DISTRICTS) {
            println!("  {:<45} {:>6}", unit, count);
        }
    }

    if let Some(path) = saved_to {
        println!("\n💾 Saved to: {}", path);
    }
    println!("{}", RULE);
}

pub fn print_seed_summary(summary: &SeedSummary) {
    println!("🗺️  Electoral districts: {} created, {} updated", summary.created, summary.updated);
    for error in &summary.errors {
        println!("  ⚠️  {}", error);
    }
}

/// Store status: totals, per-position counts, deputies per district, gaps.
pub fn print_status(conn: &Connection) -> Result<()> {
    println!("\n{}", RULE);
    println!("🗄️  DATABASE STATUS");
    println!("{}", RULE);

    let districts = ElectoralDistrict::all(conn)?;
    println!("🗺️  Electoral districts: {} ({} seats)", districts.len(), total_seats(conn)?);

    let organizations = count_rows(conn, Table::Organizations)?;
    let active = count_organizations_with_status(conn, OrganizationStatus::Active.as_label())?;
    println!("🏛️  Political organizations: {} ({} inscritas)", organizations, active);

    println!("👥 Candidates: {}", count_rows(conn, Table::Candidates)?);
    for (position, count) in count_candidates_by_position(conn)? {
        println!("  {:<45} {:>6}", position, count);
    }

    let deputies = count_candidates_by_district(conn, Some(positions::DEPUTY))?;
    if !deputies.is_empty() {
        println!("\n🗺️  Deputies per district:");
        for (district, count) in &deputies {
            println!("  {:<45} {:>6}", district, count);
        }
    }
    let without = count_candidates_without_district(conn, Some(positions::DEPUTY))?;
    if without > 0 {
        println!("  {:<45} {:>6}", crate::importer::NO_DISTRICT_LABEL, without);
    }

    let missing: Vec<&str> = districts
        .iter()
        .filter(|d| !deputies.iter().any(|(name, _)| name == &d.name))
        .map(|d| d.name.as_str())
        .collect();
    if !missing.is_empty() {
        println!("\n⚠️  Districts without deputies: {}", missing.join(", "));
    }

    let runs = recent_import_runs(conn, 5)?;
    if !runs.is_empty() {
        println!("\n📜 Recent imports:");
        for run in runs {
            println!(
                "  {} {} [{}] +{} ~{} ⏭{} ❌{}",
                run.finished_at, run.source, run.shape, run.created, run.updated, run.skipped, run.errors
            );
        }
    }
    println!("{}", RULE);
    Ok(())
}
