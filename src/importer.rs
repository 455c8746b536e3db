// 📥 Batch Importer - adapted records → reconciler → ImportSummary
//
// One pass over the records, in source order. Each record ends up exactly
// once as created, updated, skipped (lookup failure) or error (validation or
// store fault). A bad record never aborts the run; only a FormatError while
// loading the document does, and that happens before the first record.

use crate::adapter::{
    adapt, load_document, parse_document, AdaptedRecord, DistrictHint, Field, LoadedDocument,
    RawRecord, RecordKind, SourceShape,
};
use crate::config::ImportOptions;
use crate::db::{district_name_for_candidate, insert_import_run, now_timestamp, ImportRun};
use crate::entities::{
    join_name_parts, Candidate, CandidateKey, CandidateUpdates, Organization, OrganizationStatus,
    OrganizationType, OrganizationUpdates,
};
use crate::error::LookupFailure;
use crate::geography::DistrictIndex;
use crate::reconciler::{reconcile, Reconciled};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Breakdown label for candidates without an electoral district
pub const NO_DISTRICT_LABEL: &str = "(sin distrito)";

/// Organization type given to organizations created from a candidate record
pub const STUB_ORGANIZATION_TYPE: &str = "Partido Político";

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordError {
    pub index: usize,
    pub document_number: Option<String>,
    pub name: Option<String>,
    pub organization_code: Option<String>,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub document_number: Option<String>,
    pub name: Option<String>,
    #[serde(serialize_with = "serialize_display")]
    pub reason: LookupFailure,
}

fn serialize_display<S: serde::Serializer>(
    value: &LookupFailure,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
    pub skips: Vec<SkippedRecord>,
    /// Organizations created on the fly from candidate records
    pub stub_organizations: usize,
    pub by_position: BTreeMap<String, usize>,
    pub by_district: BTreeMap<String, usize>,
}

impl ImportSummary {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_success(&self, max_errors: usize) -> bool {
        self.errors.len() <= max_errors
    }

    /// Districts by candidate count, largest first
    pub fn top_districts(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut districts: Vec<(&str, usize)> = self
            .by_district
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        districts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        districts.truncate(limit);
        districts
    }
}

// ============================================================================
// IMPORTER
// ============================================================================

enum Failure {
    Skip(LookupFailure),
    Error(String),
}

struct CandidateOutcome {
    reconciled: Reconciled<Candidate>,
    district_name: Option<String>,
}

pub struct BatchImporter<'a> {
    conn: &'a Connection,
    districts: DistrictIndex,
    options: ImportOptions,
}

impl<'a> BatchImporter<'a> {
    /// Loads the district index once for the whole run
    pub fn new(conn: &'a Connection, options: ImportOptions) -> Result<Self> {
        let districts = DistrictIndex::load(conn).context("Failed to load electoral districts")?;
        if districts.is_empty() {
            tracing::warn!("no electoral districts in store; district hints will not resolve");
        }
        Ok(BatchImporter {
            conn,
            districts,
            options,
        })
    }

    pub fn run(&self, records: &[AdaptedRecord]) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for adapted in records {
            summary.processed += 1;
            let record = &adapted.record;

            match adapted.kind {
                RecordKind::Organization => match self.import_organization(record) {
                    Ok(result) => {
                        count_result(&mut summary, result.was_created);
                    }
                    Err(failure) => record_failure(&mut summary, adapted, failure),
                },
                RecordKind::Candidate => match self.import_candidate(adapted, &mut summary) {
                    Ok(outcome) => {
                        count_result(&mut summary, outcome.reconciled.was_created);
                        let candidate = &outcome.reconciled.entity;
                        *summary
                            .by_position
                            .entry(candidate.position_type.clone())
                            .or_insert(0) += 1;
                        let district = outcome
                            .district_name
                            .unwrap_or_else(|| NO_DISTRICT_LABEL.to_string());
                        *summary.by_district.entry(district).or_insert(0) += 1;
                    }
                    Err(failure) => record_failure(&mut summary, adapted, failure),
                },
            }
        }

        tracing::info!(
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "import finished"
        );
        summary
    }

    fn import_organization(&self, record: &RawRecord) -> Result<Reconciled<Organization>, Failure> {
        let code = record
            .get_owned(Field::OrganizationCode)
            .ok_or(Failure::Skip(LookupFailure::MissingOrganizationCode))?;

        let updates = OrganizationUpdates {
            name: record.get_owned(Field::OrganizationName),
            acronym: record.get_owned(Field::OrganizationAcronym),
            organization_type: record.get(Field::OrganizationType).map(OrganizationType::from_label),
            status: record.get(Field::OrganizationStatus).map(OrganizationStatus::from_label),
            registration_date: record.get_owned(Field::RegistrationDate),
            cancellation_date: record.get_owned(Field::CancellationDate),
            website: record.get_owned(Field::Website),
            address: record.get_owned(Field::Address),
            logo_url: record.get_owned(Field::LogoUrl),
        };

        reconcile::<Organization>(self.conn, &code, &updates)
            .map_err(|err| Failure::Error(err.to_string()))
    }

    /// Existing organization by code, or a stub when the record names it
    fn resolve_organization(
        &self,
        record: &RawRecord,
        summary: &mut ImportSummary,
    ) -> Result<i64, Failure> {
        let code = record
            .get_owned(Field::OrganizationCode)
            .ok_or(Failure::Skip(LookupFailure::MissingOrganizationCode))?;

        let existing = Organization::find_by_code(self.conn, &code)
            .map_err(|err| Failure::Error(err.to_string()))?;
        if let Some(org) = existing {
            return Ok(org.id);
        }

        let name = record
            .get_owned(Field::OrganizationName)
            .ok_or_else(|| Failure::Skip(LookupFailure::OrganizationUnavailable { code: code.clone() }))?;

        let updates = OrganizationUpdates {
            name: Some(name),
            organization_type: Some(OrganizationType::from_label(
                record.get(Field::OrganizationType).unwrap_or(STUB_ORGANIZATION_TYPE),
            )),
            status: Some(OrganizationStatus::Active),
            ..Default::default()
        };
        let stub = reconcile::<Organization>(self.conn, &code, &updates)
            .map_err(|err| Failure::Error(err.to_string()))?;

        tracing::debug!(code = %code, id = stub.entity.id, "organization created from candidate record");
        summary.stub_organizations += 1;
        Ok(stub.entity.id)
    }

    /// (association update, resolved district name, department fallback)
    fn resolve_district(
        &self,
        hint: &DistrictHint,
        record: &RawRecord,
    ) -> Result<(Option<Option<i64>>, Option<String>, Option<String>), Failure> {
        match hint {
            DistrictHint::Keep => Ok((None, None, None)),
            DistrictHint::National => Ok((Some(None), None, None)),
            DistrictHint::Code(code) => {
                let district = self.districts.by_code(code).ok_or_else(|| {
                    Failure::Skip(LookupFailure::UnknownDistrict { code: code.clone() })
                })?;
                Ok((
                    Some(Some(district.id)),
                    Some(district.name.clone()),
                    Some(district.name.clone()),
                ))
            }
            DistrictHint::Geography => {
                let matched = record
                    .get(Field::Department)
                    .and_then(|department| self.districts.match_department(department));
                match matched {
                    Some(district) => Ok((Some(Some(district.id)), Some(district.name.clone()), None)),
                    None => Ok((Some(None), None, None)),
                }
            }
        }
    }

    fn import_candidate(
        &self,
        adapted: &AdaptedRecord,
        summary: &mut ImportSummary,
    ) -> Result<CandidateOutcome, Failure> {
        let record = &adapted.record;

        let organization_id = self.resolve_organization(record, summary)?;
        let (district_update, district_name, department_fallback) =
            self.resolve_district(&adapted.district, record)?;

        let position_type = record
            .get_owned(Field::PositionType)
            .or_else(|| self.options.position_type.clone())
            .or_else(|| adapted.default_position.clone())
            .unwrap_or_default();

        let key = CandidateKey {
            document_number: record.get_owned(Field::DocumentNumber).unwrap_or_default(),
            position_type,
            organization_id,
        };

        let position_number = record.get(Field::PositionNumber).and_then(|raw| {
            let parsed = raw.parse::<i64>().ok();
            if parsed.is_none() {
                tracing::debug!(index = adapted.index, value = raw, "ignoring non-numeric position");
            }
            parsed
        });

        let updates = CandidateUpdates {
            electoral_district_id: district_update,
            position_number,
            document_type: record.get_owned(Field::DocumentType),
            first_name: record.get_owned(Field::FirstName),
            paternal_surname: record.get_owned(Field::PaternalSurname),
            maternal_surname: record.get_owned(Field::MaternalSurname),
            gender: record.get_owned(Field::Gender),
            birth_date: record.get_owned(Field::BirthDate),
            is_native: record.get_owned(Field::IsNative),
            status: record.get_owned(Field::Status),
            photo_guid: record.get_owned(Field::PhotoGuid),
            photo_filename: record.get_owned(Field::PhotoFilename),
            department: record.get_owned(Field::Department).or(department_fallback),
            province: record.get_owned(Field::Province),
            district: record.get_owned(Field::District),
            electoral_file_code: record.get_owned(Field::ElectoralFileCode),
        };

        let reconciled = reconcile::<Candidate>(self.conn, &key, &updates)
            .map_err(|err| Failure::Error(err.to_string()))?;

        let district_name = match adapted.district {
            DistrictHint::Keep => district_name_for_candidate(self.conn, reconciled.entity.id)
                .map_err(|err| Failure::Error(err.to_string()))?,
            _ => district_name,
        };

        Ok(CandidateOutcome {
            reconciled,
            district_name,
        })
    }
}

fn count_result(summary: &mut ImportSummary, was_created: bool) {
    if was_created {
        summary.created += 1;
    } else {
        summary.updated += 1;
    }
}

fn record_name(record: &RawRecord) -> Option<String> {
    let full = join_name_parts(&[
        record.get_owned(Field::FirstName),
        record.get_owned(Field::PaternalSurname),
        record.get_owned(Field::MaternalSurname),
    ]);
    if full.is_empty() {
        record.get_owned(Field::OrganizationName)
    } else {
        Some(full)
    }
}

fn record_failure(summary: &mut ImportSummary, adapted: &AdaptedRecord, failure: Failure) {
    let record = &adapted.record;
    match failure {
        Failure::Skip(reason) => {
            tracing::warn!(index = adapted.index, reason = %reason, "record skipped");
            summary.skipped += 1;
            summary.skips.push(SkippedRecord {
                index: adapted.index,
                document_number: record.get_owned(Field::DocumentNumber),
                name: record_name(record),
                reason,
            });
        }
        Failure::Error(cause) => {
            tracing::debug!(index = adapted.index, cause = %cause, "record failed");
            summary.errors.push(RecordError {
                index: adapted.index,
                document_number: record.get_owned(Field::DocumentNumber),
                name: record_name(record),
                organization_code: record.get_owned(Field::OrganizationCode),
                cause,
            });
        }
    }
}

// ============================================================================
// DOCUMENT IMPORT + LEDGER
// ============================================================================

/// Result of importing one document
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub run_id: String,
    pub source: String,
    pub shape: SourceShape,
    pub summary: ImportSummary,
}

/// Adapt and import an already loaded document, then write the ledger row.
pub fn import_document(
    conn: &Connection,
    document: &LoadedDocument,
    forced_shape: Option<SourceShape>,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    let started_at = now_timestamp();
    let (shape, records) = adapt(&document.value, forced_shape, options.match_geography)?;

    tracing::info!(
        source = %document.source,
        shape = shape.as_str(),
        records = records.len(),
        "import started"
    );

    let importer = BatchImporter::new(conn, options.clone())?;
    let summary = importer.run(&records);

    let run = ImportRun {
        run_id: uuid::Uuid::new_v4().to_string(),
        source: document.source.clone(),
        source_sha256: document.sha256.clone(),
        shape: shape.as_str().to_string(),
        started_at,
        finished_at: now_timestamp(),
        processed: summary.processed,
        created: summary.created,
        updated: summary.updated,
        skipped: summary.skipped,
        errors: summary.errors.len(),
    };
    insert_import_run(conn, &run).context("Failed to record import run")?;

    Ok(ImportOutcome {
        run_id: run.run_id,
        source: run.source,
        shape,
        summary,
    })
}

/// Load a JSON file and import it. A FormatError is returned before any record is touched.
pub fn import_file(
    conn: &Connection,
    path: &Path,
    forced_shape: Option<SourceShape>,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    let document = load_document(path)?;
    import_document(conn, &document, forced_shape, options)
}

/// Import a document built in memory (scrape --import without a saved file)
pub fn import_value(
    conn: &Connection,
    value: &serde_json::Value,
    origin: &str,
    forced_shape: Option<SourceShape>,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    let bytes = serde_json::to_vec(value)?;
    let document = parse_document(&bytes, origin)?;
    import_document(conn, &document, forced_shape, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, open_in_memory, recent_import_runs, Table};
    use crate::entities::{positions, seed_reference_districts, ElectoralDistrict};
    use crate::error::FormatError;
    use serde_json::{json, Value};

    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        seed_reference_districts(&conn);
        conn
    }

    fn run(conn: &Connection, doc: Value, options: ImportOptions) -> ImportSummary {
        let (_, records) = adapt(&doc, None, options.match_geography).unwrap();
        BatchImporter::new(conn, options).unwrap().run(&records)
    }

    fn candidate(doc: &str, org: &str) -> Value {
        json!({
            "idOrganizacionPolitica": org,
            "strOrganizacionPolitica": format!("Party {}", org),
            "strDocumentoIdentidad": doc,
            "strCargo": "DIPUTADO",
            "strNombres": "Ana",
            "strApellidoPaterno": "Lopez"
        })
    }

    #[test]
    fn test_single_record_scenario() {
        let conn = seeded();
        let summary = run(
            &conn,
            json!({"data": [{
                "idOrganizacionPolitica": "X1",
                "strOrganizacionPolitica": "Party X",
                "strDocumentoIdentidad": "12345678",
                "strCargo": "DIPUTADO",
                "strNombres": "Ana",
                "strApellidoPaterno": "Lopez"
            }]}),
            ImportOptions::default(),
        );

        assert_eq!((summary.created, summary.updated, summary.skipped), (1, 0, 0));
        assert!(summary.errors.is_empty());
        assert_eq!(summary.stub_organizations, 1);

        let org = Organization::find_by_code(&conn, "X1").unwrap().unwrap();
        assert_eq!(org.name, "Party X");
        assert_eq!(org.organization_type, Some(OrganizationType::PoliticalParty));
        assert!(org.is_active());

        let stored = Candidate::find_by_document(&conn, "12345678").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].full_name(), "Ana Lopez");
        assert_eq!(summary.by_district.get(NO_DISTRICT_LABEL), Some(&1));
    }

    #[test]
    fn test_second_run_only_updates() {
        let conn = seeded();
        let doc = json!({"data": [candidate("1", "A"), candidate("2", "A"), candidate("3", "B")]});

        let first = run(&conn, doc.clone(), ImportOptions::default());
        assert_eq!(first.created, 3);

        let second = run(&conn, doc, ImportOptions::default());
        assert_eq!((second.created, second.updated), (0, 3));
        assert_eq!(second.stub_organizations, 0);
        assert_eq!(count_rows(&conn, Table::Candidates).unwrap(), 3);
        assert_eq!(count_rows(&conn, Table::Organizations).unwrap(), 2);
    }

    #[test]
    fn test_bad_record_is_isolated() {
        let conn = seeded();
        let mut items: Vec<Value> = (1..=10).map(|i| candidate(&format!("{:08}", i), "A")).collect();
        items[4]["strDocumentoIdentidad"] = json!("");

        let summary = run(&conn, json!({ "data": items }), ImportOptions::default());

        assert_eq!(summary.processed, 10);
        assert_eq!(summary.created, 9);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].index, 5);
        assert!(summary.errors[0].cause.contains("document_number"));
        assert_eq!(summary.errors[0].name.as_deref(), Some("Ana Lopez"));
        assert!(!summary.is_success(0));
        assert!(summary.is_success(1));
    }

    #[test]
    fn test_organization_lookup_failures_are_skips() {
        let conn = seeded();
        let summary = run(
            &conn,
            json!({"data": [
                {"strDocumentoIdentidad": "1", "strCargo": "DIPUTADO"},
                {"strDocumentoIdentidad": "2", "strCargo": "DIPUTADO", "idOrganizacionPolitica": "Z9"},
                "not an object"
            ]}),
            ImportOptions::default(),
        );

        assert_eq!(summary.skipped, 3);
        assert!(summary.errors.is_empty());
        assert!(summary.is_success(0));
        assert_eq!(summary.skips[0].reason, LookupFailure::MissingOrganizationCode);
        assert_eq!(
            summary.skips[1].reason,
            LookupFailure::OrganizationUnavailable { code: "Z9".to_string() }
        );
        assert_eq!(count_rows(&conn, Table::Organizations).unwrap(), 0);
    }

    #[test]
    fn test_existing_organization_is_not_renamed_by_candidates() {
        let conn = seeded();
        run(
            &conn,
            json!({"Data": [{"TxCodOp": "A", "TxDesOp": "Partido A", "TxSiglasOp": "PA",
                             "TxDesTipOp": "Partido Político", "TxDesEstOp": "Inscrito"}]}),
            ImportOptions::default(),
        );
        run(&conn, json!({"data": [candidate("1", "A")]}), ImportOptions::default());

        let org = Organization::find_by_code(&conn, "A").unwrap().unwrap();
        assert_eq!(org.name, "Partido A");
        assert_eq!(org.display_name(), "Partido A (PA)");
    }

    #[test]
    fn test_organization_catalog_missing_code() {
        let conn = seeded();
        let summary = run(
            &conn,
            json!({"Data": [
                {"TxCodOp": "1", "TxDesOp": "Uno"},
                {"TxCodOp": "", "TxDesOp": "Sin código"},
                {"TxCodOp": "3"}
            ]}),
            ImportOptions::default(),
        );
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].cause.contains("name"));
        assert!(summary.by_position.is_empty());
    }

    #[test]
    fn test_grouped_by_district_codes() {
        let conn = seeded();
        let mut record = candidate("1", "A");
        record.as_object_mut().unwrap().remove("strCargo");

        let summary = run(
            &conn,
            json!({"metadata": {}, "districts": [
                {"district_code": "TACNA", "district_name": "Tacna", "candidates": [record]},
                {"district_code": "ATLANTIS", "district_name": "Atlantis", "candidates": [candidate("2", "A")]}
            ]}),
            ImportOptions::default(),
        );

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            summary.skips[0].reason,
            LookupFailure::UnknownDistrict { code: "ATLANTIS".to_string() }
        );
        assert_eq!(summary.by_district.get("Tacna"), Some(&1));
        assert_eq!(summary.by_position.get(positions::DEPUTY), Some(&1));

        let stored = &Candidate::find_by_document(&conn, "1").unwrap()[0];
        let tacna = ElectoralDistrict::find_by_code(&conn, "TACNA").unwrap().unwrap();
        assert_eq!(stored.electoral_district_id, Some(tacna.id));
        assert_eq!(stored.department.as_deref(), Some("Tacna"));
    }

    #[test]
    fn test_senate_batches_and_last_write_wins() {
        let conn = seeded();
        let mut senator = candidate("1", "A");
        senator["strCargo"] = json!("SENADOR");
        senator["strDepartamento"] = json!("APURIMAC");

        let multiple = run(
            &conn,
            json!({"results": [{"election_type": "SENADORES_DISTRITO_MULTIPLE", "candidates": [senator.clone()]}]}),
            ImportOptions::default(),
        );
        assert_eq!(multiple.by_district.get("Apurímac"), Some(&1));

        let single = run(
            &conn,
            json!({"results": [{"election_type": "SENADORES_DISTRITO_UNICO", "candidates": [senator]}]}),
            ImportOptions::default(),
        );
        assert_eq!(single.updated, 1);
        assert_eq!(single.by_district.get(NO_DISTRICT_LABEL), Some(&1));

        let stored = &Candidate::find_by_document(&conn, "1").unwrap()[0];
        assert_eq!(stored.electoral_district_id, None);
    }

    #[test]
    fn test_senate_batches_always_key_on_senator() {
        let conn = seeded();
        let mut senator = candidate("1", "A");
        senator["strCargo"] = json!("SENADOR TITULAR");

        let options = ImportOptions {
            position_type: Some("DIPUTADO".to_string()),
            ..Default::default()
        };
        let summary = run(
            &conn,
            json!({"results": [{"election_type": "SENADORES_DISTRITO_UNICO", "candidates": [senator]}]}),
            options,
        );
        assert_eq!(summary.by_position.get(positions::SENATOR), Some(&1));

        let stored = &Candidate::find_by_document(&conn, "1").unwrap()[0];
        assert_eq!(stored.position_type, positions::SENATOR);
        assert!(stored.is_senator());
    }

    #[test]
    fn test_flat_list_keeps_district_unless_matching() {
        let conn = seeded();
        let mut record = candidate("1", "A");
        record["strDepartamento"] = json!("CUSCO");
        let doc = json!({"data": [record]});

        let plain = run(&conn, doc.clone(), ImportOptions::default());
        assert_eq!(plain.by_district.get(NO_DISTRICT_LABEL), Some(&1));

        let matched = run(
            &conn,
            doc.clone(),
            ImportOptions {
                match_geography: true,
                ..Default::default()
            },
        );
        assert_eq!(matched.by_district.get("Cusco"), Some(&1));

        // Keep reports the association already stored
        let again = run(&conn, doc, ImportOptions::default());
        assert_eq!(again.by_district.get("Cusco"), Some(&1));
    }

    #[test]
    fn test_position_type_fallbacks() {
        let conn = seeded();
        let mut record = candidate("1", "A");
        record.as_object_mut().unwrap().remove("strCargo");

        let missing = run(&conn, json!({"data": [record.clone()]}), ImportOptions::default());
        assert_eq!(missing.errors.len(), 1);
        assert!(missing.errors[0].cause.contains("position_type"));

        let forced = run(
            &conn,
            json!({"data": [record]}),
            ImportOptions {
                position_type: Some(positions::PRESIDENT.to_string()),
                ..Default::default()
            },
        );
        assert_eq!(forced.created, 1);
        assert_eq!(forced.by_position.get(positions::PRESIDENT), Some(&1));
    }

    #[test]
    fn test_top_districts_ordering() {
        let mut summary = ImportSummary::default();
        summary.by_district.insert("Lima".to_string(), 5);
        summary.by_district.insert("Cusco".to_string(), 2);
        summary.by_district.insert("Arequipa".to_string(), 2);

        assert_eq!(summary.top_districts(2), vec![("Lima", 5), ("Arequipa", 2)]);
    }

    #[test]
    fn test_import_file_writes_ledger() {
        let conn = seeded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("02_Diputados.json");
        std::fs::write(&path, json!({"data": [candidate("1", "A")]}).to_string()).unwrap();

        let outcome = import_file(&conn, &path, None, &ImportOptions::default()).unwrap();
        assert_eq!(outcome.shape, SourceShape::FlatList);
        assert_eq!(outcome.summary.created, 1);

        let runs = recent_import_runs(&conn, 1).unwrap();
        assert_eq!(runs[0].run_id, outcome.run_id);
        assert_eq!(runs[0].shape, "flat_list");
        assert_eq!(runs[0].created, 1);
    }

    #[test]
    fn test_format_error_aborts_before_any_record() {
        let conn = seeded();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weird.json");
        std::fs::write(&path, r#"{"candidates": []}"#).unwrap();

        let err = import_file(&conn, &path, None, &ImportOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormatError>(),
            Some(FormatError::UnknownShape { .. })
        ));
        assert!(recent_import_runs(&conn, 1).unwrap().is_empty());
    }
}
