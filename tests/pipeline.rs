// End-to-end: documents on disk → import → store queries

use candidate_directory::db::{count_rows, get_events_for_entity, Table};
use candidate_directory::{
    import_file, open, open_in_memory, search_candidates, seed_reference_districts, Candidate,
    CandidateFilter, ElectoralDistrict, FormatError, ImportOptions, Organization, SourceShape,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn seeded() -> Connection {
    let conn = open_in_memory().unwrap();
    seed_reference_districts(&conn);
    conn
}

fn deputy(doc: &str, org: &str, department: &str) -> Value {
    json!({
        "idOrganizacionPolitica": org,
        "strOrganizacionPolitica": format!("Partido {}", org),
        "strDocumentoIdentidad": doc,
        "strCargo": "DIPUTADO",
        "strNombres": "Nombre",
        "strApellidoPaterno": format!("Apellido{}", doc),
        "strDepartamento": department,
        "strEstadoCandidato": "INSCRITO"
    })
}

#[test]
fn test_reimport_is_idempotent() {
    let conn = seeded();
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(
        dir.path(),
        "deputies.json",
        &json!({"data": [deputy("1", "A", "LIMA"), deputy("2", "B", "CUSCO"), deputy("3", "A", "PUNO")]}),
    );

    let first = import_file(&conn, &path, None, &ImportOptions::default()).unwrap();
    assert_eq!(first.summary.created, 3);

    let candidates = count_rows(&conn, Table::Candidates).unwrap();
    let organizations = count_rows(&conn, Table::Organizations).unwrap();

    let second = import_file(&conn, &path, None, &ImportOptions::default()).unwrap();
    assert_eq!(second.summary.created, 0);
    assert_eq!(second.summary.updated, 3);
    assert_eq!(count_rows(&conn, Table::Candidates).unwrap(), candidates);
    assert_eq!(count_rows(&conn, Table::Organizations).unwrap(), organizations);
}

#[test]
fn test_natural_key_is_unique_across_documents() {
    let conn = seeded();
    let dir = tempfile::tempdir().unwrap();

    // Same person, same position, same organization, in three documents of different shapes
    let flat = write_json(dir.path(), "flat.json", &json!({"data": [deputy("42", "A", "LIMA")]}));
    let grouped = write_json(
        dir.path(),
        "grouped.json",
        &json!({"metadata": {}, "districts": [
            {"district_code": "LIMA", "district_name": "Lima", "candidates": [deputy("42", "A", "LIMA")]}
        ]}),
    );
    let other_org = write_json(dir.path(), "other.json", &json!({"data": [deputy("42", "B", "LIMA")]}));

    for path in [&flat, &grouped, &other_org] {
        import_file(&conn, path, None, &ImportOptions::default()).unwrap();
    }

    let rows = Candidate::find_by_document(&conn, "42").unwrap();
    assert_eq!(rows.len(), 2);
    let mut keys: Vec<_> = rows.iter().map(|c| c.key()).collect();
    keys.dedup();
    assert_eq!(keys.len(), 2);
}

#[test]
fn test_unknown_organization_with_name_is_created() {
    let conn = seeded();
    let dir = tempfile::tempdir().unwrap();
    let path = write_json(
        dir.path(),
        "single.json",
        &json!({"data": [{
            "idOrganizacionPolitica": "X1",
            "strOrganizacionPolitica": "Party X",
            "strTipoOrgPolitica": "Alianza Electoral",
            "strDocumentoIdentidad": "12345678",
            "strCargo": "DIPUTADO",
            "strNombres": "Ana",
            "strApellidoPaterno": "Lopez"
        }]}),
    );

    let outcome = import_file(&conn, &path, None, &ImportOptions::default()).unwrap();
    let summary = &outcome.summary;
    assert_eq!(
        (summary.created, summary.updated, summary.skipped, summary.errors.len()),
        (1, 0, 0, 0)
    );

    let org = Organization::find_by_code(&conn, "X1").unwrap().unwrap();
    assert_eq!(org.name, "Party X");
    assert_eq!(org.organization_type.unwrap().as_label(), "Alianza Electoral");

    // The stub is in the audit trail
    let events = get_events_for_entity(&conn, "organization", &org.id.to_string()).unwrap();
    assert_eq!(events[0].event_type, "organization_created");
}

#[test]
fn test_department_matches_accented_district() {
    let conn = seeded();
    let dir = tempfile::tempdir().unwrap();
    let mut senator = deputy("7", "A", "APURIMAC");
    senator["strCargo"] = json!("SENADOR");
    let path = write_json(
        dir.path(),
        "senators.json",
        &json!({"scraped_at": "2026-01-01T00:00:00Z", "total_batches": 1, "total_candidates": 1,
                "results": [{"election_type": "SENADORES_DISTRITO_MULTIPLE", "tipo_eleccion_id": 21,
                             "count": 1, "candidates": [senator]}]}),
    );

    let outcome = import_file(&conn, &path, None, &ImportOptions::default()).unwrap();
    assert_eq!(outcome.shape, SourceShape::GroupedByBatch);

    let apurimac = ElectoralDistrict::find_by_code(&conn, "APURIMAC").unwrap().unwrap();
    assert_eq!(apurimac.name, "Apurímac");
    let stored = &Candidate::find_by_document(&conn, "7").unwrap()[0];
    assert_eq!(stored.electoral_district_id, Some(apurimac.id));
}

#[test]
fn test_one_bad_record_out_of_ten() {
    let conn = seeded();
    let dir = tempfile::tempdir().unwrap();
    let mut records: Vec<Value> = (1..=10).map(|i| deputy(&i.to_string(), "A", "LIMA")).collect();
    records[4].as_object_mut().unwrap().remove("strDocumentoIdentidad");
    let path = write_json(dir.path(), "ten.json", &json!({ "data": records }));

    let outcome = import_file(&conn, &path, None, &ImportOptions::default()).unwrap();
    let summary = &outcome.summary;

    assert_eq!(summary.created + summary.updated, 9);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].index, 5);
    assert!(!summary.is_success(0));
}

#[test]
fn test_malformed_documents_are_fatal() {
    let conn = seeded();
    let dir = tempfile::tempdir().unwrap();

    let not_json = dir.path().join("broken.json");
    fs::write(&not_json, "[{").unwrap();
    let err = import_file(&conn, &not_json, None, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err.downcast_ref::<FormatError>(), Some(FormatError::InvalidJson { .. })));

    let wrong_array = write_json(dir.path(), "wrong.json", &json!({"data": {"x": 1}}));
    let err = import_file(&conn, &wrong_array, Some(SourceShape::FlatList), &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<FormatError>(), Some(FormatError::MissingArray { .. })));

    let missing = dir.path().join("missing.json");
    let err = import_file(&conn, &missing, None, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err.downcast_ref::<FormatError>(), Some(FormatError::NotFound { .. })));

    assert_eq!(count_rows(&conn, Table::Candidates).unwrap(), 0);
}

#[test]
fn test_catalog_then_candidates_then_listing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("candidates.db");
    let conn = open(&db_path).unwrap();
    seed_reference_districts(&conn);

    let catalog = write_json(
        dir.path(),
        "organizations.json",
        &json!({"Data": [
            {"TxCodOp": "A", "TxDesOp": "Partido A", "TxSiglasOp": "PA", "TxDesTipOp": "Partido Político",
             "TxDesEstOp": "Inscrito", "FeInscrpOp": "2020-01-15", "TxSitioWebOp": "https://pa.pe"},
            {"TxCodOp": "B", "TxDesOp": "Partido B", "TxDesEstOp": "Cancelado"}
        ]}),
    );
    let outcome = import_file(&conn, &catalog, None, &ImportOptions::default()).unwrap();
    assert_eq!(outcome.shape, SourceShape::OrganizationCatalog);
    assert_eq!(outcome.summary.created, 2);

    let deputies = write_json(
        dir.path(),
        "deputies.json",
        &json!({"data": [deputy("1", "A", "TACNA"), deputy("2", "B", "TACNA")]}),
    );
    let options = ImportOptions {
        match_geography: true,
        ..Default::default()
    };
    let outcome = import_file(&conn, &deputies, None, &options).unwrap();
    assert_eq!(outcome.summary.by_district.get("Tacna"), Some(&2));
    assert_eq!(outcome.summary.stub_organizations, 0);

    let rows = search_candidates(
        &conn,
        &CandidateFilter {
            district: Some("TACNA".to_string()),
            organization_code: Some("A".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].organization_name, "Partido A");
    assert_eq!(rows[0].electoral_district.as_deref(), Some("Tacna"));

    // Reopening the file sees the same data
    drop(conn);
    let reopened = open(&db_path).unwrap();
    assert_eq!(count_rows(&reopened, Table::Candidates).unwrap(), 2);
}
