// 🔌 Source Adapter - heterogeneous JSON documents → one canonical record shape
//
// Four document shapes are recognized:
//   FlatList            {"data": [candidate, ...]}           (or "Data")
//   OrganizationCatalog {"Data": [{"TxCodOp": ..}, ...]}     (or "data")
//   GroupedByDistrict   {"metadata": .., "districts": [{district_code, candidates}]}
//   GroupedByBatch      {"results": [{election_type, candidates}]}
//
// Every shape flattens to Vec<AdaptedRecord>, in source order. The adapter
// never touches the store: district hints are resolved by the importer.

use crate::entities::positions;
use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ============================================================================
// CANONICAL FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    // Candidate
    DocumentNumber,
    DocumentType,
    PositionType,
    PositionNumber,
    FirstName,
    PaternalSurname,
    MaternalSurname,
    Gender,
    BirthDate,
    IsNative,
    Status,
    PhotoGuid,
    PhotoFilename,
    Department,
    Province,
    District,
    ElectoralFileCode,

    // Organization (both shapes)
    OrganizationCode,
    OrganizationName,
    OrganizationType,

    // Organization catalog only
    OrganizationAcronym,
    OrganizationStatus,
    RegistrationDate,
    CancellationDate,
    Website,
    Address,
    LogoUrl,
}

/// Source field name → canonical field
pub const FIELD_TABLE: [(&str, Field); 30] = [
    ("strDocumentoIdentidad", Field::DocumentNumber),
    ("strTipoDocumento", Field::DocumentType),
    ("strCargo", Field::PositionType),
    ("intPosicion", Field::PositionNumber),
    ("strNombres", Field::FirstName),
    ("strApellidoPaterno", Field::PaternalSurname),
    ("strApellidoMaterno", Field::MaternalSurname),
    ("strSexo", Field::Gender),
    ("strFechaNacimiento", Field::BirthDate),
    ("strEsNativo", Field::IsNative),
    ("strEstadoCandidato", Field::Status),
    ("strGuidFoto", Field::PhotoGuid),
    ("strNombre", Field::PhotoFilename),
    ("strDepartamento", Field::Department),
    ("strProvincia", Field::Province),
    ("strDistrito", Field::District),
    ("strCodExpedienteExt", Field::ElectoralFileCode),
    ("idOrganizacionPolitica", Field::OrganizationCode),
    ("strOrganizacionPolitica", Field::OrganizationName),
    ("strTipoOrgPolitica", Field::OrganizationType),
    ("TxCodOp", Field::OrganizationCode),
    ("TxDesOp", Field::OrganizationName),
    ("TxSiglasOp", Field::OrganizationAcronym),
    ("TxDesTipOp", Field::OrganizationType),
    ("TxDesEstOp", Field::OrganizationStatus),
    ("FeInscrpOp", Field::RegistrationDate),
    ("FeCancelOp", Field::CancellationDate),
    ("TxSitioWebOp", Field::Website),
    ("TxDireccionOp", Field::Address),
    ("TxLogoOp", Field::LogoUrl),
];

fn lookup_field(source_name: &str) -> Option<Field> {
    FIELD_TABLE
        .iter()
        .find(|(name, _)| *name == source_name)
        .map(|(_, field)| *field)
}

/// Trimmed string form of a scalar. Blank strings, nulls and containers are absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One source record keyed by canonical field. Only present values are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: HashMap<Field, String>,
}

impl RawRecord {
    /// Translate a JSON element. Non-objects become empty records.
    pub fn from_json(value: &Value) -> Self {
        let mut record = RawRecord::default();
        if let Value::Object(map) = value {
            for (key, raw) in map {
                if let (Some(field), Some(text)) = (lookup_field(key), scalar_to_string(raw)) {
                    record.fields.insert(field, text);
                }
            }
        }
        record
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn get_owned(&self, field: Field) -> Option<String> {
        self.fields.get(&field).cloned()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.insert(field, value.trim().to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Organization,
    Candidate,
}

/// What to do with the candidate's electoral district association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistrictHint {
    /// Leave the stored association untouched
    Keep,
    /// Nationwide list: clear the association
    National,
    /// Explicit district code from the document
    Code(String),
    /// Match the record's department against district names
    Geography,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptedRecord {
    /// 1-based position in the document (across groups)
    pub index: usize,
    pub kind: RecordKind,
    pub record: RawRecord,
    pub district: DistrictHint,
    /// Position type implied by the document layout, used when the record has none
    pub default_position: Option<String>,
}

// ============================================================================
// SHAPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceShape {
    FlatList,
    OrganizationCatalog,
    GroupedByDistrict,
    GroupedByBatch,
}

impl SourceShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceShape::FlatList => "flat_list",
            SourceShape::OrganizationCatalog => "organization_catalog",
            SourceShape::GroupedByDistrict => "grouped_by_district",
            SourceShape::GroupedByBatch => "grouped_by_batch",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            SourceShape::FlatList => "Candidate list",
            SourceShape::OrganizationCatalog => "Organization catalog",
            SourceShape::GroupedByDistrict => "Candidates grouped by district",
            SourceShape::GroupedByBatch => "Candidates grouped by election batch",
        }
    }
}

/// Senate batch labels written by the scraper
pub const SENATE_MULTIPLE_DISTRICT: &str = "SENADORES_DISTRITO_MULTIPLE";
pub const SENATE_SINGLE_DISTRICT: &str = "SENADORES_DISTRITO_UNICO";

/// Detect the shape from the top-level keys.
pub fn detect_shape(document: &Value) -> Result<SourceShape, FormatError> {
    let map = document.as_object().ok_or(FormatError::NotAnObject)?;

    if map.contains_key("districts") {
        return Ok(SourceShape::GroupedByDistrict);
    }
    if map.contains_key("results") {
        return Ok(SourceShape::GroupedByBatch);
    }
    if let Some(Value::Array(items)) = map.get("Data").or_else(|| map.get("data")) {
        let is_catalog = items
            .iter()
            .find_map(Value::as_object)
            .map(|first| first.contains_key("TxCodOp"))
            .unwrap_or(false);
        return Ok(if is_catalog {
            SourceShape::OrganizationCatalog
        } else {
            SourceShape::FlatList
        });
    }

    Err(FormatError::UnknownShape {
        keys: map.keys().cloned().collect(),
    })
}

/// Array under the first of `keys` present; error if absent or not an array.
fn require_array<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Result<&'a Vec<Value>, FormatError> {
    keys.iter()
        .find_map(|key| map.get(*key))
        .and_then(Value::as_array)
        .ok_or_else(|| FormatError::MissingArray {
            expected: keys.join("/"),
        })
}

fn as_object(document: &Value) -> Result<&Map<String, Value>, FormatError> {
    document.as_object().ok_or(FormatError::NotAnObject)
}

// ============================================================================
// SHAPE ADAPTERS
// ============================================================================

/// DocumentAdapter - one implementation per document shape
pub trait DocumentAdapter {
    fn adapt(&self, document: &Value) -> Result<Vec<AdaptedRecord>, FormatError>;

    fn shape(&self) -> SourceShape;
}

/// `{"data": [...]}` candidate list
pub struct FlatListAdapter {
    pub match_geography: bool,
}

impl DocumentAdapter for FlatListAdapter {
    fn adapt(&self, document: &Value) -> Result<Vec<AdaptedRecord>, FormatError> {
        let items = require_array(as_object(document)?, &["data", "Data"])?;
        let hint = if self.match_geography {
            DistrictHint::Geography
        } else {
            DistrictHint::Keep
        };

        Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| AdaptedRecord {
                index: i + 1,
                kind: RecordKind::Candidate,
                record: RawRecord::from_json(item),
                district: hint.clone(),
                default_position: None,
            })
            .collect())
    }

    fn shape(&self) -> SourceShape {
        SourceShape::FlatList
    }
}

/// `{"Data": [{"TxCodOp": ...}]}` organization catalog
pub struct OrganizationCatalogAdapter;

impl DocumentAdapter for OrganizationCatalogAdapter {
    fn adapt(&self, document: &Value) -> Result<Vec<AdaptedRecord>, FormatError> {
        let items = require_array(as_object(document)?, &["Data", "data"])?;

        Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| AdaptedRecord {
                index: i + 1,
                kind: RecordKind::Organization,
                record: RawRecord::from_json(item),
                district: DistrictHint::Keep,
                default_position: None,
            })
            .collect())
    }

    fn shape(&self) -> SourceShape {
        SourceShape::OrganizationCatalog
    }
}

/// Scraped deputies: `{"metadata": .., "districts": [...]}`
pub struct GroupedByDistrictAdapter;

impl DocumentAdapter for GroupedByDistrictAdapter {
    fn adapt(&self, document: &Value) -> Result<Vec<AdaptedRecord>, FormatError> {
        let groups = require_array(as_object(document)?, &["districts"])?;
        let mut records = Vec::new();

        for group in groups {
            let hint = match group.get("district_code").and_then(scalar_to_string) {
                Some(code) => DistrictHint::Code(code),
                None => DistrictHint::Geography,
            };
            let candidates = group
                .get("candidates")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for item in candidates {
                records.push(AdaptedRecord {
                    index: records.len() + 1,
                    kind: RecordKind::Candidate,
                    record: RawRecord::from_json(item),
                    district: hint.clone(),
                    default_position: Some(positions::DEPUTY.to_string()),
                });
            }
        }

        Ok(records)
    }

    fn shape(&self) -> SourceShape {
        SourceShape::GroupedByDistrict
    }
}

/// Scraped senators: `{"results": [{"election_type": .., "candidates": [...]}]}`
pub struct GroupedByBatchAdapter;

impl GroupedByBatchAdapter {
    /// Single national district → nationwide; multiple districts or unknown → geography
    pub fn hint_for_batch(label: Option<&str>) -> DistrictHint {
        match label {
            Some(SENATE_SINGLE_DISTRICT) => DistrictHint::National,
            // SENATE_MULTIPLE_DISTRICT and anything unrecognized
            _ => DistrictHint::Geography,
        }
    }
}

impl DocumentAdapter for GroupedByBatchAdapter {
    fn adapt(&self, document: &Value) -> Result<Vec<AdaptedRecord>, FormatError> {
        let batches = require_array(as_object(document)?, &["results"])?;
        let mut records = Vec::new();

        for batch in batches {
            let label = batch.get("election_type").and_then(Value::as_str);
            let hint = GroupedByBatchAdapter::hint_for_batch(label);
            let candidates = batch
                .get("candidates")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for item in candidates {
                // Every batch is a senate list; the record's own strCargo never wins here
                let mut record = RawRecord::from_json(item);
                record.set(Field::PositionType, positions::SENATOR);
                records.push(AdaptedRecord {
                    index: records.len() + 1,
                    kind: RecordKind::Candidate,
                    record,
                    district: hint.clone(),
                    default_position: Some(positions::SENATOR.to_string()),
                });
            }
        }

        Ok(records)
    }

    fn shape(&self) -> SourceShape {
        SourceShape::GroupedByBatch
    }
}

/// Get the adapter for a shape
pub fn get_adapter(shape: SourceShape, match_geography: bool) -> Box<dyn DocumentAdapter> {
    match shape {
        SourceShape::FlatList => Box::new(FlatListAdapter { match_geography }),
        SourceShape::OrganizationCatalog => Box::new(OrganizationCatalogAdapter),
        SourceShape::GroupedByDistrict => Box::new(GroupedByDistrictAdapter),
        SourceShape::GroupedByBatch => Box::new(GroupedByBatchAdapter),
    }
}

/// Adapt a parsed document, detecting the shape unless one is forced.
pub fn adapt(
    document: &Value,
    forced: Option<SourceShape>,
    match_geography: bool,
) -> Result<(SourceShape, Vec<AdaptedRecord>), FormatError> {
    let shape = match forced {
        Some(shape) => shape,
        None => detect_shape(document)?,
    };
    let records = get_adapter(shape, match_geography).adapt(document)?;
    tracing::debug!(shape = shape.as_str(), records = records.len(), "document adapted");
    Ok((shape, records))
}

// ============================================================================
// LOADING
// ============================================================================

/// A parsed source document plus its provenance
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: String,
    pub sha256: String,
    pub value: Value,
}

pub fn parse_document(bytes: &[u8], origin: &str) -> Result<LoadedDocument, FormatError> {
    let value = serde_json::from_slice(bytes).map_err(|source| FormatError::InvalidJson {
        origin: origin.to_string(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(bytes);

    Ok(LoadedDocument {
        source: origin.to_string(),
        sha256: format!("{:x}", hasher.finalize()),
        value,
    })
}

pub fn load_document(path: &Path) -> Result<LoadedDocument, FormatError> {
    if !path.exists() {
        return Err(FormatError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| FormatError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&bytes, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_translation() {
        let record = RawRecord::from_json(&json!({
            "strDocumentoIdentidad": " 12345678 ",
            "strCargo": "DIPUTADO",
            "idOrganizacionPolitica": 1264,
            "intPosicion": 3,
            "strNombres": "",
            "strApellidoMaterno": null,
            "strEsNativo": false,
            "strSomethingElse": "ignored"
        }));

        assert_eq!(record.get(Field::DocumentNumber), Some("12345678"));
        assert_eq!(record.get(Field::OrganizationCode), Some("1264"));
        assert_eq!(record.get(Field::PositionNumber), Some("3"));
        assert_eq!(record.get(Field::IsNative), Some("false"));
        assert_eq!(record.get(Field::FirstName), None);
        assert_eq!(record.get(Field::MaternalSurname), None);
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn test_non_object_becomes_empty_record() {
        assert!(RawRecord::from_json(&json!("oops")).is_empty());
        assert!(RawRecord::from_json(&json!(42)).is_empty());
    }

    #[test]
    fn test_detect_shape() {
        assert_eq!(detect_shape(&json!({"data": []})).unwrap(), SourceShape::FlatList);
        assert_eq!(
            detect_shape(&json!({"Data": [{"TxCodOp": "1"}]})).unwrap(),
            SourceShape::OrganizationCatalog
        );
        assert_eq!(
            detect_shape(&json!({"metadata": {}, "districts": []})).unwrap(),
            SourceShape::GroupedByDistrict
        );
        assert_eq!(detect_shape(&json!({"results": []})).unwrap(), SourceShape::GroupedByBatch);

        assert!(matches!(detect_shape(&json!([1, 2])), Err(FormatError::NotAnObject)));
        assert!(matches!(
            detect_shape(&json!({"foo": 1})),
            Err(FormatError::UnknownShape { .. })
        ));
    }

    #[test]
    fn test_forced_shape_missing_array() {
        let err = adapt(&json!({"data": {"not": "array"}}), Some(SourceShape::FlatList), false)
            .unwrap_err();
        assert!(matches!(err, FormatError::MissingArray { .. }));
    }

    #[test]
    fn test_flat_list_hints() {
        let doc = json!({"data": [{"strDocumentoIdentidad": "1"}, {"strDocumentoIdentidad": "2"}]});

        let (_, keep) = adapt(&doc, None, false).unwrap();
        assert_eq!(keep.len(), 2);
        assert_eq!(keep[1].index, 2);
        assert!(keep.iter().all(|r| r.district == DistrictHint::Keep));

        let (_, geo) = adapt(&doc, None, true).unwrap();
        assert!(geo.iter().all(|r| r.district == DistrictHint::Geography));
    }

    #[test]
    fn test_grouped_by_district() {
        let doc = json!({
            "metadata": {"total_districts": 3},
            "districts": [
                {"district_code": "LIMA", "district_name": "Lima",
                 "candidates": [{"strDocumentoIdentidad": "1"}, {"strDocumentoIdentidad": "2"}]},
                {"district_code": "TACNA", "district_name": "Tacna"},
                {"district_name": "Sin código", "candidates": [{"strDocumentoIdentidad": "3"}]}
            ]
        });

        let (shape, records) = adapt(&doc, None, false).unwrap();
        assert_eq!(shape, SourceShape::GroupedByDistrict);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].district, DistrictHint::Code("LIMA".to_string()));
        assert_eq!(records[2].district, DistrictHint::Geography);
        assert_eq!(records[2].index, 3);
        assert_eq!(records[0].default_position.as_deref(), Some(positions::DEPUTY));
    }

    #[test]
    fn test_grouped_by_batch() {
        let doc = json!({
            "results": [
                {"election_type": SENATE_SINGLE_DISTRICT, "candidates": [{"strDocumentoIdentidad": "1"}]},
                {"election_type": SENATE_MULTIPLE_DISTRICT, "candidates": [{"strDocumentoIdentidad": "2"}]},
                {"election_type": "SOMETHING_NEW", "candidates": [
                    {"strDocumentoIdentidad": "3", "strCargo": "SENADOR TITULAR"}
                ]}
            ]
        });

        let (_, records) = adapt(&doc, None, false).unwrap();
        let hints: Vec<&DistrictHint> = records.iter().map(|r| &r.district).collect();
        assert_eq!(
            hints,
            vec![&DistrictHint::National, &DistrictHint::Geography, &DistrictHint::Geography]
        );
        assert_eq!(records[0].default_position.as_deref(), Some(positions::SENATOR));
        for record in &records {
            assert_eq!(record.record.get(Field::PositionType), Some(positions::SENATOR));
        }
    }

    #[test]
    fn test_load_document_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load_document(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, FormatError::NotFound { .. }));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(load_document(&broken), Err(FormatError::InvalidJson { .. })));

        let good = dir.path().join("good.json");
        fs::write(&good, r#"{"data": []}"#).unwrap();
        let loaded = load_document(&good).unwrap();
        assert_eq!(loaded.sha256.len(), 64);
    }
}
