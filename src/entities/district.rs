// 🗺️ Electoral District - natural key: code
//
// Seeded from a fixed reference list (2026 bicameral map: one district per
// department, Lima Provincias split from Lima, plus Peruvians abroad).
// Read-only from the importer's point of view.

use crate::db::now_timestamp;
use crate::entities::{assign, assign_opt, is_blank};
use crate::error::{check, ValidationError, ValidationErrors};
use crate::reconciler::{reconcile, Reconcilable};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistrictType {
    Department,
    Abroad,
}

impl DistrictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistrictType::Department => "department",
            DistrictType::Abroad => "abroad",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "department" => Some(DistrictType::Department),
            "abroad" => Some(DistrictType::Abroad),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectoralDistrict {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub district_type: DistrictType,
    /// Informational; never checked against candidate counts
    pub seats_count: Option<i64>,
    pub ubigeo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictUpdates {
    pub name: Option<String>,
    pub district_type: Option<DistrictType>,
    pub seats_count: Option<i64>,
    pub ubigeo: Option<String>,
}

const COLUMNS: &str = "id, code, name, district_type, seats_count, ubigeo, created_at, updated_at";

impl ElectoralDistrict {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let district_type: String = row.get(3)?;
        Ok(ElectoralDistrict {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            district_type: DistrictType::parse(&district_type).unwrap_or(DistrictType::Department),
            seats_count: row.get(4)?,
            ubigeo: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn find_by_code(conn: &Connection, code: &str) -> Result<Option<ElectoralDistrict>> {
        let sql = format!("SELECT {} FROM electoral_districts WHERE code = ?1", COLUMNS);
        let district = conn
            .query_row(&sql, params![code.trim()], ElectoralDistrict::from_row)
            .optional()?;
        Ok(district)
    }

    /// All districts ordered by name
    pub fn all(conn: &Connection) -> Result<Vec<ElectoralDistrict>> {
        let sql = format!("SELECT {} FROM electoral_districts ORDER BY name", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let districts = stmt
            .query_map([], ElectoralDistrict::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(districts)
    }

    /// Departmental districts ordered by name (the deputies scrape order)
    pub fn departments(conn: &Connection) -> Result<Vec<ElectoralDistrict>> {
        Ok(ElectoralDistrict::all(conn)?
            .into_iter()
            .filter(|d| d.district_type == DistrictType::Department)
            .collect())
    }

    /// Delete by code. Candidates keep existing with no district.
    pub fn delete(conn: &Connection, code: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM electoral_districts WHERE code = ?1", params![code])?;
        Ok(deleted > 0)
    }

    /// "Lima (50 escaños)"
    pub fn display_name(&self) -> String {
        match self.seats_count {
            Some(seats) => format!("{} ({} escaños)", self.name, seats),
            None => self.name.clone(),
        }
    }
}

impl Reconcilable for ElectoralDistrict {
    type Key = String;
    type Updates = DistrictUpdates;

    const ENTITY_TYPE: &'static str = "electoral_district";

    fn find(conn: &Connection, key: &String) -> Result<Option<Self>> {
        ElectoralDistrict::find_by_code(conn, key)
    }

    fn from_key(key: &String) -> Self {
        let now = now_timestamp();
        ElectoralDistrict {
            id: 0,
            code: key.trim().to_string(),
            name: String::new(),
            district_type: DistrictType::Department,
            seats_count: None,
            ubigeo: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn apply(&mut self, updates: &DistrictUpdates) {
        assign(&mut self.name, &updates.name);
        assign(&mut self.district_type, &updates.district_type);
        assign_opt(&mut self.seats_count, &updates.seats_count);
        assign_opt(&mut self.ubigeo, &updates.ubigeo);
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if is_blank(&self.code) {
            errors.push(ValidationError::blank("ElectoralDistrict", "code"));
        }
        if is_blank(&self.name) {
            errors.push(ValidationError::blank("ElectoralDistrict", "name"));
        }
        if matches!(self.seats_count, Some(seats) if seats < 0) {
            errors.push(ValidationError::malformed(
                "ElectoralDistrict",
                "seats_count",
                "must be greater than or equal to 0",
            ));
        }
        check(errors)
    }

    fn insert(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO electoral_districts (
                code, name, district_type, seats_count, ubigeo, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.code,
                self.name,
                self.district_type.as_str(),
                self.seats_count,
                self.ubigeo,
                self.created_at,
                self.updated_at,
            ],
        )?;
        self.id = conn.last_insert_rowid();
        Ok(())
    }

    fn update(&mut self, conn: &Connection) -> Result<()> {
        self.updated_at = now_timestamp();
        conn.execute(
            "UPDATE electoral_districts SET
                name = ?2, district_type = ?3, seats_count = ?4, ubigeo = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                self.id,
                self.name,
                self.district_type.as_str(),
                self.seats_count,
                self.ubigeo,
                self.updated_at,
            ],
        )?;
        Ok(())
    }

    fn id(&self) -> i64 {
        self.id
    }
}

// ============================================================================
// REFERENCE LIST
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ReferenceDistrict {
    pub code: &'static str,
    pub name: &'static str,
    pub district_type: DistrictType,
    pub seats_count: i64,
    pub ubigeo: &'static str,
}

const fn department(code: &'static str, name: &'static str, seats_count: i64, ubigeo: &'static str) -> ReferenceDistrict {
    ReferenceDistrict {
        code,
        name,
        district_type: DistrictType::Department,
        seats_count,
        ubigeo,
    }
}

pub const REFERENCE_DISTRICTS: [ReferenceDistrict; 27] = [
    department("AMAZONAS", "Amazonas", 3, "010000"),
    department("ANCASH", "Áncash", 6, "020000"),
    department("APURIMAC", "Apurímac", 3, "030000"),
    department("AREQUIPA", "Arequipa", 7, "040000"),
    department("AYACUCHO", "Ayacucho", 4, "050000"),
    department("CAJAMARCA", "Cajamarca", 7, "060000"),
    department("CALLAO", "Callao", 5, "070000"),
    department("CUSCO", "Cusco", 7, "080000"),
    department("HUANCAVELICA", "Huancavelica", 3, "090000"),
    department("HUANUCO", "Huánuco", 5, "100000"),
    department("ICA", "Ica", 4, "110000"),
    department("JUNIN", "Junín", 7, "120000"),
    department("LA LIBERTAD", "La Libertad", 9, "130000"),
    department("LAMBAYEQUE", "Lambayeque", 6, "140000"),
    department("LIMA", "Lima", 50, "150000"),
    department("LIMA_PROVINCIAS", "Lima Provincias", 5, "150100"),
    department("LORETO", "Loreto", 5, "160000"),
    department("MADRE_DE_DIOS", "Madre de Dios", 1, "170000"),
    department("MOQUEGUA", "Moquegua", 1, "180000"),
    department("PASCO", "Pasco", 2, "190000"),
    department("PIURA", "Piura", 9, "200000"),
    department("PUNO", "Puno", 7, "210000"),
    department("SAN_MARTIN", "San Martín", 5, "220000"),
    department("TACNA", "Tacna", 2, "230000"),
    department("TUMBES", "Tumbes", 1, "240000"),
    department("UCAYALI", "Ucayali", 3, "250000"),
    ReferenceDistrict {
        code: "EXTRANJERO",
        name: "Peruanos en el Extranjero",
        district_type: DistrictType::Abroad,
        seats_count: 2,
        ubigeo: "999999",
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSummary {
    pub created: usize,
    pub updated: usize,
    /// "CODE: cause"
    pub errors: Vec<String>,
}

/// Reconcile the reference list into the store. Safe to run repeatedly.
pub fn seed_reference_districts(conn: &Connection) -> SeedSummary {
    let mut summary = SeedSummary::default();

    for reference in REFERENCE_DISTRICTS.iter() {
        let updates = DistrictUpdates {
            name: Some(reference.name.to_string()),
            district_type: Some(reference.district_type),
            seats_count: Some(reference.seats_count),
            ubigeo: Some(reference.ubigeo.to_string()),
        };

        match reconcile::<ElectoralDistrict>(conn, &reference.code.to_string(), &updates) {
            Ok(result) if result.was_created => summary.created += 1,
            Ok(_) => summary.updated += 1,
            Err(err) => {
                tracing::warn!(code = reference.code, error = %err, "district seed failed");
                summary.errors.push(format!("{}: {}", reference.code, err));
            }
        }
    }

    summary
}
