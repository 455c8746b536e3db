// 👤 Candidate - natural key: (document number, position type, organization)
//
// The same person may appear under several positions or organizations;
// never twice for the same position under the same organization.
// Non-key attributes are last-write-wins on every sighting.

use crate::db::{now_timestamp, ACTIVE_STATUSES};
use crate::entities::{assign_opt, is_blank, join_name_parts};
use crate::error::{check, ValidationError, ValidationErrors};
use crate::reconciler::Reconcilable;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Position type labels as published by the upstream API
pub mod positions {
    pub const PRESIDENT: &str = "PRESIDENTE DE LA REPÚBLICA";
    pub const FIRST_VICE_PRESIDENT: &str = "PRIMER VICEPRESIDENTE DE LA REPÚBLICA";
    pub const SECOND_VICE_PRESIDENT: &str = "SEGUNDO VICEPRESIDENTE DE LA REPÚBLICA";
    pub const DEPUTY: &str = "DIPUTADO";
    pub const SENATOR: &str = "SENADOR";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateKey {
    pub document_number: String,
    pub position_type: String,
    pub organization_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    // natural key
    pub document_number: String,
    pub position_type: String,
    pub political_organization_id: i64,

    pub electoral_district_id: Option<i64>,
    pub position_number: Option<i64>,
    pub document_type: Option<String>,
    pub first_name: Option<String>,
    pub paternal_surname: Option<String>,
    pub maternal_surname: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub is_native: Option<String>,
    pub status: Option<String>,
    pub photo_guid: Option<String>,
    pub photo_filename: Option<String>,
    /// Free-text geography as received
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub electoral_file_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Mutable candidate attributes. `None` = leave untouched.
///
/// `electoral_district_id` is doubly optional: `Some(None)` clears the
/// association, `None` keeps whatever is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateUpdates {
    pub electoral_district_id: Option<Option<i64>>,
    pub position_number: Option<i64>,
    pub document_type: Option<String>,
    pub first_name: Option<String>,
    pub paternal_surname: Option<String>,
    pub maternal_surname: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub is_native: Option<String>,
    pub status: Option<String>,
    pub photo_guid: Option<String>,
    pub photo_filename: Option<String>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub electoral_file_code: Option<String>,
}

const COLUMNS: &str = "id, document_number, position_type, political_organization_id,
     electoral_district_id, position_number, document_type, first_name, paternal_surname,
     maternal_surname, gender, birth_date, is_native, status, photo_guid, photo_filename,
     department, province, district, electoral_file_code, created_at, updated_at";

impl Candidate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Candidate {
            id: row.get(0)?,
            document_number: row.get(1)?,
            position_type: row.get(2)?,
            political_organization_id: row.get(3)?,
            electoral_district_id: row.get(4)?,
            position_number: row.get(5)?,
            document_type: row.get(6)?,
            first_name: row.get(7)?,
            paternal_surname: row.get(8)?,
            maternal_surname: row.get(9)?,
            gender: row.get(10)?,
            birth_date: row.get(11)?,
            is_native: row.get(12)?,
            status: row.get(13)?,
            photo_guid: row.get(14)?,
            photo_filename: row.get(15)?,
            department: row.get(16)?,
            province: row.get(17)?,
            district: row.get(18)?,
            electoral_file_code: row.get(19)?,
            created_at: row.get(20)?,
            updated_at: row.get(21)?,
        })
    }

    pub fn find_by_key(conn: &Connection, key: &CandidateKey) -> Result<Option<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates
             WHERE document_number = ?1 AND position_type = ?2 AND political_organization_id = ?3",
            COLUMNS
        );
        let candidate = conn
            .query_row(
                &sql,
                params![
                    key.document_number.trim(),
                    key.position_type.trim(),
                    key.organization_id
                ],
                Candidate::from_row,
            )
            .optional()?;
        Ok(candidate)
    }

    pub fn find_by_document(conn: &Connection, document_number: &str) -> Result<Vec<Candidate>> {
        let sql = format!(
            "SELECT {} FROM candidates WHERE document_number = ?1 ORDER BY id",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let candidates = stmt
            .query_map(params![document_number], Candidate::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    pub fn key(&self) -> CandidateKey {
        CandidateKey {
            document_number: self.document_number.clone(),
            position_type: self.position_type.clone(),
            organization_id: self.political_organization_id,
        }
    }

    pub fn full_name(&self) -> String {
        join_name_parts(&[
            self.first_name.clone(),
            self.paternal_surname.clone(),
            self.maternal_surname.clone(),
        ])
    }

    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| ACTIVE_STATUSES.contains(&s))
            .unwrap_or(false)
    }

    pub fn is_presidential(&self) -> bool {
        self.position_type == positions::PRESIDENT
    }

    pub fn is_vice_presidential(&self) -> bool {
        self.position_type.contains("VICEPRESIDENTE")
    }

    pub fn is_deputy(&self) -> bool {
        self.position_type == positions::DEPUTY
    }

    pub fn is_senator(&self) -> bool {
        self.position_type == positions::SENATOR
    }

    /// Relative photo path served by the listing
    pub fn photo_path(&self) -> Option<String> {
        self.photo_guid
            .as_deref()
            .filter(|g| !is_blank(g))
            .map(|guid| format!("/photos/{}.jpg", guid))
    }
}

impl Reconcilable for Candidate {
    type Key = CandidateKey;
    type Updates = CandidateUpdates;

    const ENTITY_TYPE: &'static str = "candidate";

    fn find(conn: &Connection, key: &CandidateKey) -> Result<Option<Self>> {
        Candidate::find_by_key(conn, key)
    }

    fn from_key(key: &CandidateKey) -> Self {
        let now = now_timestamp();
        Candidate {
            id: 0,
            document_number: key.document_number.trim().to_string(),
            position_type: key.position_type.trim().to_string(),
            political_organization_id: key.organization_id,
            electoral_district_id: None,
            position_number: None,
            document_type: None,
            first_name: None,
            paternal_surname: None,
            maternal_surname: None,
            gender: None,
            birth_date: None,
            is_native: None,
            status: None,
            photo_guid: None,
            photo_filename: None,
            department: None,
            province: None,
            district: None,
            electoral_file_code: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn apply(&mut self, updates: &CandidateUpdates) {
        if let Some(district_id) = updates.electoral_district_id {
            self.electoral_district_id = district_id;
        }
        assign_opt(&mut self.position_number, &updates.position_number);
        assign_opt(&mut self.document_type, &updates.document_type);
        assign_opt(&mut self.first_name, &updates.first_name);
        assign_opt(&mut self.paternal_surname, &updates.paternal_surname);
        assign_opt(&mut self.maternal_surname, &updates.maternal_surname);
        assign_opt(&mut self.gender, &updates.gender);
        assign_opt(&mut self.birth_date, &updates.birth_date);
        assign_opt(&mut self.is_native, &updates.is_native);
        assign_opt(&mut self.status, &updates.status);
        assign_opt(&mut self.photo_guid, &updates.photo_guid);
        assign_opt(&mut self.photo_filename, &updates.photo_filename);
        assign_opt(&mut self.department, &updates.department);
        assign_opt(&mut self.province, &updates.province);
        assign_opt(&mut self.district, &updates.district);
        assign_opt(&mut self.electoral_file_code, &updates.electoral_file_code);
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        if is_blank(&self.document_number) {
            errors.push(ValidationError::blank("Candidate", "document_number"));
        } else if !self.document_number.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(ValidationError::malformed(
                "Candidate",
                "document_number",
                format!("is malformed: {:?}", self.document_number),
            ));
        }

        if is_blank(&self.position_type) {
            errors.push(ValidationError::blank("Candidate", "position_type"));
        }

        if self.political_organization_id <= 0 {
            errors.push(ValidationError::blank("Candidate", "political_organization"));
        }

        check(errors)
    }

    fn insert(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO candidates (
                document_number, position_type, political_organization_id,
                electoral_district_id, position_number, document_type, first_name,
                paternal_surname, maternal_surname, gender, birth_date, is_native, status,
                photo_guid, photo_filename, department, province, district,
                electoral_file_code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                self.document_number,
                self.position_type,
                self.political_organization_id,
                self.electoral_district_id,
                self.position_number,
                self.document_type,
                self.first_name,
                self.paternal_surname,
                self.maternal_surname,
                self.gender,
                self.birth_date,
                self.is_native,
                self.status,
                self.photo_guid,
                self.photo_filename,
                self.department,
                self.province,
                self.district,
                self.electoral_file_code,
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
            "UPDATE candidates SET
                electoral_district_id = ?2, position_number = ?3, document_type = ?4,
                first_name = ?5, paternal_surname = ?6, maternal_surname = ?7, gender = ?8,
                birth_date = ?9, is_native = ?10, status = ?11, photo_guid = ?12,
                photo_filename = ?13, department = ?14, province = ?15, district = ?16,
                electoral_file_code = ?17, updated_at = ?18
             WHERE id = ?1",
            params![
                self.id,
                self.electoral_district_id,
                self.position_number,
                self.document_type,
                self.first_name,
                self.paternal_surname,
                self.maternal_surname,
                self.gender,
                self.birth_date,
                self.is_native,
                self.status,
                self.photo_guid,
                self.photo_filename,
                self.department,
                self.province,
                self.district,
                self.electoral_file_code,
                self.updated_at,
            ],
        )?;
        Ok(())
    }

    fn id(&self) -> i64 {
        self.id
    }
}
