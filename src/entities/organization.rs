// 🏛️ Political Organization - natural key: code
//
// Created on first sighting of a code (catalog import or stub from a
// candidate record), updated on every later sighting, never deleted by the
// pipeline. Deleting one cascades to its candidates.

use crate::db::now_timestamp;
use crate::entities::{assign, assign_opt, is_blank};
use crate::error::{check, ValidationError, ValidationErrors};
use crate::reconciler::Reconcilable;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

// ============================================================================
// ORGANIZATION TYPE / STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationType {
    PoliticalParty,
    ElectoralAlliance,
    /// Any other label, kept verbatim
    Other(String),
}

impl OrganizationType {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Partido Político" | "PARTIDO POLÍTICO" => OrganizationType::PoliticalParty,
            "Alianza Electoral" | "ALIANZA ELECTORAL" => OrganizationType::ElectoralAlliance,
            other => OrganizationType::Other(other.to_string()),
        }
    }

    pub fn as_label(&self) -> &str {
        match self {
            OrganizationType::PoliticalParty => "Partido Político",
            OrganizationType::ElectoralAlliance => "Alianza Electoral",
            OrganizationType::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationStatus {
    /// "Inscrito"
    Active,
    /// "Cancelado"
    Cancelled,
    Other(String),
}

impl OrganizationStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Inscrito" | "INSCRITO" => OrganizationStatus::Active,
            "Cancelado" | "CANCELADO" => OrganizationStatus::Cancelled,
            other => OrganizationStatus::Other(other.to_string()),
        }
    }

    pub fn as_label(&self) -> &str {
        match self {
            OrganizationStatus::Active => "Inscrito",
            OrganizationStatus::Cancelled => "Cancelado",
            OrganizationStatus::Other(label) => label,
        }
    }
}

// ============================================================================
// ORGANIZATION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub acronym: Option<String>,
    pub organization_type: Option<OrganizationType>,
    pub status: Option<OrganizationStatus>,
    /// Opaque strings, stored as received
    pub registration_date: Option<String>,
    pub cancellation_date: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Mutable organization attributes. `None` = leave untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationUpdates {
    pub name: Option<String>,
    pub acronym: Option<String>,
    pub organization_type: Option<OrganizationType>,
    pub status: Option<OrganizationStatus>,
    pub registration_date: Option<String>,
    pub cancellation_date: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
}

const COLUMNS: &str = "id, code, name, acronym, organization_type, status, registration_date,
     cancellation_date, website, address, logo_url, created_at, updated_at";

impl Organization {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Organization {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            acronym: row.get(3)?,
            organization_type: row
                .get::<_, Option<String>>(4)?
                .map(|label| OrganizationType::from_label(&label)),
            status: row
                .get::<_, Option<String>>(5)?
                .map(|label| OrganizationStatus::from_label(&label)),
            registration_date: row.get(6)?,
            cancellation_date: row.get(7)?,
            website: row.get(8)?,
            address: row.get(9)?,
            logo_url: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub fn find_by_code(conn: &Connection, code: &str) -> Result<Option<Organization>> {
        let sql = format!("SELECT {} FROM political_organizations WHERE code = ?1", COLUMNS);
        let org = conn
            .query_row(&sql, params![code.trim()], Organization::from_row)
            .optional()?;
        Ok(org)
    }

    pub fn all(conn: &Connection) -> Result<Vec<Organization>> {
        let sql = format!("SELECT {} FROM political_organizations ORDER BY name", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let orgs = stmt
            .query_map([], Organization::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orgs)
    }

    /// Delete by code. Candidates of the organization go with it.
    pub fn delete(conn: &Connection, code: &str) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM political_organizations WHERE code = ?1",
            params![code],
        )?;
        Ok(deleted > 0)
    }

    /// "Name (ACRONYM)" or just the name
    pub fn display_name(&self) -> String {
        match self.acronym.as_deref().filter(|a| !is_blank(a)) {
            Some(acronym) => format!("{} ({})", self.name, acronym),
            None => self.name.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Some(OrganizationStatus::Active)
    }
}

impl Reconcilable for Organization {
    type Key = String;
    type Updates = OrganizationUpdates;

    const ENTITY_TYPE: &'static str = "organization";

    fn find(conn: &Connection, key: &String) -> Result<Option<Self>> {
        Organization::find_by_code(conn, key)
    }

    fn from_key(key: &String) -> Self {
        let now = now_timestamp();
        Organization {
            id: 0,
            code: key.trim().to_string(),
            name: String::new(),
            acronym: None,
            organization_type: None,
            status: None,
            registration_date: None,
            cancellation_date: None,
            website: None,
            address: None,
            logo_url: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn apply(&mut self, updates: &OrganizationUpdates) {
        assign(&mut self.name, &updates.name);
        assign_opt(&mut self.acronym, &updates.acronym);
        assign_opt(&mut self.organization_type, &updates.organization_type);
        assign_opt(&mut self.status, &updates.status);
        assign_opt(&mut self.registration_date, &updates.registration_date);
        assign_opt(&mut self.cancellation_date, &updates.cancellation_date);
        assign_opt(&mut self.website, &updates.website);
        assign_opt(&mut self.address, &updates.address);
        assign_opt(&mut self.logo_url, &updates.logo_url);
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if is_blank(&self.code) {
            errors.push(ValidationError::blank("Organization", "code"));
        }
        if is_blank(&self.name) {
            errors.push(ValidationError::blank("Organization", "name"));
        }
        check(errors)
    }

    fn insert(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO political_organizations (
                code, name, acronym, organization_type, status, registration_date,
                cancellation_date, website, address, logo_url, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                self.code,
                self.name,
                self.acronym,
                self.organization_type.as_ref().map(|t| t.as_label()),
                self.status.as_ref().map(|s| s.as_label()),
                self.registration_date,
                self.cancellation_date,
                self.website,
                self.address,
                self.logo_url,
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
            "UPDATE political_organizations SET
                name = ?2, acronym = ?3, organization_type = ?4, status = ?5,
                registration_date = ?6, cancellation_date = ?7, website = ?8,
                address = ?9, logo_url = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                self.id,
                self.name,
                self.acronym,
                self.organization_type.as_ref().map(|t| t.as_label()),
                self.status.as_ref().map(|s| s.as_label()),
                self.registration_date,
                self.cancellation_date,
                self.website,
                self.address,
                self.logo_url,
                self.updated_at,
            ],
        )?;
        Ok(())
    }

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_labels() {
        assert_eq!(
            OrganizationType::from_label("Partido Político"),
            OrganizationType::PoliticalParty
        );
        assert_eq!(
            OrganizationType::from_label("Alianza Electoral"),
            OrganizationType::ElectoralAlliance
        );
        let other = OrganizationType::from_label("Movimiento Regional");
        assert_eq!(other.as_label(), "Movimiento Regional");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(OrganizationStatus::from_label("Inscrito"), OrganizationStatus::Active);
        assert_eq!(OrganizationStatus::from_label("Cancelado"), OrganizationStatus::Cancelled);
        assert_eq!(OrganizationStatus::Active.as_label(), "Inscrito");
    }

    #[test]
    fn test_display_name() {
        let mut org = Organization::from_key(&"X1".to_string());
        org.name = "Party X".to_string();
        assert_eq!(org.display_name(), "Party X");

        org.acronym = Some("PX".to_string());
        assert_eq!(org.display_name(), "Party X (PX)");
    }

    #[test]
    fn test_validate_requires_code_and_name() {
        let org = Organization::from_key(&"  ".to_string());
        let errors = org.validate().unwrap_err();
        let fields: Vec<&str> = errors.0.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["code", "name"]);
    }

    #[test]
    fn test_round_trip_through_store() {
        let conn = crate::db::open_in_memory().unwrap();

        let mut org = Organization::from_key(&"1234".to_string());
        org.apply(&OrganizationUpdates {
            name: Some("Partido Ejemplo".to_string()),
            organization_type: Some(OrganizationType::PoliticalParty),
            status: Some(OrganizationStatus::Active),
            ..Default::default()
        });
        org.insert(&conn).unwrap();

        let loaded = Organization::find_by_code(&conn, "1234").unwrap().unwrap();
        assert_eq!(loaded, org);
        assert!(loaded.is_active());
        assert!(Organization::find_by_code(&conn, "9999").unwrap().is_none());
    }
}
