// 🧭 Geography matcher - free-text department → electoral district
//
// Upstream department strings come unaccented and sometimes with
// underscores ("APURIMAC", "SAN_MARTIN"). District names are stored
// accented in title case ("Apurímac"). Both sides are NFC-normalized and
// upper-cased with Rust's Unicode case mapping; SQLite's UPPER only folds ASCII.

use crate::entities::ElectoralDistrict;
use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Upstream spelling → upper-cased district name
pub const DEPARTMENT_ALIASES: [(&str, &str); 9] = [
    ("ANCASH", "ÁNCASH"),
    ("APURIMAC", "APURÍMAC"),
    ("HUANUCO", "HUÁNUCO"),
    ("JUNIN", "JUNÍN"),
    ("SAN_MARTIN", "SAN MARTÍN"),
    ("MADRE_DE_DIOS", "MADRE DE DIOS"),
    ("LA_LIBERTAD", "LA LIBERTAD"),
    ("LIMA_PROVINCIAS", "LIMA PROVINCIAS"),
    ("EXTRANJERO", "PERUANOS EN EL EXTRANJERO"),
];

/// Composed, upper-cased form used for every name comparison
fn canonical(value: &str) -> String {
    value.trim().nfc().collect::<String>().to_uppercase()
}

/// Upper-case a department string and resolve it through the alias table.
pub fn normalize_department(department: &str) -> String {
    let upper = canonical(department);
    DEPARTMENT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper || alias.replace('_', " ") == upper)
        .map(|(_, name)| name.to_string())
        .unwrap_or(upper)
}

/// Accent-insensitive form used as a second chance when the table has no entry
fn fold(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '_' { ' ' } else { c })
        .collect()
}

/// In-memory view of the electoral districts, loaded once per import run.
#[derive(Debug, Clone, Default)]
pub struct DistrictIndex {
    by_code: HashMap<String, ElectoralDistrict>,
    by_name: HashMap<String, String>,
    by_folded_name: HashMap<String, String>,
}

impl DistrictIndex {
    pub fn load(conn: &Connection) -> Result<Self> {
        Ok(DistrictIndex::from_districts(ElectoralDistrict::all(conn)?))
    }

    pub fn from_districts(districts: Vec<ElectoralDistrict>) -> Self {
        let mut index = DistrictIndex::default();
        for district in districts {
            let upper = canonical(&district.name);
            index.by_folded_name.insert(fold(&upper), district.code.clone());
            index.by_name.insert(upper, district.code.clone());
            index.by_code.insert(district.code.clone(), district);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn by_code(&self, code: &str) -> Option<&ElectoralDistrict> {
        self.by_code.get(code.trim())
    }

    /// District whose name matches the department after normalization
    pub fn match_department(&self, department: &str) -> Option<&ElectoralDistrict> {
        if department.trim().is_empty() {
            return None;
        }
        let normalized = normalize_department(department);
        self.by_name
            .get(&normalized)
            .or_else(|| self.by_folded_name.get(&fold(&normalized)))
            .and_then(|code| self.by_code.get(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::entities::seed_reference_districts;

    fn seeded_index() -> DistrictIndex {
        let conn = open_in_memory().unwrap();
        seed_reference_districts(&conn);
        DistrictIndex::load(&conn).unwrap()
    }

    #[test]
    fn test_normalize_department() {
        assert_eq!(normalize_department("APURIMAC"), "APURÍMAC");
        assert_eq!(normalize_department(" san_martin "), "SAN MARTÍN");
        assert_eq!(normalize_department("LA LIBERTAD"), "LA LIBERTAD");
        assert_eq!(normalize_department("Cusco"), "CUSCO");
    }

    #[test]
    fn test_match_department_through_aliases() {
        let index = seeded_index();
        assert_eq!(index.len(), 27);

        assert_eq!(index.match_department("APURIMAC").unwrap().code, "APURIMAC");
        assert_eq!(index.match_department("MADRE_DE_DIOS").unwrap().code, "MADRE_DE_DIOS");
        assert_eq!(index.match_department("lima").unwrap().code, "LIMA");
        assert_eq!(index.match_department("EXTRANJERO").unwrap().code, "EXTRANJERO");
    }

    #[test]
    fn test_match_department_accent_fallback() {
        use crate::reconciler::Reconcilable;

        let mut district = ElectoralDistrict::from_key(&"REGION_X".to_string());
        district.name = "Región Ficticia".to_string();
        let index = DistrictIndex::from_districts(vec![district]);

        assert_eq!(index.match_department("REGION FICTICIA").unwrap().code, "REGION_X");
        assert_eq!(index.match_department("region_ficticia").unwrap().code, "REGION_X");
    }

    #[test]
    fn test_match_department_decomposed_accents() {
        use crate::reconciler::Reconcilable;

        let index = seeded_index();

        assert_eq!(index.match_department("APURI\u{301}MAC").unwrap().code, "APURIMAC");
        assert_eq!(index.match_department("Juni\u{301}n").unwrap().code, "JUNIN");
        assert_eq!(index.match_department("SAN MARTI\u{301}N").unwrap().code, "SAN_MARTIN");

        let mut district = ElectoralDistrict::from_key(&"REGION_Y".to_string());
        district.name = "Regio\u{301}n Decompuesta".to_string();
        let index = DistrictIndex::from_districts(vec![district]);
        assert_eq!(index.match_department("Región Decompuesta").unwrap().code, "REGION_Y");
        assert_eq!(index.match_department("REGION_DECOMPUESTA").unwrap().code, "REGION_Y");
    }

    #[test]
    fn test_no_match() {
        let index = seeded_index();
        assert!(index.match_department("ATLANTIS").is_none());
        assert!(index.match_department("   ").is_none());
        assert!(index.by_code("ATLANTIS").is_none());
        assert_eq!(index.by_code("TACNA").unwrap().name, "Tacna");
    }
}
