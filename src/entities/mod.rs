// Entity models: Political Organization, Electoral District, Candidate
// Each entity is looked up by its natural key, never by the SQLite rowid.

pub mod candidate;
pub mod district;
pub mod organization;

pub use candidate::{positions, Candidate, CandidateKey, CandidateUpdates};
pub use district::{
    seed_reference_districts, DistrictType, DistrictUpdates, ElectoralDistrict, ReferenceDistrict,
    SeedSummary, REFERENCE_DISTRICTS,
};
pub use organization::{
    Organization, OrganizationStatus, OrganizationType, OrganizationUpdates,
};

/// True when the value is missing or only whitespace.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Join the non-empty name parts with single spaces.
pub fn join_name_parts(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Overwrite `target` when an update value is present.
pub(crate) fn assign<T: Clone>(target: &mut T, update: &Option<T>) {
    if let Some(value) = update {
        *target = value.clone();
    }
}

/// Same as `assign` for optional attributes.
pub(crate) fn assign_opt<T: Clone>(target: &mut Option<T>, update: &Option<T>) {
    if let Some(value) = update {
        *target = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_name_parts_skips_missing() {
        let parts = vec![
            Some("Ana".to_string()),
            None,
            Some("  ".to_string()),
            Some("Lopez".to_string()),
        ];
        assert_eq!(join_name_parts(&parts), "Ana Lopez");
        assert_eq!(join_name_parts(&[]), "");
    }

    #[test]
    fn test_assign_only_when_present() {
        let mut name = "old".to_string();
        assign(&mut name, &None);
        assert_eq!(name, "old");
        assign(&mut name, &Some("new".to_string()));
        assert_eq!(name, "new");

        let mut acronym: Option<String> = None;
        assign_opt(&mut acronym, &Some("PX".to_string()));
        assert_eq!(acronym.as_deref(), Some("PX"));
    }
}
