// ⚠️ Error taxonomy for the import pipeline
//
// Only FormatError aborts a run. Everything else is caught where it happens
// and turned into an entry of the ImportSummary (or of a scrape report).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// FORMAT ERRORS (fatal)
// ============================================================================

/// The source document is missing or structurally invalid.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("file not found: {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {origin}: {source}")]
    InvalidJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected top-level array under {expected} (not found or not an array)")]
    MissingArray { expected: String },

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("unrecognized document shape (top-level keys: {keys:?})")]
    UnknownShape { keys: Vec<String> },
}

// ============================================================================
// VALIDATION ERRORS (per record, non-fatal)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub entity: &'static str,
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn blank(entity: &'static str, field: &'static str) -> Self {
        ValidationError {
            entity,
            field,
            message: "can't be blank".to_string(),
        }
    }

    pub fn malformed(entity: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        ValidationError {
            entity,
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.entity, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// All validation failures for one entity, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.to_string()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Collect validation errors into a Result (empty = valid).
pub fn check(errors: Vec<ValidationError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

// ============================================================================
// LOOKUP FAILURES (per record, counted as skipped)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    #[error("record has no organization code")]
    MissingOrganizationCode,

    #[error("organization {code} not found and record carries no organization name")]
    OrganizationUnavailable { code: String },

    #[error("electoral district not found: {code}")]
    UnknownDistrict { code: String },
}

// ============================================================================
// RECONCILE ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for ReconcileError {
    fn from(err: rusqlite::Error) -> Self {
        ReconcileError::Store(err.into())
    }
}

// ============================================================================
// TRANSPORT ERRORS (per unit, non-fatal)
// ============================================================================

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("malformed response body from {url}: {message}")]
    Body { url: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_collects_errors() {
        assert!(check(vec![]).is_ok());

        let err = check(vec![
            ValidationError::blank("Candidate", "document_number"),
            ValidationError::blank("Candidate", "position_type"),
        ])
        .unwrap_err();

        assert_eq!(err.0.len(), 2);
        assert_eq!(
            err.to_string(),
            "[Candidate] document_number can't be blank, [Candidate] position_type can't be blank"
        );
    }

    #[test]
    fn test_lookup_failure_messages() {
        let failure = LookupFailure::UnknownDistrict {
            code: "ATLANTIS".to_string(),
        };
        assert_eq!(failure.to_string(), "electoral district not found: ATLANTIS");
    }
}
