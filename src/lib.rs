// Candidate Directory - Core Library
// Entity store, reconciler, importer and upstream scraper, shared by the CLI and tests

pub mod adapter;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod fetch;
pub mod geography;
pub mod importer;
pub mod reconciler;
pub mod report;

// Re-export commonly used types
pub use adapter::{
    adapt, detect_shape, get_adapter, load_document, parse_document, AdaptedRecord,
    DocumentAdapter, DistrictHint, Field, LoadedDocument, RawRecord, RecordKind, SourceShape,
};
pub use config::{ImportOptions, UpstreamConfig};
pub use db::{
    backup_to, open, open_in_memory, search_candidates, setup_database, CandidateFilter,
    CandidateRow, Event, ImportRun,
};
pub use entities::{
    positions, seed_reference_districts, Candidate, CandidateKey, CandidateUpdates, DistrictType,
    ElectoralDistrict, Organization, OrganizationStatus, OrganizationType, OrganizationUpdates,
};
pub use error::{FormatError, LookupFailure, ReconcileError, TransportError, ValidationError};
pub use fetch::{scrape_deputies, scrape_senators, DeputiesDocument, SenatorsDocument, UpstreamClient};
pub use geography::DistrictIndex;
pub use importer::{
    import_document, import_file, import_value, BatchImporter, ImportOutcome, ImportSummary,
    RecordError, SkippedRecord,
};
pub use reconciler::{reconcile, Reconcilable, Reconciled};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
