// ⚙️ Configuration - upstream API constants and import options
//
// Defaults match the 2026 general election process. Every value can be
// overridden from the CLI or the environment (see main.rs).

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://sije.jne.gob.pe";
pub const CANDIDATE_LIST_PATH: &str = "/ServiciosWeb/WSCandidato/ListaCandidatos";

/// 2026 general election
pub const DEFAULT_PROCESS_ID: i64 = 124;

/// `idTipoEleccion` values
pub mod election_types {
    pub const DEPUTIES: i64 = 15;
    pub const SENATE_SINGLE_DISTRICT: i64 = 20;
    pub const SENATE_MULTIPLE_DISTRICT: i64 = 21;
}

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Where and how to reach the candidate-list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub process_id: i64,
    /// Sent as `oToken` only when set
    pub auth_token: Option<String>,
    pub user_id: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Politeness pause between consecutive per-district requests
    pub delay: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            process_id: DEFAULT_PROCESS_ID,
            auth_token: None,
            user_id: None,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            delay: DEFAULT_DELAY,
        }
    }
}

impl UpstreamConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), CANDIDATE_LIST_PATH)
    }
}

/// Knobs for one import run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// Position type for records that carry none (takes precedence over the
    /// default implied by the document layout)
    pub position_type: Option<String>,
    /// Match flat-list records to districts by department name
    pub match_geography: bool,
    /// Errors tolerated before the run counts as failed
    pub max_errors: usize,
    /// How many error details the report prints
    pub show_errors: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            position_type: None,
            match_geography: false,
            max_errors: 0,
            show_errors: 10,
        }
    }
}
