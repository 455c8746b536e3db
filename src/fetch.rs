// 🌐 Upstream client - candidate lists from the electoral authority API
//
// One POST per logical unit (department for deputies, batch for senators).
// No retry, no backoff: a failed unit is written to the document's `errors`
// list and the scrape moves on. Output documents use the same shapes the
// adapter reads (GroupedByDistrict / GroupedByBatch).

use crate::adapter::{SENATE_MULTIPLE_DISTRICT, SENATE_SINGLE_DISTRICT};
use crate::config::{election_types, UpstreamConfig};
use crate::entities::ElectoralDistrict;
use crate::error::TransportError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::thread;

pub const USER_AGENT: &str = concat!("candidate-directory/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// RESPONSE PARSING
// ============================================================================

/// Pull the candidate array out of a response body.
///
/// Checked in order: `Data`, `data`, `candidatos`, `Candidatos`, a bare
/// top-level array, then one level down under `data.Data` / `data.data`.
/// Anything else yields no candidates.
pub fn extract_candidate_array(body: &Value) -> Vec<Value> {
    if let Value::Array(items) = body {
        return items.clone();
    }

    for key in ["Data", "data", "candidatos", "Candidatos"] {
        if let Some(Value::Array(items)) = body.get(key) {
            return items.clone();
        }
    }

    if let Some(inner) = body.get("data") {
        for key in ["Data", "data"] {
            if let Some(Value::Array(items)) = inner.get(key) {
                return items.clone();
            }
        }
    }

    let keys: Vec<&String> = body.as_object().map(|m| m.keys().collect()).unwrap_or_default();
    tracing::warn!(?keys, "unexpected response structure; no candidate array");
    Vec::new()
}

// ============================================================================
// CLIENT
// ============================================================================

/// Filter sent as `oFiltro`
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateQuery {
    /// Deputies of one department, by ubigeo
    Department { ubigeo: String, election_type: i64 },
    /// Senate lists (district filter is left empty: the API returns the whole list)
    Senate { election_type: i64 },
}

pub struct UpstreamClient {
    http: reqwest::blocking::Client,
    config: UpstreamConfig,
    requests: usize,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(UpstreamClient {
            http,
            config,
            requests: 0,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Requests sent so far (failed ones included)
    pub fn request_count(&self) -> usize {
        self.requests
    }

    pub fn request_body(&self, query: &CandidateQuery) -> Value {
        let filter = match query {
            CandidateQuery::Department { ubigeo, election_type } => json!({
                "idProcesoElectoral": self.config.process_id,
                "strUbiDepartamento": ubigeo,
                "idTipoEleccion": election_type,
            }),
            CandidateQuery::Senate { election_type } => json!({
                "idProcesoElectoral": self.config.process_id,
                "strUbiDistrito": "",
                "idTipoEleccion": election_type,
            }),
        };

        let mut body = json!({ "oFiltro": filter });
        if let Some(token) = &self.config.auth_token {
            body["oToken"] = json!({
                "AuthToken": token,
                "UserId": self.config.user_id.clone().unwrap_or_default(),
            });
        }
        body
    }

    /// One POST, one attempt.
    pub fn list_candidates(&mut self, query: &CandidateQuery) -> Result<Vec<Value>, TransportError> {
        let url = self.config.endpoint();
        let body = self.request_body(query);
        self.requests += 1;

        tracing::debug!(url = %url, ?query, "requesting candidate list");

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(|source| TransportError::Request {
            url: url.clone(),
            source,
        })?;
        let parsed: Value = serde_json::from_str(&text).map_err(|e| TransportError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;

        Ok(extract_candidate_array(&parsed))
    }

    fn pause(&self) {
        if !self.config.delay.is_zero() {
            thread::sleep(self.config.delay);
        }
    }
}

// ============================================================================
// SCRAPED DOCUMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeError {
    /// District code or batch label
    pub unit: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeputiesMetadata {
    pub scraped_at: String,
    pub source: String,
    pub total_districts: usize,
    pub total_candidates: usize,
    pub total_requests: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictGroup {
    pub district_code: String,
    pub district_name: String,
    pub district_ubigeo: Option<String>,
    pub candidates_count: usize,
    pub candidates: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeputiesDocument {
    pub metadata: DeputiesMetadata,
    pub districts: Vec<DistrictGroup>,
    pub errors: Vec<ScrapeError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchGroup {
    pub election_type: String,
    pub tipo_eleccion_id: i64,
    pub count: usize,
    pub candidates: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenatorsDocument {
    pub scraped_at: String,
    pub total_batches: usize,
    pub total_candidates: usize,
    pub results: Vec<BatchGroup>,
    #[serde(default)]
    pub errors: Vec<ScrapeError>,
}

/// Per-unit counts for the scrape report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeStats {
    pub units: usize,
    pub candidates: usize,
    pub requests: usize,
    pub errors: Vec<ScrapeError>,
    /// (unit label, candidates)
    pub per_unit: Vec<(String, usize)>,
}

impl DeputiesDocument {
    pub fn stats(&self) -> ScrapeStats {
        ScrapeStats {
            units: self.districts.len(),
            candidates: self.metadata.total_candidates,
            requests: self.metadata.total_requests,
            errors: self.errors.clone(),
            per_unit: self
                .districts
                .iter()
                .map(|d| (d.district_name.clone(), d.candidates_count))
                .collect(),
        }
    }
}

impl SenatorsDocument {
    pub fn stats(&self, requests: usize) -> ScrapeStats {
        ScrapeStats {
            units: self.results.len(),
            candidates: self.total_candidates,
            requests,
            errors: self.errors.clone(),
            per_unit: self
                .results
                .iter()
                .map(|r| (r.election_type.clone(), r.count))
                .collect(),
        }
    }
}

// ============================================================================
// SCRAPERS
// ============================================================================

/// Deputies, one request per department, politeness delay in between.
/// Units that return no candidates are left out of `districts`.
pub fn scrape_deputies(client: &mut UpstreamClient, districts: &[ElectoralDistrict]) -> DeputiesDocument {
    let mut groups = Vec::new();
    let mut errors = Vec::new();

    for (i, district) in districts.iter().enumerate() {
        if i > 0 {
            client.pause();
        }

        let ubigeo = match district.ubigeo.as_deref() {
            Some(ubigeo) => ubigeo.to_string(),
            None => {
                tracing::warn!(district = %district.code, "district has no ubigeo; skipped");
                errors.push(ScrapeError {
                    unit: district.code.clone(),
                    error: "district has no ubigeo".to_string(),
                });
                continue;
            }
        };

        let query = CandidateQuery::Department {
            ubigeo: ubigeo.clone(),
            election_type: election_types::DEPUTIES,
        };
        match client.list_candidates(&query) {
            Ok(candidates) if candidates.is_empty() => {
                tracing::info!(district = %district.code, "no candidates found");
            }
            Ok(candidates) => {
                tracing::debug!(district = %district.code, count = candidates.len(), "district scraped");
                groups.push(DistrictGroup {
                    district_code: district.code.clone(),
                    district_name: district.name.clone(),
                    district_ubigeo: Some(ubigeo),
                    candidates_count: candidates.len(),
                    candidates,
                });
            }
            Err(err) => {
                tracing::warn!(district = %district.code, error = %err, "district request failed");
                errors.push(ScrapeError {
                    unit: district.code.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    DeputiesDocument {
        metadata: DeputiesMetadata {
            scraped_at: crate::db::now_timestamp(),
            source: client.config().endpoint(),
            total_districts: groups.len(),
            total_candidates: groups.iter().map(|g| g.candidates_count).sum(),
            total_requests: client.request_count(),
            errors: errors.len(),
        },
        districts: groups,
        errors,
    }
}

/// Senators: the single national list, then the multiple-district list.
pub fn scrape_senators(client: &mut UpstreamClient) -> SenatorsDocument {
    let batches = [
        (SENATE_SINGLE_DISTRICT, election_types::SENATE_SINGLE_DISTRICT),
        (SENATE_MULTIPLE_DISTRICT, election_types::SENATE_MULTIPLE_DISTRICT),
    ];
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for (i, &(label, election_type)) in batches.iter().enumerate() {
        if i > 0 {
            client.pause();
        }

        match client.list_candidates(&CandidateQuery::Senate {
            election_type,
        }) {
            Ok(candidates) if candidates.is_empty() => {
                tracing::info!(batch = label, "no candidates found");
            }
            Ok(candidates) => {
                results.push(BatchGroup {
                    election_type: label.to_string(),
                    tipo_eleccion_id: election_type,
                    count: candidates.len(),
                    candidates,
                });
            }
            Err(err) => {
                tracing::warn!(batch = label, error = %err, "batch request failed");
                errors.push(ScrapeError {
                    unit: label.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    SenatorsDocument {
        scraped_at: crate::db::now_timestamp(),
        total_batches: results.len(),
        total_candidates: results.iter().map(|r| r.count).sum(),
        results,
        errors,
    }
}

/// Write a scraped document as pretty JSON, creating parent directories.
pub fn save_document<T: Serialize>(document: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
