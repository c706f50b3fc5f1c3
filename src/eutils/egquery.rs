//! EGQuery: record counts for one query across all Entrez databases

use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::{Endpoint, EutilsClient};
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::PipelineStage;
use crate::error::{EutilsError, Result};
use crate::results::{EResults, ResultFormat};

/// Hits for the query in one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCount {
    pub db_name: String,
    pub menu_name: String,
    pub count: u64,
    pub status: String,
}

impl DatabaseCount {
    pub fn has_results(&self) -> bool {
        self.count > 0
    }
}

/// An EGQuery request
#[derive(Clone)]
pub struct EGQuery {
    request: Request,
    term: String,
}

impl EGQuery {
    pub fn new(client: &EutilsClient, term: &str) -> Result<Self> {
        let term = term.trim();
        if term.is_empty() {
            return Err(EutilsError::InvalidQuery(
                "Search term cannot be empty".to_string(),
            ));
        }

        let mut query = QueryParams::new();
        query.push("term", term);

        info!(term = %term, "EGQuery request prepared");
        Ok(Self {
            request: Request::new(
                client.clone(),
                Endpoint::EGQuery,
                query,
                method_for_payload(Some(term), 0),
            ),
            term: term.to_string(),
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Per-database counts of the last response
    pub fn counts(&self) -> Vec<DatabaseCount> {
        self.raw().map(parse_counts).unwrap_or_default()
    }
}

/// Read one [`DatabaseCount`] per `<ResultItem>`
///
/// Items without a `DbName` are skipped. Counts that are not numbers (NCBI
/// reports `Term or Database is not found` and similar) become 0.
fn parse_counts(body: &str) -> Vec<DatabaseCount> {
    let results = EResults::new(body, ResultFormat::Tree);
    let Some(roots) = results.tree() else {
        return Vec::new();
    };

    roots
        .iter()
        .flat_map(|root| root.find_all("ResultItem"))
        .filter_map(|item| {
            let child = |name: &str| item.find(name).map(|node| node.text.clone());
            let db_name = child("DbName").filter(|name| !name.is_empty())?;
            Some(DatabaseCount {
                menu_name: child("MenuName").unwrap_or_else(|| db_name.clone()),
                count: child("Count").and_then(|c| c.parse().ok()).unwrap_or(0),
                status: child("Status").unwrap_or_default(),
                db_name,
            })
        })
        .collect()
}

impl Eutility for EGQuery {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::None
    }
}
