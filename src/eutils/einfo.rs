//! EInfo: database list or statistics for one database

use tracing::info;

use super::client::{Endpoint, EutilsClient, HttpMethod};
use super::parse::{find_within, first_text};
use super::request::{Eutility, QueryParams, Request};
use super::session::PipelineStage;
use crate::error::Result;

/// Parameters of an EInfo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EInfoParams {
    /// Database to describe; empty lists all databases
    pub db: String,
    pub retmode: String,
    pub version: String,
}

impl Default for EInfoParams {
    fn default() -> Self {
        Self {
            db: String::new(),
            retmode: "xml".to_string(),
            version: "2.0".to_string(),
        }
    }
}

impl EInfoParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    pub fn with_retmode(mut self, retmode: impl Into<String>) -> Self {
        self.retmode = retmode.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        query.push_non_empty("db", self.db.trim());
        query.push_non_empty("retmode", &self.retmode);
        query.push_non_empty("version", &self.version);
        query
    }
}

/// An EInfo request
#[derive(Clone)]
pub struct EInfo {
    request: Request,
    params: EInfoParams,
}

impl EInfo {
    pub fn new(client: &EutilsClient, params: EInfoParams) -> Result<Self> {
        let db = if params.db.is_empty() { "<all>" } else { params.db.as_str() };
        info!(db, "EInfo request prepared");
        Ok(Self {
            request: Request::new(
                client.clone(),
                Endpoint::EInfo,
                params.to_query(),
                HttpMethod::Get,
            ),
            params,
        })
    }

    pub fn params(&self) -> &EInfoParams {
        &self.params
    }

    /// Database names listed by a database-list response
    pub fn databases(&self) -> Vec<String> {
        self.raw()
            .map(|body| find_within(body, "DbList", "DbName"))
            .unwrap_or_default()
    }

    /// Record count of a single-database response
    pub fn record_count(&self) -> Option<u64> {
        self.raw()
            .and_then(|body| first_text(body, "Count"))
            .and_then(|count| count.parse().ok())
    }
}

impl Eutility for EInfo {
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
