//! ESpell: spelling suggestions for a query

use tracing::info;

use super::client::{Endpoint, EutilsClient};
use super::parse::first_text;
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::PipelineStage;
use crate::error::{EutilsError, Result};

/// An ESpell request
#[derive(Clone)]
pub struct ESpell {
    request: Request,
    term: String,
    db: String,
}

impl ESpell {
    /// Build an ESpell request for `term` in `db`
    pub fn new(client: &EutilsClient, term: &str, db: &str) -> Result<Self> {
        let term = term.trim();
        if term.is_empty() {
            return Err(EutilsError::InvalidQuery(
                "Search term cannot be empty".to_string(),
            ));
        }
        let db = if db.trim().is_empty() { "pubmed" } else { db.trim() };

        let mut query = QueryParams::new();
        query.push("term", term);
        query.push("db", db);

        info!(term = %term, db = %db, "ESpell request prepared");
        Ok(Self {
            request: Request::new(
                client.clone(),
                Endpoint::ESpell,
                query,
                method_for_payload(Some(term), 0),
            ),
            term: term.to_string(),
            db: db.to_string(),
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    /// Suggested spelling, `None` before results or when NCBI has none
    pub fn corrected_query(&self) -> Option<String> {
        self.raw().and_then(|body| first_text(body, "CorrectedQuery"))
    }
}

impl Eutility for ESpell {
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
