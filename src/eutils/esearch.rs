//! ESearch: text query to a list of UIDs, optionally stored on the History server

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::client::{Endpoint, EutilsClient};
use super::parse::{find_elements, find_within, first_text};
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::{Lineage, PipelineStage, SessionSource, SessionWindow};
use crate::error::{EutilsError, Result};

/// Parameters of an ESearch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ESearchParams {
    pub term: String,
    pub db: String,
    pub usehistory: bool,
    pub retmode: String,
    pub rettype: String,
    /// History server window to search within or append to
    pub session: SessionWindow,
    pub sort: Option<String>,
    pub field: Option<String>,
    pub idtype: Option<String>,
    pub datetype: Option<String>,
    pub reldate: Option<u32>,
    pub mindate: Option<String>,
    pub maxdate: Option<String>,
    pub retstart: u32,
    pub retmax: u32,
}

impl ESearchParams {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            db: "pubmed".to_string(),
            usehistory: true,
            retmode: "xml".to_string(),
            rettype: "uilist".to_string(),
            session: SessionWindow::default(),
            sort: None,
            field: None,
            idtype: None,
            datetype: None,
            reldate: None,
            mindate: None,
            maxdate: None,
            retstart: 0,
            retmax: 20,
        }
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = db.into();
        self
    }

    pub fn with_usehistory(mut self, usehistory: bool) -> Self {
        self.usehistory = usehistory;
        self
    }

    pub fn with_retmode(mut self, retmode: impl Into<String>) -> Self {
        self.retmode = retmode.into();
        self
    }

    pub fn with_rettype(mut self, rettype: impl Into<String>) -> Self {
        self.rettype = rettype.into();
        self
    }

    pub fn with_session(mut self, session: SessionWindow) -> Self {
        self.session = session;
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_idtype(mut self, idtype: impl Into<String>) -> Self {
        self.idtype = Some(idtype.into());
        self
    }

    /// Restrict to records dated within the last `days` days of `datetype`
    pub fn with_reldate(mut self, datetype: impl Into<String>, days: u32) -> Self {
        self.datetype = Some(datetype.into());
        self.reldate = Some(days);
        self
    }

    /// Restrict to records with `datetype` between two dates (YYYY, YYYY/MM or YYYY/MM/DD)
    pub fn with_date_range(
        mut self,
        datetype: impl Into<String>,
        mindate: impl Into<String>,
        maxdate: impl Into<String>,
    ) -> Self {
        self.datetype = Some(datetype.into());
        self.mindate = Some(mindate.into());
        self.maxdate = Some(maxdate.into());
        self
    }

    pub fn with_retstart(mut self, retstart: u32) -> Self {
        self.retstart = retstart;
        self
    }

    pub fn with_retmax(mut self, retmax: u32) -> Self {
        self.retmax = retmax;
        self
    }

    fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        query.push("term", self.term.trim());
        query.push("db", &self.db);
        query.push("usehistory", if self.usehistory { "y" } else { "n" });
        query.push_non_empty("retmode", &self.retmode);
        query.push_non_empty("rettype", &self.rettype);
        query.push_opt("WebEnv", self.session.webenv.as_deref());
        query.push_opt("query_key", self.session.query_key);
        query.push_opt("sort", self.sort.as_deref());
        query.push_opt("field", self.field.as_deref());
        query.push_opt("idtype", self.idtype.as_deref());
        query.push_opt("datetype", self.datetype.as_deref());
        query.push_opt("reldate", self.reldate);
        query.push_opt("mindate", self.mindate.as_deref());
        query.push_opt("maxdate", self.maxdate.as_deref());
        query.push("retstart", self.retstart.to_string());
        query.push("retmax", self.retmax.to_string());
        query
    }
}

/// Typed view of an ESearch response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub count: u64,
    pub retmax: u64,
    pub retstart: u64,
    pub ids: Vec<String>,
    pub session: SessionWindow,
    pub query_translation: Option<String>,
}

/// An ESearch request
#[derive(Clone)]
pub struct ESearch {
    request: Request,
    params: ESearchParams,
    session: Option<SessionWindow>,
}

impl ESearch {
    /// Build an ESearch request
    ///
    /// Fails with [`EutilsError::InvalidQuery`] when the term is blank.
    pub fn new(client: &EutilsClient, params: ESearchParams) -> Result<Self> {
        if params.term.trim().is_empty() {
            return Err(EutilsError::InvalidQuery(
                "Search term cannot be empty".to_string(),
            ));
        }

        let method = method_for_payload(Some(params.term.trim()), 0);
        let request = Request::new(client.clone(), Endpoint::ESearch, params.to_query(), method);

        info!(db = %params.db, term = %params.term, "ESearch request prepared");

        Ok(Self {
            request,
            params,
            session: None,
        })
    }

    pub fn params(&self) -> &ESearchParams {
        &self.params
    }

    pub fn term(&self) -> &str {
        &self.params.term
    }

    pub fn db(&self) -> &str {
        &self.params.db
    }

    /// Session produced by the last response, if any
    pub fn session(&self) -> Option<&SessionWindow> {
        self.session.as_ref()
    }

    /// UIDs listed in the last response
    pub fn ids(&self) -> Vec<String> {
        self.raw()
            .map(|body| find_within(body, "IdList", "Id"))
            .unwrap_or_default()
    }

    /// Counts, UIDs and session of the last response
    ///
    /// `None` until the request has produced a body.
    pub fn summary(&self) -> Option<SearchSummary> {
        let body = self.raw()?;
        let number = |name: &str| {
            first_text(body, name)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };

        Some(SearchSummary {
            count: number("Count"),
            retmax: number("RetMax"),
            retstart: number("RetStart"),
            ids: find_within(body, "IdList", "Id"),
            session: self.session.clone().unwrap_or_default(),
            query_translation: first_text(body, "QueryTranslation"),
        })
    }
}

impl Eutility for ESearch {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::ESearch
    }

    fn absorb(&mut self, body: &str) {
        let session = SessionWindow {
            webenv: first_text(body, "WebEnv"),
            query_key: first_text(body, "QueryKey").and_then(|k| k.parse().ok()),
        };

        if let Some(error) = find_elements(body, "ERROR", true).into_iter().next() {
            warn!(term = %self.params.term, "ESearch reported an error: {}", error);
        }
        if self.params.usehistory && !session.is_complete() {
            warn!(term = %self.params.term, "ESearch response carries no complete history session");
        }

        debug!(%session, "ESearch session");
        let mut merged = self.params.session.clone();
        merged.update(session);
        self.session = Some(merged);
    }
}

impl SessionSource for ESearch {
    fn lineage(&self) -> Lineage {
        Lineage {
            db: self.params.db.clone(),
            term: Some(self.params.term.clone()),
            ids: self.ids(),
            idtype: self.params.idtype.clone(),
            usehistory: self.params.usehistory,
            stage: PipelineStage::ESearch,
        }
    }

    fn produced_session(&self) -> Option<SessionWindow> {
        self.session.clone()
    }

    #[instrument(skip(self), fields(term = %self.params.term))]
    async fn execute(&mut self) -> Result<SessionWindow> {
        self.try_results().await?;
        Ok(self.session.clone().unwrap_or_default())
    }
}
