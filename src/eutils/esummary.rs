//! ESummary: document summaries for UIDs or a History server window

use tracing::{info, instrument};

use super::client::{Endpoint, EutilsClient};
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::{
    Lineage, PipelineStage, RecordInput, SessionSource, SessionWindow, inherit_session,
};
use crate::error::Result;

/// Parameters of an ESummary request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ESummaryParams {
    /// Database to summarize from; taken from the source when chained and left unset
    pub db: Option<String>,
    pub ids: Vec<String>,
    pub session: SessionWindow,
    pub retstart: u32,
    pub retmax: u32,
    pub retmode: String,
    pub version: String,
}

impl Default for ESummaryParams {
    fn default() -> Self {
        Self {
            db: None,
            ids: Vec::new(),
            session: SessionWindow::default(),
            retstart: 0,
            retmax: 10000,
            retmode: "xml".to_string(),
            version: "2.0".to_string(),
        }
    }
}

impl ESummaryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.ids = ids.into_iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_session(mut self, session: SessionWindow) -> Self {
        self.session = session;
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

    pub fn with_retmode(mut self, retmode: impl Into<String>) -> Self {
        self.retmode = retmode.into();
        self
    }

    /// DocSum format version; "2.0" or empty for the legacy format
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    fn db_or_default(&self) -> &str {
        self.db.as_deref().unwrap_or("pubmed")
    }

    fn to_query(&self, input: &RecordInput) -> QueryParams {
        let mut query = QueryParams::new();
        query.push("db", self.db_or_default());
        input.apply(&mut query);
        query.push("retstart", self.retstart.to_string());
        query.push("retmax", self.retmax.to_string());
        query.push_non_empty("retmode", &self.retmode);
        query.push_non_empty("version", &self.version);
        query
    }
}

/// An ESummary request
#[derive(Clone)]
pub struct ESummary {
    request: Request,
    params: ESummaryParams,
    lineage: Option<Lineage>,
}

impl ESummary {
    pub fn new(client: &EutilsClient, params: ESummaryParams) -> Result<Self> {
        Self::build(client, params, None)
    }

    /// Build an ESummary request reading the results of `source`
    #[instrument(skip_all)]
    pub async fn from_source<S: SessionSource>(
        client: &EutilsClient,
        source: &mut S,
        mut params: ESummaryParams,
    ) -> Result<Self> {
        let inherited = inherit_session(client, source).await?;

        if params.db.is_none() {
            params.db = Some(inherited.lineage.db.clone());
        }
        if !params.session.is_complete() {
            params.session = inherited.session;
        }
        if params.ids.is_empty() {
            params.ids = inherited.lineage.ids.clone();
        }

        Self::build(client, params, Some(inherited.lineage))
    }

    fn build(
        client: &EutilsClient,
        params: ESummaryParams,
        lineage: Option<Lineage>,
    ) -> Result<Self> {
        let input = RecordInput::resolve(
            PipelineStage::ESummary,
            &params.session,
            &params.ids,
            lineage.as_ref().map(|l| l.stage),
        )?;

        let method = method_for_payload(None, input.id_count());
        info!(
            db = params.db_or_default(),
            retmax = params.retmax,
            "ESummary request prepared"
        );

        Ok(Self {
            request: Request::new(
                client.clone(),
                Endpoint::ESummary,
                params.to_query(&input),
                method,
            ),
            params,
            lineage,
        })
    }

    pub fn params(&self) -> &ESummaryParams {
        &self.params
    }

    pub fn db(&self) -> &str {
        self.params.db_or_default()
    }

    pub fn term(&self) -> Option<&str> {
        self.lineage.as_ref().and_then(|l| l.term.as_deref())
    }
}

impl Eutility for ESummary {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::ESummary
    }
}
