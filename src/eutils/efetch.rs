//! EFetch: full records for UIDs or a History server window

use tracing::{info, instrument};

use super::client::{Endpoint, EutilsClient};
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::{
    Lineage, PipelineStage, RecordInput, SessionSource, SessionWindow, inherit_session,
};
use crate::error::Result;

/// Parameters of an EFetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EFetchParams {
    /// Database to fetch from; taken from the source when chained and left unset
    pub db: Option<String>,
    pub ids: Vec<String>,
    pub session: SessionWindow,
    pub rettype: String,
    pub retmode: String,
    /// Sequence strand: 1 plus, 2 minus
    pub strand: Option<u8>,
    pub seq_start: Option<u64>,
    pub seq_stop: Option<u64>,
    /// Blob complexity level for sequence records
    pub complexity: Option<u8>,
}

impl Default for EFetchParams {
    fn default() -> Self {
        Self {
            db: None,
            ids: Vec::new(),
            session: SessionWindow::default(),
            rettype: "fasta".to_string(),
            retmode: "text".to_string(),
            strand: None,
            seq_start: None,
            seq_stop: None,
            complexity: None,
        }
    }
}

impl EFetchParams {
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

    pub fn with_rettype(mut self, rettype: impl Into<String>) -> Self {
        self.rettype = rettype.into();
        self
    }

    pub fn with_retmode(mut self, retmode: impl Into<String>) -> Self {
        self.retmode = retmode.into();
        self
    }

    pub fn with_strand(mut self, strand: u8) -> Self {
        self.strand = Some(strand);
        self
    }

    /// Restrict sequence records to a 1-based inclusive range
    pub fn with_seq_range(mut self, start: u64, stop: u64) -> Self {
        self.seq_start = Some(start);
        self.seq_stop = Some(stop);
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = Some(complexity);
        self
    }

    fn db_or_default(&self) -> &str {
        self.db.as_deref().unwrap_or("pubmed")
    }

    fn to_query(&self, input: &RecordInput) -> QueryParams {
        let mut query = QueryParams::new();
        query.push("db", self.db_or_default());
        query.push_non_empty("rettype", &self.rettype);
        query.push_non_empty("retmode", &self.retmode);
        input.apply(&mut query);
        query.push_opt("strand", self.strand);
        query.push_opt("seq_start", self.seq_start);
        query.push_opt("seq_stop", self.seq_stop);
        query.push_opt("complexity", self.complexity);
        query
    }
}

/// An EFetch request
#[derive(Clone)]
pub struct EFetch {
    request: Request,
    params: EFetchParams,
    lineage: Option<Lineage>,
}

impl EFetch {
    /// Build an EFetch request from UIDs or a session window
    ///
    /// A complete session takes precedence over UIDs. Fails with
    /// [`EutilsError::MissingInput`](crate::EutilsError::MissingInput) when
    /// neither is given.
    pub fn new(client: &EutilsClient, params: EFetchParams) -> Result<Self> {
        Self::build(client, params, None)
    }

    /// Build an EFetch request reading the results of `source`
    ///
    /// The source is executed first when it has no session yet. Its UIDs are
    /// used when it produced no complete session.
    #[instrument(skip_all)]
    pub async fn from_source<S: SessionSource>(
        client: &EutilsClient,
        source: &mut S,
        mut params: EFetchParams,
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

    fn build(client: &EutilsClient, params: EFetchParams, lineage: Option<Lineage>) -> Result<Self> {
        let input = RecordInput::resolve(
            PipelineStage::EFetch,
            &params.session,
            &params.ids,
            lineage.as_ref().map(|l| l.stage),
        )?;

        let method = method_for_payload(None, input.id_count());
        info!(
            db = params.db_or_default(),
            rettype = %params.rettype,
            retmode = %params.retmode,
            from_history = matches!(input, RecordInput::Session(_)),
            "EFetch request prepared"
        );

        Ok(Self {
            request: Request::new(
                client.clone(),
                Endpoint::EFetch,
                params.to_query(&input),
                method,
            ),
            params,
            lineage,
        })
    }

    pub fn params(&self) -> &EFetchParams {
        &self.params
    }

    pub fn db(&self) -> &str {
        self.params.db_or_default()
    }

    /// Originating search term, when chained
    pub fn term(&self) -> Option<&str> {
        self.lineage.as_ref().and_then(|l| l.term.as_deref())
    }
}

impl Eutility for EFetch {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::EFetch
    }
}
