//! EPost: upload UIDs to the History server

use tracing::{debug, info, instrument};

use super::client::{Endpoint, EutilsClient};
use super::parse::first_text;
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::{Lineage, PipelineStage, SessionSource, SessionWindow, inherit_session};
use crate::error::{EutilsError, Result};

/// Parameters of an EPost request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EPostParams {
    /// Database of the UIDs; taken from the source when chained and left unset
    pub db: Option<String>,
    pub ids: Vec<String>,
    /// Existing Web Environment to append the UIDs to
    pub webenv: Option<String>,
}

impl EPostParams {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    pub fn with_webenv(mut self, webenv: impl Into<String>) -> Self {
        self.webenv = Some(webenv.into());
        self
    }

    fn db_or_default(&self) -> &str {
        self.db.as_deref().unwrap_or("pubmed")
    }

    fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        query.push("db", self.db_or_default());
        query.push("id", self.ids.join(","));
        query.push_opt("WebEnv", self.webenv.as_deref());
        query
    }
}

/// An EPost request
#[derive(Clone)]
pub struct EPost {
    request: Request,
    params: EPostParams,
    term: Option<String>,
    session: Option<SessionWindow>,
}

impl EPost {
    /// Build an EPost request
    ///
    /// Fails with [`EutilsError::MissingInput`] when no UIDs are given.
    pub fn new(client: &EutilsClient, params: EPostParams) -> Result<Self> {
        Self::build(client, params, None)
    }

    /// Build an EPost request appending to the Web Environment of `source`
    ///
    /// The source is executed first when it has no session yet. Without UIDs
    /// of its own the request posts the UIDs known to the source.
    #[instrument(skip_all)]
    pub async fn from_source<S: SessionSource>(
        client: &EutilsClient,
        source: &mut S,
        mut params: EPostParams,
    ) -> Result<Self> {
        let inherited = inherit_session(client, source).await?;

        if params.db.is_none() {
            params.db = Some(inherited.lineage.db.clone());
        }
        if params.webenv.is_none() {
            params.webenv = inherited.session.webenv;
        }
        if params.ids.is_empty() {
            params.ids = inherited.lineage.ids;
        }

        Self::build(client, params, inherited.lineage.term)
    }

    fn build(client: &EutilsClient, params: EPostParams, term: Option<String>) -> Result<Self> {
        if params.ids.is_empty() {
            return Err(EutilsError::MissingInput {
                stage: PipelineStage::EPost,
            });
        }

        let method = method_for_payload(None, params.ids.len());
        info!(
            db = params.db_or_default(),
            ids_count = params.ids.len(),
            appending = params.webenv.is_some(),
            "EPost request prepared"
        );

        Ok(Self {
            request: Request::new(client.clone(), Endpoint::EPost, params.to_query(), method),
            params,
            term,
            session: None,
        })
    }

    pub fn params(&self) -> &EPostParams {
        &self.params
    }

    pub fn db(&self) -> &str {
        self.params.db_or_default()
    }

    pub fn ids(&self) -> &[String] {
        &self.params.ids
    }

    pub fn session(&self) -> Option<&SessionWindow> {
        self.session.as_ref()
    }
}

impl Eutility for EPost {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::EPost
    }

    fn absorb(&mut self, body: &str) {
        let session = SessionWindow {
            webenv: first_text(body, "WebEnv").or_else(|| self.params.webenv.clone()),
            query_key: first_text(body, "QueryKey").and_then(|k| k.parse().ok()),
        };
        debug!(%session, "EPost session");
        self.session = Some(session);
    }
}

impl SessionSource for EPost {
    fn lineage(&self) -> Lineage {
        Lineage {
            db: self.db().to_string(),
            term: self.term.clone(),
            ids: self.params.ids.clone(),
            idtype: None,
            usehistory: true,
            stage: PipelineStage::EPost,
        }
    }

    fn produced_session(&self) -> Option<SessionWindow> {
        self.session.clone()
    }

    #[instrument(skip(self), fields(db = self.db(), ids_count = self.params.ids.len()))]
    async fn execute(&mut self) -> Result<SessionWindow> {
        self.try_results().await?;
        Ok(self.session.clone().unwrap_or_default())
    }
}
