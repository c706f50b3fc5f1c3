//! History server session windows and the relay between chained requests
//!
//! ESearch, ELink and EPost can leave their results on NCBI's History server and
//! hand back a `WebEnv`/`query_key` pair. A downstream request built with
//! `from_source` picks that pair up through [`inherit_session`], triggering the
//! upstream call first when it has not run yet.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use super::client::EutilsClient;
use super::request::{Eutility, QueryParams};
use crate::error::{EutilsError, Result};

/// Location of a stored result set on the NCBI History server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    /// Opaque Web Environment token
    pub webenv: Option<String>,
    /// Handle of one result set within the Web Environment
    pub query_key: Option<u32>,
}

impl SessionWindow {
    pub fn new(webenv: impl Into<String>, query_key: u32) -> Self {
        Self {
            webenv: Some(webenv.into()),
            query_key: Some(query_key),
        }
    }

    /// Both coordinates are present
    pub fn is_complete(&self) -> bool {
        self.webenv.is_some() && self.query_key.is_some()
    }

    /// Neither coordinate is present
    pub fn is_empty(&self) -> bool {
        self.webenv.is_none() && self.query_key.is_none()
    }

    /// Overwrite coordinates with the ones present in `newer`
    pub fn update(&mut self, newer: SessionWindow) {
        if newer.webenv.is_some() {
            self.webenv = newer.webenv;
        }
        if newer.query_key.is_some() {
            self.query_key = newer.query_key;
        }
    }

    /// Append `query_key` and `WebEnv` parameters for whatever is set
    pub(crate) fn apply(&self, params: &mut QueryParams) {
        if let Some(query_key) = self.query_key {
            params.push("query_key", query_key.to_string());
        }
        if let Some(webenv) = &self.webenv {
            params.push("WebEnv", webenv);
        }
    }
}

impl fmt::Display for SessionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WebEnv: {}, QueryKey: {}",
            self.webenv.as_deref().unwrap_or("-"),
            self.query_key
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

/// Pipeline stage marker carried by requests and pipeline output
///
/// Purely informational: it records which E-utility last produced results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    #[default]
    None,
    ESearch,
    ELink,
    ESummary,
    EFetch,
    EPost,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::None => "NONE",
            PipelineStage::ESearch => "ESEARCH",
            PipelineStage::ELink => "ELINK",
            PipelineStage::ESummary => "ESUMMARY",
            PipelineStage::EFetch => "EFETCH",
            PipelineStage::EPost => "EPOST",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifying fields a source hands to the request chained after it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    /// Database the source's results live in
    pub db: String,
    /// Originating text query, if any
    pub term: Option<String>,
    /// UIDs known to the source (input UIDs or UIDs from its response)
    pub ids: Vec<String>,
    pub idtype: Option<String>,
    pub usehistory: bool,
    pub stage: PipelineStage,
}

/// A request whose results can feed a downstream request
#[allow(async_fn_in_trait)]
pub trait SessionSource: Eutility {
    /// Identifying fields to copy downstream
    fn lineage(&self) -> Lineage;

    /// Session produced by this request's own call, `None` until it has run
    fn produced_session(&self) -> Option<SessionWindow>;

    /// Run this request's own network call and return the session it produced
    async fn execute(&mut self) -> Result<SessionWindow>;
}

/// What a chained request receives from its source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inherited {
    pub lineage: Lineage,
    pub session: SessionWindow,
}

/// Copy identifying fields and the session window out of `source`
///
/// When the source has not produced a complete session yet its own call is
/// executed first. The configured pipeline delay follows only when that
/// execution went to the network; a cached answer is not paused after.
pub async fn inherit_session<S: SessionSource>(
    client: &EutilsClient,
    source: &mut S,
) -> Result<Inherited> {
    let session = match source.produced_session() {
        Some(session) if session.is_complete() => {
            debug!(%session, "Reusing session from source");
            session
        }
        _ => {
            let stage = source.lineage().stage;
            info!(%stage, "Source has no session yet, executing it first");
            let calls_before = source.request().calls();
            let session = source.execute().await?;

            let delay = client.config().pipeline_delay;
            if source.request().calls() > calls_before && !delay.is_zero() {
                debug!(delay_ms = delay.as_millis(), "Pausing before next request");
                sleep(delay).await;
            }
            session
        }
    };

    Ok(Inherited {
        lineage: source.lineage(),
        session,
    })
}

/// Record selection for EFetch and ESummary
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordInput {
    Session(SessionWindow),
    Ids(Vec<String>),
}

impl RecordInput {
    /// Prefer a complete session, fall back to UIDs
    ///
    /// `chained_from` names the source stage when the request was built from
    /// one, turning a missing input into [`EutilsError::SessionUnavailable`].
    pub(crate) fn resolve(
        stage: PipelineStage,
        session: &SessionWindow,
        ids: &[String],
        chained_from: Option<PipelineStage>,
    ) -> Result<Self> {
        if session.is_complete() {
            return Ok(RecordInput::Session(session.clone()));
        }
        if !ids.is_empty() {
            return Ok(RecordInput::Ids(ids.to_vec()));
        }
        Err(match chained_from {
            Some(source) => EutilsError::SessionUnavailable { stage: source },
            None => EutilsError::MissingInput { stage },
        })
    }

    pub(crate) fn apply(&self, params: &mut QueryParams) {
        match self {
            RecordInput::Session(session) => session.apply(params),
            RecordInput::Ids(ids) => params.push("id", ids.join(",")),
        }
    }

    pub(crate) fn id_count(&self) -> usize {
        match self {
            RecordInput::Session(_) => 0,
            RecordInput::Ids(ids) => ids.len(),
        }
    }
}
