//! ELink: UIDs in one database linked to UIDs in another

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, instrument, warn};

use super::client::{Endpoint, EutilsClient};
use super::esearch::ESearch;
use super::parse::{find_within, first_text};
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::{Lineage, PipelineStage, SessionSource, SessionWindow, inherit_session};
use crate::error::{EutilsError, Result};

/// ELink command modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LinkCommand {
    #[default]
    Neighbor,
    NeighborScore,
    NeighborHistory,
    ACheck,
    NCheck,
    LCheck,
    LLinks,
    LLinksLib,
    PrLinks,
}

impl LinkCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkCommand::Neighbor => "neighbor",
            LinkCommand::NeighborScore => "neighbor_score",
            LinkCommand::NeighborHistory => "neighbor_history",
            LinkCommand::ACheck => "acheck",
            LinkCommand::NCheck => "ncheck",
            LinkCommand::LCheck => "lcheck",
            LinkCommand::LLinks => "llinks",
            LinkCommand::LLinksLib => "llinkslib",
            LinkCommand::PrLinks => "prlinks",
        }
    }

    /// The command reads from or posts to the History server
    pub fn uses_history(&self) -> bool {
        matches!(self, LinkCommand::NeighborHistory)
    }

    /// The command accepts a LinkOut `holding` provider filter
    pub fn accepts_holding(&self) -> bool {
        matches!(self, LinkCommand::LLinks | LinkCommand::LLinksLib)
    }
}

impl fmt::Display for LinkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkCommand {
    type Err = EutilsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neighbor" => Ok(LinkCommand::Neighbor),
            "neighbor_score" => Ok(LinkCommand::NeighborScore),
            "neighbor_history" => Ok(LinkCommand::NeighborHistory),
            "acheck" => Ok(LinkCommand::ACheck),
            "ncheck" => Ok(LinkCommand::NCheck),
            "lcheck" => Ok(LinkCommand::LCheck),
            "llinks" => Ok(LinkCommand::LLinks),
            "llinkslib" => Ok(LinkCommand::LLinksLib),
            "prlinks" => Ok(LinkCommand::PrLinks),
            other => Err(EutilsError::InvalidQuery(format!(
                "Unknown ELink command: {other}"
            ))),
        }
    }
}

/// Parameters of an ELink request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ELinkParams {
    /// Target database
    pub db: String,
    /// Origin database; taken from the source when chained and left unset
    pub dbfrom: Option<String>,
    pub cmd: LinkCommand,
    /// Defaults to `{dbfrom}_{db}`
    pub linkname: Option<String>,
    pub ids: Vec<String>,
    pub idtype: Option<String>,
    pub retmode: String,
    pub session: SessionWindow,
    pub holding: Option<String>,
    pub datetype: Option<String>,
    pub reldate: Option<u32>,
    pub mindate: Option<String>,
    pub maxdate: Option<String>,
}

impl Default for ELinkParams {
    fn default() -> Self {
        Self {
            db: "pubmed".to_string(),
            dbfrom: None,
            cmd: LinkCommand::default(),
            linkname: None,
            ids: Vec::new(),
            idtype: None,
            retmode: "xml".to_string(),
            session: SessionWindow::default(),
            holding: None,
            datetype: None,
            reldate: None,
            mindate: None,
            maxdate: None,
        }
    }
}

impl ELinkParams {
    /// Link into the `db` database
    pub fn new(db: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            ..Self::default()
        }
    }

    pub fn with_dbfrom(mut self, dbfrom: impl Into<String>) -> Self {
        self.dbfrom = Some(dbfrom.into());
        self
    }

    pub fn with_cmd(mut self, cmd: LinkCommand) -> Self {
        self.cmd = cmd;
        self
    }

    pub fn with_linkname(mut self, linkname: impl Into<String>) -> Self {
        self.linkname = Some(linkname.into());
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

    pub fn with_idtype(mut self, idtype: impl Into<String>) -> Self {
        self.idtype = Some(idtype.into());
        self
    }

    pub fn with_retmode(mut self, retmode: impl Into<String>) -> Self {
        self.retmode = retmode.into();
        self
    }

    pub fn with_session(mut self, session: SessionWindow) -> Self {
        self.session = session;
        self
    }

    /// LinkOut provider filter, only sent with `llinks`/`llinkslib`
    pub fn with_holding(mut self, holding: impl Into<String>) -> Self {
        self.holding = Some(holding.into());
        self
    }

    pub fn with_reldate(mut self, datetype: impl Into<String>, days: u32) -> Self {
        self.datetype = Some(datetype.into());
        self.reldate = Some(days);
        self
    }

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

    fn dbfrom_or_default(&self) -> &str {
        self.dbfrom.as_deref().unwrap_or("pubmed")
    }

    fn to_query(&self) -> QueryParams {
        let dbfrom = self.dbfrom_or_default();
        let linkname = self
            .linkname
            .clone()
            .unwrap_or_else(|| format!("{}_{}", dbfrom, self.db));

        let mut query = QueryParams::new();
        query.push("dbfrom", dbfrom);
        query.push("db", &self.db);
        query.push("linkname", linkname);
        query.push("cmd", self.cmd.as_str());
        query.push_non_empty("retmode", &self.retmode);
        query.push_opt("query_key", self.session.query_key);
        query.push_opt("WebEnv", self.session.webenv.as_deref());
        // UIDs are the fallback when no complete session is available
        if !self.session.is_complete() && !self.ids.is_empty() {
            query.push("id", self.ids.join(","));
        }
        query.push_opt("idtype", self.idtype.as_deref());
        if self.cmd.accepts_holding() {
            query.push_opt("holding", self.holding.as_deref());
        }
        query.push_opt("datetype", self.datetype.as_deref());
        query.push_opt("reldate", self.reldate);
        query.push_opt("mindate", self.mindate.as_deref());
        query.push_opt("maxdate", self.maxdate.as_deref());
        query
    }
}

/// An ELink request
#[derive(Clone)]
pub struct ELink {
    request: Request,
    params: ELinkParams,
    term: Option<String>,
    usehistory: bool,
    session: SessionWindow,
    produced: bool,
}

impl ELink {
    /// Build a standalone ELink request from UIDs or an existing session
    pub fn new(client: &EutilsClient, params: ELinkParams) -> Result<Self> {
        Ok(Self::build(client, params, None, false))
    }

    /// Build an ELink request chained after an ESearch
    ///
    /// The search is executed first when it has no session yet. Identifying
    /// fields (term, usehistory, origin database) are copied from it, and its
    /// WebEnv/query_key window replaces the UID list in the payload.
    #[instrument(skip_all, fields(db = %params.db, cmd = %params.cmd))]
    pub async fn from_source(
        client: &EutilsClient,
        source: &mut ESearch,
        mut params: ELinkParams,
    ) -> Result<Self> {
        let inherited = inherit_session(client, source).await?;

        if params.dbfrom.is_none() {
            params.dbfrom = Some(inherited.lineage.db.clone());
        }
        if !inherited.session.is_empty() {
            params.session = inherited.session;
        }
        if params.ids.is_empty() {
            params.ids = inherited.lineage.ids;
        }
        if params.idtype.is_none() {
            params.idtype = inherited.lineage.idtype;
        }

        Ok(Self::build(
            client,
            params,
            inherited.lineage.term,
            inherited.lineage.usehistory,
        ))
    }

    fn build(
        client: &EutilsClient,
        params: ELinkParams,
        term: Option<String>,
        usehistory: bool,
    ) -> Self {
        let cmd = params.cmd;
        let session = params.session.clone();

        if cmd.uses_history() && session.is_empty() {
            warn!(
                %cmd,
                "ELink command requires data from the History server, but no WebEnv or query_key has been set"
            );
        }
        if session.is_complete() && !cmd.uses_history() {
            warn!(
                %cmd,
                "WebEnv and query_key are set, but this ELink command does not use them; the response may be empty"
            );
        }

        let method = method_for_payload(None, params.ids.len());
        let query = params.to_query();
        debug!(payload = %query.to_query_string(), "ELink payload");
        info!(
            dbfrom = params.dbfrom_or_default(),
            db = %params.db,
            %cmd,
            "ELink request prepared"
        );

        Self {
            request: Request::new(client.clone(), Endpoint::ELink, query, method),
            params,
            term,
            usehistory,
            session,
            produced: false,
        }
    }

    pub fn params(&self) -> &ELinkParams {
        &self.params
    }

    /// Target database
    pub fn db(&self) -> &str {
        &self.params.db
    }

    pub fn dbfrom(&self) -> &str {
        self.params.dbfrom_or_default()
    }

    pub fn cmd(&self) -> LinkCommand {
        self.params.cmd
    }

    /// Originating search term, when chained from an ESearch
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn usehistory(&self) -> bool {
        self.usehistory
    }

    /// Current session: the inherited one, updated by the response
    pub fn session(&self) -> &SessionWindow {
        &self.session
    }

    /// UIDs found in `<Link><Id>` elements of the last response
    pub fn linked_ids(&self) -> Vec<String> {
        self.raw()
            .map(|body| find_within(body, "Link", "Id"))
            .unwrap_or_default()
    }
}

impl Eutility for ELink {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::ELink
    }

    fn absorb(&mut self, body: &str) {
        let webenv = first_text(body, "WebEnv");
        let query_key = first_text(body, "QueryKey").and_then(|k| k.parse::<u32>().ok());

        if webenv.is_some() && query_key.is_none() {
            warn!(
                dbfrom = self.dbfrom(),
                db = %self.params.db,
                "ELink response has a WebEnv but no QueryKey; EFetch and ESummary cannot chain from it"
            );
        }

        self.session.update(SessionWindow { webenv, query_key });
        self.produced = true;
        debug!(session = %self.session, "ELink session");
    }
}

impl SessionSource for ELink {
    fn lineage(&self) -> Lineage {
        let linked = self.linked_ids();
        Lineage {
            db: self.params.db.clone(),
            term: self.term.clone(),
            ids: if linked.is_empty() {
                self.params.ids.clone()
            } else {
                linked
            },
            idtype: self.params.idtype.clone(),
            usehistory: self.usehistory,
            stage: PipelineStage::ELink,
        }
    }

    fn produced_session(&self) -> Option<SessionWindow> {
        self.produced.then(|| self.session.clone())
    }

    #[instrument(skip(self), fields(db = %self.params.db, cmd = %self.params.cmd))]
    async fn execute(&mut self) -> Result<SessionWindow> {
        self.try_results().await?;
        Ok(self.session.clone())
    }
}
