//! Ready-made request chains
//!
//! Each function runs its stages strictly one after another and reports a
//! failure as [`EutilsError::Pipeline`] naming the stage that failed.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{EutilsError, Result};
use crate::eutils::{
    EFetch, EFetchParams, ELink, ELinkParams, ESearch, ESearchParams, ESummary, ESummaryParams,
    Eutility, EutilsClient, LinkCommand, PipelineStage, SessionWindow,
};

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Last stage that ran
    pub stage: PipelineStage,
    /// History session the final request read from or produced
    pub session: SessionWindow,
    /// Raw body of the final response
    pub text: String,
}

/// Settings for the ESearch → ELink → EFetch/ESummary chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Database searched by ESearch and linked from
    pub dbfrom: String,
    /// Database linked to and fetched from
    pub dbto: String,
    pub cmd: LinkCommand,
    /// EFetch return type
    pub rettype: String,
    /// EFetch return mode
    pub retmode: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dbfrom: "pubmed".to_string(),
            dbto: "protein".to_string(),
            cmd: LinkCommand::NeighborHistory,
            rettype: "fasta".to_string(),
            retmode: "text".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dbfrom(mut self, dbfrom: impl Into<String>) -> Self {
        self.dbfrom = dbfrom.into();
        self
    }

    pub fn with_dbto(mut self, dbto: impl Into<String>) -> Self {
        self.dbto = dbto.into();
        self
    }

    pub fn with_cmd(mut self, cmd: LinkCommand) -> Self {
        self.cmd = cmd;
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
}

/// Attribute an error to `stage`, unless it already names the stage at fault
fn at(stage: PipelineStage) -> impl FnOnce(EutilsError) -> EutilsError {
    move |err| {
        let stage = match &err {
            EutilsError::SessionUnavailable { stage } => *stage,
            _ => stage,
        };
        err.at_stage(stage)
    }
}

/// Build the ESearch and the ELink chained after it
///
/// Building the link runs the search; the link itself runs when the final
/// stage is chained from it. Errors raised while chaining belong to the source.
async fn prepare_link(
    client: &EutilsClient,
    query: &str,
    opts: &PipelineOptions,
) -> Result<ELink> {
    info!(stage = %PipelineStage::ESearch, db = %opts.dbfrom, "Running pipeline stage");
    let mut search = ESearch::new(
        client,
        ESearchParams::new(query)
            .with_db(&opts.dbfrom)
            .with_retmode("xml"),
    )
    .map_err(at(PipelineStage::ESearch))?;

    let link = ELink::from_source(
        client,
        &mut search,
        ELinkParams::new(&opts.dbto)
            .with_dbfrom(&opts.dbfrom)
            .with_cmd(opts.cmd)
            .with_retmode("xml"),
    )
    .await
    .map_err(at(PipelineStage::ESearch))?;

    info!(
        stage = %PipelineStage::ELink,
        dbfrom = %opts.dbfrom,
        dbto = %opts.dbto,
        cmd = %opts.cmd,
        "Running pipeline stage"
    );
    Ok(link)
}

/// ESearch in `dbfrom`, ELink to `dbto`, EFetch the linked records
///
/// # Example
///
/// ```no_run
/// use entrez_client_rs::{EutilsClient, PipelineOptions, pipeline};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = EutilsClient::new();
///     let output = pipeline::esearch_elink_efetch(
///         &client,
///         "asthma[mesh] AND leukotrienes[mesh] AND 2009[pdat]",
///         &PipelineOptions::default(),
///     )
///     .await?;
///     println!("{}", output.text);
///     Ok(())
/// }
/// ```
#[instrument(skip(client, opts), fields(dbfrom = %opts.dbfrom, dbto = %opts.dbto))]
pub async fn esearch_elink_efetch(
    client: &EutilsClient,
    query: &str,
    opts: &PipelineOptions,
) -> Result<PipelineOutput> {
    let mut link = prepare_link(client, query, opts).await?;

    info!(stage = %PipelineStage::EFetch, db = %opts.dbto, "Running pipeline stage");
    let mut fetch = EFetch::from_source(
        client,
        &mut link,
        EFetchParams::new()
            .with_db(&opts.dbto)
            .with_rettype(&opts.rettype)
            .with_retmode(&opts.retmode),
    )
    .await
    .map_err(at(PipelineStage::ELink))?;
    let text = fetch
        .try_results()
        .await
        .map_err(at(PipelineStage::EFetch))?;

    Ok(PipelineOutput {
        stage: PipelineStage::EFetch,
        session: link.session().clone(),
        text,
    })
}

/// [`esearch_elink_efetch`] returning XML records
pub async fn esearch_elink_efetch_xml(
    client: &EutilsClient,
    query: &str,
    opts: &PipelineOptions,
) -> Result<PipelineOutput> {
    let opts = opts.clone().with_retmode("xml");
    esearch_elink_efetch(client, query, &opts).await
}

/// [`esearch_elink_efetch`] returning ASN.1 records
pub async fn esearch_elink_efetch_asn1(
    client: &EutilsClient,
    query: &str,
    opts: &PipelineOptions,
) -> Result<PipelineOutput> {
    let opts = opts.clone().with_retmode("asn.1");
    esearch_elink_efetch(client, query, &opts).await
}

/// ESearch in `dbfrom`, ELink to `dbto`, ESummary of the linked records
///
/// `rettype` and `retmode` of the options are not used; summaries are XML.
#[instrument(skip(client, opts), fields(dbfrom = %opts.dbfrom, dbto = %opts.dbto))]
pub async fn esearch_elink_esummary(
    client: &EutilsClient,
    query: &str,
    opts: &PipelineOptions,
) -> Result<PipelineOutput> {
    let mut link = prepare_link(client, query, opts).await?;

    info!(stage = %PipelineStage::ESummary, db = %opts.dbto, "Running pipeline stage");
    let mut summary = ESummary::from_source(
        client,
        &mut link,
        ESummaryParams::new().with_db(&opts.dbto),
    )
    .await
    .map_err(at(PipelineStage::ELink))?;
    let text = summary
        .try_results()
        .await
        .map_err(at(PipelineStage::ESummary))?;

    Ok(PipelineOutput {
        stage: PipelineStage::ESummary,
        session: link.session().clone(),
        text,
    })
}

/// Single ESearch with history enabled
#[instrument(skip(client))]
pub async fn esearch(client: &EutilsClient, query: &str, db: &str) -> Result<PipelineOutput> {
    let mut search = ESearch::new(client, ESearchParams::new(query).with_db(db))
        .map_err(at(PipelineStage::ESearch))?;
    let text = search
        .try_results()
        .await
        .map_err(at(PipelineStage::ESearch))?;

    Ok(PipelineOutput {
        stage: PipelineStage::ESearch,
        session: search.session().cloned().unwrap_or_default(),
        text,
    })
}

/// Single ELink from UIDs in `dbfrom` to `db`
#[instrument(skip(client, ids), fields(ids_count = ids.len()))]
pub async fn elink(
    client: &EutilsClient,
    ids: &[String],
    dbfrom: &str,
    db: &str,
    cmd: LinkCommand,
) -> Result<PipelineOutput> {
    let mut link = ELink::new(
        client,
        ELinkParams::new(db)
            .with_dbfrom(dbfrom)
            .with_cmd(cmd)
            .with_ids(ids),
    )
    .map_err(at(PipelineStage::ELink))?;
    let text = link
        .try_results()
        .await
        .map_err(at(PipelineStage::ELink))?;

    Ok(PipelineOutput {
        stage: PipelineStage::ELink,
        session: link.session().clone(),
        text,
    })
}
