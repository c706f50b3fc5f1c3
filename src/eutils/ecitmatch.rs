//! ECitMatch: PMIDs for bibliographic citations

use tracing::{info, instrument};

use super::client::{Endpoint, EutilsClient};
use super::request::{Eutility, QueryParams, Request, method_for_payload};
use super::session::PipelineStage;
use crate::citation::{CitationMatch, CitationMatchStatus, CitationSet, parse_citation_matches};
use crate::error::{EutilsError, Result};

/// An ECitMatch request
#[derive(Clone)]
pub struct ECitMatch {
    request: Request,
    citations: CitationSet,
}

impl ECitMatch {
    /// Build an ECitMatch request for a set of citations
    ///
    /// # Example
    ///
    /// ```no_run
    /// use entrez_client_rs::{Citation, ECitMatch, EutilsClient};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = EutilsClient::new();
    ///     let citations = Citation::new("proc natl acad sci u s a", 1991, 88, 3248, "mann bj", "Art1")
    ///         + Citation::new("science", 1987, 235, 182, "palmenberg ac", "Art2");
    ///
    ///     let mut request = ECitMatch::new(&client, citations)?;
    ///     for m in request.matches().await? {
    ///         println!("{}: {:?} ({:?})", m.key, m.pmid, m.status);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn new(client: &EutilsClient, citations: impl Into<CitationSet>) -> Result<Self> {
        let citations = citations.into();
        if citations.is_empty() {
            return Err(EutilsError::InvalidQuery(
                "At least one citation is required".to_string(),
            ));
        }

        let mut query = QueryParams::new();
        query.push("db", "pubmed");
        query.push("retmode", "xml");
        // Fields are already encoded; the `|` and `%0D` separators must stay literal
        query.push_raw("bdata", citations.to_bdata());

        let method = method_for_payload(None, citations.len());
        info!(citations_count = citations.len(), "ECitMatch request prepared");
        Ok(Self {
            request: Request::new(client.clone(), Endpoint::ECitMatch, query, method),
            citations,
        })
    }

    pub fn citations(&self) -> &CitationSet {
        &self.citations
    }

    /// Run the request and parse the reply, one entry per recognized line
    #[instrument(skip(self), fields(citations_count = self.citations.len()))]
    pub async fn matches(&mut self) -> Result<Vec<CitationMatch>> {
        let body = self.try_results().await?;
        let matches = parse_citation_matches(&body);

        info!(
            matched_count = matches
                .iter()
                .filter(|m| m.status == CitationMatchStatus::Found)
                .count(),
            "ECitMatch completed"
        );
        Ok(matches)
    }
}

impl Eutility for ECitMatch {
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
