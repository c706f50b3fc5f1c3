//! # Entrez Client
//!
//! A thin async client for NCBI's Entrez E-utilities: ESearch, ELink, EFetch,
//! EPost, ESummary, EInfo, ESpell, EGQuery and ECitMatch.
//!
//! Each request type builds its query string once, performs a single HTTP call
//! when its results are first asked for, and hands back the response body. The
//! only composition logic is the History server relay: a request built with
//! `from_source` copies the WebEnv/query_key window of an upstream request,
//! running the upstream call first when needed.
//!
//! ## Features
//!
//! - **Every E-utility**: typed parameter builders with NCBI's defaults
//! - **Session relay**: ESearch → ELink → EFetch/ESummary chains, EPost uploads
//! - **Rate limiting**: shared token bucket at NCBI's 3 (or 10 with API key) requests/second
//! - **Error handling**: lossy `results()` plus strict `try_results()`
//!
//! ## Quick Start
//!
//! ### Chaining requests
//!
//! ```no_run
//! use entrez_client_rs::{
//!     EFetch, EFetchParams, ELink, ELinkParams, ESearch, ESearchParams, Eutility, EutilsClient,
//!     LinkCommand,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EutilsClient::new();
//!
//!     let mut search = ESearch::new(&client, ESearchParams::new("asthma[mesh] AND 2019[pdat]"))?;
//!     let mut link = ELink::from_source(
//!         &client,
//!         &mut search,
//!         ELinkParams::new("protein").with_cmd(LinkCommand::NeighborHistory),
//!     )
//!     .await?;
//!     let mut fetch = EFetch::from_source(&client, &mut link, EFetchParams::new()).await?;
//!
//!     println!("{}", fetch.results().await);
//!     Ok(())
//! }
//! ```
//!
//! ### Matching citations
//!
//! ```no_run
//! use entrez_client_rs::{Citation, ECitMatch, EutilsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EutilsClient::new();
//!     let citation = Citation::new("science", 1987, 235, 182, "palmenberg ac", "Art2");
//!     let mut request = ECitMatch::new(&client, citation)?;
//!     println!("{:?}", request.matches().await?);
//!     Ok(())
//! }
//! ```

pub mod citation;
pub mod config;
pub mod error;
pub mod eutils;
pub mod logging;
pub mod pipeline;
pub mod rate_limit;
pub mod results;

// Re-export main types for convenience
pub use citation::{Citation, CitationMatch, CitationMatchStatus, CitationSet};
pub use config::ClientConfig;
pub use error::{EutilsError, Result};
pub use eutils::{
    DatabaseCount, ECitMatch, EFetch, EFetchParams, EGQuery, EInfo, EInfoParams, ELink,
    ELinkParams, EPost, EPostParams, ESearch, ESearchParams, ESpell, ESummary, ESummaryParams,
    Endpoint, Eutility, EutilsClient, FieldKind, HttpMethod, LinkCommand, ParsedField,
    PipelineStage, SearchSummary, SessionSource, SessionWindow,
};
pub use logging::init_logging;
pub use pipeline::{PipelineOptions, PipelineOutput};
pub use rate_limit::RateLimiter;
pub use results::{EResults, ResultFormat, XmlNode};
