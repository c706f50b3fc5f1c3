//! NCBI E-utilities request types
//!
//! Every endpoint has a `*Params` builder and a request type implementing
//! [`Eutility`]. ESearch, ELink and EPost also implement [`SessionSource`], so
//! EPost, EFetch and ESummary (and ELink after an ESearch) can be chained with
//! `from_source`.

pub mod client;
pub mod ecitmatch;
pub mod efetch;
pub mod egquery;
pub mod einfo;
pub mod elink;
pub mod epost;
pub mod esearch;
pub mod espell;
pub mod esummary;
pub mod parse;
pub mod request;
pub mod session;

pub use client::{Endpoint, EutilsClient, HttpMethod};
pub use ecitmatch::ECitMatch;
pub use efetch::{EFetch, EFetchParams};
pub use egquery::{DatabaseCount, EGQuery};
pub use einfo::{EInfo, EInfoParams};
pub use elink::{ELink, ELinkParams, LinkCommand};
pub use epost::{EPost, EPostParams};
pub use esearch::{ESearch, ESearchParams, SearchSummary};
pub use espell::ESpell;
pub use esummary::{ESummary, ESummaryParams};
pub use parse::{FieldKind, ParsedField, extract_field, find_elements, find_within};
pub use request::{Eutility, POST_ID_THRESHOLD, POST_TERM_THRESHOLD, QueryParams, Request};
pub use session::{Inherited, Lineage, PipelineStage, SessionSource, SessionWindow, inherit_session};
