//! Shared request core for every E-utility
//!
//! A [`Request`] owns the ordered parameter list for one endpoint, performs the
//! HTTP call at most once per successful response, and keeps the raw body plus
//! any fields extracted from it.

use std::collections::BTreeMap;

use tracing::{debug, error, instrument};

use super::client::{Endpoint, EutilsClient, HttpMethod};
use super::parse::{FieldKind, ParsedField, extract_field};
use super::session::PipelineStage;
use crate::error::{EutilsError, Result};

/// Terms longer than this are sent with POST
pub const POST_TERM_THRESHOLD: usize = 100;

/// UID lists of at least this many entries are sent with POST
pub const POST_ID_THRESHOLD: usize = 200;

/// Ordered, URL-encodable request parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String, bool)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, URL-encoded on serialization
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into(), false));
    }

    /// Append a parameter only when the value is non-empty
    pub fn push_non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.push(key, value);
        }
    }

    pub fn push_opt<T: ToString>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.push(key, value.to_string());
        }
    }

    /// Append a parameter that is already encoded for the wire
    pub fn push_raw(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into(), true));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, v, _)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn extend(&mut self, pairs: impl IntoIterator<Item = (String, String)>) {
        self.pairs
            .extend(pairs.into_iter().map(|(k, v)| (k, v, false)));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _, _)| k.as_str())
    }

    /// Serialize as `key=value&key=value`
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value, raw)| {
                if *raw {
                    format!("{}={}", key, value)
                } else {
                    format!("{}={}", key, urlencoding::encode(value))
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Pick GET or POST from the size of the payload
pub fn method_for_payload(term: Option<&str>, id_count: usize) -> HttpMethod {
    let long_term = term.is_some_and(|t| t.chars().count() > POST_TERM_THRESHOLD);
    if long_term || id_count >= POST_ID_THRESHOLD {
        HttpMethod::Post
    } else {
        HttpMethod::Get
    }
}

/// One configured call to an E-utilities endpoint
#[derive(Clone)]
pub struct Request {
    client: EutilsClient,
    endpoint: Endpoint,
    params: QueryParams,
    method: HttpMethod,
    body: Option<String>,
    fields: BTreeMap<String, ParsedField>,
    calls: usize,
}

impl Request {
    pub(crate) fn new(
        client: EutilsClient,
        endpoint: Endpoint,
        params: QueryParams,
        method: HttpMethod,
    ) -> Self {
        Self {
            client,
            endpoint,
            params,
            method,
            body: None,
            fields: BTreeMap::new(),
            calls: 0,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn client(&self) -> &EutilsClient {
        &self.client
    }

    /// Full GET URL of this request, without identification parameters
    pub fn url(&self) -> String {
        format!(
            "{}?{}",
            self.client.endpoint_url(self.endpoint),
            self.params.to_query_string()
        )
    }

    /// Cached response body, if a non-empty one has been received
    pub fn cached(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }

    /// Number of network calls issued so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Fields extracted so far with [`Request::parse`]
    pub fn fields(&self) -> &BTreeMap<String, ParsedField> {
        &self.fields
    }

    /// Return the cached body or perform the call
    ///
    /// The second element tells whether a network call was made.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub(crate) async fn fetch(&mut self) -> Result<(String, bool)> {
        if let Some(body) = self.cached() {
            debug!("Serving cached response");
            return Ok((body.to_string(), false));
        }

        self.calls += 1;
        let body = self
            .client
            .execute(self.endpoint, &self.params, self.method)
            .await?;
        self.body = Some(body.clone());
        self.fields.clear();
        Ok((body, true))
    }

    /// Extract `name` from the last response body and remember it
    ///
    /// Returns empty text when nothing has been received or the field is absent.
    pub fn parse(&mut self, name: &str, kind: FieldKind, first: bool) -> ParsedField {
        let Some(body) = self.body.as_deref() else {
            return ParsedField::Text(String::new());
        };

        let field = extract_field(body, name, kind, first);
        if !field.is_empty() {
            debug!(endpoint = %self.endpoint, field = name, value = %field, "Parsed field");
            self.fields.insert(name.to_string(), field.clone());
        }
        field
    }
}

/// Contract shared by every E-utility request type
#[allow(async_fn_in_trait)]
pub trait Eutility {
    fn request(&self) -> &Request;

    fn request_mut(&mut self) -> &mut Request;

    /// Stage tag of this request
    fn stage(&self) -> PipelineStage;

    /// Hook run once for every freshly received body
    fn absorb(&mut self, _body: &str) {}

    /// Perform the call once and return the body, with a typed error on failure
    async fn try_results(&mut self) -> Result<String> {
        let (body, fresh) = self.request_mut().fetch().await?;
        if fresh {
            self.absorb(&body);
        }
        Ok(body)
    }

    /// Perform the call once and return the body as text
    ///
    /// A non-success status yields an empty string and a transport failure
    /// yields the error message; both are logged. Use
    /// [`try_results`](Eutility::try_results) to tell these apart from an
    /// empty result.
    async fn results(&mut self) -> String {
        let stage = self.stage();
        match self.try_results().await {
            Ok(body) => body,
            Err(EutilsError::ApiError { status, message }) => {
                error!(%stage, status, "{} did not complete successfully: {}", stage, message);
                String::new()
            }
            Err(err) => {
                error!(%stage, "{} request failed: {}", stage, err);
                err.to_string()
            }
        }
    }

    /// Extract a named field from the last response body
    fn parse(&mut self, name: &str, kind: FieldKind, first: bool) -> ParsedField {
        self.request_mut().parse(name, kind, first)
    }

    /// Raw body of the last successful response
    fn raw(&self) -> Option<&str> {
        self.request().cached()
    }
}
