//! Request lifecycle against a mocked E-utilities server
//!
//! One call per request, cached repeats, field parsing and the two error
//! contracts (`results` and `try_results`).

mod common;

use std::time::Duration;

use common::{create_mock_client, esearch_xml};
use entrez_client_rs::{
    ClientConfig, ESearch, ESearchParams, EutilsClient, EutilsError, Eutility, FieldKind,
    HttpMethod, ParsedField,
};
use tracing_test::traced_test;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
#[traced_test]
async fn test_results_issue_exactly_one_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("term", "asthma[mesh]"))
        .and(query_param("db", "pubmed"))
        .and(query_param("usehistory", "y"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(esearch_xml("MCID_1", 1, &["1", "2"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma[mesh]")).unwrap();

    let first = search.results().await;
    let second = search.results().await;

    assert!(first.contains("<WebEnv>MCID_1</WebEnv>"));
    assert_eq!(first, second);
    assert_eq!(search.request().calls(), 1);
    assert_eq!(search.raw(), Some(first.as_str()));
}

#[tokio::test]
async fn test_parse_webenv_and_query_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<WebEnv>X</WebEnv><QueryKey>7</QueryKey>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();
    search.results().await;

    assert_eq!(search.parse("WebEnv", FieldKind::Text, true), "X");
    assert_eq!(
        search.parse("QueryKey", FieldKind::Int, true),
        ParsedField::Int(7)
    );
    assert_eq!(
        search.request().fields().get("QueryKey"),
        Some(&ParsedField::Int(7))
    );
    assert!(search.parse("Count", FieldKind::Int, true).is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_non_success_status_yields_empty_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();

    assert_eq!(search.results().await, "");
    assert!(logs_contain("did not complete successfully"));

    // Failures are not cached
    let err = search.try_results().await.unwrap_err();
    assert!(matches!(err, EutilsError::ApiError { status: 500, .. }));
    assert_eq!(err.status(), Some(500));
    assert_eq!(search.request().calls(), 2);
    assert!(search.raw().is_none());
}

#[tokio::test]
#[traced_test]
async fn test_transport_failure_yields_error_text() {
    // Nothing listens on the discard port
    let config = ClientConfig::new()
        .with_base_url("http://127.0.0.1:9")
        .with_timeout(Duration::from_secs(2))
        .with_pipeline_delay(Duration::ZERO);
    let client = EutilsClient::with_config(config);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();

    let text = search.results().await;
    assert!(text.starts_with("HTTP request failed"));
    assert!(logs_contain("request failed"));

    let err = search.try_results().await.unwrap_err();
    assert!(matches!(err, EutilsError::RequestError(_)));
}

#[tokio::test]
async fn test_identification_parameters_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("tool", "my-tool"))
        .and(query_param("email", "me@example.org"))
        .and(query_param("api_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_xml("W", 1, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_api_key("secret")
        .with_email("me@example.org")
        .with_tool("my-tool")
        .with_pipeline_delay(Duration::ZERO);
    let client = EutilsClient::with_config(config);

    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();
    search.try_results().await.unwrap();
}

#[tokio::test]
async fn test_long_terms_are_posted() {
    let mock_server = MockServer::start().await;
    let term = format!("({})", vec!["asthma[mesh]"; 12].join(" OR "));
    assert!(term.len() > 100);

    Mock::given(method("POST"))
        .and(path("/esearch.fcgi"))
        .and(body_string_contains("usehistory=y"))
        .and(body_string_contains("asthma%5Bmesh%5D%20OR"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_xml("W", 1, &["3"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new(term)).unwrap();
    assert_eq!(search.request().method(), HttpMethod::Post);

    search.try_results().await.unwrap();
    assert_eq!(search.ids(), vec!["3"]);
}

#[tokio::test]
async fn test_search_summary() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("retmax", "3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(esearch_xml("MCID_9", 2, &["31978945", "33515491", "25760099"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search =
        ESearch::new(&client, ESearchParams::new("asthma").with_retmax(3)).unwrap();
    search.try_results().await.unwrap();

    let summary = search.summary().unwrap();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.retmax, 3);
    assert_eq!(summary.ids, vec!["31978945", "33515491", "25760099"]);
    assert_eq!(summary.session.webenv.as_deref(), Some("MCID_9"));
    assert_eq!(summary.session.query_key, Some(2));
    assert_eq!(
        summary.query_translation.as_deref(),
        Some("asthma[MeSH Terms]")
    );
}
