//! History session relay between chained requests

mod common;

use std::time::{Duration, Instant};

use common::{
    FASTA, create_mock_client, elink_history_xml, elink_neighbor_xml, epost_xml, esearch_xml,
};
use entrez_client_rs::{
    ClientConfig, EFetch, EFetchParams, ELink, ELinkParams, EPost, EPostParams, ESearch,
    ESearchParams, ESummary, ESummaryParams, EutilsClient, EutilsError, Eutility, LinkCommand,
    PipelineStage, SessionSource, SessionWindow,
};
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
#[traced_test]
async fn test_elink_triggers_search_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(esearch_xml("MCID_S", 1, &["19008416"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .and(query_param("dbfrom", "pubmed"))
        .and(query_param("db", "protein"))
        .and(query_param("cmd", "neighbor_history"))
        .and(query_param("WebEnv", "MCID_S"))
        .and(query_param("query_key", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(elink_history_xml("MCID_S", 2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(
        &client,
        ESearchParams::new("asthma[mesh] AND 2009[pdat]"),
    )
    .unwrap();

    let mut link = ELink::from_source(
        &client,
        &mut search,
        ELinkParams::new("protein").with_cmd(LinkCommand::NeighborHistory),
    )
    .await
    .unwrap();

    // Identifying fields come from the search
    assert_eq!(search.request().calls(), 1);
    assert_eq!(link.dbfrom(), "pubmed");
    assert_eq!(link.term(), Some("asthma[mesh] AND 2009[pdat]"));
    assert!(link.usehistory());
    assert_eq!(link.session(), &SessionWindow::new("MCID_S", 1));

    link.results().await;
    link.results().await;
    assert_eq!(link.request().calls(), 1);
    assert_eq!(link.session(), &SessionWindow::new("MCID_S", 2));
    assert!(logs_contain("executing it first"));
}

#[tokio::test]
async fn test_executed_source_is_not_triggered_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_xml("MCID_S", 1, &["1"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();
    search.results().await;

    let _link = ELink::from_source(&client, &mut search, ELinkParams::new("gene"))
        .await
        .unwrap();
    let _fetch = EFetch::from_source(&client, &mut search, EFetchParams::new())
        .await
        .unwrap();

    assert_eq!(search.request().calls(), 1);
}

#[tokio::test]
async fn test_search_link_fetch_chain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_xml("MCID_S", 1, &["1"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(elink_history_xml("MCID_S", 5)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("db", "protein"))
        .and(query_param("rettype", "fasta"))
        .and(query_param("retmode", "text"))
        .and(query_param("query_key", "5"))
        .and(query_param("WebEnv", "MCID_S"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FASTA))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();
    let mut link = ELink::from_source(
        &client,
        &mut search,
        ELinkParams::new("protein").with_cmd(LinkCommand::NeighborHistory),
    )
    .await
    .unwrap();

    // Building the fetch runs the link first
    let mut fetch = EFetch::from_source(&client, &mut link, EFetchParams::new())
        .await
        .unwrap();
    assert_eq!(link.request().calls(), 1);
    assert_eq!(fetch.db(), "protein");
    assert_eq!(fetch.term(), Some("asthma"));

    assert_eq!(fetch.results().await, FASTA);
}

#[tokio::test]
async fn test_fetch_falls_back_to_linked_ids() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .and(query_param("id", "100"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(elink_neighbor_xml(&["100"], &["7", "8"])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "7,8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FASTA))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut link = ELink::new(&client, ELinkParams::new("protein").with_ids(["100"])).unwrap();

    let mut fetch = EFetch::from_source(&client, &mut link, EFetchParams::new())
        .await
        .unwrap();
    assert_eq!(link.linked_ids(), vec!["7", "8"]);
    assert_eq!(fetch.try_results().await.unwrap(), FASTA);
}

#[tokio::test]
async fn test_epost_appends_to_search_environment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_xml("MCID_S", 1, &["1"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/epost.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("id", "11237011,12466850"))
        .and(query_param("WebEnv", "MCID_S"))
        .respond_with(ResponseTemplate::new(200).set_body_string(epost_xml("MCID_S", 2)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .and(query_param("query_key", "2"))
        .and(query_param("WebEnv", "MCID_S"))
        .and(query_param("version", "2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<eSummaryResult/>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();

    let mut post = EPost::from_source(
        &client,
        &mut search,
        EPostParams::new(["11237011", "12466850"]),
    )
    .await
    .unwrap();
    assert_eq!(post.db(), "pubmed");

    let mut summary = ESummary::from_source(&client, &mut post, ESummaryParams::new())
        .await
        .unwrap();
    assert_eq!(post.produced_session(), Some(SessionWindow::new("MCID_S", 2)));
    assert_eq!(summary.results().await, "<eSummaryResult/>");
}

#[tokio::test]
async fn test_source_failure_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();

    let err = ELink::from_source(&client, &mut search, ELinkParams::new("protein"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EutilsError::ApiError { status: 503, .. }));
}

#[tokio::test]
async fn test_source_without_session_or_ids() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/elink.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<eLinkResult><LinkSet/></eLinkResult>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut link = ELink::new(&client, ELinkParams::new("protein")).unwrap();

    let err = ESummary::from_source(&client, &mut link, ESummaryParams::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        EutilsError::SessionUnavailable {
            stage: PipelineStage::ELink
        }
    ));
}

/// Mock client keeping the default one second pipeline delay
fn client_with_default_delay(mock_server: &MockServer) -> EutilsClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0);
    assert_eq!(config.pipeline_delay, Duration::from_secs(1));
    EutilsClient::with_config(config)
}

#[tokio::test]
async fn test_triggered_source_is_followed_by_pipeline_delay() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(esearch_xml("MCID_S", 1, &["1"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_default_delay(&mock_server);
    let mut search = ESearch::new(&client, ESearchParams::new("asthma")).unwrap();

    let start = Instant::now();
    let _link = ELink::from_source(&client, &mut search, ELinkParams::new("protein"))
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_secs(1));

    // The search now holds a session, so chaining again does not pause
    let start = Instant::now();
    let _fetch = EFetch::from_source(&client, &mut search, EFetchParams::new())
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(search.request().calls(), 1);
}

#[tokio::test]
async fn test_cached_source_without_session_is_not_paused_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("usehistory", "n"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<eSearchResult><Count>1</Count><IdList><Id>7</Id></IdList></eSearchResult>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_default_delay(&mock_server);
    let mut search = ESearch::new(
        &client,
        ESearchParams::new("asthma").with_usehistory(false),
    )
    .unwrap();
    search.try_results().await.unwrap();

    let start = Instant::now();
    let fetch = EFetch::from_source(&client, &mut search, EFetchParams::new())
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(search.request().calls(), 1);
    assert_eq!(fetch.request().params().get("id"), Some("7"));
}
