//! Standalone query builders against a mocked server

mod common;

use common::create_mock_client;
use entrez_client_rs::{
    Citation, CitationMatchStatus, ECitMatch, EFetch, EFetchParams, EGQuery, EInfo, EInfoParams,
    EPost, EPostParams, EResults, ESpell, ResultFormat, Eutility, HttpMethod,
};
use rstest::rstest;
use tracing_test::traced_test;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EINFO_DBLIST: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eInfoResult><DbList><DbName>pubmed</DbName><DbName>protein</DbName><DbName>nuccore</DbName></DbList></eInfoResult>"#;

const EINFO_PUBMED: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eInfoResult><DbInfo><DbName>pubmed</DbName><MenuName>PubMed</MenuName><Count>36000000</Count></DbInfo></eInfoResult>"#;

const ESPELL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<eSpellResult><Database>pubmed</Database><Query>asthmaa OR alergies</Query><CorrectedQuery>asthma or allergies</CorrectedQuery><SpelledQuery/></eSpellResult>"#;

const EGQUERY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<Result><Term>mouse[orgn]</Term><eGQueryResult>
<ResultItem><DbName>pubmed</DbName><MenuName>PubMed</MenuName><Count>1234</Count><Status>Ok</Status></ResultItem>
<ResultItem><DbName>pmc</DbName><MenuName>PMC</MenuName><Count>0</Count><Status>Term or Database is not found</Status></ResultItem>
</eGQueryResult></Result>"#;

#[rstest]
#[case::all_databases("", EINFO_DBLIST)]
#[case::single_database("pubmed", EINFO_PUBMED)]
#[tokio::test]
async fn test_einfo(#[case] db: &str, #[case] body: &str) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/einfo.fcgi"))
        .and(query_param("version", "2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut einfo = EInfo::new(&client, EInfoParams::new().with_db(db)).unwrap();
    assert_eq!(einfo.request().params().contains("db"), !db.is_empty());

    einfo.try_results().await.unwrap();
    if db.is_empty() {
        assert_eq!(einfo.databases(), vec!["pubmed", "protein", "nuccore"]);
        assert_eq!(einfo.record_count(), None);
    } else {
        assert!(einfo.databases().is_empty());
        assert_eq!(einfo.record_count(), Some(36000000));
    }
}

#[tokio::test]
async fn test_espell() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/espell.fcgi"))
        .and(query_param("term", "asthmaa OR alergies"))
        .and(query_param("db", "pubmed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESPELL_XML))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut spell = ESpell::new(&client, "asthmaa OR alergies", "pubmed").unwrap();
    spell.results().await;

    assert_eq!(
        spell.corrected_query().as_deref(),
        Some("asthma or allergies")
    );
}

#[tokio::test]
async fn test_egquery_counts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/egquery.fcgi"))
        .and(query_param("term", "mouse[orgn]"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EGQUERY_XML))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut query = EGQuery::new(&client, "mouse[orgn]").unwrap();
    query.results().await;

    let counts = query.counts();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0].db_name, "pubmed");
    assert_eq!(counts[0].menu_name, "PubMed");
    assert_eq!(counts[0].count, 1234);
    assert!(counts[0].has_results());
    assert_eq!(counts[1].count, 0);
    assert_eq!(counts[1].status, "Term or Database is not found");
}

#[tokio::test]
#[traced_test]
async fn test_ecitmatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ecitmatch.cgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("retmode", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "proc natl acad sci u s a|1991|88|3248|mann bj|Art1|2014248\n",
            "science|1987|235|182|palmenberg ac|Art2|\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let citations = Citation::new("proc natl acad sci u s a", 1991, 88, 3248, "mann bj", "Art1")
        + Citation::new("science", 1987, 235, 182, "palmenberg ac", "Art2");
    let mut request = ECitMatch::new(&client, citations).unwrap();

    let matches = request.matches().await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].key, "Art1");
    assert_eq!(matches[0].pmid.as_deref(), Some("2014248"));
    assert_eq!(matches[0].status, CitationMatchStatus::Found);
    assert_eq!(matches[1].status, CitationMatchStatus::NotFound);

    // Served from cache
    let again = request.matches().await.unwrap();
    assert_eq!(again, matches);
    assert!(logs_contain("ECitMatch completed"));
}

#[tokio::test]
async fn test_ecitmatch_bdata_survives_reserved_characters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ecitmatch.cgi"))
        .and(query_param(
            "bdata",
            "Genes & Dev|1999|13|1|O'Brien C+|k#1|\rscience|1987|235|182|palmenberg ac|Art2|",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "genes & dev|1999|13|1|o'brien c+|k#1|10000001\n",
            "science|1987|235|182|palmenberg ac|Art2|3026048\n",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let citations = Citation::new("Genes & Dev", 1999, 13, 1, "O'Brien C+", "k#1")
        + Citation::new("science", 1987, 235, 182, "palmenberg ac", "Art2");
    let mut request = ECitMatch::new(&client, citations).unwrap();

    let matches = request.matches().await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].key, "k#1");
    assert_eq!(matches[0].pmid.as_deref(), Some("10000001"));
}

#[tokio::test]
async fn test_large_uid_lists_are_posted() {
    let mock_server = MockServer::start().await;
    let ids: Vec<String> = (1..=250).map(|i| i.to_string()).collect();

    Mock::given(method("POST"))
        .and(path("/efetch.fcgi"))
        .and(body_string_contains("db=protein"))
        .and(body_string_contains("id=1%2C2%2C3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(">seq\nMK\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/epost.fcgi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<ePostResult><QueryKey>1</QueryKey><WebEnv>MCID_L</WebEnv></ePostResult>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);

    let mut fetch = EFetch::new(
        &client,
        EFetchParams::new().with_db("protein").with_ids(&ids),
    )
    .unwrap();
    assert_eq!(fetch.request().method(), HttpMethod::Post);
    assert_eq!(fetch.results().await, ">seq\nMK\n");

    let mut post = EPost::new(&client, EPostParams::new(&ids)).unwrap();
    post.try_results().await.unwrap();
    assert_eq!(post.session().and_then(|s| s.webenv.as_deref()), Some("MCID_L"));
}

#[tokio::test]
async fn test_results_render_as_tree() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/einfo.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EINFO_DBLIST))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let mut einfo = EInfo::new(&client, EInfoParams::new()).unwrap();
    let body = einfo.results().await;

    let rendered = EResults::new(body, ResultFormat::Tree).to_string();
    assert!(rendered.starts_with("<eInfoResult>\n  <DbList>\n    <DbName>pubmed</DbName>\n"));
}
