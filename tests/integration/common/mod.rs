//! Shared helpers for mocked E-utilities tests

#![allow(dead_code)]

use std::time::Duration;

use entrez_client_rs::{ClientConfig, EutilsClient};
use wiremock::MockServer;

/// Client pointing at a mock server, without rate limiting or pipeline pauses
pub fn create_mock_client(mock_server: &MockServer) -> EutilsClient {
    let config = ClientConfig::new()
        .with_base_url(mock_server.uri())
        .with_rate_limit(100.0) // High rate limit for tests
        .with_pipeline_delay(Duration::ZERO);

    EutilsClient::with_config(config)
}

/// ESearch XML body with a history session
pub fn esearch_xml(webenv: &str, query_key: u32, ids: &[&str]) -> String {
    let id_list: String = ids.iter().map(|id| format!("<Id>{id}</Id>")).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE eSearchResult PUBLIC "-//NLM//DTD esearch 20060628//EN" "https://eutils.ncbi.nlm.nih.gov/eutils/dtd/20060628/esearch.dtd">
<eSearchResult><Count>{count}</Count><RetMax>{count}</RetMax><RetStart>0</RetStart><QueryKey>{query_key}</QueryKey><WebEnv>{webenv}</WebEnv><IdList>{id_list}</IdList><TranslationSet/><QueryTranslation>asthma[MeSH Terms]</QueryTranslation></eSearchResult>"#,
        count = ids.len(),
    )
}

/// ELink XML body for a `neighbor_history` request
pub fn elink_history_xml(webenv: &str, query_key: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<eLinkResult><LinkSet><DbFrom>pubmed</DbFrom><LinkSetDbHistory><DbTo>protein</DbTo><LinkName>pubmed_protein</LinkName><QueryKey>{query_key}</QueryKey></LinkSetDbHistory><WebEnv>{webenv}</WebEnv></LinkSet></eLinkResult>"#
    )
}

/// ELink XML body for a plain `neighbor` request
pub fn elink_neighbor_xml(from: &[&str], linked: &[&str]) -> String {
    let ids: String = from.iter().map(|id| format!("<Id>{id}</Id>")).collect();
    let links: String = linked
        .iter()
        .map(|id| format!("<Link><Id>{id}</Id></Link>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<eLinkResult><LinkSet><DbFrom>pubmed</DbFrom><IdList>{ids}</IdList><LinkSetDb><DbTo>protein</DbTo><LinkName>pubmed_protein</LinkName>{links}</LinkSetDb></LinkSet></eLinkResult>"#
    )
}

/// EPost XML body
pub fn epost_xml(webenv: &str, query_key: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<ePostResult><QueryKey>{query_key}</QueryKey><WebEnv>{webenv}</WebEnv></ePostResult>"#
    )
}

pub const FASTA: &str = ">sp|P12345.1| leukotriene receptor [Homo sapiens]\nMKVLAAGIVALLLAAGCSS\n";
