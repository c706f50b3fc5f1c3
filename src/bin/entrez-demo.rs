use anyhow::Result;
use clap::Parser;
use entrez_client_rs::pipeline::esearch_elink_efetch;
use entrez_client_rs::{ClientConfig, EutilsClient, PipelineOptions, init_logging};
use tracing::{error, info};

/// Hard-coded PubMed queries linked to protein records
const DEMO_QUERIES: [&str; 3] = [
    "asthma[mesh] AND leukotrienes[mesh] AND 2009[pdat]",
    "asthma[mesh] AND 2019[pdat]",
    "leukotrienes[mesh] AND 2019[pdat]",
];

#[derive(Parser)]
#[command(
    name = "entrez-demo",
    about = "Run ESearch → ELink → EFetch demo pipelines against NCBI E-utilities",
    long_about = "Searches PubMed, links the hits to protein records through the History server \
                  and prints the fetched FASTA sequences"
)]
struct Cli {
    /// Demo query to run (0-2); any other value runs all of them
    query_no: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print each result as JSON (stage, session, text)
    #[arg(long)]
    json: bool,

    /// API key for NCBI E-utilities (increases rate limit)
    #[arg(long, env = "NCBI_API_KEY")]
    api_key: Option<String>,

    /// Email for NCBI requests (recommended)
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,
}

impl Cli {
    fn selected_queries(&self) -> Vec<&'static str> {
        match self
            .query_no
            .as_deref()
            .and_then(|n| n.trim().parse::<usize>().ok())
            .and_then(|n| DEMO_QUERIES.get(n))
        {
            Some(query) => vec![*query],
            None => DEMO_QUERIES.to_vec(),
        }
    }

    fn client(&self) -> EutilsClient {
        let mut config = ClientConfig::new();
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key);
        }
        if let Some(email) = &self.email {
            config = config.with_email(email);
        }
        EutilsClient::with_config(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let client = cli.client();
    let opts = PipelineOptions::default();

    for query in cli.selected_queries() {
        info!(query, "Running demo pipeline");
        match esearch_elink_efetch(&client, query, &opts).await {
            Ok(output) if cli.json => println!("{}", serde_json::to_string_pretty(&output)?),
            Ok(output) => println!("{}", output.text),
            Err(err) => error!(query, "Demo pipeline failed: {}", err),
        }
    }

    Ok(())
}
