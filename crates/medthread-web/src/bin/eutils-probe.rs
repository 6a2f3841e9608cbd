//! Query PubMed E-utilities directly and print what comes back.
//!
//! Run with: cargo run -p medthread-web --bin eutils-probe -- headache --resolve

use std::path::Path;

use clap::Parser;
use medthread_common::{SandboxClient, SelectionMode};
use medthread_config::{Config, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH, MAX_LOOKBACK_YEARS};
use medthread_ingestion::sources::pubmed::PubMedClient;
use medthread_ingestion::sources::{LiteratureSource, LocateParams};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "eutils-probe", about = "Run the article locator (and resolver) for one term")]
struct Args {
    /// Search term, used verbatim (no translation).
    term: String,

    /// Look back this many years; defaults to `search.lookback_years`.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LOOKBACK_YEARS)))]
    years: Option<u32>,

    /// Maximum number of ids; defaults to `search.max_results`.
    #[arg(long)]
    max: Option<usize>,

    /// Pick one id at random instead of listing all.
    #[arg(long)]
    random: bool,

    /// Also fetch and print article records.
    #[arg(long)]
    resolve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    // The probe never talks to Gemini, so skip `validate()` and its key check.
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    let config = match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) => Config::from_file(Path::new(&path))?,
        Err(_) if default_path.exists() => Config::from_file(default_path)?,
        Err(_) => Config::default(),
    }
    .with_env_overrides(|key| std::env::var(key).ok());

    let mut http = SandboxClient::new(config.timeout())?;
    if let Some(host) = url::Url::parse(&config.search.eutils_base_url)?.host_str() {
        http.allow_domain(host);
    }
    let client = PubMedClient::new(http, &config.search.eutils_base_url)
        .with_api_key(config.search.api_key);

    let params = LocateParams {
        lookback_years: args.years.unwrap_or(config.search.lookback_years),
        max_results: args.max.unwrap_or(config.search.max_results),
        mode: if args.random { SelectionMode::RandomOne } else { SelectionMode::All },
    };

    let ids = client.locate(&args.term, &params).await?;
    println!("{} id(s) for \"{}\" ({} years, mode {})", ids.len(), args.term, params.lookback_years, params.mode.as_str());
    for id in &ids {
        println!("  {}", id);
    }

    if args.resolve && !ids.is_empty() {
        let records = client.resolve(&ids).await?;
        println!("\n{} record(s)", records.len());
        for record in records {
            println!("\n[{}] {}", record.id, record.title);
            println!("  url:       {}", record.url);
            println!("  full text: {}", record.full_text_url);
            let preview: String = record.abstract_text.chars().take(200).collect();
            println!("  abstract:  {}", preview);
        }
    }

    Ok(())
}
