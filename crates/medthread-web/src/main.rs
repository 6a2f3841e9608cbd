//! medthread web server
//!
//! Run with: cargo run -p medthread-web --bin medthread

use medthread_config::Config;
use medthread_web::{pipeline::ThreadPipeline, router::build_router, state::AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("medthread=debug,info")),
        )
        .init();

    info!("medthread {} starting", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Could not load configuration: {e}");
            std::process::exit(1);
        }
    };
    info!(
        mode = config.search.mode.as_str(),
        lookback_years = config.search.lookback_years,
        model = %config.llm.gemini.model,
        "configuration loaded"
    );

    let pipeline = ThreadPipeline::from_config(&config)?;
    let app = build_router(AppState::new(pipeline)?);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
