use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Gemini;
use apify_client::ApifyClient;
use platewise_common::Config;
use platewise_scout::sources::ScrapeLimits;
use platewise_scout::{ApifySource, HttpLinkResolver, Orchestrator, TaskRegistry};

mod routes;

use routes::{build_router, AppState};

#[derive(Parser)]
#[command(name = "api", about = "Platewise dish finder API")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    port: u16,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env()?;

    let summarizer = Gemini::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    let source = ApifySource::new(
        ApifyClient::new(config.apify_api_token.clone()),
        ScrapeLimits::from_config(&config),
    );
    let resolver = HttpLinkResolver::new()?;

    let orchestrator = Orchestrator::new(
        Arc::new(TaskRegistry::new()),
        Arc::new(resolver),
        Arc::new(source),
        Arc::new(summarizer),
    );

    let app = build_router(AppState { orchestrator }, &config.allowed_origins);

    let addr = format!("{}:{}", cli.host, cli.port);
    info!(model = %config.gemini_model, "Platewise API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
