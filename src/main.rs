use anyhow::Result;
use clap::Parser;
use lingua_live::{create_router, AppState, Config};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "lingua-live", about = "Backend for the language practice app")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/lingua-live")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Live model: {}", cfg.gemini.live_model);

    if cfg.gemini.api_key.is_empty() {
        warn!("No API key configured; set GEMINI_API_KEY or LINGUA_GEMINI__API_KEY");
    }

    let addr = format!("{}:{}", cfg.service.bind, cfg.service.port);
    let state = AppState::new(cfg);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
