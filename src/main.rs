use anyhow::{Context, Result};
use clap::Parser;
use overlay_dashboard::{
    api,
    config::{QueryConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL},
    query::select_backend,
    records::load_csv,
    AppState, Chart, DashboardConfig,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// CSV file with timestamp, OHLC, Support, Resistance and direction columns
    #[arg(short, long, env = "OVERLAY_DATA", default_value = "tsla_data.csv")]
    data: PathBuf,

    /// Port to run the web server on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Directory with the frontend's static files
    #[arg(long, default_value = "frontend")]
    static_dir: PathBuf,

    /// Short moving-average window (bars)
    #[arg(long, default_value = "20")]
    short_window: usize,

    /// Long moving-average window (bars)
    #[arg(long, default_value = "50")]
    long_window: usize,

    /// Distance between entry markers and the bar's low/high
    #[arg(long, default_value = "2.0")]
    marker_offset: f64,

    /// Gemini API key; text queries are disabled without one
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,
}

impl Args {
    fn config(&self) -> DashboardConfig {
        DashboardConfig {
            data_path: self.data.clone(),
            short_window: self.short_window,
            long_window: self.long_window,
            marker_offset: self.marker_offset,
            query: QueryConfig {
                api_key: self.gemini_api_key.clone(),
                model: self.gemini_model.clone(),
                base_url: self.gemini_base_url.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("overlay_dashboard=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = args.config();
    config.validate()?;

    info!("Starting overlay dashboard server");
    info!("Data: {:?}", config.data_path);
    info!(
        "Trend windows: {:?}, marker offset: {}",
        config.trend_windows(),
        config.marker_offset
    );

    let bars = load_csv(&config.data_path)?;
    let chart = Chart::new(bars, &config)?;
    if let Some(range) = chart.default_range() {
        info!("Default range: {}", range);
    }

    let state = Arc::new(AppState {
        chart,
        query: select_backend(&config.query),
    });

    // Build router
    let app = api::router(state)
        .fallback_service(ServeDir::new(&args.static_dir))
        .layer(CorsLayer::new().allow_origin(Any));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    info!("Server running at http://{}", addr);
    info!("Open http://localhost:{} in your browser", args.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
