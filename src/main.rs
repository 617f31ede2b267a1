use building_inspection_backend::config::AppConfig;
use building_inspection_backend::infrastructure::{database, storage};
use building_inspection_backend::services::completion::{
    CompletionService, CortexCompletionClient, UnavailableCompletion,
};
use building_inspection_backend::services::worker::BackgroundWorker;
use building_inspection_backend::{AppState, create_app};
use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service type to run (api, worker, all)
    #[arg(short, long, default_value = "all")]
    mode: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Use development defaults (no object stage, small chunks)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "building_inspection_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Building Inspection Backend [Mode: {}]...", args.mode);

    let config = Arc::new(if args.dev {
        AppConfig::development()
    } else {
        AppConfig::from_env()
    });
    info!(
        "🛠️  Config: Max Size={}MB, Chunk={}KB, Stage={} ({}), Retention={}d, Model={}",
        config.max_file_size / 1024 / 1024,
        config.chunk_size / 1024,
        config.stage_name,
        if config.enable_stage { "enabled" } else { "disabled" },
        config.retention_days,
        config.default_model
    );

    let db = database::setup_database().await?;
    let stage = storage::setup_stage(&config).await;
    let completion = setup_completion(&config);

    let state = AppState::new(db.clone(), config.clone(), stage, completion);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut handles = Vec::new();

    if args.mode == "worker" || args.mode == "all" {
        let worker = BackgroundWorker::new(db.clone(), state.binary.clone(), config.clone(), shutdown_rx);
        handles.push(tokio::spawn(async move {
            worker.run().await;
        }));
        info!("👷 Worker service initialized.");
    }

    if args.mode == "api" || args.mode == "all" {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                    info!("📤 Finished in {:?} with status {}", latency, response.status());
                },
            );

        let app = create_app(state).layer(trace_layer);
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
        info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

        handles.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                error!("❌ Server runtime error: {}", e);
            }
        }));
    }

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    info!("🛑 Shutting down backend services...");
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("⚠️ Task ended abnormally: {}", e);
        }
    }

    info!("👋 Backend exited cleanly.");
    Ok(())
}

fn setup_completion(config: &AppConfig) -> Arc<dyn CompletionService> {
    let Some(url) = config.cortex_account_url.as_deref() else {
        warn!("⚠️ CORTEX_ACCOUNT_URL not set; analyses will record fallback reports");
        return Arc::new(UnavailableCompletion);
    };

    match CortexCompletionClient::new(
        url,
        config.cortex_token.clone(),
        Duration::from_secs(config.completion_timeout_secs),
    ) {
        Ok(client) => {
            info!("🧠 Completion service: {}", client.endpoint());
            Arc::new(client)
        }
        Err(e) => {
            error!("❌ Completion client setup failed: {}; using fallback", e);
            Arc::new(UnavailableCompletion)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
