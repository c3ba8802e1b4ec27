//! HTTP front end for the execution gateway

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use playbox::{Config, ExecutionRequest, ExecutionResult, Gateway};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Serialize)]
struct LanguageInfo {
    id: String,
    name: String,
    kind: &'static str,
    aliases: Vec<String>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/languages", get(languages))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

pub async fn serve(config: Config, bind: &str) -> Result<()> {
    let gateway = Gateway::new(config).context("failed to prepare scratch directory")?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "serving execution endpoint");

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn execute(
    State(gateway): State<Gateway>,
    Json(request): Json<ExecutionRequest>,
) -> Json<ExecutionResult> {
    Json(gateway.execute(&request).await)
}

async fn languages(State(gateway): State<Gateway>) -> Json<Vec<LanguageInfo>> {
    let mut languages: Vec<_> = gateway
        .config()
        .languages
        .iter()
        .map(|(id, lang)| LanguageInfo {
            id: id.clone(),
            name: lang.name.clone(),
            kind: lang.kind(),
            aliases: lang.aliases.clone(),
        })
        .collect();
    languages.sort_by(|a, b| a.id.cmp(&b.id));
    Json(languages)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}
