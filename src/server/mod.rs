// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP SERVER (feature "server")
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Superfície HTTP da operação Answer. A identidade do caller é opaca para o
// core: o servidor só precisa do booleano "autorizado" e de um identificador
// para logging.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Autorização bearer com identidade opaca
pub mod auth;
/// Handlers das rotas
pub mod handlers;
/// Schemas de request/response
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::orchestrator::Orchestrator;

/// Estado compartilhado do servidor
#[derive(Clone)]
pub struct AppState {
    /// Orquestrador construído uma vez por processo
    pub orchestrator: Arc<Orchestrator>,
    /// Tokens aceitos (RESEARCH_API_KEYS, separados por vírgula)
    pub allowed_tokens: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, allowed_tokens: HashSet<String>) -> Self {
        Self {
            orchestrator,
            allowed_tokens: Arc::new(allowed_tokens),
        }
    }
}

/// Carrega os tokens aceitos do ambiente
pub fn load_allowed_tokens() -> HashSet<String> {
    std::env::var("RESEARCH_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Monta o router axum com CORS
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/answer", post(handlers::answer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Sobe o servidor no endereço fornecido
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 Servidor HTTP em {}", addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
