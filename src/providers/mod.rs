// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROVIDER ADAPTERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Interfaces uniformes para provedores externos (LLM, busca, fetch, rerank)
// e managers com fallback ordenado. Os managers são injetados explicitamente
// no orquestrador: nenhum registro global/implícito.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente de busca web: trait + backends + manager com fallback
pub mod search;

/// Cliente LLM: trait + dois backends com shapes distintos + manager
pub mod llm;

/// Fetch de páginas com extração em dois estágios
pub mod fetch;

/// Rerank de passages: provedor remoto + fallback por overlap de keywords
pub mod rerank;

use std::sync::Arc;

use crate::types::{SearchHit, TimeRange};

pub use fetch::{FetchProvider, HttpFetcher, MockFetchProvider};
pub use llm::{LlmProvider, LlmReply, LlmRequest, MockLlmProvider};
pub use rerank::{keyword_overlap_rerank, JinaReranker, RerankProvider};
pub use search::{MockSearchProvider, SearchProvider};

/// Erros de provedores externos
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response format: {0}")]
    Parse(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Converte um erro do reqwest preservando a classe (timeout vs rede)
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Manager de provedores de busca com fallback ordenado
///
/// A ordem dos provedores é fixada na construção (presença de configuração);
/// cada busca tenta os provedores em ordem e retorna o primeiro sucesso.
pub struct SearchProviderManager {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl SearchProviderManager {
    /// Cria o manager; a lista não pode ser vazia (erro fatal de configuração
    /// tratado antes, no `config`)
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    /// Número de provedores registrados
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Busca com fallback: primeiro provedor que responder vence
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("no search provider".into());

        for provider in &self.providers {
            match provider.search(query, k, time_range).await {
                Ok(hits) => {
                    log::debug!("🔍 {} respondeu {} hits", provider.name(), hits.len());
                    return Ok(hits);
                }
                Err(e) => {
                    log::warn!("⚠️ Provedor de busca {} falhou: {}", provider.name(), e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Manager de provedores LLM com fallback ordenado
pub struct LlmProviderManager {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl LlmProviderManager {
    /// Cria o manager com a lista ordenada de provedores
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    /// Modelo do provedor primário (usado na chave de cache)
    pub fn primary_model(&self) -> String {
        self.providers
            .first()
            .map(|p| p.model().to_string())
            .unwrap_or_else(|| "unknown".into())
    }

    /// Chamada com fallback para o próximo provedor em caso de erro
    pub async fn call(&self, request: &LlmRequest) -> Result<LlmReply, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("no llm provider".into());

        for provider in &self.providers {
            match provider.call(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    log::warn!("⚠️ Provedor LLM {} falhou: {}", provider.name(), e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
