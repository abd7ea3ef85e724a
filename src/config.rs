// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Configuração do orquestrador via variáveis de ambiente (.env suportado
// pelo binário). Cada knob tem default e log da configuração efetiva.
//
// Chaves de provedores:
// - OPENAI_API_KEY / GEMINI_API_KEY: backends LLM (ao menos um obrigatório)
// - SERPER_API_KEY / BRAVE_API_KEY: backends de busca (ao menos um obrigatório)
// - JINA_API_KEY: rerank remoto (opcional; fallback por keywords existe sempre)
//
// Modelos:
// - RESEARCH_REASONING_MODEL: modelo do Planner/Router (padrão: gpt-4o-mini)
// - RESEARCH_SYNTHESIS_MODEL: modelo de síntese (padrão: gpt-4o)
//
// Budget:
// - RESEARCH_TIME_MS / RESEARCH_MAX_SEARCHES / RESEARCH_MAX_FETCHES /
//   RESEARCH_TOKEN_BUDGET: overrides dos defaults do Budget Manager
//
// Diversos:
// - RESEARCH_TRACE: inclui o trace de iterações no resultado ("1"/"true")
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::budget::BudgetOverrides;

/// Erro fatal de configuração: detectado antes de qualquer trabalho de loop
/// e devolvido ao caller como falha de request
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no LLM provider configured: set OPENAI_API_KEY or GEMINI_API_KEY")]
    MissingLlmProvider,

    #[error("no search provider configured: set SERPER_API_KEY or BRAVE_API_KEY")]
    MissingSearchProvider,
}

/// Configuração completa do orquestrador
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Modelo de raciocínio (Planner, Router, extração de facets)
    pub reasoning_model: String,
    /// Modelo de síntese da resposta final
    pub synthesis_model: String,
    /// Chave OpenAI (backend chat)
    pub openai_api_key: Option<String>,
    /// Chave Gemini (backend single-shot)
    pub gemini_api_key: Option<String>,
    /// Chave Serper
    pub serper_api_key: Option<String>,
    /// Chave Brave Search
    pub brave_api_key: Option<String>,
    /// Chave Jina (rerank)
    pub jina_api_key: Option<String>,
    /// Overrides do budget padrão
    pub budget: BudgetOverrides,
    /// Incluir trace de iterações no resultado
    pub trace_enabled: bool,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_non_empty(name).and_then(|v| v.parse().ok())
}

/// Carrega a configuração do ambiente
pub fn load_config() -> OrchestratorConfig {
    let config = OrchestratorConfig {
        reasoning_model: env_non_empty("RESEARCH_REASONING_MODEL")
            .unwrap_or_else(|| "gpt-4o-mini".into()),
        synthesis_model: env_non_empty("RESEARCH_SYNTHESIS_MODEL")
            .unwrap_or_else(|| "gpt-4o".into()),
        openai_api_key: env_non_empty("OPENAI_API_KEY"),
        gemini_api_key: env_non_empty("GEMINI_API_KEY"),
        serper_api_key: env_non_empty("SERPER_API_KEY"),
        brave_api_key: env_non_empty("BRAVE_API_KEY"),
        jina_api_key: env_non_empty("JINA_API_KEY"),
        budget: BudgetOverrides {
            time_ms: env_parse("RESEARCH_TIME_MS"),
            searches: env_parse("RESEARCH_MAX_SEARCHES"),
            fetches: env_parse("RESEARCH_MAX_FETCHES"),
            tokens: env_parse("RESEARCH_TOKEN_BUDGET"),
        },
        trace_enabled: env_non_empty("RESEARCH_TRACE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    };

    log::info!(
        "📦 Config: reasoning={} | synthesis={} | llm=[{}{}] | search=[{}{}] | rerank={}",
        config.reasoning_model,
        config.synthesis_model,
        if config.openai_api_key.is_some() { "openai " } else { "" },
        if config.gemini_api_key.is_some() { "gemini" } else { "" },
        if config.serper_api_key.is_some() { "serper " } else { "" },
        if config.brave_api_key.is_some() { "brave" } else { "" },
        if config.jina_api_key.is_some() { "jina" } else { "keyword-fallback" },
    );

    config
}

impl OrchestratorConfig {
    /// Valida a configuração; erros aqui são fatais e precedem qualquer
    /// trabalho de pesquisa
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.is_none() && self.gemini_api_key.is_none() {
            return Err(ConfigError::MissingLlmProvider);
        }
        if self.serper_api_key.is_none() && self.brave_api_key.is_none() {
            return Err(ConfigError::MissingSearchProvider);
        }
        Ok(())
    }

    /// Configuração mínima para testes (sem chaves reais)
    pub fn for_tests() -> Self {
        Self {
            reasoning_model: "mock-reasoning".into(),
            synthesis_model: "mock-synthesis".into(),
            trace_enabled: true,
            ..Default::default()
        }
    }
}
