//! # Research Orchestrator - Implementação Rust
//!
//! Este crate implementa um **orquestrador de pesquisa agêntica**: responde
//! uma pergunta aberta em linguagem natural buscando a web iterativamente,
//! lendo páginas, reordenando evidência e sintetizando uma resposta citada,
//! tudo dentro de budgets rígidos de recursos.
//!
//! ## Arquitetura Principal
//!
//! ### 1. Loop ReAct (`agent`)
//! Máquina de estados que dirige ciclos Plan → Act → Update:
//! - **Running**: Planner decide SEARCH/FETCH/RERANK/STOP, executor aplica
//! - **Consolidating**: rerank final encolhe a evidência em saídas por exaustão
//! - **Done**: loop encerrado
//!
//! ### 2. Facets (`facets`)
//! A pergunta é decomposta em sub-afirmações ("facets"); a cobertura é
//! recomputada do zero a cada iteração a partir dos passages atuais.
//!
//! ### 3. Budget (`budget`)
//! Envelope de recursos por execução: tempo de parede, buscas, fetches e
//! allowance de tokens. Contadores nunca ficam negativos.
//!
//! ### 4. Provedores (`providers`)
//! Adapters uniformes com fallback ordenado para LLM (dois shapes de request
//! não intercambiáveis), busca web, fetch de páginas e rerank.
//!
//! ## Fluxo de Controle
//!
//! Orquestrador → (cache hit? retorna) → init do estado → Router →
//! {resposta direta | loop minimal | loop completo} → Síntese → cache.
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use research_orchestrator::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = load_config();
//!     let orchestrator = Orchestrator::from_config(config).expect("config");
//!     let result = orchestrator.answer("Compare France and Germany energy policy").await;
//!     println!("{}", result.unwrap().answer_markdown);
//! }
//! ```

#![warn(rust_2018_idioms)]

/// Tipos fundamentais compartilhados por todo o sistema.
///
/// Define as estruturas de dados básicas:
/// - [`types::Passage`]: unidade de evidência recuperada
/// - [`types::Facet`]: sub-afirmação da pergunta a evidenciar
/// - [`types::ReActResult`]: resultado final com citações
/// - [`types::QuestionType`]: classificação de esforço do Router
pub mod types;

/// Loop ReAct com máquina de estados.
///
/// O coração do sistema:
/// - `ReActLoop`: dirige os ciclos Plan → Act → Update
/// - `AgentState`: agregado por execução, de posse exclusiva de um run
/// - `Action`: união fechada SEARCH/FETCH/RERANK/STOP
/// - `ActionExecutor`: executa uma ação e muta a evidência
/// - `planner`: decisão da próxima ação + guarda de decomposição de queries
/// - `progress`: detecção de estagnação e término antecipado
pub mod agent;

/// Budget Manager: envelope de recursos por execução.
pub mod budget;

/// Cache chave/valor com TTL e três namespaces (busca, página, resposta).
///
/// A chave de resposta carrega um bucket diário para perguntas sensíveis ao
/// tempo: elas são re-respondidas a cada dia, perguntas estáveis compartilham
/// uma única entrada.
pub mod cache;

/// Configuração via variáveis de ambiente + validação fatal.
pub mod config;

/// Facet Manager: extração e cobertura de sub-afirmações.
pub mod facets;

/// Adapters de provedores externos (LLM, busca, fetch, rerank) com fallback
/// ordenado e injeção explícita.
pub mod providers;

/// Question Router: classificação de esforço e despacho.
pub mod router;

/// Synthesis Engine e Result Builder: resposta citada + citações deduplicadas.
pub mod synthesis;

/// Workflow Orchestrator: entrada de topo cache → loop → síntese → cache.
pub mod orchestrator;

/// Utilitários de texto, datas e domínios.
pub mod utils;

/// Servidor HTTP opcional (feature `server`): POST /v1/answer com auth
/// bearer opaca.
#[cfg(feature = "server")]
pub mod server;

// Re-exports principais
pub use budget::{Budget, BudgetOverrides};
pub use config::{load_config, ConfigError, OrchestratorConfig};
pub use orchestrator::{AnswerOptions, Orchestrator, OrchestratorError};
pub use types::{Citation, Facet, Passage, QuestionType, ReActResult};

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
pub mod prelude {
    pub use crate::agent::{Action, ActionExecutor, AgentState, ReActLoop};
    pub use crate::budget::{Budget, BudgetOverrides};
    pub use crate::cache::{CacheConfig, CacheNamespace, CacheStore};
    pub use crate::config::{load_config, OrchestratorConfig};
    pub use crate::orchestrator::{AnswerOptions, Orchestrator};
    pub use crate::providers::{
        LlmProviderManager, SearchProviderManager,
    };
    pub use crate::types::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
