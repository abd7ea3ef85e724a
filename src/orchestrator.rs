// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WORKFLOW ORCHESTRATOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Entrada de topo: cache → init do estado → roteamento → loop ReAct →
// síntese → result builder → cache. Um run processa uma pergunta até o fim;
// o AgentState é de posse exclusiva do run e nunca compartilhado.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::Arc;

use crate::agent::{ActionExecutor, AgentState, ReActLoop};
use crate::budget::{Budget, BudgetOverrides, DEFAULT_FETCHES, DEFAULT_SEARCHES};
use crate::cache::{answer_cache_key, CacheConfig, CacheNamespace, CacheStore};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::facets::extract_facets;
use crate::providers::llm::{GeminiProvider, OpenAiChatProvider};
use crate::providers::search::{BraveProvider, SerperProvider};
use crate::providers::{
    FetchProvider, HttpFetcher, JinaReranker, LlmProvider, LlmProviderManager, RerankProvider,
    SearchProvider, SearchProviderManager,
};
use crate::router::{self, cap_budget_for_minimal};
use crate::synthesis::{build_result, select_top_diverse, synthesize, SYNTHESIS_PASSAGES};
use crate::types::{QuestionType, ReActResult};
use crate::utils::dates::{day_bucket, is_time_sensitive};
use crate::{agent::planner::decompose_question, router::RouteDecision};

/// Erros expostos ao caller: apenas a classe fatal de configuração.
/// Falhas de provedor e saída malformada de modelo degradam internamente.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Opções por chamada da operação Answer
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    /// Override do modelo de síntese
    pub model: Option<String>,
    /// Override do budget desta chamada
    pub budget: Option<BudgetOverrides>,
}

/// Orquestrador de pesquisa: constrói-se uma vez por processo e recebe os
/// managers de provedores por injeção explícita
pub struct Orchestrator {
    config: OrchestratorConfig,
    reasoning_llm: Arc<LlmProviderManager>,
    synthesis_llm: Arc<LlmProviderManager>,
    executor: ActionExecutor,
    cache: Arc<CacheStore>,
}

impl Orchestrator {
    /// Constrói o orquestrador a partir da configuração do ambiente.
    /// Configuração inválida (sem LLM, sem busca) é fatal aqui, antes de
    /// qualquer trabalho de loop.
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let reasoning_llm = Arc::new(build_llm_manager(&config, &config.reasoning_model));
        let synthesis_llm = Arc::new(build_llm_manager(&config, &config.synthesis_model));

        let mut search_providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
        if let Some(key) = &config.serper_api_key {
            search_providers.push(Arc::new(SerperProvider::new(key.clone())));
        }
        if let Some(key) = &config.brave_api_key {
            search_providers.push(Arc::new(BraveProvider::new(key.clone())));
        }

        let rerank: Option<Arc<dyn RerankProvider>> = config
            .jina_api_key
            .as_ref()
            .map(|key| Arc::new(JinaReranker::new(key.clone())) as Arc<dyn RerankProvider>);

        let cache = Arc::new(CacheStore::new(CacheConfig::default()));
        let executor = ActionExecutor::new(
            Arc::new(SearchProviderManager::new(search_providers)),
            Arc::new(HttpFetcher::new()),
            rerank,
        )
        .with_cache(cache.clone());

        Ok(Self {
            config,
            reasoning_llm,
            synthesis_llm,
            executor,
            cache,
        })
    }

    /// Construtor com componentes injetados (testes e hosts customizados)
    pub fn with_components(
        config: OrchestratorConfig,
        reasoning_llm: Arc<LlmProviderManager>,
        synthesis_llm: Arc<LlmProviderManager>,
        search: Arc<SearchProviderManager>,
        fetch: Arc<dyn FetchProvider>,
        rerank: Option<Arc<dyn RerankProvider>>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            config,
            reasoning_llm,
            synthesis_llm,
            executor: ActionExecutor::new(search, fetch, rerank).with_cache(cache.clone()),
            cache,
        }
    }

    /// Estatísticas do cache (para logs do host)
    pub fn cache_summary(&self) -> String {
        self.cache.summary()
    }

    /// Operação de entrada: responde uma pergunta dentro do budget
    pub async fn answer(&self, question: &str) -> Result<ReActResult, OrchestratorError> {
        self.answer_with_options(question, AnswerOptions::default()).await
    }

    /// Answer com overrides por chamada (modelo de síntese, budget)
    pub async fn answer_with_options(
        &self,
        question: &str,
        options: AnswerOptions,
    ) -> Result<ReActResult, OrchestratorError> {
        let question = question.trim();
        let time_sensitive = is_time_sensitive(question);
        let bucket = day_bucket(time_sensitive);

        let synthesis_model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.synthesis_model.clone());
        let budget_overrides = options.budget.unwrap_or(self.config.budget);
        let searches = budget_overrides.searches.unwrap_or(DEFAULT_SEARCHES);
        let fetches = budget_overrides.fetches.unwrap_or(DEFAULT_FETCHES);

        // 1. Cache de resposta
        let cache_key = answer_cache_key(
            question,
            &bucket,
            &self.config.reasoning_model,
            &synthesis_model,
            searches,
            fetches,
        );
        if let Some(cached) = self
            .cache
            .get::<ReActResult>(&cache_key, CacheNamespace::Answers)
        {
            log::info!("💾 Cache hit para \"{}\" (bucket {})", question, bucket);
            return Ok(cached);
        }

        // 2. Roteamento
        let route = router::classify(&self.reasoning_llm, question).await;

        // 3. Caminho direto: resposta pré-gerada, loop pulado por inteiro
        if let RouteDecision {
            question_type: QuestionType::DirectAnswer,
            direct_answer: Some(answer),
        } = &route
        {
            log::info!("⚡ Resposta direta, nenhuma busca consumida");
            let result = build_result(answer.clone(), &[], time_sensitive, None);
            self.store_answer(&cache_key, &result, time_sensitive);
            return Ok(result);
        }

        // 4. Init do estado: facets + budget + decomposição
        let facets = extract_facets(&self.reasoning_llm, question).await;
        let mut budget = Budget::init(budget_overrides);
        if route.question_type == QuestionType::MinimalSearch {
            cap_budget_for_minimal(&mut budget);
            log::info!("🪶 Caminho minimal: budget capado para ≤{} buscas, ≤{} fetch", budget.searches, budget.fetches);
        }

        let mut state = AgentState::new(
            question,
            route.question_type,
            time_sensitive,
            facets,
            budget,
            decompose_question(question),
        );

        // 5. Loop ReAct
        let outcome = ReActLoop::new(&self.reasoning_llm, &self.executor)
            .run(&mut state)
            .await;

        // 6. Síntese sobre a evidência diversa
        let synthesis_llm = self.synthesis_manager_for(options.model.as_deref());
        let selected = select_top_diverse(&state.passages, SYNTHESIS_PASSAGES);
        let answer = synthesize(&synthesis_llm, question, &selected).await;

        // 7. Result builder + cache
        let trace = self.config.trace_enabled.then(|| state.trace.clone());
        let result = build_result(answer, &selected, time_sensitive, trace);
        self.store_answer(&cache_key, &result, time_sensitive);

        log::info!(
            "✅ Run concluído ({}): {} buscas, {} fetches, {} reranks | {}",
            outcome.reason,
            state.metrics.searches,
            state.metrics.fetches,
            state.metrics.reranks,
            self.cache.summary()
        );

        Ok(result)
    }

    fn store_answer(&self, key: &str, result: &ReActResult, time_sensitive: bool) {
        let ttl = self.cache.config().answer_ttl(time_sensitive);
        self.cache.set(key, result, ttl, CacheNamespace::Answers);
    }

    /// Manager de síntese para um override de modelo por chamada
    fn synthesis_manager_for(&self, model_override: Option<&str>) -> Arc<LlmProviderManager> {
        match model_override {
            Some(model) if model != self.config.synthesis_model => {
                Arc::new(build_llm_manager(&self.config, model))
            }
            _ => self.synthesis_llm.clone(),
        }
    }
}

/// Monta o manager LLM na ordem fixa openai → gemini, cada backend habilitado
/// pela presença da sua chave
fn build_llm_manager(config: &OrchestratorConfig, model: &str) -> LlmProviderManager {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
    if let Some(key) = &config.openai_api_key {
        providers.push(Arc::new(OpenAiChatProvider::new(key.clone(), model.to_string())));
    }
    if let Some(key) = &config.gemini_api_key {
        providers.push(Arc::new(GeminiProvider::new(key.clone(), model.to_string())));
    }
    LlmProviderManager::new(providers)
}
