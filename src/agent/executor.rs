// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ACTION EXECUTOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Executa exatamente uma ação e muta passages/budget/métricas do estado.
// Falhas de provedor são engolidas com log no nível da ação: a execução
// produz zero evidência nova e o loop segue para a próxima decisão.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;

use crate::agent::actions::Action;
use crate::agent::state::AgentState;
use crate::cache::{CacheNamespace, CacheStore};
use crate::providers::{
    keyword_overlap_rerank, FetchProvider, RerankProvider, SearchProviderManager,
};
use crate::types::{PageContent, Passage, SearchHit, TimeRange};
use crate::utils::dates::extract_published_date;
use crate::utils::domains::{
    domain_authority, is_blocklisted, recency_mention_bonus, source_domain,
    technical_source_bonus,
};
use crate::utils::text::chunk_windows;

/// Resultados brutos retidos após o scoring
const SEARCH_RETAIN_LIMIT: usize = 35;
/// Máximo de passages por domínio
pub const PER_DOMAIN_CAP: usize = 3;
/// Alvo de passages após a diversidade por domínio
const DIVERSITY_TARGET: usize = 25;
/// Janela de chunking do FETCH em tokens
const FETCH_WINDOW_TOKENS: usize = 900;
/// Overlap entre janelas em tokens
const FETCH_OVERLAP_TOKENS: usize = 120;
/// Máximo de chunks por página
pub const MAX_FETCH_CHUNKS: usize = 8;

/// Executor de ações: detém os provedores e aplica as mutações de estado
pub struct ActionExecutor {
    search: Arc<SearchProviderManager>,
    fetch: Arc<dyn FetchProvider>,
    rerank: Option<Arc<dyn RerankProvider>>,
    cache: Option<Arc<CacheStore>>,
}

impl ActionExecutor {
    pub fn new(
        search: Arc<SearchProviderManager>,
        fetch: Arc<dyn FetchProvider>,
        rerank: Option<Arc<dyn RerankProvider>>,
    ) -> Self {
        Self {
            search,
            fetch,
            rerank,
            cache: None,
        }
    }

    /// Habilita os namespaces de cache de busca e de página
    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Busca com cache: resultados cacheados por (query, k, filtro temporal)
    async fn cached_search(
        &self,
        query: &str,
        k: usize,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<SearchHit>, crate::providers::ProviderError> {
        let key = format!("{}|{}|{:?}", query.trim().to_lowercase(), k, time_range);

        if let Some(cache) = &self.cache {
            if let Some(hits) = cache.get::<Vec<SearchHit>>(&key, CacheNamespace::SearchResults) {
                log::debug!("💾 Cache de busca hit: \"{}\"", query);
                return Ok(hits);
            }
        }

        let hits = self.search.search(query, k, time_range).await?;
        if let Some(cache) = &self.cache {
            let ttl = cache.config().search_ttl_secs;
            cache.set(&key, &hits, ttl, CacheNamespace::SearchResults);
        }
        Ok(hits)
    }

    /// Fetch com cache: conteúdo cacheado por URL
    async fn cached_fetch(
        &self,
        url: &str,
    ) -> Result<PageContent, crate::providers::ProviderError> {
        if let Some(cache) = &self.cache {
            if let Some(page) = cache.get::<PageContent>(url, CacheNamespace::PageContent) {
                log::debug!("💾 Cache de página hit: {}", url);
                return Ok(page);
            }
        }

        let page = self.fetch.fetch(url).await?;
        if let Some(cache) = &self.cache {
            let ttl = cache.config().page_ttl_secs;
            cache.set(url, &page, ttl, CacheNamespace::PageContent);
        }
        Ok(page)
    }

    /// Executa uma ação contra os provedores, mutando o estado
    pub async fn execute(&self, action: &Action, state: &mut AgentState) {
        match action {
            Action::Search { query, k, time_range } => {
                self.execute_search(query, *k, *time_range, state).await;
            }
            Action::Fetch { url } => {
                self.execute_fetch(url, state).await;
            }
            Action::Rerank { top_n } => {
                self.execute_rerank(*top_n, state).await;
            }
            Action::Stop => {
                // Sinal de saída tratado pelo loop
            }
        }
    }

    /// SEARCH: consome uma busca do budget, pontua e filtra resultados,
    /// aplica diversidade por domínio e anexa os passages
    async fn execute_search(
        &self,
        query: &str,
        k: usize,
        time_range: Option<TimeRange>,
        state: &mut AgentState,
    ) {
        if !state.budget.consume_search() {
            log::warn!("⛔ SEARCH sem budget de buscas, ignorando");
            return;
        }
        state.metrics.searches += 1;
        state.search_history.push(query.to_string());

        // Fan-out read-only das variantes; merge determinístico por URL
        let variants = query_variants(query, state.time_sensitive);
        let searches = variants
            .iter()
            .map(|variant| self.cached_search(variant, k, time_range));
        let results = join_all(searches).await;

        let mut merged: Vec<SearchHit> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut failures = 0usize;
        for result in results {
            match result {
                Ok(hits) => {
                    for hit in hits {
                        if seen_urls.insert(hit.url.clone()) {
                            merged.push(hit);
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("⚠️ Variante de busca falhou: {}", e);
                }
            }
        }

        if merged.is_empty() {
            log::warn!(
                "🔍 Busca \"{}\" sem resultados ({} variantes falharam)",
                query,
                failures
            );
            return;
        }

        // Blocklist + scoring ponderado
        let mut scored: Vec<(f32, SearchHit)> = merged
            .into_iter()
            .filter(|hit| !is_blocklisted(&hit.url))
            .map(|hit| (score_hit(&hit), hit))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(SEARCH_RETAIN_LIMIT);

        // Diversidade por domínio antes de virar passages
        let capped = apply_domain_cap_hits(scored, PER_DOMAIN_CAP, DIVERSITY_TARGET);

        let existing_ids: HashSet<String> = state.passages.iter().map(|p| p.id.clone()).collect();
        let mut added = 0usize;
        for (score, hit) in capped {
            let id = Passage::id_for_url(&hit.url);
            if existing_ids.contains(&id) {
                continue;
            }
            let published_date = extract_published_date(&hit.snippet, &hit.url);
            state.passages.push(Passage {
                id,
                text: hit.snippet.clone(),
                source_domain: source_domain(&hit.url),
                url: hit.url,
                title: Some(hit.title),
                published_date,
                score: Some(score),
            });
            added += 1;
        }

        log::info!(
            "🔍 Busca \"{}\": +{} passages ({} no total)",
            query,
            added,
            state.passages.len()
        );
    }

    /// FETCH: consome um fetch do budget, extrai conteúdo e data, chunca o
    /// corpo em janelas e anexa cada chunk como passage
    async fn execute_fetch(&self, url: &str, state: &mut AgentState) {
        if !state.budget.consume_fetch() {
            log::warn!("⛔ FETCH sem budget de fetches, ignorando");
            return;
        }
        state.metrics.fetches += 1;

        let page = match self.cached_fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("⚠️ Fetch de {} falhou: {}", url, e);
                return;
            }
        };

        let published_date = extract_published_date(&page.text, url);
        let domain = source_domain(url);
        let chunks = chunk_windows(
            &page.text,
            FETCH_WINDOW_TOKENS,
            FETCH_OVERLAP_TOKENS,
            MAX_FETCH_CHUNKS,
        );
        let chunk_count = chunks.len();

        for (ordinal, chunk) in chunks.into_iter().enumerate() {
            state.passages.push(Passage {
                id: Passage::id_for_chunk(url, ordinal),
                text: chunk,
                url: url.to_string(),
                title: page.title.clone(),
                published_date,
                source_domain: domain.clone(),
                score: None,
            });
        }

        log::info!("📖 Fetch {}: {} chunks ({} no total)", url, chunk_count, state.passages.len());
    }

    /// RERANK: reordena via provedor (ou fallback por keywords), re-aplica o
    /// cap por domínio e SUBSTITUI a coleção de passages
    async fn execute_rerank(&self, top_n: usize, state: &mut AgentState) {
        if state.passages.is_empty() {
            return;
        }
        state.metrics.reranks += 1;

        let reranked = match &self.rerank {
            Some(provider) => match provider.rerank(&state.question, &state.passages, top_n).await {
                Ok(reranked) => reranked,
                Err(e) => {
                    log::warn!("⚠️ Rerank {} falhou ({}), usando fallback de keywords", provider.name(), e);
                    keyword_overlap_rerank(&state.question, &state.passages, top_n)
                }
            },
            None => keyword_overlap_rerank(&state.question, &state.passages, top_n),
        };

        let mut replacement = apply_domain_cap(&reranked, PER_DOMAIN_CAP);
        replacement.truncate(top_n);

        log::info!(
            "📊 Rerank: {} → {} passages",
            state.passages.len(),
            replacement.len()
        );
        state.passages = replacement;
    }
}

/// Variantes read-only de uma query para o fan-out de expansão
///
/// O merge posterior deduplica por URL preservando a ordem de chegada.
fn query_variants(query: &str, time_sensitive: bool) -> Vec<String> {
    let mut variants = vec![query.to_string()];
    if time_sensitive && !query.to_lowercase().contains("latest") {
        variants.push(format!("{} latest", query));
    }
    variants
}

/// Score ponderado de um resultado de busca: autoridade de domínio, tamanho
/// do snippet, bônus de fonte técnica e bônus de recência
fn score_hit(hit: &SearchHit) -> f32 {
    let domain = source_domain(&hit.url).unwrap_or_default();
    let authority = domain_authority(&domain);
    let snippet_score = (hit.snippet.len() as f32 / 200.0).min(1.0);
    let technical = technical_source_bonus(&domain, &hit.snippet);
    let recency = recency_mention_bonus(&format!("{} {}", hit.title, hit.snippet));

    2.0 * authority + snippet_score + technical + recency
}

/// Aplica o cap por domínio preservando a ordem
///
/// Passages sem domínio derivável contam como únicos (nunca agrupam).
pub fn apply_domain_cap(passages: &[Passage], cap: usize) -> Vec<Passage> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::new();

    for passage in passages {
        let key = passage
            .source_domain
            .clone()
            .unwrap_or_else(|| format!("unknown:{}", passage.url));
        let count = counts.entry(key).or_insert(0);
        if *count < cap {
            *count += 1;
            kept.push(passage.clone());
        }
    }

    kept
}

/// Cap por domínio sobre hits pontuados, sem encolher abaixo do alvo quando
/// só há excedentes do mesmo domínio disponíveis
fn apply_domain_cap_hits(
    scored: Vec<(f32, SearchHit)>,
    cap: usize,
    target: usize,
) -> Vec<(f32, SearchHit)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::new();

    for (score, hit) in scored {
        let key = source_domain(&hit.url).unwrap_or_else(|| format!("unknown:{}", hit.url));
        let count = counts.entry(key).or_insert(0);
        if *count < cap {
            *count += 1;
            kept.push((score, hit));
        }
        if kept.len() >= target {
            break;
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, BudgetOverrides};
    use crate::providers::{MockFetchProvider, MockSearchProvider};
    use crate::types::{Facet, QuestionType};

    fn test_state(searches: u32, fetches: u32) -> AgentState {
        AgentState::new(
            "test question about rust",
            QuestionType::FullResearch,
            false,
            vec![Facet::new("test question about rust", true)],
            Budget::init(BudgetOverrides {
                searches: Some(searches),
                fetches: Some(fetches),
                ..Default::default()
            }),
            Vec::new(),
        )
    }

    fn executor_with_hits(hits: Vec<SearchHit>) -> ActionExecutor {
        ActionExecutor::new(
            Arc::new(SearchProviderManager::new(vec![Arc::new(
                MockSearchProvider::with_hits(hits),
            )])),
            Arc::new(MockFetchProvider::new()),
            None,
        )
    }

    fn hit(url: &str, snippet: &str) -> SearchHit {
        SearchHit {
            url: url.into(),
            title: "Title".into(),
            snippet: snippet.into(),
        }
    }

    #[tokio::test]
    async fn test_search_consumes_budget_and_appends() {
        let executor = executor_with_hits(vec![
            hit("https://a.com/1", "rust evidence one"),
            hit("https://b.com/1", "rust evidence two"),
        ]);
        let mut state = test_state(2, 0);

        executor
            .execute(
                &Action::Search { query: "rust".into(), k: 10, time_range: None },
                &mut state,
            )
            .await;

        assert_eq!(state.budget.searches, 1);
        assert_eq!(state.metrics.searches, 1);
        assert_eq!(state.passages.len(), 2);
        assert_eq!(state.search_history, vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn test_search_without_budget_is_noop() {
        let executor = executor_with_hits(vec![hit("https://a.com/1", "x")]);
        let mut state = test_state(0, 5);

        executor
            .execute(
                &Action::Search { query: "rust".into(), k: 10, time_range: None },
                &mut state,
            )
            .await;

        assert_eq!(state.budget.searches, 0);
        assert!(state.passages.is_empty());
        assert_eq!(state.metrics.searches, 0);
    }

    #[tokio::test]
    async fn test_search_filters_blocklist() {
        let executor = executor_with_hits(vec![
            hit("https://a.com/tag/rust", "tag page"),
            hit("https://www.youtube.com/watch?v=1", "video"),
            hit("https://a.com/article", "real article about rust"),
        ]);
        let mut state = test_state(1, 0);

        executor
            .execute(
                &Action::Search { query: "rust".into(), k: 10, time_range: None },
                &mut state,
            )
            .await;

        assert_eq!(state.passages.len(), 1);
        assert_eq!(state.passages[0].url, "https://a.com/article");
    }

    #[tokio::test]
    async fn test_search_enforces_domain_diversity() {
        // 6 resultados do mesmo domínio: cap de 3
        let hits: Vec<SearchHit> = (0..6)
            .map(|i| hit(&format!("https://same.com/{}", i), "rust content here"))
            .collect();
        let executor = executor_with_hits(hits);
        let mut state = test_state(1, 0);

        executor
            .execute(
                &Action::Search { query: "rust".into(), k: 10, time_range: None },
                &mut state,
            )
            .await;

        assert_eq!(state.passages.len(), PER_DOMAIN_CAP);
        assert!(state
            .passages
            .iter()
            .all(|p| p.source_domain.as_deref() == Some("same.com")));
    }

    #[tokio::test]
    async fn test_fetch_chunks_and_consumes_budget() {
        let long_body = "sentence of page body text ".repeat(2000);
        let executor = ActionExecutor::new(
            Arc::new(SearchProviderManager::new(vec![Arc::new(
                MockSearchProvider::new(),
            )])),
            Arc::new(MockFetchProvider::new().with_page("https://a.com/long", long_body)),
            None,
        );
        let mut state = test_state(0, 2);

        executor
            .execute(&Action::Fetch { url: "https://a.com/long".into() }, &mut state)
            .await;

        assert_eq!(state.budget.fetches, 1);
        assert_eq!(state.metrics.fetches, 1);
        // Corpo longo: atinge o cap de chunks
        assert_eq!(state.passages.len(), MAX_FETCH_CHUNKS);
        // Ids estáveis com ordinal
        assert!(state.passages[0].id.ends_with("#0"));
        assert!(state.passages[7].id.ends_with("#7"));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_state_unchanged_except_budget() {
        let executor = ActionExecutor::new(
            Arc::new(SearchProviderManager::new(vec![Arc::new(
                MockSearchProvider::new(),
            )])),
            Arc::new(MockFetchProvider::new()),
            None,
        );
        let mut state = test_state(0, 1);

        executor
            .execute(&Action::Fetch { url: "https://unknown.com/x".into() }, &mut state)
            .await;

        assert_eq!(state.budget.fetches, 0);
        assert!(state.passages.is_empty());
    }

    #[tokio::test]
    async fn test_rerank_replaces_collection() {
        let executor = executor_with_hits(vec![]);
        let mut state = test_state(0, 0);
        for i in 0..12 {
            state.passages.push(Passage {
                id: format!("p{}", i),
                text: if i % 2 == 0 { "rust question evidence".into() } else { "unrelated".into() },
                url: format!("https://d{}.com/x", i),
                title: None,
                published_date: None,
                source_domain: Some(format!("d{}.com", i)),
                score: None,
            });
        }

        executor.execute(&Action::Rerank { top_n: 4 }, &mut state).await;

        assert_eq!(state.passages.len(), 4);
        assert_eq!(state.metrics.reranks, 1);
        // Fallback de keywords: os relevantes primeiro
        assert!(state.passages[0].text.contains("rust"));
    }

    #[tokio::test]
    async fn test_stop_is_noop() {
        let executor = executor_with_hits(vec![]);
        let mut state = test_state(1, 1);

        executor.execute(&Action::Stop, &mut state).await;

        assert_eq!(state.budget.searches, 1);
        assert_eq!(state.budget.fetches, 1);
        assert!(state.passages.is_empty());
    }

    #[test]
    fn test_apply_domain_cap_preserves_order() {
        let passages: Vec<Passage> = (0..5)
            .map(|i| Passage {
                id: format!("p{}", i),
                text: "t".into(),
                url: format!("https://same.com/{}", i),
                title: None,
                published_date: None,
                source_domain: Some("same.com".into()),
                score: None,
            })
            .collect();

        let capped = apply_domain_cap(&passages, 3);
        assert_eq!(capped.len(), 3);
        assert_eq!(capped[0].id, "p0");
        assert_eq!(capped[2].id, "p2");
    }

    #[tokio::test]
    async fn test_search_results_are_cached_per_query() {
        use crate::cache::{CacheConfig, CacheStore};

        let search_mock = Arc::new(MockSearchProvider::with_hits(vec![hit(
            "https://a.com/1",
            "rust evidence",
        )]));
        let providers: Vec<Arc<dyn crate::providers::SearchProvider>> = vec![search_mock.clone()];
        let executor = ActionExecutor::new(
            Arc::new(SearchProviderManager::new(providers)),
            Arc::new(MockFetchProvider::new()),
            None,
        )
        .with_cache(Arc::new(CacheStore::new(CacheConfig::for_tests())));

        let action = Action::Search { query: "rust".into(), k: 10, time_range: None };

        let mut first = test_state(2, 0);
        executor.execute(&action, &mut first).await;

        let mut second = test_state(2, 0);
        executor.execute(&action, &mut second).await;

        // A segunda execução veio do cache: o provedor só viu uma query
        assert_eq!(search_mock.seen_queries().len(), 1);
        assert_eq!(second.passages.len(), first.passages.len());
    }

    #[test]
    fn test_query_variants_time_sensitive() {
        assert_eq!(query_variants("rust release", false).len(), 1);
        let variants = query_variants("rust release", true);
        assert_eq!(variants.len(), 2);
        assert!(variants[1].contains("latest"));
    }
}
