// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REACT LOOP - MÁQUINA DE ESTADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Dirige ciclos Plan → Act → Update até um sinal de término. Fases:
// Running → {Running, Consolidating, Done}. Saída por exaustão (não por
// sucesso limpo de cobertura) passa por um RERANK de consolidação que
// encolhe a evidência para os ~10 passages mais úteis.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ações do agente e parse validador da saída do modelo
pub mod actions;
/// Executor de ações contra os provedores
pub mod executor;
/// Planner: decisão da próxima ação + guarda de decomposição
pub mod planner;
/// Tracker de progresso e política de término antecipado
pub mod progress;
/// Estado agregado por execução
pub mod state;

pub use actions::{Action, Plan};
pub use executor::ActionExecutor;
pub use progress::{EarlyTermination, ProgressTracker};
pub use state::{AgentState, LoopPhase, RunMetrics};

use crate::facets::{all_required_covered, required_coverage_ratio, update_coverage};
use crate::providers::LlmProviderManager;

/// Teto duro de iterações, independente dos demais sinais
pub const MAX_ITERATIONS: usize = 10;

/// Passages mantidos pelo rerank de consolidação
pub const CONSOLIDATION_TOP_N: usize = 10;

/// Resultado do loop
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Motivo do término
    pub reason: String,
    /// Iterações executadas
    pub iterations: usize,
    /// True quando a saída foi por cobertura completa dos facets
    pub clean: bool,
}

/// Loop ReAct: Planner ⇄ Action Executor ⇄ Facet Manager/Progress Tracker
pub struct ReActLoop<'a> {
    llm: &'a LlmProviderManager,
    executor: &'a ActionExecutor,
}

impl<'a> ReActLoop<'a> {
    pub fn new(llm: &'a LlmProviderManager, executor: &'a ActionExecutor) -> Self {
        Self { llm, executor }
    }

    /// Executa o loop até DONE, mutando o estado da execução
    pub async fn run(&self, state: &mut AgentState) -> LoopOutcome {
        let mut phase = LoopPhase::Running;
        let mut tracker = ProgressTracker::new();
        let mut iterations = 0usize;
        let mut reason = String::new();
        let mut clean = false;

        // Pattern matching exaustivo sobre as fases
        loop {
            match phase {
                LoopPhase::Running if iterations >= MAX_ITERATIONS => {
                    reason = "iteration cap reached".into();
                    phase = LoopPhase::Consolidating;
                }

                LoopPhase::Running if state.budget.is_depleted() => {
                    reason = "budget depleted before planning".into();
                    phase = LoopPhase::Consolidating;
                }

                LoopPhase::Running => {
                    // 1. Plan
                    let decision = planner::decide(self.llm, state).await;
                    let action_name = decision.plan.action.name();
                    log::info!(
                        "📍 Iteração {} | Ação: {} | Think: {}",
                        iterations,
                        action_name,
                        decision.plan.thought.chars().take(120).collect::<String>()
                    );

                    if decision.plan.action.is_stop() {
                        state.push_trace(
                            iterations,
                            action_name,
                            &decision.plan.thought,
                            Some("planner requested stop".into()),
                        );
                        clean = all_required_covered(&state.facets);
                        reason = "planner stop".into();
                        phase = if clean {
                            LoopPhase::Done
                        } else {
                            LoopPhase::Consolidating
                        };
                        iterations += 1;
                        continue;
                    }

                    // 2. Act
                    self.executor.execute(&decision.plan.action, state).await;

                    // 3. Recomputar cobertura de facets (do zero)
                    state.facets = update_coverage(&state.facets, &state.passages);
                    if state.facets.iter().any(|f| f.covered) {
                        state.any_facet_ever_covered = true;
                    }
                    state.push_trace(
                        iterations,
                        action_name,
                        &decision.plan.thought,
                        decision.repair_note,
                    );

                    // 4. Progress tracker
                    let progress = tracker.update(state.covered_required_count());

                    // 5. Freshness boost
                    if let Some(boost) = progress::maybe_freshness_boost(state) {
                        log::info!("🕐 Evidência velha para pergunta sensível ao tempo, busca de recência extra");
                        state.freshness_boost_used = true;
                        self.executor.execute(&boost, state).await;
                        state.facets = update_coverage(&state.facets, &state.passages);
                        if state.facets.iter().any(|f| f.covered) {
                            state.any_facet_ever_covered = true;
                        }
                        state.push_trace(
                            iterations,
                            boost.name(),
                            "freshness boost",
                            Some("recency-filtered extra search".into()),
                        );
                    }

                    // 6. Término antecipado
                    let covered = all_required_covered(&state.facets);
                    let ratio = required_coverage_ratio(&state.facets);

                    if progress.stop {
                        reason = format!(
                            "stagnation: {} iterations without coverage progress",
                            progress.iterations_without_progress
                        );
                        phase = LoopPhase::Consolidating;
                    } else if let Some(stop_reason) =
                        EarlyTermination::stop_reason(state, covered, ratio)
                    {
                        reason = stop_reason.into();
                        clean = stop_reason == "required facets covered with domain diversity";
                        phase = if clean {
                            LoopPhase::Done
                        } else {
                            LoopPhase::Consolidating
                        };
                    }

                    iterations += 1;
                }

                LoopPhase::Consolidating => {
                    // Rerank final: encolher para os passages mais úteis
                    if state.passages.len() > CONSOLIDATION_TOP_N {
                        self.executor
                            .execute(&Action::Rerank { top_n: CONSOLIDATION_TOP_N }, state)
                            .await;
                        state.facets = update_coverage(&state.facets, &state.passages);
                        state.push_trace(
                            iterations,
                            "rerank",
                            "consolidation before exit",
                            Some(reason.clone()),
                        );
                    }
                    phase = LoopPhase::Done;
                }

                LoopPhase::Done => break,
            }
        }

        log::info!(
            "🏁 Loop encerrado: {} | {} iterações | {} passages | clean={}",
            reason,
            iterations,
            state.passages.len(),
            clean
        );

        LoopOutcome {
            reason,
            iterations,
            clean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, BudgetOverrides};
    use crate::providers::{
        MockFetchProvider, MockLlmProvider, MockSearchProvider, SearchProviderManager,
    };
    use crate::types::{Facet, QuestionType, SearchHit};
    use std::sync::Arc;

    fn hit(domain: &str, snippet: &str) -> SearchHit {
        SearchHit {
            url: format!("https://{}/article", domain),
            title: "Rust evidence".into(),
            snippet: snippet.into(),
        }
    }

    fn executor(hits: Vec<SearchHit>) -> ActionExecutor {
        ActionExecutor::new(
            Arc::new(SearchProviderManager::new(vec![Arc::new(
                MockSearchProvider::with_hits(hits),
            )])),
            Arc::new(MockFetchProvider::new()),
            None,
        )
    }

    fn state(question: &str, facet: &str, searches: u32) -> AgentState {
        AgentState::new(
            question,
            QuestionType::FullResearch,
            false,
            vec![Facet::new(facet, true)],
            Budget::init(BudgetOverrides {
                searches: Some(searches),
                fetches: Some(4),
                ..Default::default()
            }),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_loop_stops_clean_on_coverage() {
        // Busca devolve dois domínios cobrindo o facet: saída limpa na
        // primeira iteração, sem consolidação
        let llm = LlmProviderManager::new(vec![Arc::new(MockLlmProvider::with_reply(
            r#"{"thought": "gather", "action": {"type": "search", "query": "rust borrow checker"}}"#,
        ))]);
        let exec = executor(vec![
            hit("a.com", "rust borrow checker explained"),
            hit("b.com", "the rust borrow checker in depth"),
        ]);
        let mut s = state("how does rust borrow checker work", "rust borrow checker", 4);

        let outcome = ReActLoop::new(&llm, &exec).run(&mut s).await;

        assert!(outcome.clean);
        assert_eq!(outcome.reason, "required facets covered with domain diversity");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(s.metrics.searches, 1);
    }

    #[tokio::test]
    async fn test_loop_respects_iteration_cap() {
        // Buscas nunca cobrem o facet (snippets irrelevantes); o mock sempre
        // propõe novas queries distintas; stagnation para antes do cap
        let replies: Vec<String> = (0..12)
            .map(|i| {
                format!(
                    r#"{{"thought": "try again", "action": {{"type": "search", "query": "unrelated angle {}"}}}}"#,
                    i
                )
            })
            .collect();
        let llm = LlmProviderManager::new(vec![Arc::new(MockLlmProvider::with_script(replies))]);
        let exec = executor(vec![hit("a.com", "nothing relevant at all")]);
        let mut s = state(
            "what is the adoption rate of webassembly in production",
            "webassembly adoption production",
            20,
        );
        s.budget.fetches = 20;

        let outcome = ReActLoop::new(&llm, &exec).run(&mut s).await;

        assert!(!outcome.clean);
        assert!(outcome.iterations <= MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn test_loop_consolidates_on_budget_exhaustion() {
        let llm = LlmProviderManager::new(vec![Arc::new(MockLlmProvider::with_reply(
            r#"{"thought": "gather", "action": {"type": "search", "query": "rust topic detail"}}"#,
        ))]);
        // Muitos domínios distintos, nenhum cobre o facet
        let hits: Vec<SearchHit> = (0..30)
            .map(|i| hit(&format!("d{}.com", i), "completely unrelated snippet text"))
            .collect();
        let exec = executor(hits);
        let mut s = state("niche question topic", "unfindable facet phrase", 2);

        let outcome = ReActLoop::new(&llm, &exec).run(&mut s).await;

        assert!(!outcome.clean);
        // Consolidação encolheu a evidência
        assert!(s.passages.len() <= CONSOLIDATION_TOP_N);
        assert!(s.metrics.reranks >= 1);
    }

    #[tokio::test]
    async fn test_loop_planner_stop_without_coverage_consolidates() {
        let llm = LlmProviderManager::new(vec![Arc::new(MockLlmProvider::with_reply(
            r#"{"thought": "giving up", "action": {"type": "stop"}}"#,
        ))]);
        let exec = executor(vec![]);
        let mut s = state("question", "facet words", 4);

        let outcome = ReActLoop::new(&llm, &exec).run(&mut s).await;

        assert!(!outcome.clean);
        assert_eq!(outcome.reason, "planner stop");
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn test_loop_records_trace() {
        let llm = LlmProviderManager::new(vec![Arc::new(MockLlmProvider::with_reply(
            r#"{"thought": "gather", "action": {"type": "search", "query": "rust borrow checker"}}"#,
        ))]);
        let exec = executor(vec![
            hit("a.com", "rust borrow checker explained"),
            hit("b.com", "rust borrow checker details"),
        ]);
        let mut s = state("how does rust borrow checker work", "rust borrow checker", 4);

        ReActLoop::new(&llm, &exec).run(&mut s).await;

        assert!(!s.trace.is_empty());
        assert_eq!(s.trace[0].action, "search");
        assert!(s.trace[0].passages_total > 0);
    }
}
