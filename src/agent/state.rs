// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADO DO AGENTE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Agregado por execução, de posse exclusiva de um run do orquestrador.
// Nunca compartilhado entre perguntas concorrentes: cada run recebe um
// AgentState e um budget independentes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;

use crate::budget::Budget;
use crate::types::{Facet, Passage, QuestionType, TraceEntry};

/// Fase do loop ReAct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Ciclos Plan → Act → Update em andamento
    Running,
    /// Rerank final de consolidação antes de sair
    Consolidating,
    /// Loop encerrado
    Done,
}

/// Métricas de uma execução
#[derive(Debug, Clone, Copy, Default)]
pub struct RunMetrics {
    /// Buscas executadas
    pub searches: usize,
    /// Fetches executados
    pub fetches: usize,
    /// Reranks executados
    pub reranks: usize,
}

/// Estado agregado de uma execução de pesquisa
#[derive(Debug)]
pub struct AgentState {
    /// Pergunta original, imutável
    pub question: String,
    /// Classificação de esforço atribuída pelo Router
    pub question_type: QuestionType,
    /// Se a pergunta é sensível ao tempo
    pub time_sensitive: bool,
    /// Evidência acumulada (substituída apenas por RERANK)
    pub passages: Vec<Passage>,
    /// Facets correntes (recomputados a cada iteração)
    pub facets: Vec<Facet>,
    /// Budget da execução
    pub budget: Budget,
    /// Métricas da execução
    pub metrics: RunMetrics,
    /// Queries de busca já executadas, em ordem
    pub search_history: Vec<String>,
    /// Sub-queries decompostas já usadas pela guarda do Planner
    pub used_decomposed_queries: HashSet<String>,
    /// Sub-queries decompostas pré-computadas para esta sessão
    pub decomposed_queries: Vec<String>,
    /// Se algum facet já foi coberto em qualquer iteração
    pub any_facet_ever_covered: bool,
    /// Se o freshness boost já foi disparado nesta execução
    pub freshness_boost_used: bool,
    /// Diário das iterações
    pub trace: Vec<TraceEntry>,
}

impl AgentState {
    /// Cria o estado de uma nova execução
    pub fn new(
        question: impl Into<String>,
        question_type: QuestionType,
        time_sensitive: bool,
        facets: Vec<Facet>,
        budget: Budget,
        decomposed_queries: Vec<String>,
    ) -> Self {
        Self {
            question: question.into(),
            question_type,
            time_sensitive,
            passages: Vec::new(),
            facets,
            budget,
            metrics: RunMetrics::default(),
            search_history: Vec::new(),
            used_decomposed_queries: HashSet::new(),
            decomposed_queries,
            any_facet_ever_covered: false,
            freshness_boost_used: false,
            trace: Vec::new(),
        }
    }

    /// Facets obrigatórios cobertos no momento
    pub fn covered_required_count(&self) -> usize {
        self.facets.iter().filter(|f| f.required && f.covered).count()
    }

    /// Registra uma iteração no diário
    pub fn push_trace(
        &mut self,
        iteration: usize,
        action: &str,
        thought: &str,
        note: Option<String>,
    ) {
        self.trace.push(TraceEntry {
            iteration,
            action: action.to_string(),
            thought: thought.to_string(),
            passages_total: self.passages.len(),
            facets_covered: self.covered_required_count(),
            note,
        });
    }

    /// True se uma query (normalizada) já foi buscada
    pub fn already_searched(&self, query: &str) -> bool {
        let normalized = query.trim().to_lowercase();
        self.search_history
            .iter()
            .any(|q| q.trim().to_lowercase() == normalized)
    }

    /// Próxima sub-query decomposta não usada; cicla quando esgotadas
    pub fn next_decomposed_query(&mut self) -> Option<String> {
        if self.decomposed_queries.is_empty() {
            return None;
        }

        let unused = self
            .decomposed_queries
            .iter()
            .find(|q| !self.used_decomposed_queries.contains(*q))
            .cloned();

        let query = match unused {
            Some(q) => q,
            None => {
                // Todas usadas: ciclar pela posição
                let idx = self.used_decomposed_queries.len() % self.decomposed_queries.len();
                self.decomposed_queries[idx].clone()
            }
        };

        self.used_decomposed_queries.insert(query.clone());
        Some(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, BudgetOverrides};

    fn state_with_decomposed(queries: Vec<&str>) -> AgentState {
        AgentState::new(
            "test question",
            QuestionType::FullResearch,
            false,
            vec![Facet::new("test question", true)],
            Budget::init(BudgetOverrides::default()),
            queries.into_iter().map(String::from).collect(),
        )
    }

    #[test]
    fn test_next_decomposed_query_in_order() {
        let mut state = state_with_decomposed(vec!["sub a", "sub b"]);

        assert_eq!(state.next_decomposed_query(), Some("sub a".into()));
        assert_eq!(state.next_decomposed_query(), Some("sub b".into()));
    }

    #[test]
    fn test_next_decomposed_query_cycles() {
        let mut state = state_with_decomposed(vec!["sub a", "sub b"]);
        state.next_decomposed_query();
        state.next_decomposed_query();

        // Esgotadas: volta a ciclar
        assert!(state.next_decomposed_query().is_some());
    }

    #[test]
    fn test_next_decomposed_query_empty() {
        let mut state = state_with_decomposed(vec![]);
        assert_eq!(state.next_decomposed_query(), None);
    }

    #[test]
    fn test_already_searched_normalizes() {
        let mut state = state_with_decomposed(vec![]);
        state.search_history.push("Solar Panels ".into());

        assert!(state.already_searched("solar panels"));
        assert!(!state.already_searched("wind turbines"));
    }

    #[test]
    fn test_push_trace_snapshots_state() {
        let mut state = state_with_decomposed(vec![]);
        state.push_trace(0, "search", "looking for evidence", None);

        assert_eq!(state.trace.len(), 1);
        assert_eq!(state.trace[0].action, "search");
        assert_eq!(state.trace[0].passages_total, 0);
    }
}
