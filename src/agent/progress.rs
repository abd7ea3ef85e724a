// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROGRESS TRACKER & EARLY TERMINATION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Detecção de estagnação (iterações sem melhora de cobertura) e política de
// término antecipado do loop. Inclui o freshness boost: uma busca extra com
// filtro de recência quando a pergunta é sensível ao tempo e a evidência
// mais nova está velha.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::agent::actions::{Action, DEFAULT_SEARCH_K};
use crate::agent::state::AgentState;
use crate::facets::{has_domain_diversity, SOFT_COVERAGE_THRESHOLD};
use crate::types::TimeRange;
use crate::utils::dates::{newest_age_days, STALE_AFTER_DAYS};

/// Iterações consecutivas sem melhora de cobertura que forçam a parada
pub const STAGNATION_LIMIT: usize = 3;

/// Fração do tempo de parede acima da qual o loop encerra incondicionalmente
const TIME_HARD_FRACTION: f64 = 0.85;

/// Fração do tempo acima da qual 60% de cobertura já basta para encerrar
const TIME_SOFT_FRACTION: f64 = 0.80;

/// Passages acumulados sem nenhum facet coberto: beco sem saída
const DEAD_END_PASSAGES: usize = 15;

/// Rastreador de progresso entre iterações
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last_coverage: Option<usize>,
    iterations_without_progress: usize,
}

/// Resultado de uma atualização do tracker
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    /// Se a cobertura melhorou em relação à iteração anterior
    pub progressed: bool,
    /// Se a estagnação atingiu o limite e o loop deve parar
    pub stop: bool,
    /// Iterações consecutivas sem progresso
    pub iterations_without_progress: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compara a cobertura atual com a da iteração anterior
    pub fn update(&mut self, current_facet_coverage: usize) -> ProgressUpdate {
        let progressed = match self.last_coverage {
            Some(last) => current_facet_coverage > last,
            // Primeira iteração conta como progresso
            None => true,
        };

        if progressed {
            self.iterations_without_progress = 0;
        } else {
            self.iterations_without_progress += 1;
        }
        self.last_coverage = Some(current_facet_coverage);

        ProgressUpdate {
            progressed,
            stop: self.iterations_without_progress >= STAGNATION_LIMIT,
            iterations_without_progress: self.iterations_without_progress,
        }
    }
}

/// Política de término antecipado do loop
pub struct EarlyTermination;

impl EarlyTermination {
    /// Motivo de parada, se alguma condição foi atingida
    pub fn stop_reason(
        state: &AgentState,
        required_facets_covered: bool,
        coverage_ratio: f32,
    ) -> Option<&'static str> {
        if state.budget.is_depleted() {
            return Some("budget depleted");
        }
        if state.budget.elapsed_fraction() > TIME_HARD_FRACTION {
            return Some("time budget above 85%");
        }
        if required_facets_covered && has_domain_diversity(&state.passages, 2) {
            return Some("required facets covered with domain diversity");
        }
        if state.passages.len() >= DEAD_END_PASSAGES && !state.any_facet_ever_covered {
            return Some("dead end: evidence piling up without facet coverage");
        }
        if state.budget.elapsed_fraction() > TIME_SOFT_FRACTION
            && coverage_ratio >= SOFT_COVERAGE_THRESHOLD
        {
            return Some("time budget above 80% with 60% coverage");
        }
        None
    }

    /// True se o loop deve parar agora
    pub fn should_stop_loop(
        state: &AgentState,
        required_facets_covered: bool,
        coverage_ratio: f32,
    ) -> bool {
        Self::stop_reason(state, required_facets_covered, coverage_ratio).is_some()
    }
}

/// Freshness boost: para perguntas sensíveis ao tempo cuja evidência mais
/// nova está velha (ou sem data), força uma busca extra estreita com filtro
/// de recência: uma vez por execução e só se houver budget de busca.
pub fn maybe_freshness_boost(state: &AgentState) -> Option<Action> {
    if !state.time_sensitive || state.freshness_boost_used || state.budget.searches == 0 {
        return None;
    }

    let newest = newest_age_days(state.passages.iter().map(|p| p.published_date));
    let stale = match newest {
        Some(age) => age > STALE_AFTER_DAYS,
        // Nenhuma data conhecida conta como velho
        None => true,
    };
    if !stale {
        return None;
    }

    let topic = state.question.trim_end_matches('?').trim();
    Some(Action::Search {
        query: format!("{} latest update", topic),
        k: DEFAULT_SEARCH_K,
        time_range: Some(TimeRange::Month),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, BudgetOverrides};
    use crate::types::{Facet, Passage, QuestionType};

    fn state(searches: u32, fetches: u32, time_sensitive: bool) -> AgentState {
        AgentState::new(
            "bitcoin price today",
            QuestionType::FullResearch,
            time_sensitive,
            vec![Facet::new("bitcoin price", true)],
            Budget::init(BudgetOverrides {
                searches: Some(searches),
                fetches: Some(fetches),
                ..Default::default()
            }),
            Vec::new(),
        )
    }

    fn passage(domain: &str, date: Option<chrono::NaiveDate>) -> Passage {
        Passage {
            id: format!("p-{}-{:?}", domain, date),
            text: "text".into(),
            url: format!("https://{}/x", domain),
            title: None,
            published_date: date,
            source_domain: Some(domain.into()),
            score: None,
        }
    }

    #[test]
    fn test_tracker_stops_after_three_flat_iterations() {
        let mut tracker = ProgressTracker::new();

        assert!(!tracker.update(0).stop); // primeira
        assert!(!tracker.update(0).stop); // 1 sem progresso
        assert!(!tracker.update(0).stop); // 2 sem progresso
        let update = tracker.update(0); // 3 sem progresso
        assert!(update.stop);
        assert_eq!(update.iterations_without_progress, STAGNATION_LIMIT);
    }

    #[test]
    fn test_tracker_resets_on_progress() {
        let mut tracker = ProgressTracker::new();
        tracker.update(0);
        tracker.update(0);
        tracker.update(0);

        let progressed = tracker.update(1);
        assert!(progressed.progressed);
        assert_eq!(progressed.iterations_without_progress, 0);
        assert!(!progressed.stop);
    }

    #[test]
    fn test_stop_on_depleted_budget_regardless_of_coverage() {
        let state = state(0, 0, false);
        // Cobertura zero, mas budget esgotado: para
        assert!(EarlyTermination::should_stop_loop(&state, false, 0.0));
        assert_eq!(
            EarlyTermination::stop_reason(&state, false, 0.0),
            Some("budget depleted")
        );
    }

    #[test]
    fn test_stop_on_coverage_with_diversity() {
        let mut s = state(4, 12, false);
        s.passages.push(passage("a.com", None));
        s.passages.push(passage("b.com", None));

        assert!(EarlyTermination::should_stop_loop(&s, true, 1.0));
    }

    #[test]
    fn test_no_stop_on_coverage_without_diversity() {
        let mut s = state(4, 12, false);
        s.passages.push(passage("a.com", None));

        assert!(!EarlyTermination::should_stop_loop(&s, true, 1.0));
    }

    #[test]
    fn test_stop_on_dead_end() {
        let mut s = state(4, 12, false);
        for i in 0..15 {
            s.passages.push(passage(&format!("d{}.com", i), None));
        }
        s.any_facet_ever_covered = false;

        assert_eq!(
            EarlyTermination::stop_reason(&s, false, 0.0),
            Some("dead end: evidence piling up without facet coverage")
        );

        // Com algum facet já coberto, não é beco sem saída
        s.any_facet_ever_covered = true;
        assert!(!EarlyTermination::should_stop_loop(&s, false, 0.0));
    }

    #[test]
    fn test_freshness_boost_on_stale_evidence() {
        let today = chrono::Utc::now().date_naive();
        let mut s = state(2, 2, true);
        s.passages.push(passage("a.com", Some(today - chrono::Duration::days(90))));

        let action = maybe_freshness_boost(&s);
        match action {
            Some(Action::Search { query, time_range, .. }) => {
                assert!(query.contains("latest"));
                assert_eq!(time_range, Some(TimeRange::Month));
            }
            other => panic!("expected boost search, got {:?}", other),
        }
    }

    #[test]
    fn test_freshness_boost_on_undated_evidence() {
        let mut s = state(2, 2, true);
        s.passages.push(passage("a.com", None));
        assert!(maybe_freshness_boost(&s).is_some());
    }

    #[test]
    fn test_no_freshness_boost_with_fresh_evidence() {
        let today = chrono::Utc::now().date_naive();
        let mut s = state(2, 2, true);
        s.passages.push(passage("a.com", Some(today - chrono::Duration::days(5))));
        assert!(maybe_freshness_boost(&s).is_none());
    }

    #[test]
    fn test_no_freshness_boost_without_budget_or_flag() {
        let mut without_budget = state(0, 2, true);
        without_budget.passages.push(passage("a.com", None));
        assert!(maybe_freshness_boost(&without_budget).is_none());

        let mut evergreen = state(2, 2, false);
        evergreen.passages.push(passage("a.com", None));
        assert!(maybe_freshness_boost(&evergreen).is_none());

        let mut already_used = state(2, 2, true);
        already_used.passages.push(passage("a.com", None));
        already_used.freshness_boost_used = true;
        assert!(maybe_freshness_boost(&already_used).is_none());
    }
}
