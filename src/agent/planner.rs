// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PLANNER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Decide a próxima ação com uma única chamada ao modelo de raciocínio.
// Perguntas complexas chegam com uma lista pré-computada de sub-queries
// decompostas; a guarda de validação reescreve queries de SEARCH ruins
// (vazias, duplicatas da pergunta, cláusulas demais, já tentadas)
// substituindo pela próxima sub-query não usada.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::agent::actions::{fallback_plan, parse_plan, Action, Plan};
use crate::agent::state::AgentState;
use crate::providers::{LlmProviderManager, LlmRequest};
use crate::utils::text::{clause_count, keywords, token_overlap_ratio};

/// Overlap de tokens com a pergunta original acima do qual uma query de
/// SEARCH conta como duplicata
const QUERY_OVERLAP_LIMIT: f32 = 0.7;

/// Cláusulas acima deste limite contam como query composta demais
const QUERY_CLAUSE_LIMIT: usize = 3;

/// Palavras acima deste limite marcam a pergunta como complexa
const COMPLEX_WORD_LIMIT: usize = 12;

/// Decisão do Planner: o plano e a nota de reparo da query (se houve)
#[derive(Debug, Clone)]
pub struct Decision {
    pub plan: Plan,
    pub repair_note: Option<String>,
}

/// Heurística de complexidade: pergunta longa, linguagem de comparação ou
/// conjunções
pub fn is_complex_question(question: &str) -> bool {
    let lowered = question.to_lowercase();
    if question.split_whitespace().count() > COMPLEX_WORD_LIMIT {
        return true;
    }
    const COMPARISON: &[&str] = &["compare", " vs ", " versus ", "difference between"];
    if COMPARISON.iter().any(|c| lowered.contains(c)) {
        return true;
    }
    lowered.contains(" and ") || lowered.contains(" or ")
}

/// Decompõe uma pergunta complexa em sub-queries focadas
///
/// Determinístico: remove prefixos de comparação, divide por conectivos e
/// ancora cada parte no tópico final da pergunta quando a parte o perdeu.
/// Perguntas simples retornam lista vazia.
pub fn decompose_question(question: &str) -> Vec<String> {
    if !is_complex_question(question) {
        return Vec::new();
    }

    let mut cleaned = question.to_lowercase();
    for prefix in [
        "what is the difference between ",
        "what are the differences between ",
        "compare ",
        "how do ",
        "how does ",
    ] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.to_string();
            break;
        }
    }
    let cleaned = cleaned.trim_end_matches(['?', '.', '!']).to_string();

    // Âncora: última keyword da pergunta, normalmente o tópico compartilhado
    let question_keywords = keywords(&cleaned);
    let anchor = question_keywords.last().cloned();

    let mut parts = vec![cleaned.clone()];
    for separator in [",", ";", " versus ", " vs ", " compared to ", " whereas ", " and ", " or "] {
        parts = parts
            .into_iter()
            .flat_map(|part| {
                part.split(separator)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
    }

    let mut subqueries: Vec<String> = Vec::new();
    for part in parts {
        let part = part.trim().to_string();
        if keywords(&part).is_empty() {
            continue;
        }

        let subquery = match &anchor {
            Some(anchor) if !part.contains(anchor.as_str()) => format!("{} {}", part, anchor),
            _ => part,
        };
        if !subqueries.contains(&subquery) {
            subqueries.push(subquery);
        }
    }

    subqueries.truncate(5);
    subqueries
}

/// Decide a próxima ação para o estado atual
///
/// Saída malformada do modelo nunca propaga como erro: cai no fallback
/// determinístico (SEARCH "<pergunta> latest" com pouca evidência, RERANK
/// caso contrário).
pub async fn decide(llm: &LlmProviderManager, state: &mut AgentState) -> Decision {
    let system = build_system_prompt(state);
    let user = build_user_prompt(state);
    let request = LlmRequest::with_system(system, user, 400);
    state.budget.consume_tokens(request.estimated_tokens());

    let reply_text = match llm.call(&request).await {
        Ok(reply) => reply.text,
        Err(e) => {
            log::warn!("⚠️ Planner sem resposta do modelo: {}", e);
            String::new()
        }
    };

    let plan = parse_plan(&reply_text)
        .unwrap_or_else(|| fallback_plan(&state.question, state.passages.len()));

    // Guarda de decomposição: só SEARCH passa por reparo de query
    if let Action::Search { query, k, time_range } = &plan.action {
        let (repaired, note) = repair_search_query(query, state);
        if let Some(reason) = &note {
            log::info!("🔧 Query de busca reparada ({}): \"{}\"", reason, repaired);
        }
        return Decision {
            plan: Plan {
                thought: plan.thought,
                action: Action::Search {
                    query: repaired,
                    k: *k,
                    time_range: *time_range,
                },
            },
            repair_note: note,
        };
    }

    Decision {
        plan,
        repair_note: None,
    }
}

/// Valida e, se preciso, reescreve uma query de SEARCH proposta
///
/// Motivos de reparo, em ordem: vazia; >70% de overlap com a pergunta
/// completa; cláusulas demais; já tentada. A substituta é a próxima
/// sub-query decomposta não usada (ciclando quando esgotadas).
pub fn repair_search_query(proposed: &str, state: &mut AgentState) -> (String, Option<String>) {
    let reason = if proposed.trim().is_empty() {
        Some("empty query")
    } else if token_overlap_ratio(proposed, &state.question) > QUERY_OVERLAP_LIMIT {
        Some("duplicates the full question")
    } else if clause_count(proposed) > QUERY_CLAUSE_LIMIT {
        Some("too many clauses")
    } else if state.already_searched(proposed) {
        Some("already searched")
    } else {
        None
    };

    let Some(reason) = reason else {
        return (proposed.to_string(), None);
    };

    let substitute = state.next_decomposed_query().unwrap_or_else(|| {
        // Pergunta simples sem decomposição: variação determinística
        let candidate = format!("{} latest", state.question.trim_end_matches('?').trim());
        if state.already_searched(&candidate) {
            format!("{} details", state.question.trim_end_matches('?').trim())
        } else {
            candidate
        }
    });

    (substitute, Some(reason.to_string()))
}

fn build_system_prompt(state: &AgentState) -> String {
    let mut prompt = String::from(
        r#"You are the planning module of a research agent. Choose exactly ONE next action.

Respond with ONLY this JSON shape:
{"thought": "<brief reasoning>", "action": {"type": "search"|"fetch"|"rerank"|"stop", "query"?: "...", "k"?: n, "url"?: "...", "top_n"?: n, "timeRange"?: "day"|"week"|"month"|"year"}}

Rules:
1. SEARCH for missing facets with a short focused query, never the full question verbatim
2. FETCH a promising result URL when snippets are too shallow
3. RERANK when evidence is plentiful but noisy
4. STOP only when every required facet is covered by evidence
"#,
    );

    if !state.decomposed_queries.is_empty() {
        prompt.push_str(
            "\nThis question is compound. SEARCH queries MUST be picked from this decomposed list:\n",
        );
        for query in &state.decomposed_queries {
            prompt.push_str(&format!("- {}\n", query));
        }
    }

    prompt
}

fn build_user_prompt(state: &AgentState) -> String {
    let covered: Vec<&str> = state
        .facets
        .iter()
        .filter(|f| f.required && f.covered)
        .map(|f| f.name.as_str())
        .collect();
    let uncovered: Vec<String> = state
        .facets
        .iter()
        .filter(|f| f.required && !f.covered)
        .map(|f| format!("{} (suggested query: \"{}\")", f.name, f.name))
        .collect();

    let history = if state.search_history.is_empty() {
        "none".to_string()
    } else {
        // Últimas buscas: padrões repetidos a evitar
        state
            .search_history
            .iter()
            .rev()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "Question: {}\n\nBudget: {}\nPassages collected: {}\nCovered facets: {}\nUncovered required facets:\n{}\n\nRecent searches (do NOT repeat these patterns): {}",
        state.question,
        state.budget.summary(),
        state.passages.len(),
        if covered.is_empty() { "none".to_string() } else { covered.join("; ") },
        if uncovered.is_empty() { "  none".to_string() } else { uncovered.iter().map(|u| format!("  - {}", u)).collect::<Vec<_>>().join("\n") },
        history,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{Budget, BudgetOverrides};
    use crate::providers::MockLlmProvider;
    use crate::types::{Facet, QuestionType};
    use std::sync::Arc;

    fn full_state(question: &str) -> AgentState {
        AgentState::new(
            question,
            QuestionType::FullResearch,
            false,
            vec![Facet::new(question, true)],
            Budget::init(BudgetOverrides::default()),
            decompose_question(question),
        )
    }

    #[test]
    fn test_is_complex_question() {
        assert!(is_complex_question("Compare solar and wind energy subsidies"));
        assert!(is_complex_question(
            "What are the long term macroeconomic effects of quantitative easing on emerging markets"
        ));
        assert!(!is_complex_question("What is the capital of France?"));
    }

    #[test]
    fn test_decompose_comparison_question() {
        let subs = decompose_question("Compare France and Germany energy policy");
        assert!(subs.len() >= 2);
        // Cada parte mantém a âncora do tópico
        assert!(subs.iter().all(|s| s.contains("policy")));
        assert!(subs.iter().any(|s| s.contains("france")));
        assert!(subs.iter().any(|s| s.contains("germany")));
    }

    #[test]
    fn test_decompose_simple_question_is_empty() {
        assert!(decompose_question("What is the capital of France?").is_empty());
    }

    #[test]
    fn test_repair_empty_query() {
        let mut state = full_state("Compare France and Germany energy policy");
        let (repaired, note) = repair_search_query("", &mut state);
        assert!(!repaired.is_empty());
        assert_eq!(note.as_deref(), Some("empty query"));
        assert!(state.decomposed_queries.contains(&repaired));
    }

    #[test]
    fn test_repair_duplicate_of_question() {
        let mut state = full_state("Compare France and Germany energy policy");
        let (repaired, note) =
            repair_search_query("Compare France and Germany energy policy", &mut state);
        assert!(note.is_some());
        assert_ne!(repaired.to_lowercase(), state.question.to_lowercase());
    }

    #[test]
    fn test_repair_already_searched() {
        let mut state = full_state("Compare France and Germany energy policy");
        state.search_history.push("france energy subsidies".into());

        let (repaired, note) = repair_search_query("france energy subsidies", &mut state);
        assert_eq!(note.as_deref(), Some("already searched"));
        assert_ne!(repaired, "france energy subsidies");
    }

    #[test]
    fn test_repair_excessive_clauses() {
        let mut state = full_state("Compare France and Germany energy policy");
        let (_repaired, note) =
            repair_search_query("a, b, c and d or e vs f", &mut state);
        assert_eq!(note.as_deref(), Some("too many clauses"));
    }

    #[test]
    fn test_repair_keeps_good_query() {
        let mut state = full_state("Compare France and Germany energy policy");
        let (kept, note) = repair_search_query("nuclear reactors EDF output", &mut state);
        assert_eq!(kept, "nuclear reactors EDF output");
        assert!(note.is_none());
    }

    #[test]
    fn test_repair_simple_question_without_decomposition() {
        let mut state = full_state("What is the capital of France?");
        assert!(state.decomposed_queries.is_empty());

        let (repaired, note) = repair_search_query("", &mut state);
        assert_eq!(note.as_deref(), Some("empty query"));
        assert!(repaired.contains("capital of France"));
    }

    #[tokio::test]
    async fn test_decide_falls_back_on_garbage() {
        let mock = MockLlmProvider::with_reply("absolutely not json");
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);
        let mut state = full_state("What is the capital of France?");

        let decision = decide(&llm, &mut state).await;
        // Pouca evidência: fallback é SEARCH "<pergunta> latest"
        match decision.plan.action {
            Action::Search { query, .. } => assert!(query.ends_with(" latest")),
            other => panic!("expected search fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decide_repairs_compound_search() {
        let mock = MockLlmProvider::with_reply(
            r#"{"thought": "search it all", "action": {"type": "search", "query": "Compare France and Germany energy policy"}}"#,
        );
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);
        let mut state = full_state("Compare France and Germany energy policy");

        let decision = decide(&llm, &mut state).await;
        match decision.plan.action {
            Action::Search { query, .. } => {
                assert!(state.decomposed_queries.contains(&query));
                assert!(decision.repair_note.is_some());
            }
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decide_accepts_valid_stop() {
        let mock = MockLlmProvider::with_reply(
            r#"{"thought": "coverage complete", "action": {"type": "stop"}}"#,
        );
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);
        let mut state = full_state("What is the capital of France?");

        let decision = decide(&llm, &mut state).await;
        assert!(decision.plan.action.is_stop());
        assert!(decision.repair_note.is_none());
    }
}
