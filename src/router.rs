// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// QUESTION ROUTER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Classifica o esforço necessário da pergunta e despacha:
// - DirectAnswer: trivial, responde com a resposta pré-gerada, pula o loop
// - MinimalSearch: capa o budget efetivo (≤2 buscas, ≤1 fetch) antes do loop
// - FullResearch: loop sem modificação
//
// O despacho em si é puro; a classificação é uma chamada ao modelo de
// raciocínio com parse defensivo (saída inaproveitável → FullResearch).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::budget::Budget;
use crate::providers::{LlmProviderManager, LlmRequest};
use crate::types::QuestionType;
use crate::utils::text::extract_json_block;

/// Buscas máximas do caminho MinimalSearch
pub const MINIMAL_SEARCHES: u32 = 2;
/// Fetches máximos do caminho MinimalSearch
pub const MINIMAL_FETCHES: u32 = 1;

/// Decisão de roteamento
#[derive(Debug, Clone)]
pub struct RouteDecision {
    /// Classificação atribuída
    pub question_type: QuestionType,
    /// Resposta pré-gerada (apenas DirectAnswer)
    pub direct_answer: Option<String>,
}

impl RouteDecision {
    /// Rota conservadora quando a classificação não é aproveitável
    pub fn full_research() -> Self {
        Self {
            question_type: QuestionType::FullResearch,
            direct_answer: None,
        }
    }
}

/// Classifica a pergunta com uma chamada ao modelo de raciocínio
///
/// Para DIRECT_ANSWER o modelo devolve também a resposta pré-gerada; sem
/// resposta utilizável a rota degrada para MinimalSearch.
pub async fn classify(llm: &LlmProviderManager, question: &str) -> RouteDecision {
    let prompt = format!(
        r#"Classify the research effort needed for the question below.

Respond with ONLY this JSON shape:
{{"type": "direct_answer"|"minimal_search"|"full_research", "answer"?: "<the answer, direct_answer only>"}}

- direct_answer: trivial factual/definitional question you can answer confidently without searching
- minimal_search: simple question needing one or two quick searches
- full_research: open-ended question needing iterative research

Question: {}"#,
        question
    );

    let request = LlmRequest::user_only(prompt, 400);
    let reply = match llm.call(&request).await {
        Ok(reply) => reply.text,
        Err(e) => {
            log::warn!("⚠️ Router sem resposta do modelo ({}), rota full_research", e);
            return RouteDecision::full_research();
        }
    };

    let Some(parsed) = extract_json_block(&reply) else {
        log::warn!("⚠️ Classificação não parseável, rota full_research");
        return RouteDecision::full_research();
    };

    let decision = match parsed["type"].as_str().map(str::to_lowercase).as_deref() {
        Some("direct_answer") => {
            let answer = parsed["answer"]
                .as_str()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from);
            match answer {
                Some(answer) => RouteDecision {
                    question_type: QuestionType::DirectAnswer,
                    direct_answer: Some(answer),
                },
                // DIRECT_ANSWER sem resposta pré-gerada não serve: degradar
                None => RouteDecision {
                    question_type: QuestionType::MinimalSearch,
                    direct_answer: None,
                },
            }
        }
        Some("minimal_search") => RouteDecision {
            question_type: QuestionType::MinimalSearch,
            direct_answer: None,
        },
        Some("full_research") => RouteDecision::full_research(),
        _ => RouteDecision::full_research(),
    };

    log::info!("🧭 Rota: {}", decision.question_type.as_str());
    decision
}

/// Capa o budget efetivo do caminho MinimalSearch antes do loop
pub fn cap_budget_for_minimal(budget: &mut Budget) {
    budget.searches = budget.searches.min(MINIMAL_SEARCHES);
    budget.fetches = budget.fetches.min(MINIMAL_FETCHES);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetOverrides;
    use crate::providers::MockLlmProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_classify_direct_answer() {
        let mock = MockLlmProvider::with_reply(
            r#"{"type": "direct_answer", "answer": "Paris is the capital of France."}"#,
        );
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);

        let decision = classify(&llm, "What is the capital of France?").await;
        assert_eq!(decision.question_type, QuestionType::DirectAnswer);
        assert_eq!(
            decision.direct_answer.as_deref(),
            Some("Paris is the capital of France.")
        );
    }

    #[tokio::test]
    async fn test_classify_direct_without_answer_degrades() {
        let mock = MockLlmProvider::with_reply(r#"{"type": "direct_answer"}"#);
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);

        let decision = classify(&llm, "What is the capital of France?").await;
        assert_eq!(decision.question_type, QuestionType::MinimalSearch);
        assert!(decision.direct_answer.is_none());
    }

    #[tokio::test]
    async fn test_classify_full_research() {
        let mock = MockLlmProvider::with_reply(r#"{"type": "full_research"}"#);
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);

        let decision = classify(&llm, "Compare energy policies of France and Germany").await;
        assert_eq!(decision.question_type, QuestionType::FullResearch);
    }

    #[tokio::test]
    async fn test_classify_garbage_defaults_to_full() {
        let mock = MockLlmProvider::with_reply("no json");
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);

        let decision = classify(&llm, "anything").await;
        assert_eq!(decision.question_type, QuestionType::FullResearch);
    }

    #[test]
    fn test_cap_budget_for_minimal() {
        let mut budget = Budget::init(BudgetOverrides::default());
        cap_budget_for_minimal(&mut budget);

        assert_eq!(budget.searches, MINIMAL_SEARCHES);
        assert_eq!(budget.fetches, MINIMAL_FETCHES);

        // Budget já menor não cresce
        let mut small = Budget::init(BudgetOverrides {
            searches: Some(1),
            fetches: Some(0),
            ..Default::default()
        });
        cap_budget_for_minimal(&mut small);
        assert_eq!(small.searches, 1);
        assert_eq!(small.fetches, 0);
    }
}
