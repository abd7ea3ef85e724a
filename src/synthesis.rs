// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SYNTHESIS ENGINE & RESULT BUILDER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Seleciona evidência diversa, pede ao modelo de síntese uma resposta em
// markdown com citações inline e monta o ReActResult final (citações
// deduplicadas, aviso de desatualização).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::agent::executor::apply_domain_cap;
use crate::providers::{LlmProviderManager, LlmRequest};
use crate::types::{Citation, Passage, ReActResult, TraceEntry};
use crate::utils::dates::{newest_age_days, recency_decay, STALE_AFTER_DAYS};
use crate::utils::domains::domain_authority;

/// Passages enviados ao modelo de síntese
pub const SYNTHESIS_PASSAGES: usize = 10;
/// Máximo de citações no resultado
pub const MAX_CITATIONS: usize = 4;

/// Peso do score prévio na seleção
const W_PRIOR: f32 = 0.55;
/// Peso da autoridade de domínio
const W_AUTHORITY: f32 = 0.30;
/// Peso do decaimento de recência
const W_RECENCY: f32 = 0.15;

/// Linha com números/percentuais
static NUMERIC_CLAIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?%?").expect("regex numeric"));

/// Par de nomes próprios (aproximação de entidade citável)
static PROPER_NOUN_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").expect("regex proper noun"));

/// Seleciona até `n` passages diversos por score combinado
///
/// score = 0.55·prévio + 0.30·autoridade + 0.15·recência, seleção gulosa
/// com cap de 3 por domínio.
pub fn select_top_diverse(passages: &[Passage], n: usize) -> Vec<Passage> {
    if passages.is_empty() {
        return Vec::new();
    }

    // Normalizar o score prévio para [0, 1]
    let max_prior = passages
        .iter()
        .filter_map(|p| p.score)
        .fold(0.0f32, f32::max);

    let mut scored: Vec<(f32, &Passage)> = passages
        .iter()
        .map(|p| {
            let prior = match (p.score, max_prior > 0.0) {
                (Some(score), true) => score / max_prior,
                _ => 0.5,
            };
            let authority = domain_authority(p.source_domain.as_deref().unwrap_or(""));
            let recency = recency_decay(p.published_date);
            (W_PRIOR * prior + W_AUTHORITY * authority + W_RECENCY * recency, p)
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let ordered: Vec<Passage> = scored.into_iter().map(|(_, p)| p.clone()).collect();
    let mut selected = apply_domain_cap(&ordered, 3);
    selected.truncate(n);
    selected
}

/// Gera a resposta final citada com uma chamada ao modelo de síntese
///
/// Falha total do modelo degrada para uma lista determinística da evidência
/// (nunca propaga erro para o caller).
pub async fn synthesize(
    llm: &LlmProviderManager,
    question: &str,
    passages: &[Passage],
) -> String {
    if passages.is_empty() {
        return format!(
            "No supporting evidence could be gathered for this question: {}",
            question
        );
    }

    let evidence = passages
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "[{}] {} ({}) — {}\n{}",
                i + 1,
                p.title.as_deref().unwrap_or("untitled"),
                p.published_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "no date".into()),
                p.url,
                p.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let system = r#"You are the synthesis module of a research agent. Write a markdown answer from the evidence passages only.

Rules:
1. Cite every non-trivial claim inline as [Title (Date)](URL), using the passage metadata
2. Prefer claims corroborated by at least 2 independent domains
3. Explicitly flag claims backed by a single source or by stale evidence
4. Do not invent facts absent from the evidence"#;

    let user = format!("Question: {}\n\nEvidence passages:\n\n{}", question, evidence);
    let request = LlmRequest::with_system(system, user, 1200);

    match llm.call(&request).await {
        Ok(reply) if !reply.text.trim().is_empty() => annotate_unverified(&reply.text),
        Ok(_) | Err(_) => {
            log::warn!("⚠️ Síntese indisponível, degradando para lista de evidência");
            fallback_answer(question, passages)
        }
    }
}

/// Resposta determinística quando o modelo de síntese está indisponível
fn fallback_answer(question: &str, passages: &[Passage]) -> String {
    let mut answer = format!("## {}\n\nTop evidence gathered:\n\n", question);
    for passage in passages.iter().take(5) {
        answer.push_str(&format!(
            "- [{}]({}): {}\n",
            passage.title.as_deref().unwrap_or("source"),
            passage.url,
            passage.text.chars().take(200).collect::<String>()
        ));
    }
    answer
}

/// Pós-processo: linhas com números/percentuais ou pares de nomes próprios
/// sem link de citação inline recebem a anotação de verificação
pub fn annotate_unverified(answer: &str) -> String {
    answer
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            let is_substantive = !trimmed.is_empty() && !trimmed.starts_with('#');
            let has_citation = line.contains("](http");
            let has_claim =
                NUMERIC_CLAIM.is_match(line) || PROPER_NOUN_PAIR.is_match(line);

            if is_substantive && has_claim && !has_citation {
                format!("{} *(verify: uncited claim)*", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Monta o ReActResult final: citações deduplicadas por URL na ordem dos
/// passages (máximo 4) e aviso de desatualização quando aplicável
pub fn build_result(
    answer_markdown: String,
    passages: &[Passage],
    time_sensitive: bool,
    trace: Option<Vec<TraceEntry>>,
) -> ReActResult {
    // Dedupe por URL, primeira ocorrência vence (ordem dos passages)
    let mut seen: HashSet<String> = HashSet::new();
    let mut citations = Vec::new();

    for passage in passages {
        if seen.insert(passage.url.clone()) {
            citations.push(Citation {
                url: passage.url.clone(),
                title: passage.title.clone(),
                published_date: passage.published_date,
            });
            if citations.len() >= MAX_CITATIONS {
                break;
            }
        }
    }

    let time_warning = if time_sensitive {
        let newest = newest_age_days(passages.iter().map(|p| p.published_date));
        match newest {
            Some(age) if age <= STALE_AFTER_DAYS => None,
            _ => Some(format!(
                "Time-sensitive question, but no source is newer than {} days; details may be outdated.",
                STALE_AFTER_DAYS
            )),
        }
    } else {
        None
    };

    ReActResult {
        answer_markdown,
        citations,
        trace,
        time_warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockLlmProvider;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn passage(url: &str, domain: &str, score: Option<f32>, date: Option<NaiveDate>) -> Passage {
        Passage {
            id: Passage::id_for_url(url),
            text: "evidence text".into(),
            url: url.into(),
            title: Some("Title".into()),
            published_date: date,
            source_domain: Some(domain.into()),
            score,
        }
    }

    #[test]
    fn test_select_top_diverse_prefers_score_and_authority() {
        let passages = vec![
            passage("https://blog.net/a", "blog.net", Some(0.1), None),
            passage("https://wikipedia.org/b", "wikipedia.org", Some(0.9), None),
        ];

        let selected = select_top_diverse(&passages, 2);
        assert_eq!(selected[0].url, "https://wikipedia.org/b");
    }

    #[test]
    fn test_select_top_diverse_caps_per_domain() {
        let mut passages: Vec<Passage> = (0..6)
            .map(|i| passage(&format!("https://same.com/{}", i), "same.com", Some(1.0), None))
            .collect();
        passages.push(passage("https://other.com/x", "other.com", Some(0.5), None));

        let selected = select_top_diverse(&passages, 10);
        let same_count = selected
            .iter()
            .filter(|p| p.source_domain.as_deref() == Some("same.com"))
            .count();
        assert_eq!(same_count, 3);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_select_top_diverse_empty() {
        assert!(select_top_diverse(&[], 5).is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_uses_model_output() {
        let mock = MockLlmProvider::with_reply(
            "The answer is well documented [Title (2024-01-01)](https://a.com/x).",
        );
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);
        let passages = vec![passage("https://a.com/x", "a.com", Some(1.0), None)];

        let answer = synthesize(&llm, "question?", &passages).await;
        assert!(answer.contains("https://a.com/x"));
    }

    #[tokio::test]
    async fn test_synthesize_degrades_on_empty_reply() {
        let mock = MockLlmProvider::with_reply("");
        let llm = LlmProviderManager::new(vec![Arc::new(mock)]);
        let passages = vec![passage("https://a.com/x", "a.com", Some(1.0), None)];

        let answer = synthesize(&llm, "question?", &passages).await;
        assert!(answer.contains("Top evidence gathered"));
        assert!(answer.contains("https://a.com/x"));
    }

    #[test]
    fn test_annotate_flags_uncited_numbers() {
        let answer = "Adoption grew 42% in 2024.\nA cited claim grew 10% [T (2024)](https://a.com).";
        let annotated = annotate_unverified(answer);

        let lines: Vec<&str> = annotated.lines().collect();
        assert!(lines[0].contains("(verify: uncited claim)"));
        assert!(!lines[1].contains("(verify"));
    }

    #[test]
    fn test_annotate_skips_headings_and_plain_prose() {
        let answer = "# 42 Ways\nplain prose without claims";
        let annotated = annotate_unverified(answer);
        assert!(!annotated.contains("(verify"));
    }

    #[test]
    fn test_build_result_dedupes_and_caps_citations() {
        let mut passages = Vec::new();
        // URL repetida + 5 distintas
        passages.push(passage("https://a.com/x", "a.com", None, None));
        passages.push(passage("https://a.com/x", "a.com", None, None));
        for i in 0..5 {
            passages.push(passage(&format!("https://d{}.com/x", i), &format!("d{}.com", i), None, None));
        }

        let result = build_result("answer".into(), &passages, false, None);
        assert_eq!(result.citations.len(), MAX_CITATIONS);
        // Ordem por posição dos passages, primeira URL primeiro
        assert_eq!(result.citations[0].url, "https://a.com/x");
        let urls: HashSet<&str> = result.citations.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls.len(), MAX_CITATIONS);
    }

    #[test]
    fn test_build_result_time_warning_on_stale_evidence() {
        let today = chrono::Utc::now().date_naive();
        let stale = vec![passage(
            "https://a.com/x",
            "a.com",
            None,
            Some(today - chrono::Duration::days(120)),
        )];

        let result = build_result("answer".into(), &stale, true, None);
        assert!(result.time_warning.is_some());

        let fresh = vec![passage(
            "https://a.com/x",
            "a.com",
            None,
            Some(today - chrono::Duration::days(3)),
        )];
        let result = build_result("answer".into(), &fresh, true, None);
        assert!(result.time_warning.is_none());

        // Pergunta evergreen nunca recebe aviso
        let result = build_result("answer".into(), &stale, false, None);
        assert!(result.time_warning.is_none());
    }
}
