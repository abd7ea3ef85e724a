// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FACET MANAGER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Decompõe a pergunta em facets (sub-afirmações) e recomputa a cobertura a
// cada iteração a partir do conjunto atual de passages. A recomputação é uma
// função pura: nunca é patchada incrementalmente.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeSet;

use crate::providers::{LlmProviderManager, LlmRequest};
use crate::types::{Facet, Passage};
use crate::utils::text::{extract_json_block, keywords};

/// Máximo de facets extraídos por pergunta
const MAX_FACETS: usize = 8;

/// Fração mínima de facets obrigatórios cobertos (gate rápido)
pub const SOFT_COVERAGE_THRESHOLD: f32 = 0.6;

/// Extrai facets da pergunta com uma única chamada de modelo
///
/// Saída malformada degrada para um único facet obrigatório igual à
/// pergunta inteira, nunca propaga erro.
pub async fn extract_facets(llm: &LlmProviderManager, question: &str) -> Vec<Facet> {
    let prompt = format!(
        r#"Break the research question below into its component sub-claims (facets).
Return ONLY a JSON array, each element: {{"name": "<short facet phrase>", "required": <bool>}}.
Mark a facet required when the question cannot be answered without evidence for it.
At most {} facets.

Question: {}"#,
        MAX_FACETS, question
    );

    let request = LlmRequest::user_only(prompt, 512);
    let fallback = || vec![Facet::new(question, true)];

    let reply = match llm.call(&request).await {
        Ok(reply) => reply,
        Err(e) => {
            log::warn!("⚠️ Extração de facets falhou ({}), usando facet único", e);
            return fallback();
        }
    };

    let parsed = match extract_json_block(&reply.text).and_then(|v| v.as_array().cloned()) {
        Some(items) => items,
        None => {
            log::warn!("⚠️ Facets não parseáveis, usando facet único");
            return fallback();
        }
    };

    let facets: Vec<Facet> = parsed
        .iter()
        .filter_map(|item| {
            let name = item["name"].as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(Facet::new(name, item["required"].as_bool().unwrap_or(true)))
        })
        .take(MAX_FACETS)
        .collect();

    if facets.is_empty() {
        log::warn!("⚠️ Lista de facets vazia, usando facet único");
        return fallback();
    }

    log::info!(
        "🧩 {} facets extraídos ({} obrigatórios)",
        facets.len(),
        facets.iter().filter(|f| f.required).count()
    );
    facets
}

/// Recomputa a cobertura de cada facet a partir do zero
///
/// Um passage "acerta" um facet quando TODAS as keywords do nome do facet
/// (tokens com comprimento > 2, lowercase) aparecem em título + texto.
/// `covered` = ≥1 domínio distinto acertando; `multiple_sources` = ≥2.
pub fn update_coverage(facets: &[Facet], passages: &[Passage]) -> Vec<Facet> {
    facets
        .iter()
        .map(|facet| {
            let facet_keywords = keywords(&facet.name);
            let mut domains: BTreeSet<String> = BTreeSet::new();

            if !facet_keywords.is_empty() {
                for passage in passages {
                    let haystack = format!(
                        "{} {}",
                        passage.title.as_deref().unwrap_or(""),
                        passage.text
                    )
                    .to_lowercase();

                    if facet_keywords.iter().all(|k| haystack.contains(k.as_str())) {
                        if let Some(domain) = &passage.source_domain {
                            domains.insert(domain.clone());
                        }
                    }
                }
            }

            Facet {
                name: facet.name.clone(),
                required: facet.required,
                covered: !domains.is_empty(),
                multiple_sources: domains.len() >= 2,
                covered_source_domains: domains,
            }
        })
        .collect()
}

/// Fração dos facets obrigatórios cobertos (0.0 quando não há obrigatórios)
pub fn required_coverage_ratio(facets: &[Facet]) -> f32 {
    let required: Vec<&Facet> = facets.iter().filter(|f| f.required).collect();
    if required.is_empty() {
        return 0.0;
    }
    let covered = required.iter().filter(|f| f.covered).count();
    covered as f32 / required.len() as f32
}

/// Condição estrita de sucesso: o gate rápido de 60% E todos os facets
/// obrigatórios cobertos. O gate de 60% é o sinal consumido pela política de
/// término; a cobertura total é o que libera a recomendação de STOP.
pub fn all_required_covered(facets: &[Facet]) -> bool {
    let ratio = required_coverage_ratio(facets);
    if ratio < SOFT_COVERAGE_THRESHOLD {
        return false;
    }
    facets.iter().filter(|f| f.required).all(|f| f.covered)
        && facets.iter().any(|f| f.required)
}

/// Diversidade de domínios: contagem de `source_domain` distintos ≥ mínimo
pub fn has_domain_diversity(passages: &[Passage], min_domains: usize) -> bool {
    let domains: BTreeSet<&str> = passages
        .iter()
        .filter_map(|p| p.source_domain.as_deref())
        .collect();
    domains.len() >= min_domains
}
