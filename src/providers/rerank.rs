// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RERANK
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Reordenação de passages por relevância à pergunta. Provedor remoto (Jina)
// opcional; o fallback por overlap de keywords existe sempre e é puro.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::ProviderError;
use crate::types::Passage;
use crate::utils::text::keywords;

/// Timeout das chamadas de rerank
const RERANK_TIMEOUT_SECS: u64 = 20;

/// Trait para provedores de rerank
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Nome do backend para logs
    fn name(&self) -> &'static str;

    /// Reordena os passages por relevância à query, retornando os `top_n`
    /// melhores com score atualizado
    async fn rerank(
        &self,
        query: &str,
        passages: &[Passage],
        top_n: usize,
    ) -> Result<Vec<Passage>, ProviderError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO JINA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backend Jina Rerank API
pub struct JinaReranker {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl JinaReranker {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "jina-reranker-v2-base-multilingual".into(),
            endpoint: "https://api.jina.ai/v1/rerank".into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(RERANK_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl RerankProvider for JinaReranker {
    fn name(&self) -> &'static str {
        "jina"
    }

    async fn rerank(
        &self,
        query: &str,
        passages: &[Passage],
        top_n: usize,
    ) -> Result<Vec<Passage>, ProviderError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        let body = json!({
            "model": self.model,
            "query": query,
            "documents": documents,
            "top_n": top_n,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Api(format!("status {}", response.status())));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let results = parsed["results"]
            .as_array()
            .ok_or_else(|| ProviderError::Parse("missing results".into()))?;

        let mut reranked = Vec::with_capacity(top_n);
        for item in results {
            let index = item["index"]
                .as_u64()
                .ok_or_else(|| ProviderError::Parse("missing result index".into()))?
                as usize;
            let score = item["relevance_score"].as_f64().unwrap_or(0.0) as f32;

            if let Some(passage) = passages.get(index) {
                let mut passage = passage.clone();
                passage.score = Some(score);
                reranked.push(passage);
            }
        }

        Ok(reranked)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FALLBACK POR OVERLAP DE KEYWORDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Rerank puro por overlap de keywords: fração das keywords da query que
/// aparecem no texto do passage. Usado quando nenhum provedor de rerank está
/// configurado ou quando todos falham.
pub fn keyword_overlap_rerank(query: &str, passages: &[Passage], top_n: usize) -> Vec<Passage> {
    let query_keywords: Vec<String> = keywords(query);
    if query_keywords.is_empty() {
        return passages.iter().take(top_n).cloned().collect();
    }

    let mut scored: Vec<Passage> = passages
        .iter()
        .map(|p| {
            let haystack: HashSet<String> = keywords(&format!(
                "{} {}",
                p.title.as_deref().unwrap_or(""),
                p.text
            ))
            .into_iter()
            .collect();
            let shared = query_keywords.iter().filter(|k| haystack.contains(*k)).count();
            let score = shared as f32 / query_keywords.len() as f32;

            let mut passage = p.clone();
            passage.score = Some(score);
            passage
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .partial_cmp(&a.score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_n);
    scored
}
