// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE DE BUSCA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para busca web. Cada backend é habilitado pela
// presença da sua chave de API na configuração; o fallback ordenado fica no
// SearchProviderManager.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::ProviderError;
use crate::types::{SearchHit, TimeRange};

/// Timeout das chamadas de busca
const SEARCH_TIMEOUT_SECS: u64 = 20;

/// Trait principal para provedores de busca
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Nome do backend para logs
    fn name(&self) -> &'static str;

    /// Executa uma busca, retornando até `k` resultados
    async fn search(
        &self,
        query: &str,
        k: usize,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<SearchHit>, ProviderError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO SERPER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backend Serper (POST JSON com X-API-KEY)
pub struct SerperProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl SerperProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: "https://google.serper.dev/search".into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SearchProvider for SerperProvider {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let mut body = json!({"q": query, "num": k});
        if let Some(range) = time_range {
            body["tbs"] = json!(range.as_tbs());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
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

        let organic = parsed["organic"]
            .as_array()
            .ok_or_else(|| ProviderError::Parse("missing organic results".into()))?;

        let hits = organic
            .iter()
            .filter_map(|item| {
                Some(SearchHit {
                    url: item["link"].as_str()?.to_string(),
                    title: item["title"].as_str().unwrap_or_default().to_string(),
                    snippet: item["snippet"].as_str().unwrap_or_default().to_string(),
                })
            })
            .take(k)
            .collect();

        Ok(hits)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO BRAVE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backend Brave Search (GET com X-Subscription-Token)
pub struct BraveProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl BraveProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: "https://api.search.brave.com/res/v1/web/search".into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    fn freshness_param(range: TimeRange) -> &'static str {
        match range {
            TimeRange::Day => "pd",
            TimeRange::Week => "pw",
            TimeRange::Month => "pm",
            TimeRange::Year => "py",
        }
    }
}

#[async_trait]
impl SearchProvider for BraveProvider {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let mut url = format!(
            "{}?q={}&count={}",
            self.endpoint,
            urlencoding::encode(query),
            k
        );
        if let Some(range) = time_range {
            url.push_str(&format!("&freshness={}", Self::freshness_param(range)));
        }

        let response = self
            .client
            .get(&url)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
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

        let results = parsed["web"]["results"]
            .as_array()
            .ok_or_else(|| ProviderError::Parse("missing web.results".into()))?;

        let hits = results
            .iter()
            .filter_map(|item| {
                Some(SearchHit {
                    url: item["url"].as_str()?.to_string(),
                    title: item["title"].as_str().unwrap_or_default().to_string(),
                    snippet: item["description"].as_str().unwrap_or_default().to_string(),
                })
            })
            .take(k)
            .collect();

        Ok(hits)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Provedor mock para testes unitários e de integração
#[derive(Debug, Default)]
pub struct MockSearchProvider {
    /// Hits devolvidos em toda busca
    pub hits: Vec<SearchHit>,
    /// Queries recebidas, em ordem
    pub queries: std::sync::Mutex<Vec<String>>,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock com hits fixos
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Queries de busca recebidas até agora
    pub fn seen_queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        _time_range: Option<TimeRange>,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}
