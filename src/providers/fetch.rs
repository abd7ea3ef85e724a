// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FETCH DE PÁGINAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Recupera conteúdo de páginas web com extração em dois estágios:
// 1. Readability (algoritmo Mozilla), caminho primário
// 2. html2text, fallback quando a extração primária falha ou vem vazia
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;

use super::ProviderError;
use crate::types::PageContent;
use crate::utils::text::clean_text;

/// Timeout do fetch de conteúdo
const FETCH_TIMEOUT_SECS: u64 = 15;

/// Trait para recuperação de conteúdo de URLs
#[async_trait]
pub trait FetchProvider: Send + Sync {
    /// Busca e extrai o conteúdo textual de uma URL
    async fn fetch(&self, url: &str) -> Result<PageContent, ProviderError>;
}

/// Fetcher HTTP com extração Readability → html2text
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
                .user_agent("research-orchestrator/0.1")
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Extrai texto e título de um HTML: Readability primeiro, html2text depois
pub fn extract_content(html: &str, url: &str) -> (String, Option<String>) {
    // Caminho primário: Readability
    if let Ok(parsed_url) = url::Url::parse(url) {
        let mut cursor = Cursor::new(html.as_bytes().to_vec());
        if let Ok(product) = readability::extractor::extract(&mut cursor, &parsed_url) {
            let text = clean_text(&product.text);
            if !text.is_empty() {
                let title = if product.title.trim().is_empty() {
                    None
                } else {
                    Some(product.title.trim().to_string())
                };
                return (text, title);
            }
        }
    }

    // Fallback: HTML bruto → texto
    log::debug!("📄 Readability vazio para {}, usando html2text", url);
    let text = clean_text(&html2text::from_read(html.as_bytes(), 100));
    let title = extract_title_tag(html);
    (text, title)
}

/// Extrai o <title> do HTML bruto (fallback)
fn extract_title_tag(html: &str) -> Option<String> {
    let lowered = html.to_lowercase();
    let start = lowered.find("<title")?;
    let open_end = html[start..].find('>')? + start + 1;
    let close = lowered[open_end..].find("</title>")? + open_end;
    let title = clean_text(&html[open_end..close]);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[async_trait]
impl FetchProvider for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(ProviderError::Api(format!("status {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let (text, title) = extract_content(&html, url);
        if text.is_empty() {
            return Err(ProviderError::Parse(format!("no extractable content at {}", url)));
        }

        Ok(PageContent { text, title, status })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fetcher mock: conteúdo fixo por URL, erro para URLs desconhecidas
#[derive(Debug, Default)]
pub struct MockFetchProvider {
    pages: HashMap<String, PageContent>,
}

impl MockFetchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra o conteúdo devolvido para uma URL
    pub fn with_page(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            PageContent {
                text: text.into(),
                title: Some("Mock Page".into()),
                status: 200,
            },
        );
        self
    }
}

#[async_trait]
impl FetchProvider for MockFetchProvider {
    async fn fetch(&self, url: &str) -> Result<PageContent, ProviderError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ProviderError::Network(format!("mock: unknown url {}", url)))
    }
}
