// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para modelos de linguagem. Dois backends com shapes
// de request NÃO intercambiáveis, normalizados para um único retorno:
// - OpenAiChatProvider: lista de mensagens system+user (chat/completions)
// - GeminiProvider: single-shot com maxOutputTokens (generateContent)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::ProviderError;

/// Timeout das chamadas de modelo
const LLM_TIMEOUT_SECS: u64 = 20;

/// Request normalizado para qualquer backend LLM
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Instrução de sistema (opcional)
    pub system: Option<String>,
    /// Prompt do usuário
    pub user: String,
    /// Máximo de tokens de saída
    pub max_tokens: u32,
    /// Temperatura de amostragem
    pub temperature: f32,
}

impl LlmRequest {
    /// Request simples sem instrução de sistema
    pub fn user_only(user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: None,
            user: user.into(),
            max_tokens,
            temperature: 0.2,
        }
    }

    /// Request com instrução de sistema
    pub fn with_system(
        system: impl Into<String>,
        user: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
            max_tokens,
            temperature: 0.2,
        }
    }

    /// Estimativa de tokens do request + resposta, para débito no budget
    pub fn estimated_tokens(&self) -> u64 {
        let prompt = self.system.as_deref().unwrap_or("").len() + self.user.len();
        (prompt / 4) as u64 + self.max_tokens as u64
    }
}

/// Resposta normalizada de qualquer backend
#[derive(Debug, Clone)]
pub struct LlmReply {
    /// Texto gerado
    pub text: String,
}

/// Trait principal para clientes LLM
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Nome do backend para logs
    fn name(&self) -> &'static str;

    /// Id do modelo configurado
    fn model(&self) -> &str;

    /// Executa uma chamada de geração
    async fn call(&self, request: &LlmRequest) -> Result<LlmReply, ProviderError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO OPENAI (CHAT MESSAGES)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backend estilo chat: request estruturado como lista system+user
pub struct OpenAiChatProvider {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAiChatProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Sobrescreve o endpoint (proxies compatíveis)
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn call(&self, request: &LlmRequest) -> Result<LlmReply, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.user}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
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

        let text = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Parse("missing choices[0].message.content".into()))?
            .to_string();

        Ok(LlmReply { text })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO GEMINI (SINGLE-SHOT)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backend single-shot: um único conteúdo + maxOutputTokens
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn call(&self, request: &LlmRequest) -> Result<LlmReply, ProviderError> {
        // Shape single-shot: a instrução de sistema vira prefixo do prompt
        let prompt = match &request.system {
            Some(system) => format!("{}\n\n{}", system, request.user),
            None => request.user.clone(),
        };

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            },
        });

        let endpoint = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&endpoint)
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

        let text = parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ProviderError::Parse("missing candidates[0] text".into()))?
            .to_string();

        Ok(LlmReply { text })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente mock: devolve respostas roteirizadas em ordem (FIFO), depois a
/// resposta default. Registra os prompts recebidos.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    /// Respostas roteirizadas, consumidas em ordem
    scripted: Mutex<VecDeque<String>>,
    /// Resposta usada quando o roteiro se esgota
    pub default_reply: String,
    /// Prompts de usuário recebidos, em ordem
    pub calls: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            default_reply: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock com uma única resposta fixa
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            default_reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock com roteiro de respostas em ordem
    pub fn with_script(replies: Vec<String>) -> Self {
        Self {
            scripted: Mutex::new(replies.into()),
            default_reply: String::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Enfileira mais uma resposta roteirizada
    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.push_back(reply.into());
        }
    }

    /// Número de chamadas recebidas
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn call(&self, request: &LlmRequest) -> Result<LlmReply, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.user.clone());
        }

        let text = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.default_reply.clone());

        Ok(LlmReply { text })
    }
}
