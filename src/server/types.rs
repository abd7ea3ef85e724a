// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SCHEMAS API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::types::ReActResult;

/// Request para POST /v1/answer
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    /// Override do modelo de síntese
    pub model: Option<String>,
    /// Overrides do budget desta chamada
    #[serde(rename = "modelConfig")]
    pub model_config: Option<ModelConfig>,
}

/// Overrides aceitos no corpo do request
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub time_ms: Option<u64>,
    pub searches: Option<u32>,
    pub fetches: Option<u32>,
    pub tokens: Option<u64>,
}

/// Response de sucesso
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    #[serde(flatten)]
    pub result: ReActResult,
}

/// Response de erro
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
