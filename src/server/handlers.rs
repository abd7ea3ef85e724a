// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HANDLERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::auth::authorize;
use super::types::{AnswerRequest, AnswerResponse, ErrorResponse};
use super::AppState;
use crate::budget::BudgetOverrides;
use crate::orchestrator::AnswerOptions;

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// POST /v1/answer: corpo `{question, model?, modelConfig?}`
pub async fn answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(identity) = authorize(&headers, &state.allowed_tokens) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthorized".into(),
            }),
        ));
    };

    let question = request.question.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "question must not be empty".into(),
            }),
        ));
    }

    log::info!("📨 [{}] pergunta: \"{}\"", identity.0, question);

    let options = AnswerOptions {
        model: request.model,
        budget: request.model_config.map(|mc| BudgetOverrides {
            time_ms: mc.time_ms,
            searches: mc.searches,
            fetches: mc.fetches,
            tokens: mc.tokens,
        }),
    };

    match state.orchestrator.answer_with_options(question, options).await {
        Ok(result) => Ok(Json(AnswerResponse { result })),
        Err(e) => {
            log::error!("❌ [{}] request falhou: {}", identity.0, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            ))
        }
    }
}
