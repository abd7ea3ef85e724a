// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AUTORIZAÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Bearer token contra a lista configurada. A identidade devolvida é opaca,
// usada apenas para logging/quota, sem semântica de sessão.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;

use axum::http::HeaderMap;

/// Identidade opaca de um caller autorizado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

/// Extrai o bearer token do header Authorization
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Autoriza o request; retorna a identidade opaca do caller
///
/// A identidade é um prefixo curto do token: suficiente para logging sem
/// vazar a credencial.
pub fn authorize(headers: &HeaderMap, allowed: &HashSet<String>) -> Option<CallerIdentity> {
    let token = bearer_token(headers)?;
    if !allowed.contains(token) {
        return None;
    }
    let prefix: String = token.chars().take(8).collect();
    Some(CallerIdentity(prefix))
}
