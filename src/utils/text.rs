// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TEXT UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Utilitários de texto usados pelo pipeline:
// - Estimativa de tokens
// - Extração de keywords (cobertura de facets)
// - Overlap de tokens (guarda de decomposição de queries)
// - Chunking em janelas com overlap (FETCH)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashSet;

/// Estimativa de caracteres por token (GPT-4)
const CHARS_PER_TOKEN: f32 = 4.0;

/// Estima número de tokens em um texto
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() as f32 / CHARS_PER_TOKEN).ceil() as usize
}

/// Trunca texto para um número máximo de tokens, respeitando char boundaries
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let max_chars = (max_tokens as f32 * CHARS_PER_TOKEN) as usize;
    if text.len() <= max_chars {
        text
    } else {
        let mut end = max_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

/// Remove caracteres de controle e normaliza whitespace
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokeniza um texto em keywords: alfanuméricos, lowercase, comprimento > 2
pub fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Fração dos tokens de `candidate` que também aparecem em `reference`
///
/// Usada pela guarda do Planner: uma query proposta com >70% de overlap com a
/// pergunta original é considerada duplicata e substituída.
pub fn token_overlap_ratio(candidate: &str, reference: &str) -> f32 {
    let cand: Vec<String> = keywords(candidate);
    if cand.is_empty() {
        return 0.0;
    }
    let refs: HashSet<String> = keywords(reference).into_iter().collect();
    let shared = cand.iter().filter(|t| refs.contains(*t)).count();
    shared as f32 / cand.len() as f32
}

/// Conta cláusulas de uma query (separadas por vírgula ou conectivos)
pub fn clause_count(query: &str) -> usize {
    let lowered = query.to_lowercase();
    let mut count = 1;
    count += lowered.matches(',').count();
    for connective in [" and ", " or ", " vs ", " versus ", " compared to "] {
        count += lowered.matches(connective).count();
    }
    count
}

/// Extrai o primeiro bloco JSON de uma resposta de modelo
///
/// Modelos devolvem JSON cercado de prosa ou code fences; este parse
/// defensivo localiza o primeiro objeto/array e tenta o serde. Retorna None
/// para saída inaproveitável (o caller decide o fallback determinístico).
pub fn extract_json_block(text: &str) -> Option<serde_json::Value> {
    // Tentativa direta primeiro
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }

    // Remover code fences ```json ... ```
    let stripped = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Ok(value) = serde_json::from_str(stripped) {
        return Some(value);
    }

    // Último recurso: do primeiro delimitador ao último correspondente
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if end > start {
                if let Ok(value) = serde_json::from_str(&text[start..=end]) {
                    return Some(value);
                }
            }
        }
    }

    None
}

/// Divide texto em janelas de ~`window_tokens` com ~`overlap_tokens` de
/// sobreposição, no máximo `max_chunks` janelas.
///
/// As janelas são medidas em caracteres via [`CHARS_PER_TOKEN`]; o corte
/// retrocede até um char boundary válido.
pub fn chunk_windows(
    text: &str,
    window_tokens: usize,
    overlap_tokens: usize,
    max_chunks: usize,
) -> Vec<String> {
    let window_chars = (window_tokens as f32 * CHARS_PER_TOKEN) as usize;
    let overlap_chars = (overlap_tokens as f32 * CHARS_PER_TOKEN) as usize;
    // Overlap maior que a janela degeneraria em loop infinito
    let step = window_chars.saturating_sub(overlap_chars).max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() && chunks.len() < max_chunks {
        let mut end = (start + window_chars).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
        if start >= end {
            break;
        }

        let chunk = text[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= text.len() {
            break;
        }
        start += step;
    }

    chunks
}
