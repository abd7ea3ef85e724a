// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AÇÕES DO AGENTE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// União fechada de ações produzidas pelo Planner. O payload duck-typed do
// modelo é convertido por um parse validador que rejeita shapes desconhecidos
// em vez de confiar na entrada; saída inaproveitável cai no fallback
// determinístico.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::types::TimeRange;
use crate::utils::text::extract_json_block;

/// Resultados pedidos por padrão em uma busca
pub const DEFAULT_SEARCH_K: usize = 20;
/// Passages mantidos por padrão em um rerank
pub const DEFAULT_RERANK_TOP_N: usize = 10;

/// Cada ação carrega seus próprios dados - impossível ter SEARCH sem query
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Buscar na web
    Search {
        /// Query de busca (validada/reparada pelo Planner antes da execução)
        query: String,
        /// Número de resultados desejado
        k: usize,
        /// Filtro temporal opcional
        time_range: Option<TimeRange>,
    },

    /// Buscar o conteúdo de uma página
    Fetch {
        /// URL a recuperar
        url: String,
    },

    /// Reordenar e filtrar os passages atuais
    Rerank {
        /// Quantos passages manter
        top_n: usize,
    },

    /// Sinalizar saída do loop
    Stop,
}

impl Action {
    /// Nome da ação para logs e trace
    pub fn name(&self) -> &'static str {
        match self {
            Action::Search { .. } => "search",
            Action::Fetch { .. } => "fetch",
            Action::Rerank { .. } => "rerank",
            Action::Stop => "stop",
        }
    }

    /// Verifica se é uma ação de busca
    pub fn is_search(&self) -> bool {
        matches!(self, Action::Search { .. })
    }

    /// Verifica se é STOP
    pub fn is_stop(&self) -> bool {
        matches!(self, Action::Stop)
    }
}

/// Decisão completa do Planner: raciocínio + ação
#[derive(Debug, Clone)]
pub struct Plan {
    /// Raciocínio do modelo
    pub thought: String,
    /// Ação escolhida
    pub action: Action,
}

/// Converte a saída do modelo em um Plan validado
///
/// Shape esperado: `{"thought": "...", "action": {"type": "search"|"fetch"|
/// "rerank"|"stop", "query"?, "k"?, "url"?, "top_n"?, "timeRange"?}}`.
/// Retorna None para shapes desconhecidos ou campos essenciais inválidos;
/// o caller aplica o fallback determinístico.
pub fn parse_plan(text: &str) -> Option<Plan> {
    let value = extract_json_block(text)?;
    let thought = value["thought"].as_str().unwrap_or("").to_string();
    let action_value = &value["action"];
    let action_type = action_value["type"].as_str()?.to_lowercase();

    let action = match action_type.as_str() {
        "search" => {
            let query = action_value["query"].as_str().unwrap_or("").trim().to_string();
            let k = action_value["k"]
                .as_u64()
                .map(|k| (k as usize).clamp(1, 35))
                .unwrap_or(DEFAULT_SEARCH_K);
            let time_range = action_value["timeRange"]
                .as_str()
                .and_then(parse_time_range);
            Action::Search { query, k, time_range }
        }
        "fetch" => {
            let url = action_value["url"].as_str()?.trim().to_string();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return None;
            }
            Action::Fetch { url }
        }
        "rerank" => {
            let top_n = action_value["top_n"]
                .as_u64()
                .map(|n| (n as usize).clamp(1, 30))
                .unwrap_or(DEFAULT_RERANK_TOP_N);
            Action::Rerank { top_n }
        }
        "stop" => Action::Stop,
        _ => return None,
    };

    Some(Plan { thought, action })
}

fn parse_time_range(raw: &str) -> Option<TimeRange> {
    match raw.to_lowercase().as_str() {
        "day" | "d" => Some(TimeRange::Day),
        "week" | "w" => Some(TimeRange::Week),
        "month" | "m" => Some(TimeRange::Month),
        "year" | "y" => Some(TimeRange::Year),
        _ => None,
    }
}

/// Fallback determinístico para saída inaproveitável do modelo:
/// poucos passages → buscar "<pergunta> latest"; senão → rerank
pub fn fallback_plan(question: &str, passage_count: usize) -> Plan {
    if passage_count < 6 {
        Plan {
            thought: "fallback: unparseable plan, gathering more evidence".into(),
            action: Action::Search {
                query: format!("{} latest", question),
                k: DEFAULT_SEARCH_K,
                time_range: None,
            },
        }
    } else {
        Plan {
            thought: "fallback: unparseable plan, consolidating evidence".into(),
            action: Action::Rerank {
                top_n: DEFAULT_RERANK_TOP_N,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let text = r#"{"thought": "need prices", "action": {"type": "search", "query": "solar panel cost 2024", "k": 15}}"#;
        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.thought, "need prices");
        assert_eq!(
            plan.action,
            Action::Search {
                query: "solar panel cost 2024".into(),
                k: 15,
                time_range: None,
            }
        );
    }

    #[test]
    fn test_parse_search_with_time_range() {
        let text = r#"{"thought": "t", "action": {"type": "SEARCH", "query": "q", "timeRange": "week"}}"#;
        let plan = parse_plan(text).unwrap();
        match plan.action {
            Action::Search { time_range, k, .. } => {
                assert_eq!(time_range, Some(TimeRange::Week));
                assert_eq!(k, DEFAULT_SEARCH_K);
            }
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fetch_requires_http_url() {
        let good = r#"{"thought": "t", "action": {"type": "fetch", "url": "https://example.com/a"}}"#;
        assert!(parse_plan(good).is_some());

        let bad = r#"{"thought": "t", "action": {"type": "fetch", "url": "ftp://example.com"}}"#;
        assert!(parse_plan(bad).is_none());

        let missing = r#"{"thought": "t", "action": {"type": "fetch"}}"#;
        assert!(parse_plan(missing).is_none());
    }

    #[test]
    fn test_parse_rerank_clamps_top_n() {
        let text = r#"{"thought": "t", "action": {"type": "rerank", "top_n": 500}}"#;
        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.action, Action::Rerank { top_n: 30 });
    }

    #[test]
    fn test_parse_stop() {
        let text = r#"{"thought": "done", "action": {"type": "stop"}}"#;
        assert!(parse_plan(text).unwrap().action.is_stop());
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let text = r#"{"thought": "t", "action": {"type": "teleport"}}"#;
        assert!(parse_plan(text).is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_plan("no json whatsoever").is_none());
    }

    #[test]
    fn test_fallback_low_evidence_searches() {
        let plan = fallback_plan("what is rust?", 3);
        match plan.action {
            Action::Search { query, .. } => assert_eq!(query, "what is rust? latest"),
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_fallback_enough_evidence_reranks() {
        let plan = fallback_plan("what is rust?", 6);
        assert_eq!(
            plan.action,
            Action::Rerank {
                top_n: DEFAULT_RERANK_TOP_N
            }
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Stop.name(), "stop");
        assert_eq!(Action::Rerank { top_n: 5 }.name(), "rerank");
    }
}
