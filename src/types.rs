// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Classificação de esforço necessário para responder uma pergunta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    /// Pergunta trivial/definicional, respondível sem busca
    DirectAnswer,
    /// Pergunta simples: budget reduzido (≤2 buscas, ≤1 fetch)
    MinimalSearch,
    /// Pergunta aberta: pipeline completo
    FullResearch,
}

impl Default for QuestionType {
    fn default() -> Self {
        Self::FullResearch
    }
}

impl QuestionType {
    /// Retorna o tipo como string para logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectAnswer => "direct_answer",
            Self::MinimalSearch => "minimal_search",
            Self::FullResearch => "full_research",
        }
    }
}

/// Filtro temporal para buscas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    /// Código do filtro no formato dos provedores SERP (ex: "qdr:w")
    pub fn as_tbs(&self) -> &'static str {
        match self {
            Self::Day => "qdr:d",
            Self::Week => "qdr:w",
            Self::Month => "qdr:m",
            Self::Year => "qdr:y",
        }
    }
}

/// Resultado bruto de um provedor de busca
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// URL do resultado
    pub url: String,
    /// Título da página
    pub title: String,
    /// Snippet/descrição retornado pelo provedor
    pub snippet: String,
}

/// Conteúdo extraído de uma página
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// Texto extraído (limpo)
    pub text: String,
    /// Título da página, se detectado
    pub title: Option<String>,
    /// Status HTTP da resposta
    pub status: u16,
}

/// Unidade de evidência recuperada (snippet de busca ou chunk de página)
///
/// Passages são produzidos exclusivamente pelo Action Executor. A coleção é
/// append-only, exceto durante RERANK, que a substitui por um subconjunto
/// filtrado e reordenado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Id estável e livre de colisões dentro de uma execução
    pub id: String,
    /// Texto da evidência
    pub text: String,
    /// URL de origem
    pub url: String,
    /// Título da página de origem
    pub title: Option<String>,
    /// Data de publicação detectada
    pub published_date: Option<NaiveDate>,
    /// Domínio de origem (eTLD+1)
    pub source_domain: Option<String>,
    /// Score de relevância atribuído (busca ou rerank)
    pub score: Option<f32>,
}

impl Passage {
    /// Deriva um id estável a partir da URL (hash de conteúdo)
    pub fn id_for_url(url: &str) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        url.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Id de um chunk de FETCH: hash da URL + ordinal do chunk
    pub fn id_for_chunk(url: &str, ordinal: usize) -> String {
        format!("{}#{}", Self::id_for_url(url), ordinal)
    }
}

/// Sub-afirmação da pergunta que precisa ser evidenciada
///
/// Facets são derivados: recomputados a cada iteração pelo Facet Manager a
/// partir do conjunto atual de passages, nunca mutados incrementalmente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facet {
    /// Nome da sub-afirmação
    pub name: String,
    /// Se a cobertura deste facet é obrigatória
    pub required: bool,
    /// Domínios distintos que evidenciam este facet
    pub covered_source_domains: BTreeSet<String>,
    /// Se ao menos um domínio cobre o facet
    pub covered: bool,
    /// Se dois ou mais domínios independentes cobrem o facet
    pub multiple_sources: bool,
}

impl Facet {
    /// Cria um facet ainda sem cobertura
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            covered_source_domains: BTreeSet::new(),
            covered: false,
            multiple_sources: false,
        }
    }
}

/// Citação de fonte no resultado final
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// URL da fonte
    pub url: String,
    /// Título da fonte
    pub title: Option<String>,
    /// Data de publicação da fonte
    pub published_date: Option<NaiveDate>,
}

/// Entrada do trace de execução (diário de uma iteração do loop)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Número da iteração (0-based)
    pub iteration: usize,
    /// Nome da ação executada
    pub action: String,
    /// Raciocínio do modelo para a ação
    pub thought: String,
    /// Total de passages após a ação
    pub passages_total: usize,
    /// Facets obrigatórios cobertos após a ação
    pub facets_covered: usize,
    /// Nota livre (ex: motivo de término, reparo de query)
    pub note: Option<String>,
}

/// Resultado final de uma execução de pesquisa
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReActResult {
    /// Resposta em markdown com citações inline
    pub answer_markdown: String,
    /// Citações deduplicadas por URL, no máximo 4
    pub citations: Vec<Citation>,
    /// Trace das iterações (opcional)
    pub trace: Option<Vec<TraceEntry>>,
    /// Aviso de possível desatualização da evidência
    pub time_warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_as_str() {
        assert_eq!(QuestionType::DirectAnswer.as_str(), "direct_answer");
        assert_eq!(QuestionType::FullResearch.as_str(), "full_research");
    }

    #[test]
    fn test_time_range_tbs() {
        assert_eq!(TimeRange::Month.as_tbs(), "qdr:m");
        assert_eq!(TimeRange::Day.as_tbs(), "qdr:d");
    }

    #[test]
    fn test_passage_id_stable() {
        let a = Passage::id_for_url("https://example.com/page");
        let b = Passage::id_for_url("https://example.com/page");
        assert_eq!(a, b);

        let c = Passage::id_for_url("https://example.com/other");
        assert_ne!(a, c);
    }

    #[test]
    fn test_chunk_ids_distinct() {
        let c0 = Passage::id_for_chunk("https://example.com/page", 0);
        let c1 = Passage::id_for_chunk("https://example.com/page", 1);
        assert_ne!(c0, c1);
        assert!(c0.ends_with("#0"));
    }

    #[test]
    fn test_facet_new() {
        let facet = Facet::new("population of france", true);
        assert!(facet.required);
        assert!(!facet.covered);
        assert!(facet.covered_source_domains.is_empty());
    }
}
