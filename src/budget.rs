// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BUDGET MANAGER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Envelope de recursos de uma execução: tempo de parede, chamadas de busca,
// chamadas de fetch e allowance de tokens. Contadores nunca ficam negativos;
// o loop verifica depleção antes de consumir.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::time::Instant;

/// Tempo máximo padrão de uma execução
pub const DEFAULT_TIME_MS: u64 = 25_000;
/// Buscas padrão por execução
pub const DEFAULT_SEARCHES: u32 = 4;
/// Fetches padrão por execução
pub const DEFAULT_FETCHES: u32 = 12;
/// Allowance de tokens padrão por execução
pub const DEFAULT_TOKENS: u64 = 24_000;

/// Overrides do caller sobre os defaults do budget
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetOverrides {
    pub time_ms: Option<u64>,
    pub searches: Option<u32>,
    pub fetches: Option<u32>,
    pub tokens: Option<u64>,
}

/// Budget de uma execução
///
/// `searches`/`fetches` são contadores monotonicamente não-crescentes,
/// consumidos um por ação. `time_ms` é comparado contra o relógio de parede
/// decorrido desde `started`.
#[derive(Debug, Clone)]
pub struct Budget {
    /// Tempo máximo em milissegundos
    pub time_ms: u64,
    /// Buscas restantes
    pub searches: u32,
    /// Fetches restantes
    pub fetches: u32,
    /// Tokens restantes (informativo; não decide depleção)
    pub tokens: u64,
    /// Instante de início da execução
    pub started: Instant,
}

impl Budget {
    /// Cria um budget aplicando overrides sobre os defaults e carimbando
    /// o instante de início
    pub fn init(overrides: BudgetOverrides) -> Self {
        Self {
            time_ms: overrides.time_ms.unwrap_or(DEFAULT_TIME_MS),
            searches: overrides.searches.unwrap_or(DEFAULT_SEARCHES),
            fetches: overrides.fetches.unwrap_or(DEFAULT_FETCHES),
            tokens: overrides.tokens.unwrap_or(DEFAULT_TOKENS),
            started: Instant::now(),
        }
    }

    /// Milissegundos decorridos desde o início
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Fração do tempo de parede já consumida (0.0 - 1.0+)
    pub fn elapsed_fraction(&self) -> f64 {
        if self.time_ms == 0 {
            return 1.0;
        }
        self.elapsed_ms() as f64 / self.time_ms as f64
    }

    /// True se o tempo acabou OU se buscas E fetches acabaram.
    /// Sem efeitos colaterais.
    pub fn is_depleted(&self) -> bool {
        self.elapsed_ms() >= self.time_ms || (self.searches == 0 && self.fetches == 0)
    }

    /// Consome uma busca; retorna false se não havia busca disponível
    pub fn consume_search(&mut self) -> bool {
        if self.searches == 0 {
            return false;
        }
        self.searches -= 1;
        true
    }

    /// Consome um fetch; retorna false se não havia fetch disponível
    pub fn consume_fetch(&mut self) -> bool {
        if self.fetches == 0 {
            return false;
        }
        self.fetches -= 1;
        true
    }

    /// Debita tokens estimados de uma chamada de modelo
    pub fn consume_tokens(&mut self, tokens: u64) {
        self.tokens = self.tokens.saturating_sub(tokens);
    }

    /// Resumo legível para o prompt do Planner e para logs
    pub fn summary(&self) -> String {
        format!(
            "time {}ms/{}ms | searches left {} | fetches left {} | tokens left {}",
            self.elapsed_ms(),
            self.time_ms,
            self.searches,
            self.fetches,
            self.tokens
        )
    }
}
