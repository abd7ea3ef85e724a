// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CACHE STORE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Cache chave/valor com TTL e três namespaces lógicos:
// - SearchResults: resultados de busca
// - PageContent: conteúdo de páginas fetchadas
// - Answers: respostas finais (bucket diário para perguntas sensíveis ao tempo)
//
// Thread-safe, com estatísticas de hit/miss e eviction da entrada mais antiga
// quando o namespace atinge o limite.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Namespace lógico de uma entrada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Resultados de busca
    SearchResults,
    /// Conteúdo de páginas
    PageContent,
    /// Respostas finais
    Answers,
}

impl CacheNamespace {
    /// Nome do namespace para logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchResults => "search",
            Self::PageContent => "page",
            Self::Answers => "answer",
        }
    }
}

/// Configuração do cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL para resultados de busca (segundos)
    pub search_ttl_secs: u64,
    /// TTL para conteúdo de páginas (segundos)
    pub page_ttl_secs: u64,
    /// TTL para respostas de perguntas sensíveis ao tempo (segundos)
    pub answer_daily_ttl_secs: u64,
    /// TTL fixo para respostas evergreen (segundos)
    pub answer_evergreen_ttl_secs: u64,
    /// Máximo de entradas por namespace
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_secs: 900,               // 15 minutos
            page_ttl_secs: 3600,                // 1 hora
            answer_daily_ttl_secs: 86_400,      // 1 dia
            answer_evergreen_ttl_secs: 2_592_000, // 30 dias
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    /// Configuração para testes (TTL longo, sem pressão de eviction)
    pub fn for_tests() -> Self {
        Self {
            search_ttl_secs: 86_400,
            page_ttl_secs: 86_400,
            answer_daily_ttl_secs: 86_400,
            answer_evergreen_ttl_secs: 86_400,
            max_entries: 100,
        }
    }

    /// TTL de resposta conforme a sensibilidade temporal da pergunta
    pub fn answer_ttl(&self, time_sensitive: bool) -> u64 {
        if time_sensitive {
            self.answer_daily_ttl_secs
        } else {
            self.answer_evergreen_ttl_secs
        }
    }
}

/// Entrada do cache
#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    hit_count: u64,
}

impl CacheEntry {
    fn new(value: serde_json::Value, ttl_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            value,
            expires_at: now + ChronoDuration::seconds(ttl_secs as i64),
            last_accessed: now,
            hit_count: 0,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    fn touch(&mut self) {
        self.hit_count += 1;
        self.last_accessed = Utc::now();
    }
}

/// Estatísticas do cache
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub hit_rate: f64,
}

/// Cache thread-safe com TTL e namespaces
pub struct CacheStore {
    store: RwLock<HashMap<(CacheNamespace, String), CacheEntry>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStore {
    /// Cria um cache com a configuração fornecida
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Armazena um valor serializável com TTL explícito
    pub fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
        namespace: CacheNamespace,
    ) {
        let json = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("cache: falha ao serializar valor para {}: {}", key, e);
                return;
            }
        };

        if let Ok(mut store) = self.store.write() {
            let in_namespace = store.keys().filter(|(ns, _)| *ns == namespace).count();
            if in_namespace >= self.config.max_entries {
                Self::evict_oldest(&mut store, namespace, &self.evictions);
            }
            store.insert((namespace, key.to_string()), CacheEntry::new(json, ttl_secs));
        }
    }

    /// Recupera um valor do cache, ou None se ausente/expirado
    pub fn get<T: DeserializeOwned>(&self, key: &str, namespace: CacheNamespace) -> Option<T> {
        let map_key = (namespace, key.to_string());

        if let Ok(mut store) = self.store.write() {
            if let Some(entry) = store.get_mut(&map_key) {
                if !entry.is_expired() {
                    entry.touch();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return serde_json::from_value(entry.value.clone()).ok();
                }
                // Expirado: remover na passada
                store.remove(&map_key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Remove entradas expiradas de todos os namespaces
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        if let Ok(mut store) = self.store.write() {
            let expired: Vec<_> = store
                .iter()
                .filter(|(_, entry)| entry.is_expired())
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                store.remove(&key);
                removed += 1;
            }
        }
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    fn evict_oldest(
        store: &mut HashMap<(CacheNamespace, String), CacheEntry>,
        namespace: CacheNamespace,
        evictions: &AtomicU64,
    ) {
        if let Some(oldest) = store
            .iter()
            .filter(|((ns, _), _)| *ns == namespace)
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone())
        {
            store.remove(&oldest);
            evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Número de entradas (todos os namespaces)
    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    /// True se o cache está vazio
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configuração ativa
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Estatísticas agregadas
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }

    /// Resumo formatado para logs
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "CacheStore: {} entries | {:.1}% hit rate ({} hits, {} misses) | {} evictions",
            stats.entries,
            stats.hit_rate * 100.0,
            stats.hits,
            stats.misses,
            stats.evictions
        )
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Chave determinística de cache de resposta
///
/// Hash estável de {pergunta, day bucket, modelo de raciocínio, modelo de
/// síntese, shape do budget}. O bucket diário faz perguntas sensíveis ao
/// tempo serem re-respondidas a cada dia enquanto perguntas estáveis
/// compartilham uma única resposta cacheada.
pub fn answer_cache_key(
    question: &str,
    day_bucket: &str,
    reasoning_model: &str,
    synthesis_model: &str,
    searches: u32,
    fetches: u32,
) -> String {
    let canonical = format!(
        "{}|{}|{}|{}|{}|{}",
        question.trim().to_lowercase(),
        day_bucket,
        reasoning_model,
        synthesis_model,
        searches,
        fetches
    );
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("answer:{:016x}", hasher.finish())
}
