// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// UTILITÁRIOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Processamento de texto: estimativa de tokens, keywords, chunking em janelas
pub mod text;

/// Datas: extração de data de publicação, decaimento de recência, day bucket
pub mod dates;

/// Domínios: eTLD+1, autoridade de domínio, blocklist de URLs
pub mod domains;

pub use dates::{day_bucket, extract_published_date, is_time_sensitive, recency_decay};
pub use domains::{domain_authority, is_blocklisted, source_domain};
pub use text::{chunk_windows, estimate_tokens, extract_json_block, keywords, token_overlap_ratio};
