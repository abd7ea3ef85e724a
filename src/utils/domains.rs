// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DOMAIN UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Derivação de eTLD+1, autoridade de domínio, blocklist de URLs e bônus de
// fonte técnica, usados pelo scoring do Action Executor e pela diversidade
// de domínios do Facet Manager.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Segundos níveis que compõem sufixos de dois rótulos (ex: co.uk, com.br)
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "co", "com", "org", "net", "gov", "edu", "ac", "mil",
];

/// Deriva o eTLD+1 aproximado de uma URL (sem lista pública completa)
///
/// "www.blog.example.co.uk" → "example.co.uk"; "docs.rs" → "docs.rs"
pub fn source_domain(url_str: &str) -> Option<String> {
    let parsed = url::Url::parse(url_str).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").to_lowercase();

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return Some(host);
    }

    // host = a.b.c.tld → sufixo de dois rótulos se o penúltimo for genérico
    let n = labels.len();
    let take = if SECOND_LEVEL_SUFFIXES.contains(&labels[n - 2]) && labels[n - 1].len() == 2 {
        3
    } else {
        2
    };
    Some(labels[n - take..].join("."))
}

/// Autoridade de domínio em [0, 1]
///
/// Tabela curta de fontes confiáveis; domínios desconhecidos valem 0.5.
pub fn domain_authority(domain: &str) -> f32 {
    const AUTHORITATIVE: &[(&str, f32)] = &[
        ("wikipedia.org", 0.95),
        ("arxiv.org", 0.95),
        ("nature.com", 0.95),
        ("science.org", 0.9),
        ("acm.org", 0.9),
        ("ieee.org", 0.9),
        ("nih.gov", 0.9),
        ("who.int", 0.9),
        ("reuters.com", 0.85),
        ("apnews.com", 0.85),
        ("bbc.com", 0.85),
        ("bbc.co.uk", 0.85),
        ("github.com", 0.8),
        ("stackoverflow.com", 0.8),
        ("docs.rs", 0.8),
        ("rust-lang.org", 0.8),
        ("nytimes.com", 0.8),
        ("economist.com", 0.8),
    ];

    for (known, score) in AUTHORITATIVE {
        if domain == *known || domain.ends_with(&format!(".{}", known)) {
            return *score;
        }
    }
    if domain.ends_with(".gov") || domain.ends_with(".edu") {
        return 0.9;
    }
    0.5
}

/// Páginas de navegação, documentos de escritório, vídeo e redes sociais
/// não viram evidência
pub fn is_blocklisted(url_str: &str) -> bool {
    let lowered = url_str.to_lowercase();

    // Páginas de navegação: tags, categorias, autor, feeds
    const NAV_SEGMENTS: &[&str] = &[
        "/tag/", "/tags/", "/category/", "/categories/", "/author/", "/feed", "/rss", "/page/",
    ];
    if NAV_SEGMENTS.iter().any(|s| lowered.contains(s)) {
        return true;
    }

    // Documentos de escritório e binários
    const DOC_EXTENSIONS: &[&str] = &[
        ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".zip",
    ];
    let path_end = lowered.split(['?', '#']).next().unwrap_or(&lowered);
    if DOC_EXTENSIONS.iter().any(|e| path_end.ends_with(e)) {
        return true;
    }

    // Vídeo e redes sociais
    const SOCIAL_HOSTS: &[&str] = &[
        "youtube.com", "youtu.be", "tiktok.com", "facebook.com", "instagram.com",
        "twitter.com", "x.com", "pinterest.com", "reddit.com", "linkedin.com",
    ];
    if let Some(domain) = source_domain(url_str) {
        if SOCIAL_HOSTS.contains(&domain.as_str()) {
            return true;
        }
    }

    false
}

/// Bônus para fontes técnicas/acadêmicas
pub fn technical_source_bonus(domain: &str, text: &str) -> f32 {
    const ACADEMIC_DOMAINS: &[&str] = &[
        "arxiv.org", "acm.org", "ieee.org", "nature.com", "science.org",
        "springer.com", "sciencedirect.com", "nih.gov",
    ];
    if ACADEMIC_DOMAINS.iter().any(|d| domain == *d) || domain.ends_with(".edu") {
        return 1.0;
    }

    const TECHNICAL_KEYWORDS: &[&str] = &[
        "study", "research", "paper", "dataset", "benchmark", "peer-reviewed", "doi",
    ];
    let lowered = text.to_lowercase();
    let hits = TECHNICAL_KEYWORDS.iter().filter(|k| lowered.contains(*k)).count();
    (hits as f32 * 0.25).min(0.75)
}

/// Bônus de recência por menções de frescor no snippet
pub fn recency_mention_bonus(text: &str) -> f32 {
    let lowered = text.to_lowercase();
    let year = chrono::Datelike::year(&chrono::Utc::now());

    let mut bonus: f32 = 0.0;
    if lowered.contains(&year.to_string()) {
        bonus += 0.5;
    } else if lowered.contains(&(year - 1).to_string()) {
        bonus += 0.25;
    }
    const FRESH_WORDS: &[&str] = &["updated", "latest", "new release", "announced"];
    if FRESH_WORDS.iter().any(|w| lowered.contains(w)) {
        bonus += 0.25;
    }
    bonus.min(0.75)
}
