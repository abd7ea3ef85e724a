// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DATE UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Extração de data de publicação (conteúdo + path da URL), decaimento de
// recência para scoring, heurística de sensibilidade temporal e day bucket
// para a chave de cache.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Evidência mais velha que isso dispara freshness boost / time warning
pub const STALE_AFTER_DAYS: i64 = 30;

/// Data ISO no conteúdo: 2024-05-12
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("regex ISO"));

/// Data verbal no conteúdo: May 12, 2024 / 12 May 2024
static VERBAL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})|(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{4}))\b",
    )
    .expect("regex verbal")
});

/// Data no path da URL: /2024/05/12/ ou /2024/05/
static URL_PATH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{1,2})(?:/(\d{1,2}))?(?:/|$)").expect("regex URL"));

fn month_number(name: &str) -> Option<u32> {
    let idx = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ]
    .iter()
    .position(|m| name.to_lowercase().starts_with(m))?;
    Some(idx as u32 + 1)
}

fn plausible(date: NaiveDate) -> bool {
    (1995..=Utc::now().year() + 1).contains(&date.year())
}

/// Extrai a data de publicação de uma página via regex sobre o conteúdo e
/// sobre padrões de path da URL. Retorna a primeira data plausível.
pub fn extract_published_date(content: &str, url: &str) -> Option<NaiveDate> {
    // Só o início do conteúdo interessa: metadados de publicação ficam no topo
    let head: String = content.chars().take(2000).collect();

    if let Some(caps) = ISO_DATE.captures(&head) {
        let parsed = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if let Some(date) = parsed.filter(|d| plausible(*d)) {
            return Some(date);
        }
    }

    if let Some(caps) = VERBAL_DATE.captures(&head) {
        let parsed = if caps.get(1).is_some() {
            // May 12, 2024
            NaiveDate::from_ymd_opt(
                caps[3].parse().ok()?,
                month_number(&caps[1])?,
                caps[2].parse().ok()?,
            )
        } else {
            // 12 May 2024
            NaiveDate::from_ymd_opt(
                caps[6].parse().ok()?,
                month_number(&caps[5])?,
                caps[4].parse().ok()?,
            )
        };
        if let Some(date) = parsed.filter(|d| plausible(*d)) {
            return Some(date);
        }
    }

    if let Some(caps) = URL_PATH_DATE.captures(url) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps.get(3).and_then(|d| d.as_str().parse().ok()).unwrap_or(1);
        if (1..=12).contains(&month) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day).filter(|d| plausible(*d)) {
                return Some(date);
            }
        }
    }

    None
}

/// Decaimento de recência em [0, 1] relativo a `today`
///
/// Datas ausentes valem 0.25: evidência sem data não ganha nem perde muito.
pub fn recency_decay_at(date: Option<NaiveDate>, today: NaiveDate) -> f32 {
    match date {
        Some(d) => {
            let age_days = (today - d).num_days().max(0) as f32;
            (-age_days / 180.0).exp()
        }
        None => 0.25,
    }
}

/// Decaimento de recência relativo a hoje (UTC)
pub fn recency_decay(date: Option<NaiveDate>) -> f32 {
    recency_decay_at(date, Utc::now().date_naive())
}

/// Heurística de sensibilidade temporal da pergunta
///
/// Keywords explícitas de atualidade ou menção a anos recentes.
pub fn is_time_sensitive(question: &str) -> bool {
    let lowered = question.to_lowercase();
    const FRESH_KEYWORDS: &[&str] = &[
        "today", "latest", "now", "current", "currently", "recent", "recently", "news",
        "this week", "this month", "this year", "right now", "as of", "price", "update",
    ];
    if FRESH_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return true;
    }

    // Menção ao ano corrente ou anterior
    let year = Utc::now().year();
    [year, year - 1]
        .iter()
        .any(|y| lowered.contains(&y.to_string()))
}

/// Bucket diário da chave de cache: data ISO de hoje (UTC) para perguntas
/// sensíveis ao tempo, token fixo "evergreen" para as demais
pub fn day_bucket(time_sensitive: bool) -> String {
    if time_sensitive {
        Utc::now().date_naive().format("%Y-%m-%d").to_string()
    } else {
        "evergreen".to_string()
    }
}

/// Idade em dias da data mais recente do conjunto, se houver
pub fn newest_age_days(dates: impl Iterator<Item = Option<NaiveDate>>) -> Option<i64> {
    let today = Utc::now().date_naive();
    dates
        .flatten()
        .map(|d| (today - d).num_days())
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_iso_date_from_content() {
        let content = "Published: 2024-03-15 by staff writers. Lorem ipsum.";
        let date = extract_published_date(content, "https://example.com/a");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_extract_verbal_date_from_content() {
        let content = "Updated on March 5, 2023 — full report below.";
        let date = extract_published_date(content, "https://example.com/a");
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 3, 5));

        let content2 = "Posted 7 Jul 2022 in the archive.";
        let date2 = extract_published_date(content2, "https://example.com/a");
        assert_eq!(date2, NaiveDate::from_ymd_opt(2022, 7, 7));
    }

    #[test]
    fn test_extract_date_from_url_path() {
        let date = extract_published_date("no dates here", "https://blog.example.com/2023/11/04/post");
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 11, 4));

        // Sem dia: primeiro do mês
        let date2 = extract_published_date("no dates", "https://example.com/2022/09/title");
        assert_eq!(date2, NaiveDate::from_ymd_opt(2022, 9, 1));
    }

    #[test]
    fn test_extract_date_rejects_implausible() {
        assert_eq!(extract_published_date("ref 1850-01-01 antique", "https://e.com/a"), None);
        // /1234/56/ não é data plausível
        assert_eq!(extract_published_date("none", "https://e.com/1234/56/x"), None);
    }

    #[test]
    fn test_recency_decay_ordering() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let fresh = recency_decay_at(NaiveDate::from_ymd_opt(2024, 5, 30), today);
        let old = recency_decay_at(NaiveDate::from_ymd_opt(2022, 5, 30), today);
        let undated = recency_decay_at(None, today);

        assert!(fresh > undated);
        assert!(undated > old);
        assert!(fresh <= 1.0 && old >= 0.0);
    }

    #[test]
    fn test_is_time_sensitive() {
        assert!(is_time_sensitive("What is the latest Rust release?"));
        assert!(is_time_sensitive("Bitcoin price today"));
        assert!(!is_time_sensitive("What is the capital of France?"));
    }

    #[test]
    fn test_day_bucket() {
        assert_eq!(day_bucket(false), "evergreen");
        let bucket = day_bucket(true);
        assert_eq!(bucket.len(), 10); // YYYY-MM-DD
        assert!(bucket.contains('-'));
    }

    #[test]
    fn test_newest_age_days() {
        let today = Utc::now().date_naive();
        let dates = vec![
            Some(today - chrono::Duration::days(90)),
            Some(today - chrono::Duration::days(10)),
            None,
        ];
        assert_eq!(newest_age_days(dates.into_iter()), Some(10));
        assert_eq!(newest_age_days(vec![None].into_iter()), None);
    }
}
