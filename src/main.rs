// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Binário de linha de comando: responde uma pergunta com o pipeline completo.
// Com a feature "server", `--serve [addr]` sobe a superfície HTTP.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use anyhow::Result;

use research_orchestrator::{load_config, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    #[cfg(feature = "server")]
    if args.first().map(String::as_str) == Some("--serve") {
        let addr = args.get(1).cloned().unwrap_or_else(|| "0.0.0.0:8080".into());
        let config = load_config();
        let orchestrator = std::sync::Arc::new(Orchestrator::from_config(config)?);
        let state = research_orchestrator::server::AppState::new(
            orchestrator,
            research_orchestrator::server::load_allowed_tokens(),
        );
        return research_orchestrator::server::serve(state, &addr).await;
    }

    let question = args.join(" ");
    if question.trim().is_empty() {
        eprintln!("Uso: research-cli \"<pergunta>\"");
        eprintln!("     research-cli --serve [addr]   (feature \"server\")");
        std::process::exit(2);
    }

    let config = load_config();
    let orchestrator = Orchestrator::from_config(config)?;

    log::info!("🔬 Pesquisando: {}", question);
    let result = orchestrator.answer(&question).await?;

    println!("{}", result.answer_markdown);

    if let Some(warning) = &result.time_warning {
        println!("\n⚠️  {}", warning);
    }

    if !result.citations.is_empty() {
        println!("\nFontes:");
        for citation in &result.citations {
            match (&citation.title, citation.published_date) {
                (Some(title), Some(date)) => println!("  - {} ({}) — {}", title, date, citation.url),
                (Some(title), None) => println!("  - {} — {}", title, citation.url),
                _ => println!("  - {}", citation.url),
            }
        }
    }

    log::info!("{}", orchestrator.cache_summary());
    Ok(())
}
