use bridge_scout::core::config::load_scout_config;
use bridge_scout::proxy_grabber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = load_scout_config();

    // Sources from argv win over config/env.
    let mut sources: Vec<String> = std::env::args().skip(1).collect();
    if sources.is_empty() {
        sources = config.resolve_proxy_sources();
    }
    if sources.is_empty() {
        anyhow::bail!("No proxy sources: pass URLs as arguments or set PROXY_SOURCES");
    }

    let ctx = bridge_scout::ScoutContext::new(config)?;
    let report = proxy_grabber::refresh_proxy_pool(&ctx.transport, &sources).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "sources": sources.len(),
            "failed_sources": report.failed_sources,
            "skipped_lines": report.skipped_lines,
            "total": report.proxies.len(),
            "proxies": proxy_grabber::masked_list(&report.proxies),
        }))?
    );
    Ok(())
}
