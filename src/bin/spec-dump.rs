use bridge_scout::core::config::load_scout_config;
use bridge_scout::specs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("usage: spec-dump <phone name>");
    }

    let config = load_scout_config();
    let out_dir = config.resolve_output_dir();
    let ctx = bridge_scout::ScoutContext::new(config)?;
    if ctx.identities().use_proxy() {
        ctx.refresh_proxies().await;
    }

    let lookup = specs::lookup(&ctx, &query).await;
    let Some(hit) = lookup.hit.as_ref() else {
        println!("No results for {:?}", query);
        return Ok(());
    };
    if lookup.specs.is_empty() {
        println!("{}: no spec rows found", hit.display_name);
        return Ok(());
    }

    let path = specs::save_spec_sheet(&out_dir, &hit.display_name, &lookup.specs).await?;
    println!("{} ({} rows) -> {}", hit.display_name, lookup.specs.len(), path.display());
    Ok(())
}
