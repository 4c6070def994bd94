use anyhow::Context as _;

pub fn init() -> anyhow::Result<()> {
    init_with_default_filter("info")
}

/// Installs the stderr subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_with_default_filter(default_filter: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
