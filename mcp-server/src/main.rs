use domtrace_core::ConfigOverrides;
use domtrace_mcp_server::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_main(ConfigOverrides::default()).await?;
    Ok(())
}
