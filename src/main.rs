use rmcp::{ServiceExt, transport::stdio};

use veogen::config::Config;
use veogen::server::VeogenServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env from the binary's directory (MCP servers may start with any CWD),
    // then the cargo project root, then dotenvy's default CWD search.
    let env_file = std::env::current_exe().ok().and_then(|exe| {
        let dir = exe.parent()?;
        [dir.join(".env"), dir.join("../../.env")]
            .into_iter()
            .find(|p| p.exists())
    });
    match env_file {
        Some(path) => {
            dotenvy::from_path(&path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing::info!("veogen starting");

    // The credential is checked once, before any provider call.
    let config = Config::load().inspect_err(|e| tracing::error!("startup failed: {e}"))?;
    tracing::debug!(?config, "configuration loaded");

    let server = VeogenServer::new(config)?;

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {e:?}"))?;

    service.waiting().await?;

    tracing::info!("veogen shutting down");
    Ok(())
}
