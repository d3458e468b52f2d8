#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = api_server::run_server().await {
        tracing::error!("Server exited: {:#}", e);
        return Err(e);
    }
    Ok(())
}
