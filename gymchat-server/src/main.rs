use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = gymchat_server::build()?;
    let addr = app.addr();

    println!("[gymchat] listening on http://{addr}");

    app.ax.listen(addr).await?;

    Ok(())
}
