use yamdb_server::{
    config::{Parser as _, ServerConfig},
    run::run,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = ServerConfig::parse();
    run(args).await?;
    Ok(())
}
