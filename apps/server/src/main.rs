use dhanbridge_server::{
    api::app_router, build_state, config::Config, init_tracing,
    scheduler::start_dataset_refresh_scheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    tracing::info!(
        "TradingView to Dhan Bridge v{} starting",
        env!("CARGO_PKG_VERSION")
    );
    let state = build_state(&config).await?;

    start_dataset_refresh_scheduler(state.clone());

    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
