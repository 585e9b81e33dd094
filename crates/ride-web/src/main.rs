use std::net::SocketAddr;

use ride_web::config::ServerConfig;
use ride_web::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_web=debug,ride_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let sweep_every = config.rate_limit.sweep_interval();

    let state = AppState::new(config);
    let seeded = state.seed_admins().await?;
    if seeded > 0 {
        tracing::info!("Seeded {seeded} admin account(s)");
    }

    // Idle rate-limit key eviction
    let governor = state.governor.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let evicted = governor.sweep();
            if evicted > 0 {
                tracing::debug!(evicted, tracked = governor.tracked_keys(), "rate limiter sweep");
            }
        }
    });

    let app = ride_web::app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("ride-web listening on http://{}", bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
