//! Backplane entry-point: connects the cache and bus adapters and serves the
//! HTTP façade until a termination signal arrives.

mod server;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use actix_web::web;
use mockable::DefaultEnv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backplane::SERVICE_NAME;
use backplane::domain::ports::{CacheService, EventPublisher};
use backplane::inbound::http::health::HealthState;
use backplane::inbound::http::state::HttpState;
use backplane::outbound::cache::{CacheAdapter, RedisClusterConfig};
use backplane::outbound::events::{EventBusPublisher, KafkaConfig};
use backplane::settings::{CacheSettings, EventBusSettings, ServerSettings};
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cache_settings = CacheSettings::from_env()?;
    let bus_settings = EventBusSettings::from_env()?;
    let server_settings = ServerSettings::from_env()?;

    let cache: Arc<dyn CacheService> = Arc::new(
        CacheAdapter::connect_cluster(&RedisClusterConfig::from_settings(&cache_settings))
            .await
            .map_err(|e| std::io::Error::other(format!("cache client setup failed: {e}")))?,
    );
    let events: Arc<dyn EventPublisher> = Arc::new(
        EventBusPublisher::connect(
            KafkaConfig::from_settings(&bus_settings, SERVICE_NAME),
            SERVICE_NAME,
        )
        .map_err(|e| std::io::Error::other(format!("event publisher setup failed: {e}")))?,
    );

    let bind_addr = bind_address(&server_settings)?;
    let config = ServerConfig::new(
        bind_addr,
        HttpState::new(cache.clone(), events.clone(), SERVICE_NAME),
    );
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(server::make_metrics(SERVICE_NAME)?));

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(service = SERVICE_NAME, addr = %bind_addr, "listening");

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        wait_for_termination().await;
        info!("shutting down");
        health_state.mark_unhealthy();
        events.close().await;
        cache.close().await;
        handle.stop(true).await;
    });

    server.await
}

fn bind_address(settings: &ServerSettings) -> std::io::Result<SocketAddr> {
    let host: IpAddr = settings.host().parse().map_err(|e| {
        std::io::Error::other(format!("invalid APP_HOST {:?}: {e}", settings.host()))
    })?;
    Ok(SocketAddr::new(host, settings.port(&DefaultEnv::new())))
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable; waiting for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
