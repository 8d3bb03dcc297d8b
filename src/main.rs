//! Feud Back binary entrypoint wiring REST, WebSocket, SSE and the storage backends.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feud_back::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        models::GameStateEntity,
        storage::StorageError,
    },
    routes,
    state::{AppState, SharedState},
};

const STORE_ENV: &str = "FEUD_STORE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let seed = GameStateEntity::provisioned(
        config.default_team_a_name.clone(),
        config.default_team_b_name.clone(),
    );
    let app_state = AppState::new(config);

    let backend = env::var(STORE_ENV).unwrap_or_else(|_| "memory".into());
    install_store(&app_state, &backend, seed).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, backend = %backend, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the selected backend. Database backends are connected by the
/// storage supervisor in the background; the server stays degraded until then.
async fn install_store(
    state: &SharedState,
    backend: &str,
    seed: GameStateEntity,
) -> anyhow::Result<()> {
    match backend {
        "memory" => {
            state
                .set_game_store(Arc::new(MemoryGameStore::new(seed)))
                .await;
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use feud_back::dao::game_store::mongodb::{MongoConfig, MongoGameStore};
            use feud_back::services::storage_supervisor;

            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let seed = seed.clone();
                async move {
                    let config = MongoConfig::from_env().await?;
                    let store = MongoGameStore::connect(config, seed).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use feud_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};
            use feud_back::services::storage_supervisor;

            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let seed = seed.clone();
                async move {
                    let config = CouchConfig::from_env()?;
                    let store = CouchGameStore::connect(config, seed).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }
            }));
        }
        other => bail!("unsupported {STORE_ENV} value `{other}`"),
    }
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
