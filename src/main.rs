use mimalloc::MiMalloc;
use sheetwise::accessor::{DataAccessor, WorkspaceAccessor};
use sheetwise::auth::{AuthConfig, CredentialCipher, CredentialManager};
use sheetwise::config::CONFIG;
use sheetwise::remote::build_client;
use sheetwise::server::{SheetwiseState, sheetwise_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &*CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        proxy = %cfg.gateway.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        auth_mode = %cfg.auth.mode,
        resource = %cfg.workspace.resource.as_deref().unwrap_or("<unset>"),
        dev_mode = cfg.basic.dev_mode,
    );

    let cipher = CredentialCipher::resolve(cfg.auth.encryption_key.as_deref(), cfg.basic.dev_mode)?;
    let store = sheetwise::store::spawn(&cfg.basic.database_url).await?;
    let http = build_client(&cfg.gateway)?;
    let credentials = CredentialManager::initialize(
        AuthConfig::from_settings(&cfg.auth),
        cipher,
        http,
        Some(store.clone()),
    )
    .await?;
    let accessor = Arc::new(WorkspaceAccessor::initialize(
        &cfg.workspace,
        &cfg.gateway,
        Arc::new(credentials),
    )?);

    // Build axum router and serve
    let state = SheetwiseState::new(
        accessor.clone(),
        Arc::from(cfg.basic.sheetwise_key.as_str()),
        cfg.basic.dev_mode,
    );
    let app = sheetwise_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    accessor.close().await;
    store.stop();
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
