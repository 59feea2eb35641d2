use anyhow::Context;
use storekeep::StoreAdmin;
use storekeep_mongodb::MongoManagerDirectory;
use storekeep_postgres::PostgresStoreRepository;
use storekeep_web::{app, logging, AppConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error).context("failed to read .env file");
        }
    }

    let config = AppConfig::from_env().context("invalid configuration")?;
    logging::init(config.log_format).context("failed to install tracing subscriber")?;

    info!("[startup.begin] starting storekeep");

    let stores =
        PostgresStoreRepository::with_config(config.database_url.clone(), config.postgres.clone())
            .await
            .context("failed to connect to postgres")?;
    stores
        .ping()
        .await
        .context("postgres is not answering")?;
    stores
        .migrate()
        .await
        .context("failed to migrate postgres schema")?;
    info!("[startup.postgres_ready] relational store ready");

    let managers = MongoManagerDirectory::connect(config.mongo.clone())
        .await
        .context("failed to connect to mongodb")?;
    info!("[startup.mongodb_ready] manager collection ready");

    let listener = TcpListener::bind((config.host, config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!(
        address = %listener.local_addr().context("listener has no local address")?,
        "[startup.listening] serving administration pages"
    );

    axum::serve(listener, app(StoreAdmin::new(stores, managers)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    info!("[shutdown.complete] storekeep stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "[shutdown.ctrl_c] failed to install handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "[shutdown.terminate] failed to install handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("[shutdown.signal] received Ctrl+C"),
        () = terminate => info!("[shutdown.signal] received terminate"),
    }
}
