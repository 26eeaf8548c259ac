//! rollcall attendance service
//!
//! Serves the attendance report API and runs the change feed worker that
//! notifies students when new attendance entries are recorded.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rollcall_service::{
    api, config,
    db::{AttendanceStore, Database, UserDirectory},
    feed::ChangeFeedWorker,
    notify::{ExpoPushClient, NotificationDispatcher},
    state::AppState,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

fn log_server_exit(result: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!("Server exited normally"),
        Ok(Err(e)) => error!(error = %e, "Server error"),
        Err(e) => error!(error = %e, "Server task panicked"),
    }
}

/// Waits for the server task to finish its graceful shutdown. Returns false on timeout.
async fn wait_for_server(handle: JoinHandle<std::io::Result<()>>, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, handle).await {
        Ok(result) => {
            log_server_exit(result);
            true
        }
        Err(e) => {
            warn!(error = %e, "HTTP server did not shut down in time");
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Prefer RUST_LOG, fall back to ROLLCALL_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting rollcall attendance service");
    info!(
        listen_addr = %config.listen_addr,
        push_endpoint = %config.push.endpoint,
        max_in_flight = config.feed.max_in_flight,
        "Configuration loaded"
    );

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };

    if config.dev_mode {
        info!("Running database migrations (dev mode)");
        if let Err(e) = db.run_migrations().await {
            error!(error = %e, "Failed to run migrations");
            return Err(e.into());
        }
    }

    let store: Arc<dyn AttendanceStore> = Arc::new(db.attendance_store());
    let users: Arc<dyn UserDirectory> = Arc::new(db.user_directory());
    let gateway = Arc::new(ExpoPushClient::new(&config.push)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = NotificationDispatcher::new(Arc::clone(&users), gateway);
    let feed_worker = ChangeFeedWorker::new(Arc::clone(&store), dispatcher, config.feed.clone());
    let feed_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            feed_worker.run(shutdown_rx).await;
        }
    });

    let app = api::create_router(AppState::new(store, users));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    let server_finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            false
        }
        result = &mut server_handle => {
            log_server_exit(result);
            true
        }
    };

    let _ = shutdown_tx.send(true);

    if !server_finished {
        info!("Waiting for HTTP server to shut down...");
        wait_for_server(server_handle, SERVER_SHUTDOWN_TIMEOUT).await;
    }

    info!("Waiting for change feed worker to shut down...");
    // The worker bounds its own drain; allow a little beyond that.
    let shutdown_timeout = config.feed.drain_timeout + Duration::from_secs(5);
    if let Err(e) = tokio::time::timeout(shutdown_timeout, feed_handle).await {
        warn!(error = %e, "Change feed worker did not shut down in time");
    }

    info!("rollcall shutdown complete");
    Ok(())
}
