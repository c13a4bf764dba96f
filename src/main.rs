// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use secure_file_host::{
    api::router,
    auth::SecretHeader,
    config::{
        LogFormat, ServerConfig, DEFAULT_LOG_FILTER, SECRET_HEADER_VALUE_ENV, TLS_CERT_PATH_ENV,
        TLS_KEY_PATH_ENV,
    },
    state::AppState,
    storage::{FileStore, StoreConfig},
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init(),
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn Error>> {
    let store_config = StoreConfig::from_hex(&config.upload_dir, &config.encryption_key)?
        .with_id_policy(config.id_policy);
    let store = FileStore::open(store_config)?;

    let orphans = store.find_orphans()?;
    if !orphans.is_empty() {
        warn!(count = orphans.len(), "found blobs without descriptors");
    }

    if config.secret_header_value.is_none() {
        warn!("{SECRET_HEADER_VALUE_ENV} is not set; every /api request will be rejected");
    }
    let gate = SecretHeader::new(
        &config.secret_header_name,
        config.secret_header_value.as_deref(),
    )?;

    let state = AppState::new(store, gate)
        .with_max_file_size(config.max_file_size)
        .with_static_dir(config.static_dir.clone());
    let app = router(state);

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    let addr = config.bind_addr;
    match &config.tls {
        Some(tls) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "failed to install rustls crypto provider")?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            info!(%addr, upload_dir = %config.upload_dir.display(), "Secure file host listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            warn!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} not set; serving plain HTTP");
            info!(%addr, upload_dir = %config.upload_dir.display(), "Secure file host listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    info!("server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(LogFormat::from_env());

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
