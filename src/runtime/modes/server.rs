//! Server mode
//!
//! Configures and starts the HTTP (and in production, HTTPS) listeners.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::middleware::ConnectionCounter;
use crate::config::StaticConfig;
use crate::runtime::lifetime;
use crate::services::{Notifier, SparkPostNotifier, startup_notification};

/// Run the HTTP server
///
/// This function:
/// 1. Prepares shared state (data dir, click log, telemetry, background tasks)
/// 2. Binds HTTP, plus HTTPS in production when certificates are configured
/// 3. Sends the startup log / mail
/// 4. Waits for the server to stop, then flushes telemetry
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            error!("Server startup failed: {}", e);
            e
        })?;

    let state = startup.state.clone();
    let stats = state.stats.clone();
    let server_cfg = &config.server;

    let cpu_count = server_cfg.cpu_count.clamp(1, 32);
    info!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(ConnectionCounter::new(stats.clone()))
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Connection", "keep-alive"))
                    .add(("Cache-Control", "public, max-age=300")),
            )
            .configure(move |cfg| state.configure(cfg))
    })
    .keep_alive(Duration::from_secs(120))
    .client_request_timeout(Duration::from_millis(server_cfg.read_timeout_ms))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .shutdown_timeout(server_cfg.shutdown_timeout_secs)
    .disable_signals()
    .workers(cpu_count);

    let server = server
        .bind(&server_cfg.addr)
        .with_context(|| format!("Failed to bind {}", server_cfg.addr))?;
    let msg = format!(
        "Started running on {}, production: {}",
        server_cfg.addr, server_cfg.production
    );
    warn!("{}", msg);

    #[cfg(feature = "tls")]
    let server = match https_config(&config)? {
        Some(tls_config) => {
            let server = server
                .bind_rustls_0_23(&server_cfg.https_addr, tls_config)
                .with_context(|| format!("Failed to bind {}", server_cfg.https_addr))?;
            warn!(
                "Started running HTTPS on {} for *{}",
                server_cfg.https_addr, config.tls.allowed_host_suffix
            );
            server
        }
        None => server,
    };
    #[cfg(not(feature = "tls"))]
    if server_cfg.production {
        warn!("Built without the `tls` feature, HTTPS disabled");
    }

    let server = server.run();

    if let Some(ref client) = startup.state.telemetry
        && let Err(e) = client.log([("log", msg.as_str())])
    {
        warn!("Failed to queue startup log: {}", e);
    }

    if server_cfg.production {
        send_startup_mail(&config, &startup.data_dir);
    }

    let handle = server.handle();
    let shutdown = tokio::spawn(lifetime::shutdown::listen_for_shutdown(
        handle,
        startup.cancel.clone(),
    ));

    let result = server.await;
    shutdown.abort();

    lifetime::shutdown::perform_shutdown_tasks(&startup.cancel, startup.state.telemetry.as_ref())
        .await;
    info!("Server stopped");

    result.context("HTTP server failed")
}

/// 生产模式且配置了证书时返回 HTTPS 配置
#[cfg(feature = "tls")]
fn https_config(config: &StaticConfig) -> Result<Option<rustls::ServerConfig>> {
    if !config.server.production {
        return Ok(None);
    }
    let tls = &config.tls;
    let (Some(cert), Some(key)) = (&tls.cert_path, &tls.key_path) else {
        warn!("Production mode without tls.cert_path/tls.key_path, HTTPS disabled");
        return Ok(None);
    };
    let tls_config = crate::system::tls::load_server_config(cert, key, &tls.allowed_host_suffix)?;
    Ok(Some(tls_config))
}

/// 后台发送启动邮件，失败只记录日志
fn send_startup_mail(config: &StaticConfig, data_dir: &std::path::Path) {
    let Some(notifier) = SparkPostNotifier::from_config(&config.mail) else {
        info!("Mail API key not configured, skipping startup mail");
        return;
    };
    let notification =
        startup_notification(chrono::Utc::now(), config.server.production, data_dir);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(notification).await {
            warn!("Failed to send startup mail: {}", e);
        }
    });
}
