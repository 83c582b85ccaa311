use std::time::Duration;

use actix_web::dev::ServerHandle;
use tokio::signal;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::telemetry::TelemetryClient;

/// 关闭时 telemetry flush 的超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C，然后停止接收新连接并等待进行中的请求完成
pub async fn listen_for_shutdown(handle: ServerHandle, cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, draining connections...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    cancel.cancel();
    handle.stop(true).await;
}

/// 服务器停止后执行：停止后台任务，尽力发送剩余的远程日志
pub async fn perform_shutdown_tasks(cancel: &CancellationToken, telemetry: Option<&TelemetryClient>) {
    cancel.cancel();

    let Some(client) = telemetry else {
        info!("Telemetry is not configured, skipping flush");
        return;
    };

    match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), client.flush()).await {
        Ok(Ok(())) => {
            info!("Telemetry flushed successfully");
        }
        Ok(Err(e)) => {
            warn!("Final telemetry flush failed: {}", e);
        }
        Err(_) => {
            error!(
                "Telemetry flush timed out after {} seconds",
                TASK_TIMEOUT_SECS
            );
        }
    }
}
