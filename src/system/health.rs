//! 周期性健康日志
//!
//! 定时输出连接/下载计数和进程内存占用，同时上报到远程日志。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::counters::{ServerStats, StatsSnapshot};
use crate::telemetry::{Message, TelemetryClient};

/// 进程内存（字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub rss: u64,
    pub virtual_memory: u64,
}

/// 主机内存（字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostMemory {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
}

#[cfg(feature = "mem-stats")]
pub fn sample_memory() -> Option<MemoryUsage> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(std::process::id());
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).map(|process| MemoryUsage {
        rss: process.memory(),
        virtual_memory: process.virtual_memory(),
    })
}

#[cfg(not(feature = "mem-stats"))]
pub fn sample_memory() -> Option<MemoryUsage> {
    None
}

#[cfg(feature = "mem-stats")]
pub fn sample_host_memory() -> Option<HostMemory> {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    // 部分平台（容器）取不到
    if total == 0 {
        return None;
    }
    Some(HostMemory {
        total,
        used: sys.used_memory(),
        free: sys.free_memory(),
        available: sys.available_memory(),
    })
}

#[cfg(not(feature = "mem-stats"))]
pub fn sample_host_memory() -> Option<HostMemory> {
    None
}

/// 主机名，取不到时为 "unknown"
pub fn host_name() -> String {
    #[cfg(feature = "mem-stats")]
    if let Some(name) = sysinfo::System::host_name() {
        return name;
    }
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// 组装一条健康日志消息
pub fn health_message(
    snapshot: &StatsSnapshot,
    memory: Option<MemoryUsage>,
    host: Option<HostMemory>,
) -> Message {
    let mut msg = Message::new();
    msg.insert("event".into(), Value::from("health"));
    msg.insert(
        "concurrent_connections".into(),
        Value::from(snapshot.concurrent_connections),
    );
    msg.insert(
        "total_connections".into(),
        Value::from(snapshot.total_connections),
    );
    msg.insert("total_downloads".into(), Value::from(snapshot.total_downloads));
    if let Some(mem) = memory {
        msg.insert("rss_bytes".into(), Value::from(mem.rss));
        msg.insert("virtual_bytes".into(), Value::from(mem.virtual_memory));
    }
    if let Some(host) = host {
        msg.insert("mem_total".into(), Value::from(host.total));
        msg.insert("mem_used".into(), Value::from(host.used));
        msg.insert("mem_free".into(), Value::from(host.free));
        msg.insert("mem_available".into(), Value::from(host.available));
    }
    msg
}

/// 每隔 `every` 输出一次，直到 `cancel` 被触发
pub async fn run_health_logger(
    stats: Arc<ServerStats>,
    telemetry: Option<TelemetryClient>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + every, every);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Health logger stopped");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = stats.snapshot();
                let memory = sample_memory();
                let host = sample_host_memory();
                if let Some(h) = host {
                    debug!(
                        "host memory: used {} MB, free {} MB, available {} MB of {} MB",
                        h.used / (1024 * 1024),
                        h.free / (1024 * 1024),
                        h.available / (1024 * 1024),
                        h.total / (1024 * 1024),
                    );
                }
                match memory {
                    Some(mem) => info!(
                        "health: connections {} (total {}), downloads {}, rss {} MB, virtual {} MB",
                        snapshot.concurrent_connections,
                        snapshot.total_connections,
                        snapshot.total_downloads,
                        mem.rss / (1024 * 1024),
                        mem.virtual_memory / (1024 * 1024),
                    ),
                    None => info!(
                        "health: connections {} (total {}), downloads {}",
                        snapshot.concurrent_connections,
                        snapshot.total_connections,
                        snapshot.total_downloads,
                    ),
                }

                if let Some(ref client) = telemetry
                    && let Err(e) = client.send(health_message(&snapshot, memory, host))
                {
                    warn!("Failed to queue health message: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_message_fields() {
        let stats = Arc::new(ServerStats::new());
        let _conn = stats.connection_started();
        stats.record_download();

        let msg = health_message(
            &stats.snapshot(),
            Some(MemoryUsage {
                rss: 10,
                virtual_memory: 20,
            }),
            Some(HostMemory {
                total: 400,
                used: 300,
                free: 40,
                available: 100,
            }),
        );
        assert_eq!(msg["event"], "health");
        assert_eq!(msg["concurrent_connections"], 1);
        assert_eq!(msg["total_downloads"], 1);
        assert_eq!(msg["rss_bytes"], 10);
        assert_eq!(msg["mem_used"], 300);
        assert_eq!(msg["mem_free"], 40);
        assert_eq!(msg["mem_available"], 100);
    }

    #[test]
    fn test_health_message_without_memory() {
        let msg = health_message(&ServerStats::new().snapshot(), None, None);
        assert!(!msg.contains_key("rss_bytes"));
        assert!(!msg.contains_key("mem_used"));
    }

    #[test]
    fn test_host_name_not_empty() {
        assert!(!host_name().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logger_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_health_logger(
            Arc::new(ServerStats::new()),
            None,
            Duration::from_secs(600),
            cancel.clone(),
        ));
        tokio::time::advance(Duration::from_secs(601)).await;
        cancel.cancel();
        task.await.unwrap();
    }

    #[cfg(feature = "mem-stats")]
    #[test]
    fn test_host_memory_consistent() {
        if let Some(host) = sample_host_memory() {
            assert!(host.used <= host.total);
            assert!(host.free <= host.total);
        }
    }
}
