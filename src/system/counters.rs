use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

/// 连接与下载计数
#[derive(Debug, Default)]
pub struct ServerStats {
    concurrent_connections: AtomicI64,
    total_connections: AtomicU64,
    total_downloads: AtomicU64,
}

/// 某一时刻的计数快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub concurrent_connections: i64,
    pub total_connections: u64,
    pub total_downloads: u64,
}

/// Drop 时减少并发连接数，保证 panic 时也能正确计数
pub struct ConnectionGuard {
    stats: Arc<ServerStats>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.stats
            .concurrent_connections
            .fetch_sub(1, Ordering::Relaxed);
    }
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求开始；返回的 guard 在请求结束时释放
    pub fn connection_started(self: &Arc<Self>) -> ConnectionGuard {
        self.concurrent_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            stats: Arc::clone(self),
        }
    }

    /// 本地文件下载成功
    pub fn record_download(&self) {
        self.total_downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            concurrent_connections: self.concurrent_connections.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_downloads: self.total_downloads.load(Ordering::Relaxed),
        }
    }
}
