use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;

use super::{FileProbe, ResolutionDecision, is_safe_relative};

/// 下载路由：本地文件优先，否则重定向到对象存储
///
/// `disable_local` 打开后所有下载都走远端，不检查本地文件。
pub struct DownloadRouter {
    downloads_root: PathBuf,
    remote_base: String,
    disable_local: bool,
    probe: Arc<dyn FileProbe>,
}

impl DownloadRouter {
    pub fn new(
        downloads_root: impl Into<PathBuf>,
        remote_base: impl Into<String>,
        disable_local: bool,
        probe: Arc<dyn FileProbe>,
    ) -> Self {
        Self {
            downloads_root: downloads_root.into(),
            remote_base: remote_base.into(),
            disable_local,
            probe,
        }
    }

    pub fn local_disabled(&self) -> bool {
        self.disable_local
    }

    /// `name` 是 `/dl/` 之后的原始（未解码）部分
    ///
    /// 远端 URL 直接拼接原始名字，不检查远端对象是否存在。
    pub fn route_download(&self, name: &str) -> ResolutionDecision {
        if !self.disable_local
            && let Some(path) = self.local_path(name)
            && self.probe.is_file(&path)
        {
            trace!("Serving download '{}' from {}", name, path.display());
            return ResolutionDecision::ServeFile(path);
        }

        let remote = format!("{}{}", self.remote_base, name);
        trace!("Redirecting download '{}' to {}", name, remote);
        ResolutionDecision::found(remote)
    }

    fn local_path(&self, name: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(name).ok()?;
        if decoded.is_empty() || !is_safe_relative(&decoded) {
            return None;
        }
        Some(self.downloads_root.join(decoded.trim_start_matches('/')))
    }
}
