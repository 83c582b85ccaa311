use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{FileProbe, RedirectTable, ResolutionDecision, normalize_request_path};

/// 主站路径解析器
///
/// 每次调用都重新查询文件系统，结果只取决于路径和当时的磁盘状态。
pub struct PathResolver {
    root: PathBuf,
    table: RedirectTable,
    probe: Arc<dyn FileProbe>,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, table: RedirectTable, probe: Arc<dyn FileProbe>) -> Self {
        Self {
            root: root.into(),
            table,
            probe,
        }
    }

    /// 解析请求路径（原始、未解码的 URI path）
    pub fn resolve(&self, request_path: &str) -> ResolutionDecision {
        let Some(path) = normalize_request_path(request_path) else {
            trace!("Unparseable request path rejected: {}", request_path);
            return ResolutionDecision::NotFound;
        };

        if let Some(destination) = self.table.get(&path) {
            trace!("Redirect table hit: {} => {}", path, destination);
            return ResolutionDecision::found(destination);
        }

        let file_path = self.site_path(&path);
        if self.probe.is_file(&file_path) {
            return ResolutionDecision::ServeFile(file_path);
        }

        // /docs/ 下有些链接没有 .html 后缀
        let html_path = self.site_path(&format!("{}.html", path));
        if self.probe.is_file(&html_path) {
            return ResolutionDecision::ServeFile(html_path);
        }

        if let Some(untranslated) = self.untranslated_redirect(&path) {
            debug!("{} => {}", path, untranslated);
            return ResolutionDecision::found(untranslated);
        }

        ResolutionDecision::NotFound
    }

    /// 旧的翻译页面 `/free-pdf-reader-bg.html` 已删除，
    /// 如果 `/free-pdf-reader.html` 存在就重定向过去
    fn untranslated_redirect(&self, path: &str) -> Option<String> {
        let candidate = strip_locale_suffix(path)?;
        if self.probe.is_file(&self.site_path(&candidate)) {
            Some(candidate)
        } else {
            None
        }
    }

    fn site_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

/// `/name-xx.html` → `/name.html`；不匹配 `-xx` 后缀时返回 None
pub fn strip_locale_suffix(path: &str) -> Option<String> {
    let stem = path.strip_suffix(".html")?;
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n < 4 || bytes[n - 3] != b'-' {
        return None;
    }
    // `-` 是 ASCII，n - 3 一定落在字符边界上
    Some(format!("{}.html", &stem[..n - 3]))
}
