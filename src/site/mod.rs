//! URL 解析与重定向决策
//!
//! 请求路径依次经过：
//! 精确重定向表 → 静态文件 → 补 `.html` → 旧语言后缀回退 → 404
//!
//! `/dl/` 下载请求走 [`DownloadRouter`]，`/go-to/` 走 [`ToolLinks`]。

pub mod download;
pub mod probe;
pub mod redirect_table;
pub mod resolver;
pub mod tools;

pub use download::DownloadRouter;
pub use probe::{DiskProbe, FileProbe};
pub use redirect_table::RedirectTable;
pub use resolver::PathResolver;
pub use tools::ToolLinks;

use std::path::PathBuf;

use actix_web::http::StatusCode;

/// 单次请求的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionDecision {
    /// 直接返回磁盘上的文件
    ServeFile(PathBuf),
    /// 重定向到站内相对路径或外部绝对 URL
    Redirect { location: String, status: StatusCode },
    NotFound,
}

impl ResolutionDecision {
    /// 302 Found
    pub fn found(location: impl Into<String>) -> Self {
        ResolutionDecision::Redirect {
            location: location.into(),
            status: StatusCode::FOUND,
        }
    }
}

/// 解码并校验请求路径
///
/// 返回解码后的路径；以下情况视为无法解析：
/// - 不以 `/` 开头
/// - 百分号编码解出非法 UTF-8
/// - 包含 NUL、反斜杠或 `..` 段
pub fn normalize_request_path(raw: &str) -> Option<String> {
    if !raw.starts_with('/') {
        return None;
    }
    let decoded = urlencoding::decode(raw).ok()?;
    if !is_safe_relative(&decoded) {
        return None;
    }
    Some(decoded.into_owned())
}

/// 路径能否安全地拼接到根目录下
pub(crate) fn is_safe_relative(path: &str) -> bool {
    if path.contains('\0') || path.contains('\\') {
        return false;
    }
    !path.split('/').any(|segment| segment == "..")
}
