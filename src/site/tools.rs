use crate::config::ToolEntry;

/// `/go-to/<slug>` 的目标表
#[derive(Debug, Clone)]
pub struct ToolLinks {
    entries: Vec<ToolEntry>,
    fallback: String,
}

impl ToolLinks {
    pub fn new(entries: Vec<ToolEntry>, fallback: impl Into<String>) -> Self {
        Self {
            entries,
            fallback: fallback.into(),
        }
    }

    /// slug 精确匹配；返回第一个匹配项的目标 URL
    ///
    /// 比旧站点的后缀匹配更严格：`/go-to/smallpdf.com/merge-pdf` 这类
    /// 带前缀的 slug 不再命中，会跳到 fallback 页面。
    pub fn lookup(&self, slug: &str) -> Option<&str> {
        if slug.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.slug == slug)
            .map(|entry| entry.url.as_str())
    }

    /// 未知 slug 时跳转的站内页面
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}
