use std::path::PathBuf;

/// 展开开头的 `~`（使用 HOME 环境变量）
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~')
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(format!("{}{}", home, rest));
    }
    PathBuf::from(path)
}

/// 返回第一个存在的候选目录
pub fn find_data_dir<S: AsRef<str>>(candidates: &[S]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| expand_tilde(c.as_ref()))
        .find(|dir| dir.is_dir())
}
