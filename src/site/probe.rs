use std::path::Path;

/// 文件存在性判断
///
/// 解析器只通过这个 trait 访问文件系统，测试可以替换成内存实现。
pub trait FileProbe: Send + Sync {
    /// `path` 是否是一个普通文件（目录不算）
    fn is_file(&self, path: &Path) -> bool;
}

/// 直接查询磁盘，不做任何缓存
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskProbe;

impl FileProbe for DiskProbe {
    fn is_file(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disk_probe_regular_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.html");
        std::fs::write(&file, "<html></html>").unwrap();

        assert!(DiskProbe.is_file(&file));
        assert!(!DiskProbe.is_file(&dir.path().join("missing.html")));
    }

    #[test]
    fn test_disk_probe_directory_is_not_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();

        assert!(!DiskProbe.is_file(&dir.path().join("docs")));
    }
}
