//! 路径解析性能基准测试

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use sumatra_website::config::default_redirects;
use sumatra_website::site::{
    FileProbe, PathResolver, RedirectTable, ResolutionDecision, normalize_request_path,
};

/// 内存文件集合，排除磁盘 I/O 的影响
struct MemProbe(HashSet<PathBuf>);

impl FileProbe for MemProbe {
    fn is_file(&self, path: &Path) -> bool {
        self.0.contains(path)
    }
}

fn resolver() -> PathResolver {
    let files = [
        "www/free-pdf-reader.html",
        "www/download-free-pdf-viewer.html",
        "www/news.html",
        "www/docs/Command-line-arguments.html",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();
    PathResolver::new(
        "www",
        RedirectTable::from_entries(default_redirects()),
        Arc::new(MemProbe(files)),
    )
}

// ============== resolve 基准测试 ==============

fn bench_resolve(c: &mut Criterion) {
    let resolver = resolver();
    let mut group = c.benchmark_group("site/resolve");

    group.bench_function("redirect_table_hit", |b| {
        b.iter(|| {
            assert!(matches!(
                resolver.resolve("/"),
                ResolutionDecision::Redirect { .. }
            ));
        });
    });

    group.bench_function("static_file", |b| {
        b.iter(|| {
            assert!(matches!(
                resolver.resolve("/free-pdf-reader.html"),
                ResolutionDecision::ServeFile(_)
            ));
        });
    });

    group.bench_function("html_suffix", |b| {
        b.iter(|| {
            assert!(matches!(
                resolver.resolve("/docs/Command-line-arguments"),
                ResolutionDecision::ServeFile(_)
            ));
        });
    });

    group.bench_function("locale_fallback", |b| {
        b.iter(|| {
            assert!(matches!(
                resolver.resolve("/news-de.html"),
                ResolutionDecision::Redirect { .. }
            ));
        });
    });

    group.bench_function("not_found", |b| {
        b.iter(|| {
            assert_eq!(
                resolver.resolve("/no/such/page.html"),
                ResolutionDecision::NotFound
            );
        });
    });

    group.finish();
}

// ============== normalize_request_path 基准测试 ==============

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("site/normalize_request_path");

    group.bench_function("plain", |b| {
        b.iter(|| {
            assert!(normalize_request_path("/free-pdf-reader.html").is_some());
        });
    });

    group.bench_function("percent_encoded", |b| {
        b.iter(|| {
            assert!(normalize_request_path("/release%20notes%2Fv3.html").is_some());
        });
    });

    group.bench_function("traversal", |b| {
        b.iter(|| {
            assert!(normalize_request_path("/%2e%2e/etc/passwd").is_none());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_normalize);
criterion_main!(benches);
