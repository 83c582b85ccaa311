//! Shared fixtures: a temporary site tree and the app state built from it.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use sumatra_website::analytics::ClickRecorder;
use sumatra_website::api::AppState;
use sumatra_website::config::StaticConfig;
use sumatra_website::runtime::lifetime::startup::build_app_state;
use sumatra_website::site::DiskProbe;
use sumatra_website::telemetry::TelemetryClient;
use tempfile::TempDir;

pub const REMOTE: &str = "https://kjkpub.s3.amazonaws.com/sumatrapdf/rel/";

pub struct SiteFixture {
    pub dir: TempDir,
    pub config: StaticConfig,
}

impl SiteFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let www = dir.path().join("www");
        let files = www.join("files");
        let docs = www.join("docs");
        std::fs::create_dir_all(&files).unwrap();
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();

        std::fs::write(www.join("free-pdf-reader.html"), "<html>home</html>").unwrap();
        std::fs::write(www.join("download-free-pdf-viewer.html"), "<html>download</html>").unwrap();
        std::fs::write(www.join("pdf-tools.html"), "<html>tools</html>").unwrap();
        std::fs::write(www.join("news.html"), "<html>news</html>").unwrap();
        std::fs::write(www.join("sumatra.css"), "body{}").unwrap();
        std::fs::write(docs.join("Command-line-arguments.html"), "<html>args</html>").unwrap();
        std::fs::write(files.join("SumatraPDF-3.1.2-install.exe"), b"MZ\x90\x00").unwrap();

        let mut config = StaticConfig::default();
        config.site.www_root = www;
        config.site.downloads_dir = files;
        config.site.remote_download_base = REMOTE.to_string();
        config.data.candidate_dirs = vec![dir.path().join("data").to_string_lossy().into_owned()];

        Self { dir, config }
    }

    pub fn stats_path(&self) -> PathBuf {
        self.dir.path().join("data").join("stats.json")
    }

    pub fn state(&self) -> AppState {
        self.state_with(None)
    }

    pub fn state_with(&self, telemetry: Option<TelemetryClient>) -> AppState {
        let recorder = Arc::new(ClickRecorder::open(self.stats_path()));
        build_app_state(&self.config, Arc::new(DiskProbe), recorder, telemetry)
    }
}

/// 用 AppState 初始化测试服务（与服务器相同的中间件和路由）
#[macro_export]
macro_rules! site_app {
    ($state:expr) => {{
        let state: sumatra_website::api::AppState = $state;
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(sumatra_website::api::middleware::ConnectionCounter::new(
                    state.stats.clone(),
                ))
                .configure(move |cfg| state.configure(cfg)),
        )
        .await
    }};
}

pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get("Location")
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}
