//! HTTP layer: handlers, routes and middleware

pub mod middleware;
pub mod services;

use std::sync::Arc;

use actix_web::web;

use crate::analytics::ClickRecorder;
use crate::site::{DownloadRouter, PathResolver, ToolLinks};
use crate::system::ServerStats;
use crate::telemetry::TelemetryClient;

/// 注入到每个 worker 的共享状态
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PathResolver>,
    pub downloads: Arc<DownloadRouter>,
    pub tools: Arc<ToolLinks>,
    pub recorder: Arc<ClickRecorder>,
    pub stats: Arc<ServerStats>,
    pub telemetry: Option<TelemetryClient>,
}

impl AppState {
    /// 注册 app_data 和全部路由
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.resolver.clone()))
            .app_data(web::Data::new(self.downloads.clone()))
            .app_data(web::Data::new(self.tools.clone()))
            .app_data(web::Data::new(self.recorder.clone()))
            .app_data(web::Data::new(self.stats.clone()))
            .app_data(web::Data::new(self.telemetry.clone()))
            .service(services::site_routes());
    }
}
