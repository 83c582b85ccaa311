pub mod download;
pub mod health;
pub mod site;
pub mod tools;

pub use download::DownloadService;
pub use health::HealthService;
pub use site::{SiteService, not_found_response, respond};
pub use tools::{ToolsService, render_stats_page};

use actix_web::web;

/// 全部路由；按注册顺序匹配，`/*` 必须最后
pub fn site_routes() -> actix_web::Scope {
    web::scope("")
        .route("/ping", web::get().to(HealthService::ping))
        .route("/ping", web::head().to(HealthService::ping))
        .route("/see-stats", web::get().to(ToolsService::see_stats))
        .route("/see-stats", web::head().to(ToolsService::see_stats))
        .route("/go-to/{slug:.*}", web::get().to(ToolsService::handle_go_to))
        .route("/go-to/{slug:.*}", web::head().to(ToolsService::handle_go_to))
        .route("/dl/{name:.*}", web::get().to(DownloadService::handle_download))
        .route("/dl/{name:.*}", web::head().to(DownloadService::handle_download))
        .route("/{path:.*}", web::get().to(SiteService::handle_page))
        .route("/{path:.*}", web::head().to(SiteService::handle_page))
}
