use std::sync::Arc;

use actix_web::{HttpRequest, Responder, web};

use super::site::respond;
use crate::site::{DownloadRouter, ResolutionDecision};
use crate::system::ServerStats;

pub struct DownloadService;

impl DownloadService {
    /// `/dl/<name>`：本地文件存在则直接返回，否则重定向到远端
    pub async fn handle_download(
        req: HttpRequest,
        router: web::Data<Arc<DownloadRouter>>,
        stats: web::Data<Arc<ServerStats>>,
    ) -> impl Responder {
        // 使用原始（未解码）路径，远端 URL 原样拼接
        let name = req.path().strip_prefix("/dl/").unwrap_or_default();
        let decision = router.route_download(name);
        if matches!(decision, ResolutionDecision::ServeFile(_)) {
            stats.record_download();
        }
        respond(&req, decision).await
    }
}
