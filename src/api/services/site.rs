use std::sync::Arc;

use actix_files::NamedFile;
use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_TYPE, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::{debug, trace, warn};

use crate::site::{PathResolver, ResolutionDecision};
use crate::utils::content_type_for;

pub struct SiteService;

impl SiteService {
    /// `/*`：重定向表 → 静态文件 → `.html` → 旧语言后缀 → 404
    pub async fn handle_page(
        req: HttpRequest,
        resolver: web::Data<Arc<PathResolver>>,
    ) -> impl Responder {
        let decision = resolver.resolve(req.path());
        trace!("{} -> {:?}", req.path(), decision);
        respond(&req, decision).await
    }
}

/// 把解析结果转换成 HTTP 响应
///
/// 文件以流的方式发送，支持 Range、ETag 和 If-Modified-Since。
pub async fn respond(req: &HttpRequest, decision: ResolutionDecision) -> HttpResponse {
    match decision {
        ResolutionDecision::ServeFile(path) => match NamedFile::open_async(&path).await {
            Ok(file) => {
                let mut resp = file.disable_content_disposition().into_response(req);
                resp.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(content_type_for(&path)),
                );
                resp
            }
            Err(e) => {
                // 检查之后文件被删除或不可读
                warn!("Failed to open {}: {}", path.display(), e);
                not_found_response()
            }
        },
        ResolutionDecision::Redirect { location, status } => {
            debug!("Redirecting to {} ({})", location, status.as_u16());
            HttpResponse::build(status)
                .insert_header(("Location", location))
                .finish()
        }
        ResolutionDecision::NotFound => not_found_response(),
    }
}

#[inline]
pub fn not_found_response() -> HttpResponse {
    HttpResponse::build(StatusCode::NOT_FOUND)
        .insert_header(("Content-Type", "text/plain; charset=utf-8"))
        .body("404 page not found\n")
}
