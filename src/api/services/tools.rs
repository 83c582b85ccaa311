use std::fmt::Write;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::{debug, info};

use crate::analytics::{CategoryCount, ClickRecorder};
use crate::site::{ResolutionDecision, ToolLinks};
use crate::telemetry::TelemetryClient;
use crate::utils::escape_html;

use super::site::respond;

pub struct ToolsService;

impl ToolsService {
    /// `/go-to/<slug>`：记录点击后重定向；未知 slug 不记录，跳到工具页
    pub async fn handle_go_to(
        req: HttpRequest,
        tools: web::Data<Arc<ToolLinks>>,
        recorder: web::Data<Arc<ClickRecorder>>,
        telemetry: web::Data<Option<TelemetryClient>>,
    ) -> impl Responder {
        let raw = req.path().strip_prefix("/go-to/").unwrap_or_default();
        let slug = urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string());

        let Some(url) = tools.lookup(&slug) else {
            debug!("Unknown tool slug '{}', falling back to {}", slug, tools.fallback());
            return respond(&req, ResolutionDecision::found(tools.fallback())).await;
        };

        recorder.record_click(&slug);
        if let Some(client) = telemetry.get_ref()
            && let Err(e) = client.log([("event", "tool_click"), ("tool", slug.as_str())])
        {
            debug!("Failed to queue tool click: {}", e);
        }
        info!("Tool click: {} -> {}", slug, url);
        respond(&req, ResolutionDecision::found(url)).await
    }

    /// `/see-stats`：按点击数降序的 HTML 表格
    pub async fn see_stats(recorder: web::Data<Arc<ClickRecorder>>) -> impl Responder {
        let html = render_stats_page(&recorder.sorted_snapshot());
        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body(html)
    }
}

pub fn render_stats_page(stats: &[CategoryCount]) -> String {
    let mut html = String::from(
        "<!doctype html><html><body>\n<div>Stats of what people click</div>\n<table>\n\
         <thead>\n<tr>\n<td>Where</td>\n<td>Count</td>\n</tr>\n</thead>\n<tbody>\n",
    );
    for entry in stats {
        let _ = write!(
            html,
            "<tr>\n<td>{}</td>\n<td>{}</td>\n</tr>\n",
            escape_html(&entry.category),
            entry.count
        );
    }
    html.push_str("</tbody>\n</table>\n</body></html>\n");
    html
}
