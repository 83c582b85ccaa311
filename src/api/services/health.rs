use actix_web::{HttpResponse, Responder};
use tracing::trace;

pub struct HealthService;

impl HealthService {
    /// `/ping`
    pub async fn ping() -> impl Responder {
        trace!("Received ping");
        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .body("pong")
    }
}
