//! Connection counting middleware
//!
//! Tracks concurrent and total connections in [`ServerStats`].

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

use crate::system::ServerStats;

/// Connection counting middleware factory
#[derive(Clone)]
pub struct ConnectionCounter {
    stats: Arc<ServerStats>,
}

impl ConnectionCounter {
    pub fn new(stats: Arc<ServerStats>) -> Self {
        Self { stats }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ConnectionCounter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ConnectionCounterService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ConnectionCounterService {
            service: Rc::new(service),
            stats: Arc::clone(&self.stats),
        }))
    }
}

pub struct ConnectionCounterService<S> {
    service: Rc<S>,
    stats: Arc<ServerStats>,
}

impl<S, B> Service<ServiceRequest> for ConnectionCounterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let stats = Arc::clone(&self.stats);
        let start = Instant::now();

        Box::pin(async move {
            // Guard ensures the concurrent count drops even on panic
            let _guard = stats.connection_started();
            let method = req.method().clone();
            let path = req.path().to_string();

            let result = srv.call(req).await;

            if let Ok(ref response) = result {
                trace!(
                    "{} {} -> {} in {:?}",
                    method,
                    path,
                    response.status().as_u16(),
                    start.elapsed()
                );
            }
            result
        })
    }
}
