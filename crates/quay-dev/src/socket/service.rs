use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::Service;
use tower::ServiceExt;

use super::SocketRouter;
use crate::error::RouteMiss;

/// Per-connection hyper service: upgrades go to the [`SocketRouter`],
/// everything else to the HTTP routes.
#[derive(Clone)]
pub struct DevService {
    sockets: Arc<SocketRouter>,
    http: Router,
}

impl DevService {
    pub fn new(sockets: Arc<SocketRouter>, http: Router) -> Self {
        Self { sockets, http }
    }

    pub fn sockets(&self) -> &Arc<SocketRouter> {
        &self.sockets
    }
}

impl Service<Request<Incoming>> for DevService {
    type Response = Response;
    type Error = RouteMiss;
    type Future = Pin<Box<dyn Future<Output = Result<Response, RouteMiss>> + Send>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let request = request.map(Body::new);

        if is_upgrade_request(&request) {
            let sockets = Arc::clone(&self.sockets);
            Box::pin(async move { sockets.handle_upgrade(request).await })
        } else {
            let http = self.http.clone();
            Box::pin(async move { http.oneshot(request).await.map_err(|never| match never {}) })
        }
    }
}

/// `Connection: upgrade` plus an `Upgrade` header.
pub fn is_upgrade_request<B>(request: &Request<B>) -> bool {
    let headers = request.headers();

    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    connection_upgrade && headers.contains_key(header::UPGRADE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/message");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn detects_websocket_upgrades() {
        assert!(is_upgrade_request(&request(&[
            ("connection", "Upgrade"),
            ("upgrade", "websocket"),
        ])));
        assert!(is_upgrade_request(&request(&[
            ("connection", "keep-alive, Upgrade"),
            ("upgrade", "websocket"),
        ])));
    }

    #[test]
    fn plain_requests_are_not_upgrades() {
        assert!(!is_upgrade_request(&request(&[])));
        assert!(!is_upgrade_request(&request(&[("connection", "keep-alive")])));
        assert!(!is_upgrade_request(&request(&[("connection", "upgrade")])));
        assert!(!is_upgrade_request(&request(&[("upgrade", "websocket")])));
    }
}
