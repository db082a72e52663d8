//! Fixed route table for the control API.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, FromRequest},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, MethodRouter},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::control::endpoints::{EndpointResult, Endpoints};
use crate::control::error::EndpointError;

/// Largest request body a control endpoint will read.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// The five administrative endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Environ,
    Reload,
    Metric,
    MaintenanceEnable,
    MaintenanceDisable,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Environ,
        Endpoint::Reload,
        Endpoint::Metric,
        Endpoint::MaintenanceEnable,
        Endpoint::MaintenanceDisable,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Environ => "/v3/environ",
            Endpoint::Reload => "/v3/reload",
            Endpoint::Metric => "/v3/metric",
            Endpoint::MaintenanceEnable => "/v3/maintenance/enable",
            Endpoint::MaintenanceDisable => "/v3/maintenance/disable",
        }
    }

    async fn dispatch(self, endpoints: &dyn Endpoints, body: axum::body::Bytes) -> EndpointResult {
        match self {
            Endpoint::Environ => endpoints.put_environ(body).await,
            Endpoint::Reload => endpoints.post_reload(body).await,
            Endpoint::Metric => endpoints.post_metric(body).await,
            Endpoint::MaintenanceEnable => endpoints.post_enable_maintenance(body).await,
            Endpoint::MaintenanceDisable => endpoints.post_disable_maintenance(body).await,
        }
    }
}

/// Build the control router over `endpoints`.
pub fn build_router(endpoints: Arc<dyn Endpoints>) -> Router {
    let mut router = Router::new();
    for endpoint in Endpoint::ALL {
        router = router.route(endpoint.path(), post_only(endpoint, endpoints.clone()));
    }
    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Wrap a handler so anything but POST is answered with 405 before the
/// handler (or the body) is touched.
fn post_only(endpoint: Endpoint, endpoints: Arc<dyn Endpoints>) -> MethodRouter {
    any(move |request: Request<Body>| {
        let endpoints = endpoints.clone();
        async move {
            if request.method() != Method::POST {
                tracing::debug!(
                    path = endpoint.path(),
                    method = %request.method(),
                    "control: rejected non-POST request"
                );
                return StatusCode::METHOD_NOT_ALLOWED.into_response();
            }

            let body = match Bytes::from_request(request, &()).await {
                Ok(bytes) => bytes,
                Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    return respond(endpoint, Err(EndpointError::TooLarge(MAX_BODY_BYTES)));
                }
                Err(rejection) => {
                    return respond(endpoint, Err(EndpointError::Body(rejection.body_text())));
                }
            };

            respond(endpoint, endpoint.dispatch(endpoints.as_ref(), body).await)
        }
    })
}

fn respond(endpoint: Endpoint, result: EndpointResult) -> Response {
    match result {
        Ok(status) => status.into_response(),
        Err(e) => {
            tracing::warn!(path = endpoint.path(), error = %e, "control: endpoint failed");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Records which handlers ran.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Endpoint>>,
    }

    impl Recorder {
        fn record(&self, endpoint: Endpoint) -> EndpointResult {
            self.calls.lock().unwrap().push(endpoint);
            Ok(StatusCode::OK)
        }
    }

    #[async_trait]
    impl Endpoints for Recorder {
        async fn put_environ(&self, _body: Bytes) -> EndpointResult {
            self.record(Endpoint::Environ)
        }
        async fn post_reload(&self, _body: Bytes) -> EndpointResult {
            self.record(Endpoint::Reload)
        }
        async fn post_metric(&self, body: Bytes) -> EndpointResult {
            serde_json::from_slice::<serde_json::Value>(&body)?;
            self.record(Endpoint::Metric)
        }
        async fn post_enable_maintenance(&self, _body: Bytes) -> EndpointResult {
            self.record(Endpoint::MaintenanceEnable)
        }
        async fn post_disable_maintenance(&self, _body: Bytes) -> EndpointResult {
            self.record(Endpoint::MaintenanceDisable)
        }
    }

    fn request(method: Method, path: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_post_reaches_each_handler() {
        let recorder = Arc::new(Recorder::default());
        let router = build_router(recorder.clone());

        for endpoint in Endpoint::ALL {
            let res = router
                .clone()
                .oneshot(request(Method::POST, endpoint.path(), "{}"))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{}", endpoint.path());
        }

        assert_eq!(*recorder.calls.lock().unwrap(), Endpoint::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_non_post_rejected_before_handler() {
        let recorder = Arc::new(Recorder::default());
        let router = build_router(recorder.clone());

        for endpoint in Endpoint::ALL {
            for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH, Method::HEAD] {
                let res = router
                    .clone()
                    .oneshot(request(method.clone(), endpoint.path(), "{}"))
                    .await
                    .unwrap();
                assert_eq!(
                    res.status(),
                    StatusCode::METHOD_NOT_ALLOWED,
                    "{} {}",
                    method,
                    endpoint.path()
                );
            }
        }

        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let router = build_router(Arc::new(Recorder::default()));
        let res = router
            .oneshot(request(Method::POST, "/v3/ping", ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let recorder = Arc::new(Recorder::default());
        let router = build_router(recorder.clone());

        let oversized = Request::builder()
            .method(Method::POST)
            .uri(Endpoint::Environ.path())
            .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
            .unwrap();
        let res = router.clone().oneshot(oversized).await.unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(recorder.calls.lock().unwrap().is_empty());

        let at_limit = Request::builder()
            .method(Method::POST)
            .uri(Endpoint::Environ.path())
            .body(Body::from(vec![b' '; MAX_BODY_BYTES]))
            .unwrap();
        let res = router.oneshot(at_limit).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_is_rendered() {
        let router = build_router(Arc::new(Recorder::default()));
        let res = router
            .oneshot(request(Method::POST, Endpoint::Metric.path(), "not json"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
