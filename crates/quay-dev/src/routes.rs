//! Plain HTTP routes of the dev server.

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quay_config::Platform;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::state::SharedState;
use crate::symbolicate::Symbolicator;

pub const STATUS_TEXT: &str = "packager-status:running";
pub const INDEX_TEXT: &str = "quay dev server is running";

/// File stem every bundle request must use: `/index.bundle`, `/index.map`.
pub const BUNDLE_NAME: &str = "index";

pub const PROJECT_ROOT_HEADER: HeaderName = HeaderName::from_static("x-react-native-project-root");

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/symbolicate", post(symbolicate).get(symbolicate))
        .route("/reload", post(reload))
        .route("/{file}", get(serve_bundle))
        .layer(map_response(no_store))
        .with_state(state)
}

async fn index() -> &'static str {
    INDEX_TEXT
}

async fn status(State(state): State<SharedState>) -> Response {
    let mut response = STATUS_TEXT.into_response();
    let root = state.project().root.to_string_lossy().into_owned();
    if let Ok(value) = HeaderValue::from_str(&root) {
        response.headers_mut().insert(PROJECT_ROOT_HEADER, value);
    }
    response
}

async fn symbolicate(body: Bytes) -> Response {
    match Symbolicator::parse(&body) {
        Some(stack) => {
            debug!(frames = stack.len(), "symbolicate");
            Json(json!({ "stack": stack })).into_response()
        }
        None => (StatusCode::BAD_REQUEST, "invalid stack frame data").into_response(),
    }
}

async fn reload(State(state): State<SharedState>) -> Response {
    let clients = state.reload();
    debug!(clients, "reload requested");
    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
struct BundleQuery {
    platform: Option<String>,
}

enum BundleResource {
    Bundle,
    Sourcemap,
}

async fn serve_bundle(
    State(state): State<SharedState>,
    Path(file): Path<String>,
    Query(query): Query<BundleQuery>,
) -> Response {
    let (stem, resource) = if let Some(stem) = file.strip_suffix(".bundle") {
        (stem, BundleResource::Bundle)
    } else if let Some(stem) = file.strip_suffix(".map") {
        (stem, BundleResource::Sourcemap)
    } else {
        return (StatusCode::NOT_FOUND, format!("not found: {}", file)).into_response();
    };

    let Some(platform) = query.platform.as_deref().and_then(|p| p.parse::<Platform>().ok()) else {
        return (StatusCode::BAD_REQUEST, "invalid platform").into_response();
    };

    // `index.bundle` and `index.ios.bundle` both name the dev bundle.
    let name = stem.split('.').next().unwrap_or(stem);
    if name != BUNDLE_NAME {
        return (StatusCode::NOT_FOUND, format!("invalid bundle name: {}", stem)).into_response();
    }

    let bundle = match state.bundle(platform).await {
        Ok(bundle) => bundle,
        Err(err) => {
            error!(platform = %platform, "{:#}", err);
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)).into_response();
        }
    };

    match resource {
        BundleResource::Bundle => (
            [(header::CONTENT_TYPE, "application/javascript; charset=UTF-8")],
            Body::from(bundle.bundle.clone()),
        )
            .into_response(),
        BundleResource::Sourcemap => match &bundle.sourcemap {
            Some(sourcemap) => (
                [
                    (header::CONTENT_TYPE, "application/json"),
                    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "devtools://devtools"),
                ],
                Body::from(sourcemap.clone()),
            )
                .into_response(),
            None => (StatusCode::NOT_FOUND, "no sourcemap for this bundle").into_response(),
        },
    }
}

/// Dev responses must never be cached.
async fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static("surrogate-control"), HeaderValue::from_static("no-store"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}
