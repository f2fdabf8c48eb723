//! HTTP surface: router, inbound bodies and handlers

pub mod health;
pub mod invoices;
pub mod payments;
pub mod requests;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::payments::PaymentFlow;

#[derive(Clone)]
pub struct AppState {
    pub flow: PaymentFlow,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(flow: PaymentFlow, config: Config) -> Self {
        Self {
            flow,
            config: Arc::new(config),
        }
    }
}

/// Full application router with request-id and tracing layers
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/", or_not_found(get(health::index)))
        .route("/payments/initialize", or_not_found(post(payments::initialize)))
        .route("/transactions/initialize", or_not_found(post(payments::initialize)))
        .route("/payments/refund", or_not_found(post(payments::refund)))
        .route("/payments/withdraw", or_not_found(post(payments::withdraw)))
        .route(
            "/payments/pre-authorize",
            or_not_found(post(payments::pre_authorize)),
        )
        .route(
            "/payments/pre-authorize/commit",
            or_not_found(post(payments::pre_authorize_commit)),
        )
        .route(
            "/payments/pre-authorize/cancel",
            or_not_found(post(payments::pre_authorize_cancel)),
        )
        .route(
            "/payments/issue-invoice",
            or_not_found(post(invoices::issue_invoice)),
        )
        .route(
            "/payments/credit-invoice",
            or_not_found(post(invoices::credit_invoice)),
        );

    Router::new()
        .route("/health", or_not_found(get(health::health_check)))
        .nest("/api/v1", v1)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

/// A known path hit with an unsupported method is answered like an unknown path
fn or_not_found(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(not_found)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
