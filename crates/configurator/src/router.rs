use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::engine::ConfigurationTreeNode;
use crate::product::ProductId;
use crate::service::{ConfigurationService, ConfigurationServiceError, ProductSource};

/// Request body shared by both endpoints. A missing tree means the product's initial tree.
#[derive(Debug, Default, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub tree: Option<ConfigurationTreeNode>,
}

/// Router exposing evaluation and diagnostic endpoints per product.
pub fn evaluation_router<S>(service: Arc<ConfigurationService<S>>) -> Router
where
    S: ProductSource + 'static,
{
    Router::new()
        .route(
            "/api/v1/products/:product_id/evaluations",
            post(evaluate_handler::<S>),
        )
        .route(
            "/api/v1/products/:product_id/expressions",
            post(expressions_handler::<S>),
        )
        .with_state(service)
}

fn error_response(error: ConfigurationServiceError) -> Response {
    let status = match error {
        ConfigurationServiceError::UnknownProduct(_) => StatusCode::NOT_FOUND,
        ConfigurationServiceError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn evaluate_handler<S>(
    State(service): State<Arc<ConfigurationService<S>>>,
    Path(product_id): Path<String>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    S: ProductSource + 'static,
{
    match service.evaluate(&ProductId(product_id), request.tree).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expressions_handler<S>(
    State(service): State<Arc<ConfigurationService<S>>>,
    Path(product_id): Path<String>,
    axum::Json(request): axum::Json<EvaluationRequest>,
) -> Response
where
    S: ProductSource + 'static,
{
    match service.expressions(&ProductId(product_id), request.tree) {
        Ok(bundle) => (StatusCode::OK, axum::Json(bundle)).into_response(),
        Err(error) => error_response(error),
    }
}
