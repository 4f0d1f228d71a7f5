//! HTTP API: request decoding, invocation, and error mapping.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use belfry_core::{FileId, InvocationRequest, InvokeError, TenantId};
use belfry_invoker::Invoker;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// The invocation pipeline
    pub invoker: Arc<Invoker>,
}

/// Wire shape of one invocation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeBody {
    tenant_id: String,
    file_id: String,
    function_name: String,
    params: Value,
    #[serde(default)]
    customer: Option<Value>,
    #[serde(default)]
    debug: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(InvokeError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InvokeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = ErrorBody {
            error: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/invoke", post(invoke))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn invoke(
    State(state): State<AppState>,
    Json(body): Json<InvokeBody>,
) -> Result<Response, ApiError> {
    let tenant = TenantId::parse(&body.tenant_id).map_err(|_| {
        ApiError(InvokeError::InvalidInput {
            field: "tenantId".to_string(),
        })
    })?;
    let file = FileId::parse(&body.file_id).map_err(|_| {
        ApiError(InvokeError::InvalidInput {
            field: "fileId".to_string(),
        })
    })?;

    let mut request = InvocationRequest::new(tenant, file, &body.function_name, body.params)
        .with_debug(body.debug);
    if let Some(customer) = body.customer {
        request = request.with_customer(customer);
    }

    let response = state.invoker.invoke(request).await.map_err(ApiError)?;
    Ok(Json(response).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind() {
        assert_eq!(ServerConfig::default().bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_body_decodes_camel_case() {
        let body: InvokeBody = serde_json::from_str(
            r#"{
                "tenantId": "acme",
                "fileId": "checkout",
                "functionName": "add",
                "params": {"a": 1},
                "debug": true
            }"#,
        )
        .unwrap();
        assert_eq!(body.tenant_id, "acme");
        assert_eq!(body.function_name, "add");
        assert!(body.debug);
        assert!(body.customer.is_none());
    }

    #[test]
    fn test_internal_errors_are_500() {
        let response = ApiError(InvokeError::Internal {
            message: "broken".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_guest_failures_are_400() {
        let response = ApiError(InvokeError::RuntimeError {
            message: "boom".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
