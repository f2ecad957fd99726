//! Axum wiring for the retrieval service.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;

use crate::repository::{DieselRepository, ListFilter};
use crate::retrieval::{
    PageRequest, ServiceError, get_notice, get_policy, list_notices, list_policies,
    similar_notices,
};

pub struct AppState {
    pub repo: DieselRepository,
    pub similarity_threshold: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticesQuery {
    page: Option<u32>,
    limit: Option<u32>,
    policy_id: Option<i32>,
    category: Option<String>,
    q: Option<String>,
}

#[derive(Deserialize)]
pub struct PoliciesQuery {
    page: Option<u32>,
    limit: Option<u32>,
    category: Option<String>,
    q: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/notices", get(notices_list))
        .route("/notices/{id}", get(notice_detail))
        .route("/policies", get(policies_list))
        .route("/policies/{id}", get(policy_detail))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn notices_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NoticesQuery>,
) -> Response {
    let page = PageRequest::new(params.page, params.limit);

    let result = match params.policy_id {
        Some(policy_id) => {
            similar_notices(&state.repo, policy_id, state.similarity_threshold, page)
        }
        None => {
            let filter = ListFilter {
                category: params.category,
                search: params.q,
            };
            list_notices(&state.repo, &filter, page)
        }
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn notice_detail(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<i32>() else {
        return ServiceError::InvalidParameter(format!("notice id {id:?}")).into_response();
    };
    match get_notice(&state.repo, id) {
        Ok(body) => Json(serde_json::json!({ "data": body })).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn policies_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PoliciesQuery>,
) -> Response {
    let page = PageRequest::new(params.page, params.limit);
    let filter = ListFilter {
        category: params.category,
        search: params.q,
    };

    match list_policies(&state.repo, &filter, page) {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn policy_detail(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<i32>() else {
        return ServiceError::InvalidParameter(format!("policy id {id:?}")).into_response();
    };
    match get_policy(&state.repo, id) {
        Ok(body) => Json(serde_json::json!({ "data": body })).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServiceError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "invalid_parameter"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::VectorNotReady(_) => (StatusCode::BAD_REQUEST, "vector_not_ready"),
            ServiceError::Storage(e) => {
                log::error!("storage failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        // Internal detail stays in the logs.
        let message = match &self {
            ServiceError::Storage(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": { "code": code, "message": message }
            })),
        )
            .into_response()
    }
}
