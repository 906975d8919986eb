//! Response envelopes, error mapping and the actor extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::{ErrorKind, LifecycleError};
use crate::models::Actor;
use crate::repository::{DbError, StoreError};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Successful payload wrapper.
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Wrap `value` as `{"data": value}`.
pub fn data<T: Serialize>(value: T) -> Json<DataEnvelope<T>> {
    Json(DataEnvelope { data: value })
}

/// Error response with a stable `kind` code.
#[derive(Debug)]
pub struct ApiError(pub LifecycleError);

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        ApiError(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e.into())
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError(e.into())
    }
}

impl ApiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ApiError(LifecycleError::InvalidInput(msg.into()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict | ErrorKind::InvalidStateTransition => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::MissingConfiguration => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::RenderFailed | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(kind = %kind, "Request failed: {}", self.0);
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.0.public_message(),
                "kind": kind,
            })),
        )
            .into_response()
    }
}

/// Acting user taken from the `X-Actor-*` headers.
#[derive(Debug, Clone)]
pub struct ActorHeaders(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for ActorHeaders
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(ActorHeaders)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build an [`Actor`]; the name falls back to the id.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = header(headers, ACTOR_ID_HEADER)
        .ok_or_else(|| ApiError::invalid_input("X-Actor-Id header is required"))?;
    let name = header(headers, ACTOR_NAME_HEADER).unwrap_or(id);
    let actor = Actor::new(id, name);
    Ok(match header(headers, ACTOR_ROLE_HEADER) {
        Some(role) => actor.with_role(role),
        None => actor,
    })
}
