use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::models::external_auth::ExternalAuthProvider;
use crate::responses::JsonResponse;
use crate::routes::auth::claims::Claims;
use crate::routes::auth::session::AuthSession;
use crate::services::oauth::errors::ExternalAuthError;
use crate::state::AppState;

const PROVIDER: ExternalAuthProvider = ExternalAuthProvider::Microsoft;

#[derive(Debug, Default, Deserialize)]
pub struct CreateAuthorizationBody {
    #[serde(default)]
    pub scope: Option<Vec<String>>,
}

fn ensure_acl(claims: &Claims, user_uuid: Uuid, action: &str) -> Result<(), Response> {
    let required = format!("auth.users.{user_uuid}.external.{PROVIDER}.{action}");
    if claims.has_acl(&required) {
        Ok(())
    } else {
        Err(JsonResponse::unauthorized(&format!("Missing ACL {required}")).into_response())
    }
}

pub async fn create_authorization(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(user_uuid): Path<Uuid>,
    body: Bytes,
) -> Response {
    if let Err(resp) = ensure_acl(&claims, user_uuid, "create") {
        return resp;
    }

    let body: CreateAuthorizationBody = if body.iter().all(u8::is_ascii_whitespace) {
        CreateAuthorizationBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(err) => {
                return JsonResponse::bad_request(&format!("Invalid request body: {err}"))
                    .into_response()
            }
        }
    };

    match state
        .coordinator
        .begin_authorization(user_uuid, body.scope)
        .await
    {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(err) => map_external_auth_error(err),
    }
}

pub async fn get_authorization(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(user_uuid): Path<Uuid>,
) -> Response {
    if let Err(resp) = ensure_acl(&claims, user_uuid, "read") {
        return resp;
    }

    match state.tokens.get_access_token(user_uuid).await {
        Ok(grant) => Json(grant).into_response(),
        Err(err) => map_external_auth_error(err),
    }
}

pub async fn delete_authorization(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(user_uuid): Path<Uuid>,
) -> Response {
    if let Err(resp) = ensure_acl(&claims, user_uuid, "delete") {
        return resp;
    }

    match state.tokens.revoke(user_uuid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => map_external_auth_error(err),
    }
}

pub fn map_external_auth_error(err: ExternalAuthError) -> Response {
    match err {
        ExternalAuthError::Validation(msg) => JsonResponse::bad_request(&msg).into_response(),
        ExternalAuthError::NotFound => {
            JsonResponse::not_found("No external auth found for provider").into_response()
        }
        ExternalAuthError::NotAuthorizedYet(provider) => JsonResponse::unauthorized_with_details(
            &err.to_string(),
            "authentication_not_completed",
            json!({ "type": provider.as_str() }),
        )
        .into_response(),
        ExternalAuthError::UpstreamUnavailable(e) => {
            error!("Microsoft token request failed: {e}");
            JsonResponse::service_unavailable("Microsoft is unavailable, try again later")
                .into_response()
        }
        ExternalAuthError::Storage(e) => {
            error!("External auth storage error: {e}");
            JsonResponse::server_error("Failed to access external auth storage").into_response()
        }
        ExternalAuthError::Configuration(e) => {
            error!("External auth configuration error: {e}");
            JsonResponse::server_error("External auth is misconfigured").into_response()
        }
    }
}
