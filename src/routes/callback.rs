use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use crate::responses::JsonResponse;
use crate::services::oauth::callback::CallbackMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Browser redirect target used when no websocket relay is configured.
pub async fn microsoft_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(local) = state.local_callbacks.as_ref() else {
        return JsonResponse::not_found("Authorization codes are relayed elsewhere")
            .into_response();
    };

    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_else(|| error.clone());
        warn!(%error, %description, "Microsoft returned an authorization error");
        return JsonResponse::bad_request(&description).into_response();
    }

    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return JsonResponse::bad_request("Missing code or state").into_response();
    };

    match local.deliver(&oauth_state, CallbackMessage { code }) {
        Ok(()) => {
            JsonResponse::success("Authorization received, you may close this window")
                .into_response()
        }
        Err(err) => {
            warn!(error = %err, "dropping authorization callback");
            JsonResponse::not_found("Unknown or expired authorization state").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::routes::auth_router;
    use crate::routes::test_support::test_app_state;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn unknown_state_is_not_found() {
        let (state, _) = test_app_state();
        let resp = auth_router(state)
            .oneshot(get("/0.1/oauth2/microsoft/callback?code=abc&state=nope"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn provider_error_is_bad_request() {
        let (state, _) = test_app_state();
        let resp = auth_router(state)
            .oneshot(get(
                "/0.1/oauth2/microsoft/callback?error=access_denied&state=abc",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_code_is_bad_request() {
        let (state, _) = test_app_state();
        let resp = auth_router(state)
            .oneshot(get("/0.1/oauth2/microsoft/callback?state=abc"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
