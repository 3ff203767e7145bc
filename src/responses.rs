use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl JsonResponse {
    fn error(status: StatusCode, msg: &str) -> (StatusCode, Json<JsonResponse>) {
        (
            status,
            Json(JsonResponse {
                status: "error".to_string(),
                success: false,
                message: msg.to_string(),
                code: None,
                details: None,
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                status: "success".to_string(),
                success: true,
                message: msg.to_string(),
                code: None,
                details: None,
            }),
        )
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn service_unavailable(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    /// 401 for an authorization that exists but has not completed yet.
    pub fn unauthorized_with_details(msg: &str, code: &str, details: Value) -> impl IntoResponse {
        let (status, Json(mut body)) = Self::error(StatusCode::UNAUTHORIZED, msg);
        body.code = Some(code.to_string());
        body.details = Some(details);
        (status, Json(body))
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use serde_json::{from_slice, json};

    use crate::responses::JsonResponse;

    async fn body_of(resp: axum::response::Response) -> JsonResponse {
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_success_response() {
        let resp = JsonResponse::success("ok").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let json = body_of(resp).await;
        assert_eq!(json.status, "success");
        assert!(json.success);
        assert_eq!(json.message, "ok");
    }

    #[tokio::test]
    async fn test_service_unavailable_response() {
        let resp = JsonResponse::service_unavailable("Microsoft is unavailable").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);

        let json = body_of(resp).await;
        assert_eq!(json.status, "error");
        assert!(!json.success);
        assert!(json.details.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_with_details_response() {
        let resp = JsonResponse::unauthorized_with_details(
            "not authorized",
            "authentication_not_completed",
            json!({"type": "microsoft"}),
        )
        .into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::UNAUTHORIZED);

        let json = body_of(resp).await;
        assert_eq!(json.code.as_deref(), Some("authentication_not_completed"));
        assert_eq!(json.details, Some(json!({"type": "microsoft"})));
    }
}
