use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::response::Response;
use serde_json::Value;
use uuid::Uuid;

use crate::config::MicrosoftOAuthSettings;
use crate::db::in_memory_external_auth_repository::InMemoryExternalAuthRepository;
use crate::routes::auth::claims::Claims;
use crate::services::oauth::coordinator::AuthorizationCoordinator;
use crate::services::oauth::microsoft::mock_microsoft_oauth::MockMicrosoftOAuth;
use crate::state::AppState;
use crate::utils::jwt::{create_jwt, JwtKeys};

pub const TEST_JWT_SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn test_app_state() -> (AppState, Arc<MockMicrosoftOAuth>) {
    test_app_state_with(MockMicrosoftOAuth::default())
}

pub fn test_app_state_with(oauth: MockMicrosoftOAuth) -> (AppState, Arc<MockMicrosoftOAuth>) {
    let oauth = Arc::new(oauth);
    let state = AppState::new(
        Arc::new(InMemoryExternalAuthRepository::new()),
        oauth.clone(),
        MicrosoftOAuthSettings::for_tests(),
        JwtKeys::from_secret(TEST_JWT_SECRET).unwrap(),
    );
    (state, oauth)
}

pub fn session_token(state: &AppState, user: Uuid, acl: &[&str]) -> String {
    let claims = Claims {
        sub: user.to_string(),
        acl: acl.iter().map(|rule| rule.to_string()).collect(),
        exp: (SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600) as usize,
    };
    create_jwt(&claims, &state.jwt_keys).unwrap()
}

pub async fn body_json(resp: Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn wait_for_no_pending(coordinator: &AuthorizationCoordinator) {
    let pending = coordinator.pending();
    for _ in 0..200 {
        if pending.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pending authorizations were not drained");
}
