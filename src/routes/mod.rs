pub mod auth;
pub mod callback;
pub mod directory;
pub mod external_auth;
#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::responses::JsonResponse;
use crate::state::{AppState, DirectoryState};

/// Routes served by the external-auth service. Rate limiting is layered on
/// in `main` since it needs the peer address.
pub fn auth_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/users/{user_uuid}/external/microsoft",
            get(external_auth::get_authorization)
                .post(external_auth::create_authorization)
                .delete(external_auth::delete_authorization),
        )
        .route(
            "/oauth2/microsoft/callback",
            get(callback::microsoft_callback),
        );

    Router::new()
        .route("/", get(root))
        .nest("/0.1", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn directory_router(state: DirectoryState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/sources/{name}/lookup", get(directory::lookup))
        .route("/sources/{name}/favorites", get(directory::favorites))
        .route("/sources/{name}/first-match", get(directory::first_match))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Response {
    JsonResponse::success("ok").into_response()
}
