use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::MicrosoftOAuthSettings;
use crate::db::external_auth_repository::ExternalAuthRepository;
use crate::services::oauth::{
    callback::{CallbackChannel, LocalCallbackChannel, WebSocketCallbackChannel},
    coordinator::AuthorizationCoordinator,
    microsoft::service::MicrosoftOAuthService,
    token_service::TokenLifecycleService,
};
use crate::services::office365::source::Office365Source;
use crate::utils::jwt::{JwtKeyProvider, JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: AuthorizationCoordinator,
    pub tokens: TokenLifecycleService,
    /// Set when codes arrive through this service's own redirect route.
    pub local_callbacks: Option<Arc<LocalCallbackChannel>>,
    pub jwt_keys: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn ExternalAuthRepository>,
        oauth: Arc<dyn MicrosoftOAuthService>,
        settings: MicrosoftOAuthSettings,
        jwt_keys: JwtKeys,
    ) -> Self {
        let mut local_callbacks = None;
        let callbacks: Arc<dyn CallbackChannel> =
            if let Some(host) = settings.websocket_host.as_deref() {
                info!(%host, "waiting for authorization codes on websocket relay");
                Arc::new(WebSocketCallbackChannel::new(host))
            } else {
                let local = Arc::new(LocalCallbackChannel::new());
                local_callbacks = Some(local.clone());
                local
            };

        let coordinator = AuthorizationCoordinator::new(
            repo.clone(),
            oauth.clone(),
            callbacks,
            settings.clone(),
        );
        let tokens = TokenLifecycleService::new(repo, oauth, settings, coordinator.pending());

        Self {
            coordinator,
            tokens,
            local_callbacks,
            jwt_keys: Arc::new(jwt_keys),
        }
    }
}

impl JwtKeyProvider for AppState {
    fn jwt_keys(&self) -> &JwtKeys {
        &self.jwt_keys
    }
}

#[derive(Clone, Default)]
pub struct DirectoryState {
    pub sources: Arc<HashMap<String, Office365Source>>,
}

impl DirectoryState {
    pub fn new(sources: Vec<Office365Source>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.name().to_string(), source))
            .collect();
        Self {
            sources: Arc::new(sources),
        }
    }

    pub fn source(&self, name: &str) -> Option<&Office365Source> {
        self.sources.get(name)
    }
}
