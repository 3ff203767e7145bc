use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    auth_client::{AuthClientConfig, ExternalAuthClient},
    errors::DirectoryError,
    formatter::{format_columns, Contact},
    graph::Office365Service,
};
use crate::models::contact::{SourceResult, OFFICE365_BACKEND};

fn default_sort_column() -> String {
    "givenName".to_string()
}

fn default_unique_column() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Office365SourceConfig {
    pub name: String,
    pub auth: AuthClientConfig,
    pub endpoint: String,
    #[serde(default)]
    pub format_columns: BTreeMap<String, String>,
    #[serde(default)]
    pub searched_columns: Vec<String>,
    #[serde(default)]
    pub first_matched_columns: Vec<String>,
    #[serde(default = "default_sort_column")]
    pub sort_column: String,
    #[serde(default = "default_unique_column")]
    pub unique_column: String,
}

/// Reads a JSON array of source definitions.
pub fn load_source_configs(path: &Path) -> Result<Vec<Office365SourceConfig>, DirectoryError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| DirectoryError::Config(format!("{}: {err}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|err| DirectoryError::Config(format!("{}: {err}", path.display())))
}

/// Caller identity forwarded with every lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupArgs {
    pub user_uuid: Option<String>,
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct Office365Source {
    config: Office365SourceConfig,
    auth: ExternalAuthClient,
    office365: Office365Service,
}

impl Office365Source {
    pub fn load(config: Office365SourceConfig) -> Result<Self, DirectoryError> {
        if config.searched_columns.is_empty() {
            info!(
                source = %config.name,
                "no \"searched_columns\" configured, no results will be matched"
            );
        }
        Ok(Self {
            auth: ExternalAuthClient::new(&config.auth)?,
            office365: Office365Service::default(),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub async fn search(&self, term: &str, args: &LookupArgs) -> Vec<SourceResult> {
        debug!(source = %self.config.name, %term, "searching");
        let Some(token) = self.microsoft_token(args).await else {
            return Vec::new();
        };

        let contacts = self
            .office365
            .get_contacts_with_term(&token, term, &self.config.endpoint)
            .await;

        let lowered_term = term.to_lowercase();
        let mut matched: Vec<Contact> = update_contact_fields(contacts)
            .into_iter()
            .filter(|contact| {
                self.config.searched_columns.iter().any(|column| {
                    column_text(contact, column)
                        .to_lowercase()
                        .contains(&lowered_term)
                })
            })
            .collect();
        matched.sort_by_cached_key(|contact| column_text(contact, &self.config.sort_column));

        matched
            .into_iter()
            .map(|contact| self.to_result(contact))
            .collect()
    }

    /// Favorites: every contact whose unique column is one of `unique_ids`.
    pub async fn list(&self, unique_ids: &[String], args: &LookupArgs) -> Vec<SourceResult> {
        let Some(token) = self.microsoft_token(args).await else {
            return Vec::new();
        };

        let contacts = self
            .office365
            .get_contacts(&token, &self.config.endpoint)
            .await;

        update_contact_fields(contacts)
            .into_iter()
            .filter(|contact| {
                let id = column_text(contact, &self.config.unique_column);
                unique_ids.iter().any(|wanted| *wanted == id)
            })
            .map(|contact| self.to_result(contact))
            .collect()
    }

    pub async fn first_match(&self, term: &str, args: &LookupArgs) -> Option<SourceResult> {
        if self.config.first_matched_columns.is_empty() {
            return None;
        }
        let token = self.microsoft_token(args).await?;

        let contacts = self
            .office365
            .get_contacts(&token, &self.config.endpoint)
            .await;

        let lowered_term = term.to_lowercase();
        update_contact_fields(contacts)
            .into_iter()
            .find(|contact| {
                self.config
                    .first_matched_columns
                    .iter()
                    .any(|column| column_text(contact, column).to_lowercase() == lowered_term)
            })
            .map(|contact| self.to_result(contact))
    }

    async fn microsoft_token(&self, args: &LookupArgs) -> Option<String> {
        let result = match (args.token.as_deref(), args.user_uuid.as_deref()) {
            (None, _) | (Some(""), _) => Err(DirectoryError::MissingSessionToken),
            (_, None) | (_, Some("")) => Err(DirectoryError::MissingUserUuid),
            (Some(token), Some(user_uuid)) => match Uuid::parse_str(user_uuid) {
                Ok(user_uuid) => self.auth.get_microsoft_access_token(user_uuid, token).await,
                Err(_) => Err(DirectoryError::InvalidUserUuid(user_uuid.to_string())),
            },
        };
        result
            .map_err(|err| {
                debug!(source = %self.config.name, error = %err, "unable to search Office365");
            })
            .ok()
    }

    fn to_result(&self, mut contact: Contact) -> SourceResult {
        let id = match contact.get(&self.config.unique_column) {
            None | Some(Value::Null) => None,
            Some(_) => Some(column_text(&contact, &self.config.unique_column)),
        };
        let formatted = format_columns(&contact, &self.config.format_columns);
        contact.extend(formatted);

        SourceResult {
            backend: OFFICE365_BACKEND.to_string(),
            source: self.config.name.clone(),
            id,
            fields: contact,
        }
    }
}

fn update_contact_fields(contacts: Vec<Contact>) -> Vec<Contact> {
    contacts
        .into_iter()
        .map(|mut contact| {
            contact
                .entry("givenName")
                .or_insert_with(|| Value::String(String::new()));
            let email = first_email(&contact);
            contact.insert("email".to_string(), email);
            contact
        })
        .collect()
}

fn first_email(contact: &Contact) -> Value {
    contact
        .get("emailAddresses")
        .and_then(Value::as_array)
        .and_then(|addresses| addresses.first())
        .and_then(|first| first.get("address"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn column_text(contact: &Contact, column: &str) -> String {
    match contact.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const SESSION: &str = "session-token";
    const USER: &str = "6c2f3c2a-1111-2222-3333-444455556666";

    fn contacts() -> Value {
        json!({"value": [
            {
                "id": "an-id",
                "givenName": "Wario",
                "surname": "Bros",
                "businessPhones": ["5555555555"],
                "emailAddresses": [
                    {"name": "wbros@wazoquebec.onmicrosoft.com", "address": "wbros@wazoquebec.onmicrosoft.com"}
                ]
            },
            {
                "id": "other-id",
                "givenName": "Mario",
                "surname": "Bros",
                "businessPhones": [],
                "emailAddresses": []
            },
            {
                "id": "third-id",
                "surname": "Koopa",
                "businessPhones": ["5551234567"]
            }
        ]})
    }

    fn config(server: &MockServer) -> Office365SourceConfig {
        serde_json::from_value(json!({
            "name": "office365",
            "auth": {"host": server.host(), "port": server.port(), "https": false},
            "endpoint": server.url("/me/contacts"),
            "format_columns": {
                "name": "{givenName} {surname}",
                "phone": "{businessPhones[0]}"
            },
            "searched_columns": ["givenName", "surname", "businessPhones"],
            "first_matched_columns": ["givenName", "surname"]
        }))
        .unwrap()
    }

    fn args() -> LookupArgs {
        LookupArgs {
            user_uuid: Some(USER.into()),
            token: Some(SESSION.into()),
        }
    }

    fn mock_auth(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/0.1/users/{USER}/external/microsoft"))
                .header("X-Auth-Token", SESSION);
            then.status(200).json_body(json!({
                "access_token": "ms-token",
                "expiration": 1_700_000_000,
                "scope": ["Contacts.Read"]
            }));
        })
    }

    #[test]
    fn config_defaults_apply() {
        let config: Office365SourceConfig = serde_json::from_value(json!({
            "name": "o365",
            "auth": {"host": "localhost"},
            "endpoint": "https://graph.microsoft.com/v1.0/me/contacts"
        }))
        .unwrap();

        assert_eq!(config.sort_column, "givenName");
        assert_eq!(config.unique_column, "id");
        assert!(config.searched_columns.is_empty());
        assert_eq!(config.auth.prefix, "/0.1");
    }

    #[tokio::test]
    async fn search_returns_matching_contacts_sorted() {
        let server = MockServer::start();
        let auth = mock_auth(&server);
        let graph = server.mock(|when, then| {
            when.method(GET)
                .path("/me/contacts")
                .query_param("search", "BROS")
                .header("authorization", "Bearer ms-token");
            then.status(200).json_body(contacts());
        });

        let source = Office365Source::load(config(&server)).unwrap();
        let results = source.search("BROS", &args()).await;

        auth.assert();
        graph.assert();
        let names: Vec<_> = results.iter().map(|r| r.field_str("givenName")).collect();
        assert_eq!(names, vec![Some("Mario"), Some("Wario")]);

        let wario = &results[1];
        assert_eq!(wario.backend, "office365");
        assert_eq!(wario.source, "office365");
        assert_eq!(wario.id.as_deref(), Some("an-id"));
        assert_eq!(wario.field_str("email"), Some("wbros@wazoquebec.onmicrosoft.com"));
        assert_eq!(wario.field_str("name"), Some("Wario Bros"));
        assert_eq!(wario.field_str("phone"), Some("5555555555"));

        let mario = &results[0];
        assert_eq!(mario.fields["email"], Value::Null);
        assert_eq!(mario.fields["phone"], Value::Null);
    }

    #[tokio::test]
    async fn search_matches_array_columns_and_defaults_given_name() {
        let server = MockServer::start();
        mock_auth(&server);
        server.mock(|when, then| {
            when.method(GET).path("/me/contacts");
            then.status(200).json_body(contacts());
        });

        let source = Office365Source::load(config(&server)).unwrap();
        let results = source.search("1234", &args()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_deref(), Some("third-id"));
        assert_eq!(results[0].field_str("givenName"), Some(""));
    }

    #[tokio::test]
    async fn search_without_searched_columns_matches_nothing() {
        let server = MockServer::start();
        mock_auth(&server);
        server.mock(|when, then| {
            when.method(GET).path("/me/contacts");
            then.status(200).json_body(contacts());
        });

        let mut config = config(&server);
        config.searched_columns.clear();
        let source = Office365Source::load(config).unwrap();

        assert!(source.search("wario", &args()).await.is_empty());
    }

    #[tokio::test]
    async fn search_without_authorization_is_empty() {
        let server = MockServer::start();
        let auth = server.mock(|when, then| {
            when.method(GET).path(format!("/0.1/users/{USER}/external/microsoft"));
            then.status(401).json_body(json!({
                "reason": ["This external authentification method has been set but not authorized: \"microsoft\""]
            }));
        });
        let graph = server.mock(|when, then| {
            when.method(GET).path("/me/contacts");
            then.status(200).json_body(contacts());
        });

        let source = Office365Source::load(config(&server)).unwrap();
        let results = source.search("wario", &args()).await;

        assert!(results.is_empty());
        auth.assert();
        graph.assert_hits(0);
    }

    #[tokio::test]
    async fn search_without_session_token_is_empty() {
        let server = MockServer::start();
        let auth = mock_auth(&server);

        let source = Office365Source::load(config(&server)).unwrap();
        let missing_token = LookupArgs {
            user_uuid: Some(USER.into()),
            token: None,
        };
        let missing_user = LookupArgs {
            user_uuid: None,
            token: Some(SESSION.into()),
        };

        assert!(source.search("wario", &missing_token).await.is_empty());
        assert!(source.search("wario", &missing_user).await.is_empty());
        auth.assert_hits(0);
    }

    #[tokio::test]
    async fn search_with_malformed_user_uuid_never_calls_auth_service() {
        let server = MockServer::start();
        let any_auth = server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(json!({"access_token": "ms-token"}));
        });

        let source = Office365Source::load(config(&server)).unwrap();
        for user_uuid in ["../..", "x?y", "not-a-uuid"] {
            let args = LookupArgs {
                user_uuid: Some(user_uuid.into()),
                token: Some(SESSION.into()),
            };
            assert!(source.search("wario", &args).await.is_empty());
        }

        any_auth.assert_hits(0);
    }

    #[tokio::test]
    async fn search_against_malformed_endpoint_is_empty() {
        let server = MockServer::start();
        mock_auth(&server);
        server.mock(|when, then| {
            when.method(GET).path("/me/contacts");
            then.status(200).body("definitely not json");
        });

        let source = Office365Source::load(config(&server)).unwrap();
        assert!(source.search("wario", &args()).await.is_empty());

        let mut unreachable = config(&server);
        unreachable.endpoint = "http://127.0.0.1:9/me/contacts".into();
        let source = Office365Source::load(unreachable).unwrap();
        assert!(source.search("wario", &args()).await.is_empty());
    }

    #[tokio::test]
    async fn list_returns_favorites_by_unique_column() {
        let server = MockServer::start();
        mock_auth(&server);
        let graph = server.mock(|when, then| {
            when.method(GET).path("/me/contacts");
            then.status(200).json_body(contacts());
        });

        let source = Office365Source::load(config(&server)).unwrap();
        let results = source
            .list(&["an-id".to_string(), "missing".to_string()], &args())
            .await;

        graph.assert();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_deref(), Some("an-id"));
    }

    #[tokio::test]
    async fn first_match_compares_case_insensitively() {
        let server = MockServer::start();
        mock_auth(&server);
        server.mock(|when, then| {
            when.method(GET).path("/me/contacts");
            then.status(200).json_body(contacts());
        });

        let source = Office365Source::load(config(&server)).unwrap();
        let result = source.first_match("koopa", &args()).await.unwrap();
        assert_eq!(result.id.as_deref(), Some("third-id"));

        assert!(source.first_match("nobody", &args()).await.is_none());
    }

    #[tokio::test]
    async fn first_match_without_columns_skips_network() {
        let server = MockServer::start();
        let auth = mock_auth(&server);

        let mut config = config(&server);
        config.first_matched_columns.clear();
        let source = Office365Source::load(config).unwrap();

        assert!(source.first_match("wario", &args()).await.is_none());
        auth.assert_hits(0);
    }

    #[test]
    fn loads_source_configs_from_file() {
        let path = std::env::temp_dir()
            .join(format!("office365-sources-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"name": "o365", "auth": {"host": "localhost"}, "endpoint": "https://graph.microsoft.com/v1.0/me/contacts"}]"#,
        )
        .unwrap();

        let configs = load_source_configs(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "o365");
        assert!(matches!(
            load_source_configs(&path),
            Err(DirectoryError::Config(_))
        ));
    }
}
