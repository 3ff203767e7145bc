use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{errors::DirectoryError, formatter::Contact};

pub const USER_AGENT: &str = "wazo_ua/1.0";

#[derive(Deserialize)]
struct GraphListResponse {
    #[serde(default)]
    value: Vec<Contact>,
}

/// Reads contacts from a Microsoft Graph contacts endpoint.
///
/// Failures are logged and reported as an empty contact list.
#[derive(Clone, Default)]
pub struct Office365Service {
    client: Client,
}

impl Office365Service {
    pub async fn get_contacts_with_term(
        &self,
        microsoft_token: &str,
        term: &str,
        endpoint: &str,
    ) -> Vec<Contact> {
        self.fetch(microsoft_token, endpoint, Some(term))
            .await
            .unwrap_or_else(|err| {
                error!(%endpoint, error = %err, "unable to get contacts from this endpoint");
                Vec::new()
            })
    }

    pub async fn get_contacts(&self, microsoft_token: &str, endpoint: &str) -> Vec<Contact> {
        self.fetch(microsoft_token, endpoint, None)
            .await
            .unwrap_or_else(|err| {
                error!(%endpoint, error = %err, "unable to get contacts from this endpoint");
                Vec::new()
            })
    }

    async fn fetch(
        &self,
        microsoft_token: &str,
        endpoint: &str,
        term: Option<&str>,
    ) -> Result<Vec<Contact>, DirectoryError> {
        let mut request = self
            .client
            .get(endpoint)
            .bearer_auth(microsoft_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("client-request-id", Uuid::new_v4().to_string())
            .header("return-client-request-id", "true");
        if let Some(term) = term {
            request = request.query(&[("search", term)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "contacts endpoint returned an error");
            return Err(DirectoryError::UnexpectedStatus {
                service: "Microsoft Graph",
                status: status.as_u16(),
            });
        }

        let body: GraphListResponse = response
            .json()
            .await
            .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))?;
        debug!(count = body.value.len(), "fetched contacts from Microsoft");
        Ok(body.value)
    }
}
