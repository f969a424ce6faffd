use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GatewayError;

/// Base URL of the supervisor-proxied platform API, as seen from inside
/// an add-on container.
pub const DEFAULT_API_BASE: &str = "http://supervisor/core/api";

/// State of a single platform entity as the REST API reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Client for the platform REST API. Every request carries the
/// supervisor bearer token and a JSON body/accept.
pub struct SupervisorClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl SupervisorClient {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
            token: token.into(),
        }
    }

    /// Build from the environment the add-on runtime provides:
    /// `SUPERVISOR_TOKEN` for auth, `SUPERVISOR_API` to override the
    /// base URL when developing against a remote host.
    pub fn from_env() -> Self {
        let base =
            std::env::var("SUPERVISOR_API").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let token = std::env::var("SUPERVISOR_TOKEN").unwrap_or_default();
        Self::new(base, token)
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::check(response).await
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// All entity states known to the platform.
    pub async fn states(&self) -> Result<Vec<EntityState>, GatewayError> {
        Ok(self.get("states").await?.json().await?)
    }

    /// A single entity's state, `None` when the entity does not exist.
    pub async fn state(&self, entity_id: &str) -> Result<Option<EntityState>, GatewayError> {
        match self.get(&format!("states/{}", entity_id)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(GatewayError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace an entity's state and attributes.
    pub async fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: serde_json::Value,
    ) -> Result<(), GatewayError> {
        let body = json!({ "state": state, "attributes": attributes });
        self.post(&format!("states/{}", entity_id), &body).await?;
        Ok(())
    }

    /// Invoke a platform service.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        body: serde_json::Value,
    ) -> Result<(), GatewayError> {
        self.post(&format!("services/{}/{}", domain, service), &body)
            .await?;
        Ok(())
    }

    /// Create a persistent notification, deduplicated by
    /// `notification_id` when one is given.
    pub async fn notify(
        &self,
        title: &str,
        message: &str,
        notification_id: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut body = json!({ "title": title, "message": message });
        if let Some(id) = notification_id {
            body["notification_id"] = json!(id);
        }
        self.call_service("persistent_notification", "create", body)
            .await
    }

    pub async fn set_input_text(&self, entity_id: &str, value: &str) -> Result<(), GatewayError> {
        self.call_service(
            "input_text",
            "set_value",
            json!({ "entity_id": entity_id, "value": value }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = SupervisorClient::new("http://supervisor/core/api/", "t");
        assert_eq!(
            client.url("/states/sensor.ble_gateway_raw_data"),
            "http://supervisor/core/api/states/sensor.ble_gateway_raw_data"
        );
        assert_eq!(client.url("states"), "http://supervisor/core/api/states");
    }

    #[test]
    fn test_entity_state_deserializes_partial_payloads() {
        let state: EntityState =
            serde_json::from_str(r#"{"entity_id": "bluetooth.kitchen"}"#).unwrap();
        assert_eq!(state.entity_id, "bluetooth.kitchen");
        assert!(state.state.is_empty());
        assert!(state.attributes.is_empty());

        let state: EntityState = serde_json::from_str(
            r#"{"entity_id": "bluetooth.kitchen", "state": "on", "attributes": {"rssi": -67}}"#,
        )
        .unwrap();
        assert_eq!(state.attributes["rssi"], serde_json::json!(-67));
    }
}
