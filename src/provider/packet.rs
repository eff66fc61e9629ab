//! Packet-style REST client for the resource provider
//!
//! Thin reqwest wrapper: every call is one JSON request, authenticated with
//! the X-Auth-Token header. Non-2xx responses become resource API errors
//! carrying the status and response body.

use crate::error::{AppError, Result};
use crate::provider::{DeviceCreate, DeviceRecord, Project, ResourceApi, SshKeyRecord};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

const AUTH_HEADER: &str = "X-Auth-Token";

/// HTTP client for the provider's REST API
#[derive(Debug, Clone)]
pub struct PacketClient {
    http: reqwest::Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct DevicesEnvelope {
    devices: Vec<DeviceRecord>,
}

#[derive(Debug, Deserialize)]
struct SshKeysEnvelope {
    ssh_keys: Vec<SshKeyRecord>,
}

impl PacketClient {
    /// Create a client for the given API base URL and auth token
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(token)
            .map_err(|e| AppError::config(format!("Invalid API token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTH_HEADER, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    /// Map a non-2xx response to a resource API error with its body text
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::resource_api(format!(
            "provider returned {}: {}",
            status,
            body.trim()
        )))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self.http.delete(self.endpoint(path)?).send().await?;
        // some delete endpoints answer 204, others 200 with a body
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl ResourceApi for PacketClient {
    async fn create_project(&self, name: &str) -> Result<Project> {
        let response = self
            .http
            .post(self.endpoint("projects")?)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_project(&self, id: &str) -> Result<Project> {
        let response = self
            .http
            .get(self.endpoint(&format!("projects/{}", id))?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.delete(&format!("projects/{}", id)).await
    }

    async fn list_ssh_keys(&self) -> Result<Vec<SshKeyRecord>> {
        let response = self.http.get(self.endpoint("ssh-keys")?).send().await?;
        let envelope: SshKeysEnvelope = Self::check(response).await?.json().await?;
        Ok(envelope.ssh_keys)
    }

    async fn add_ssh_key(&self, label: &str, key: &str) -> Result<SshKeyRecord> {
        let response = self
            .http
            .post(self.endpoint("ssh-keys")?)
            .json(&json!({ "label": label, "key": key }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_ssh_key(&self, id: &str) -> Result<()> {
        self.delete(&format!("ssh-keys/{}", id)).await
    }

    async fn list_devices(&self, project_id: &str) -> Result<Vec<DeviceRecord>> {
        let response = self
            .http
            .get(self.endpoint(&format!("projects/{}/devices", project_id))?)
            .send()
            .await?;
        let envelope: DevicesEnvelope = Self::check(response).await?.json().await?;
        Ok(envelope.devices)
    }

    async fn create_device(&self, project_id: &str, request: &DeviceCreate) -> Result<DeviceRecord> {
        let response = self
            .http
            .post(self.endpoint(&format!("projects/{}/devices", project_id))?)
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_device(&self, device_id: &str) -> Result<()> {
        self.delete(&format!("devices/{}", device_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> PacketClient {
        PacketClient::new(&format!("{}/", server.uri()), "secret-token").unwrap()
    }

    #[tokio::test]
    async fn test_list_devices_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/proj-1/devices"))
            .and(header(AUTH_HEADER, "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "devices": [
                    {"id": "dev-1", "hostname": "target1", "state": "active", "ip_addresses": []}
                ]
            })))
            .mount(&server)
            .await;

        let devices = client_for(&server)
            .await
            .list_devices("proj-1")
            .await
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].hostname, "target1");
        assert!(devices[0].is_active());
    }

    #[tokio::test]
    async fn test_create_device_posts_request_body() {
        let server = MockServer::start().await;
        let request = DeviceCreate {
            hostname: "target1".to_string(),
            plan: "baremetal_1".to_string(),
            facility: "ewr1".to_string(),
            operating_system: "centos_7".to_string(),
        };

        Mock::given(method("POST"))
            .and(path("/projects/proj-1/devices"))
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "dev-9", "hostname": "target1", "state": "queued", "ip_addresses": []
            })))
            .mount(&server)
            .await;

        let record = client_for(&server)
            .await
            .create_device("proj-1", &request)
            .await
            .unwrap();
        assert_eq!(record.id, "dev-9");
        assert!(!record.is_active());
    }

    #[tokio::test]
    async fn test_error_status_maps_to_resource_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"error":"not found"}"#),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_project("missing")
            .await
            .unwrap_err();
        assert_eq!(err.category(), "RESOURCE");
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/devices/dev-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        client_for(&server).await.delete_device("dev-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_add_ssh_key_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ssh-keys"))
            .and(body_json(&serde_json::json!({
                "label": "temporary key for netperf-fleet",
                "key": "ssh-ed25519 AAAA test@host"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "key-1",
                "label": "temporary key for netperf-fleet",
                "key": "ssh-ed25519 AAAA test@host"
            })))
            .mount(&server)
            .await;

        let record = client_for(&server)
            .await
            .add_ssh_key("temporary key for netperf-fleet", "ssh-ed25519 AAAA test@host")
            .await
            .unwrap();
        assert_eq!(record.id, "key-1");
    }
}
