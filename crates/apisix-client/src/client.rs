//! HTTP implementation of [`AdminApi`]

use crate::api::{AdminApi, ApiObject};
use crate::config::ClientConfig;
use crate::envelope::{error_message, parse_list, parse_object};
use apisix_core::{Error, ObjectKind, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Admin API client over HTTP
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base: String,
    config: ClientConfig,
}

impl AdminClient {
    /// Build a client from its configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let base = config.base_url()?.as_str().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key)
                .map_err(|_| Error::Config("api_key contains invalid characters".to_string()))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(concat!("apisix-tf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base, config })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, kind: ObjectKind, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base, kind.path_segment(), id),
            None => format!("{}/{}", self.base, kind.path_segment()),
        }
    }

    /// Send a request, retrying idempotent ones on transient failures
    async fn send(&self, method: Method, url: &str, body: Option<&Map<String, Value>>) -> Result<Value> {
        let attempts = if method == Method::POST {
            1
        } else {
            self.config.retry_attempts.max(1)
        };

        let mut attempt = 1;
        loop {
            match self.send_once(method.clone(), url, body).await {
                Err(err) if attempt < attempts && err.is_retryable() => {
                    let delay = self.config.retry_backoff * attempt;
                    warn!(
                        method = %method,
                        url = %url,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Admin API request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        debug!(method = %method, url = %url, status = status.as_u16(), "Admin API response");

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::conversion("response", format!("invalid JSON from {url}: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport(err.to_string())
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn get(&self, kind: ObjectKind, id: &str) -> Result<ApiObject> {
        let body = self.send(Method::GET, &self.url(kind, Some(id)), None).await?;
        parse_object(kind, &body)
    }

    async fn list(&self, kind: ObjectKind) -> Result<Vec<ApiObject>> {
        let body = self.send(Method::GET, &self.url(kind, None), None).await?;
        parse_list(kind, &body)
    }

    async fn create(&self, kind: ObjectKind, body: &Map<String, Value>) -> Result<ApiObject> {
        let response = self.send(Method::POST, &self.url(kind, None), Some(body)).await?;
        let object = parse_object(kind, &response)?;
        debug!(kind = %kind, id = %object.id, "created object");
        Ok(object)
    }

    async fn put(&self, kind: ObjectKind, id: &str, body: &Map<String, Value>) -> Result<ApiObject> {
        let response = if kind.id_in_body() {
            let mut body = body.clone();
            body.insert(kind.id_field().to_string(), Value::String(id.to_string()));
            self.send(Method::PUT, &self.url(kind, None), Some(&body)).await?
        } else {
            self.send(Method::PUT, &self.url(kind, Some(id)), Some(body)).await?
        };
        parse_object(kind, &response)
    }

    async fn delete(&self, kind: ObjectKind, id: &str) -> Result<()> {
        self.send(Method::DELETE, &self.url(kind, Some(id)), None).await?;
        debug!(kind = %kind, id = %id, "deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AdminClient {
        let config = ClientConfig::new(format!("{}/apisix/admin", server.uri()))
            .with_api_key("edd1c9f034335f136f87ad84b625c8f1")
            .with_retries(3, Duration::from_millis(1));
        AdminClient::new(config).unwrap()
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apisix/admin/routes/1"))
            .and(header("x-api-key", "edd1c9f034335f136f87ad84b625c8f1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/apisix/routes/1",
                "value": {"id": "1", "uri": "/hello"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let object = client(&server).get(ObjectKind::Route, "1").await.unwrap();
        assert_eq!(object.id, "1");
        assert_eq!(object.value["uri"], json!("/hello"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apisix/admin/upstreams/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Key not found"})))
            .mount(&server)
            .await;

        let err = client(&server).get(ObjectKind::Upstream, "9").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_api_error_uses_error_msg() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/apisix/admin/routes/1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_msg": "invalid configuration: property \"uri\" validation failed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .put(ObjectKind::Route, "1", &body(json!({"uri": 1})))
            .await
            .unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("invalid configuration"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apisix/admin/services/s1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apisix/admin/services/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/apisix/services/s1",
                "value": {"id": "s1"}
            })))
            .mount(&server)
            .await;

        let object = client(&server).get(ObjectKind::Service, "s1").await.unwrap();
        assert_eq!(object.id, "s1");
    }

    #[tokio::test]
    async fn test_post_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apisix/admin/routes"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .create(ObjectKind::Route, &body(json!({"uri": "/a"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_create_returns_assigned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/apisix/admin/upstreams"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "key": "/apisix/upstreams/00000000000000000042",
                "value": {"id": "00000000000000000042", "type": "roundrobin"}
            })))
            .mount(&server)
            .await;

        let object = client(&server)
            .create(ObjectKind::Upstream, &body(json!({"type": "roundrobin"})))
            .await
            .unwrap();
        assert_eq!(object.id, "00000000000000000042");
    }

    #[tokio::test]
    async fn test_consumer_put_carries_username() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/apisix/admin/consumers"))
            .and(body_partial_json(json!({"username": "jack"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/apisix/consumers/jack",
                "value": {"username": "jack"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let object = client(&server)
            .put(ObjectKind::Consumer, "jack", &Map::new())
            .await
            .unwrap();
        assert_eq!(object.id, "jack");
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/apisix/admin/ssls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "list": [{"key": "/apisix/ssls/1", "value": {"id": "1", "snis": ["a.com"]}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/apisix/admin/ssls/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let objects = client.list(ObjectKind::Ssl).await.unwrap();
        assert_eq!(objects.len(), 1);
        client.delete(ObjectKind::Ssl, "1").await.unwrap();
    }
}
