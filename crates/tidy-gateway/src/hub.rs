use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use tidy_core::gateway::HomeHub;
use tidy_core::ServiceError;

use crate::{check_status, transport_error};

/// REST client for a Home Assistant instance.
pub struct HomeAssistantClient {
    client: Client,
    base_url: String,
    token: SecretString,
    timeout: Duration,
}

impl HomeAssistantClient {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Unreachable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: SecretString::from(token.into()),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        let token = self.token.expose_secret();
        if token.is_empty() {
            req
        } else {
            req.bearer_auth(token)
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<reqwest::Response, ServiceError> {
        let resp = self
            .authed(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        check_status(resp).await
    }
}

/// `notify.mobile_app_phone` and `mobile_app_phone` address the same service.
pub fn notify_service_name(service: &str) -> &str {
    service.strip_prefix("notify.").unwrap_or(service)
}

/// Pull completed item summaries for `entity` out of a `todo.get_items`
/// service response.
fn completed_from_response(body: &Value, entity: &str) -> Vec<String> {
    let root = body.get("service_response").unwrap_or(body);
    let items = root
        .get(entity)
        .and_then(|e| e.get("items"))
        .and_then(Value::as_array);

    items
        .into_iter()
        .flatten()
        .filter(|item| item.get("status").and_then(Value::as_str) == Some("completed"))
        .filter_map(|item| item.get("summary").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl HomeHub for HomeAssistantClient {
    #[instrument(skip(self))]
    async fn get_snapshot(&self, camera_ref: &str) -> Result<Bytes, ServiceError> {
        let resp = self
            .authed(
                self.client
                    .get(self.url(&format!("/api/camera_proxy/{camera_ref}"))),
            )
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let bytes = check_status(resp)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        if bytes.is_empty() {
            return Err(ServiceError::Malformed(format!(
                "empty snapshot from {camera_ref}"
            )));
        }
        debug!(camera = camera_ref, size = bytes.len(), "snapshot fetched");
        Ok(bytes)
    }

    #[instrument(skip(self, attributes))]
    async fn update_sensor(
        &self,
        sensor_ref: &str,
        state: &str,
        attributes: Map<String, Value>,
    ) -> Result<(), ServiceError> {
        let body = json!({ "state": state, "attributes": attributes });
        self.post_json(&format!("/api/states/{sensor_ref}"), &body)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_task_item(&self, task_list_ref: &str, text: &str) -> Result<(), ServiceError> {
        let body = json!({ "entity_id": task_list_ref, "item": text });
        self.post_json("/api/services/todo/add_item", &body).await?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn send_notification(
        &self,
        service: &str,
        title: &str,
        message: &str,
    ) -> Result<(), ServiceError> {
        let path = format!("/api/services/notify/{}", notify_service_name(service));
        let body = json!({ "message": message, "title": title });
        self.post_json(&path, &body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn completed_items(&self, task_list_ref: &str) -> Result<Vec<String>, ServiceError> {
        let body = json!({ "entity_id": task_list_ref, "status": "completed" });
        let resp = self
            .post_json("/api/services/todo/get_items?return_response", &body)
            .await?;
        let value: Value = resp
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        Ok(completed_from_response(&value, task_list_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HomeAssistantClient {
        HomeAssistantClient::new(&server.uri(), "secret-token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn strips_notify_prefix() {
        assert_eq!(notify_service_name("notify.mobile_app"), "mobile_app");
        assert_eq!(notify_service_name("mobile_app"), "mobile_app");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let c =
            HomeAssistantClient::new("http://ha.local:8123/", "", Duration::from_secs(1)).unwrap();
        assert_eq!(c.base_url(), "http://ha.local:8123");
    }

    #[tokio::test]
    async fn snapshot_uses_camera_proxy_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/camera_proxy/camera.kitchen"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client(&server).get_snapshot("camera.kitchen").await.unwrap();
        assert_eq!(bytes.as_ref(), &[0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn missing_camera_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/camera_proxy/camera.gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Entity not found"))
            .mount(&server)
            .await;

        let err = client(&server).get_snapshot("camera.gone").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_snapshot_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/camera_proxy/camera.dark"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client(&server).get_snapshot("camera.dark").await.unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));
    }

    #[tokio::test]
    async fn sensor_update_posts_state_and_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/states/sensor.tidy_kitchen_score"))
            .and(body_json(json!({
                "state": "40",
                "attributes": {"unit_of_measurement": "%"}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut attrs = Map::new();
        attrs.insert("unit_of_measurement".into(), json!("%"));
        client(&server)
            .update_sensor("sensor.tidy_kitchen_score", "40", attrs)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_task_item_calls_todo_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/todo/add_item"))
            .and(body_json(json!({"entity_id": "todo.kitchen", "item": "Sweep floor"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .add_task_item("todo.kitchen", "Sweep floor")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn server_error_is_retryable_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/todo/add_item"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client(&server)
            .add_task_item("todo.kitchen", "Sweep floor")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Status { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn notification_strips_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/notify/mobile_app_phone"))
            .and(body_json(json!({"message": "hi", "title": "Kitchen"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .send_notification("notify.mobile_app_phone", "Kitchen", "hi")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn completed_items_filters_by_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/todo/get_items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "service_response": {
                    "todo.kitchen": {
                        "items": [
                            {"summary": "Sweep floor", "status": "completed"},
                            {"summary": "Wipe table", "status": "needs_action"}
                        ]
                    }
                }
            })))
            .mount(&server)
            .await;

        let done = client(&server).completed_items("todo.kitchen").await.unwrap();
        assert_eq!(done, vec!["Sweep floor"]);
    }

    #[tokio::test]
    async fn unreachable_host_is_unreachable() {
        let c = HomeAssistantClient::new("http://127.0.0.1:1", "", Duration::from_secs(2)).unwrap();
        let err = c.get_snapshot("camera.kitchen").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
