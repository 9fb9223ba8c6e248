//! Network records extracted from a devtools protocol log

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ComputedArtifact, ComputedCache};
use crate::artifacts::Artifacts;
use crate::error::ArtifactError;

/// One network request as seen by the browser
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub request_id: String,
    pub url: String,
    /// Protocol resource type (Document, Script, Stylesheet, Image, ...)
    pub resource_type: String,
    pub mime_type: String,
    pub status_code: u16,
    /// Seconds, protocol monotonic clock
    pub start_time: f64,
    pub end_time: Option<f64>,
    /// Bytes over the wire, headers included
    pub transfer_size: u64,
    /// Decoded body bytes
    pub resource_size: u64,
    pub finished: bool,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl NetworkRecord {
    /// URL scheme, lowercased
    pub fn scheme(&self) -> String {
        self.url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Host portion of the URL, without port or credentials
    pub fn host(&self) -> Option<&str> {
        url_host(&self.url)
    }

    /// Whether the request never touched the network (data:, blob:, ...)
    pub fn is_non_network(&self) -> bool {
        matches!(
            self.scheme().as_str(),
            "data" | "blob" | "about" | "chrome" | "chrome-extension" | "filesystem"
        )
    }

    /// Whether the request was made over a secure transport
    pub fn is_secure(&self) -> bool {
        if self.is_non_network() {
            return true;
        }
        match self.scheme().as_str() {
            "https" | "wss" => true,
            _ => matches!(self.host(), Some("localhost") | Some("127.0.0.1")),
        }
    }
}

pub(crate) fn url_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Input: the raw `DevtoolsLog` artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkRecordsInput {
    pub devtools_log: Value,
}

impl NetworkRecordsInput {
    pub fn from_artifacts(artifacts: &Artifacts) -> Result<Self, ArtifactError> {
        Ok(Self {
            devtools_log: artifacts.get("DevtoolsLog")?.as_ref().clone(),
        })
    }
}

/// Reconstructs network records from `Network.*` protocol events
pub struct NetworkRecords;

#[derive(Deserialize)]
struct ProtocolEvent {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestWillBeSent {
    request_id: String,
    request: RequestInfo,
    #[serde(default)]
    timestamp: f64,
    #[serde(rename = "type", default)]
    resource_type: Option<String>,
    #[serde(default)]
    redirect_response: Option<ResponseInfo>,
}

#[derive(Deserialize)]
struct RequestInfo {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInfo {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    encoded_data_length: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseReceived {
    request_id: String,
    #[serde(rename = "type", default)]
    resource_type: Option<String>,
    response: ResponseInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataReceived {
    request_id: String,
    #[serde(default)]
    data_length: f64,
    #[serde(default)]
    encoded_data_length: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFinished {
    request_id: String,
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    encoded_data_length: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFailed {
    request_id: String,
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    error_text: Option<String>,
}

fn params<T: for<'de> Deserialize<'de>>(event: &ProtocolEvent) -> Option<T> {
    T::deserialize(&event.params).ok()
}

fn bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

/// Builds records keyed by request id, renaming redirected hops
#[derive(Default)]
struct RecordBuilder {
    records: IndexMap<String, NetworkRecord>,
}

impl RecordBuilder {
    fn request_will_be_sent(&mut self, event: RequestWillBeSent) {
        if let Some(redirect) = &event.redirect_response {
            if let Some(mut previous) = self.records.shift_remove(&event.request_id) {
                previous.status_code = redirect.status;
                previous.mime_type = redirect.mime_type.clone();
                previous.transfer_size = bytes(redirect.encoded_data_length);
                previous.end_time = Some(event.timestamp);
                previous.finished = true;

                let mut redirect_id = format!("{}:redirect", previous.request_id);
                while self.records.contains_key(&redirect_id) {
                    redirect_id.push_str(":redirect");
                }
                previous.request_id = redirect_id.clone();
                self.records.insert(redirect_id, previous);
            }
        }

        let record = NetworkRecord {
            request_id: event.request_id.clone(),
            url: event.request.url,
            resource_type: event.resource_type.unwrap_or_else(|| "Other".to_string()),
            start_time: event.timestamp,
            ..Default::default()
        };
        self.records.insert(event.request_id, record);
    }

    fn response_received(&mut self, event: ResponseReceived) {
        if let Some(record) = self.records.get_mut(&event.request_id) {
            record.status_code = event.response.status;
            record.mime_type = event.response.mime_type;
            record.transfer_size = bytes(event.response.encoded_data_length);
            if let Some(resource_type) = event.resource_type {
                record.resource_type = resource_type;
            }
        }
    }

    fn data_received(&mut self, event: DataReceived) {
        if let Some(record) = self.records.get_mut(&event.request_id) {
            record.resource_size += bytes(event.data_length);
            record.transfer_size += bytes(event.encoded_data_length);
        }
    }

    fn loading_finished(&mut self, event: LoadingFinished) {
        if let Some(record) = self.records.get_mut(&event.request_id) {
            // The final encoded length is authoritative when reported
            if event.encoded_data_length > 0.0 {
                record.transfer_size = bytes(event.encoded_data_length);
            }
            record.end_time = Some(event.timestamp);
            record.finished = true;
        }
    }

    fn loading_failed(&mut self, event: LoadingFailed) {
        if let Some(record) = self.records.get_mut(&event.request_id) {
            record.end_time = Some(event.timestamp);
            record.finished = true;
            record.failed = true;
            record.error_text = event.error_text;
        }
    }

    fn build(self) -> Vec<NetworkRecord> {
        let mut records: Vec<NetworkRecord> = self.records.into_values().collect();
        records.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        records
    }
}

#[async_trait]
impl ComputedArtifact for NetworkRecords {
    type Input = NetworkRecordsInput;
    type Output = Vec<NetworkRecord>;

    fn name(&self) -> &'static str {
        "NetworkRecords"
    }

    async fn compute(
        &self,
        input: &NetworkRecordsInput,
        _cache: &ComputedCache,
    ) -> Result<Vec<NetworkRecord>, ArtifactError> {
        let events = input
            .devtools_log
            .as_array()
            .ok_or_else(|| ArtifactError::Malformed {
                name: "DevtoolsLog".to_string(),
                message: "expected an array of protocol events".to_string(),
            })?;

        let mut builder = RecordBuilder::default();
        for raw in events {
            let Ok(event) = ProtocolEvent::deserialize(raw) else {
                continue;
            };
            match event.method.as_str() {
                "Network.requestWillBeSent" => {
                    if let Some(params) = params(&event) {
                        builder.request_will_be_sent(params);
                    }
                }
                "Network.responseReceived" => {
                    if let Some(params) = params(&event) {
                        builder.response_received(params);
                    }
                }
                "Network.dataReceived" => {
                    if let Some(params) = params(&event) {
                        builder.data_received(params);
                    }
                }
                "Network.loadingFinished" => {
                    if let Some(params) = params(&event) {
                        builder.loading_finished(params);
                    }
                }
                "Network.loadingFailed" => {
                    if let Some(params) = params(&event) {
                        builder.loading_failed(params);
                    }
                }
                _ => {}
            }
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log() -> Value {
        json!([
            {"method": "Network.requestWillBeSent", "params": {
                "requestId": "1", "timestamp": 1.0, "type": "Document",
                "request": {"url": "http://example.com/"}}},
            {"method": "Network.requestWillBeSent", "params": {
                "requestId": "1", "timestamp": 1.2, "type": "Document",
                "request": {"url": "https://example.com/"},
                "redirectResponse": {"status": 301, "mimeType": "text/html", "encodedDataLength": 200}}},
            {"method": "Network.responseReceived", "params": {
                "requestId": "1", "type": "Document",
                "response": {"status": 200, "mimeType": "text/html", "encodedDataLength": 300}}},
            {"method": "Network.dataReceived", "params": {
                "requestId": "1", "dataLength": 5000, "encodedDataLength": 1500}},
            {"method": "Network.loadingFinished", "params": {
                "requestId": "1", "timestamp": 1.5, "encodedDataLength": 1800}},
            {"method": "Network.requestWillBeSent", "params": {
                "requestId": "2", "timestamp": 1.6, "type": "Script",
                "request": {"url": "https://cdn.example.net/app.js"}}},
            {"method": "Network.loadingFailed", "params": {
                "requestId": "2", "timestamp": 1.7, "errorText": "net::ERR_FAILED"}},
            {"method": "Page.frameNavigated", "params": {}},
            "not an event"
        ])
    }

    #[tokio::test]
    async fn test_builds_records_with_redirects() {
        let cache = ComputedCache::new();
        let input = NetworkRecordsInput { devtools_log: log() };
        let records = cache.request(&NetworkRecords, &input).await.unwrap();

        assert_eq!(records.len(), 3);

        let redirect = &records[0];
        assert_eq!(redirect.request_id, "1:redirect");
        assert_eq!(redirect.url, "http://example.com/");
        assert_eq!(redirect.status_code, 301);
        assert_eq!(redirect.transfer_size, 200);
        assert!(redirect.finished);

        let document = &records[1];
        assert_eq!(document.request_id, "1");
        assert_eq!(document.status_code, 200);
        assert_eq!(document.transfer_size, 1800);
        assert_eq!(document.resource_size, 5000);
        assert_eq!(document.end_time, Some(1.5));

        let script = &records[2];
        assert!(script.failed);
        assert_eq!(script.error_text.as_deref(), Some("net::ERR_FAILED"));
    }

    #[tokio::test]
    async fn test_rejects_non_array_log() {
        let cache = ComputedCache::new();
        let input = NetworkRecordsInput {
            devtools_log: json!({"events": []}),
        };
        let err = cache.request(&NetworkRecords, &input).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Malformed { .. }));
    }

    #[test]
    fn test_record_url_helpers() {
        let record = NetworkRecord {
            url: "https://user@Example.com:8443/path?q=1".to_string(),
            ..Default::default()
        };
        assert_eq!(record.scheme(), "https");
        assert_eq!(record.host(), Some("Example.com"));
        assert!(record.is_secure());

        let local = NetworkRecord {
            url: "http://localhost:3000/".to_string(),
            ..Default::default()
        };
        assert!(local.is_secure());

        let insecure = NetworkRecord {
            url: "http://example.com/".to_string(),
            ..Default::default()
        };
        assert!(!insecure.is_secure());

        let inline = NetworkRecord {
            url: "data:image/png;base64,AAAA".to_string(),
            ..Default::default()
        };
        assert!(inline.is_non_network());
        assert_eq!(inline.host(), None);
    }
}
