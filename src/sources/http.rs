use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::range::DateRange;
use crate::sources::{SourceClient, SourceError, SourceKind, SourcePayload};

/// Response envelope every backend collaborator uses
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Source reached over HTTP: `POST {startDate, endDate}` → `{data}` or `{error}`
pub struct HttpSourceClient {
    kind: SourceKind,
    endpoint: String,
    client: Client,
}

impl HttpSourceClient {
    pub fn new(kind: SourceKind, endpoint: String, client: Client) -> Self {
        Self {
            kind,
            endpoint,
            client,
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, range: &DateRange) -> Result<SourcePayload, SourceError> {
        debug!(
            "Fetching {} for {}..{}",
            self.kind,
            range.start_str(),
            range.end_str()
        );

        let response = self.client.post(&self.endpoint).json(range).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let envelope: Envelope = response.json().await?;
        decode_envelope(self.kind, envelope)
    }
}

fn decode_envelope(kind: SourceKind, envelope: Envelope) -> Result<SourcePayload, SourceError> {
    if let Some(error) = envelope.error {
        let message = match error {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(SourceError::Upstream(message));
    }

    match envelope.data {
        Some(data) => SourcePayload::parse(kind, data),
        None => Err(SourceError::Upstream("response has neither data nor error".to_string())),
    }
}

/// Stand-in for a source with no configured endpoint
pub struct OfflineSource {
    kind: SourceKind,
}

impl OfflineSource {
    pub fn new(kind: SourceKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl SourceClient for OfflineSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _range: &DateRange) -> Result<SourcePayload, SourceError> {
        Err(SourceError::NotConfigured(self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_with_data() {
        let payload = decode_envelope(
            SourceKind::Subscriptions,
            envelope(json!({"data": {"active": 40, "new": 5, "churned": 2, "mrr": 800}})),
        )
        .unwrap();
        assert_eq!(payload.kind(), SourceKind::Subscriptions);
    }

    #[test]
    fn test_envelope_with_error() {
        let err = decode_envelope(
            SourceKind::SearchAds,
            envelope(json!({"error": "rate limit exceeded"})),
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Upstream(ref m) if m == "rate limit exceeded"));

        let err = decode_envelope(
            SourceKind::SearchAds,
            envelope(json!({"error": {"code": 401}})),
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));
    }

    #[test]
    fn test_empty_envelope_is_an_error() {
        assert!(decode_envelope(SourceKind::Email, envelope(json!({}))).is_err());
    }
}
