//! [`EventSink`] implementations.
//!
//! [`LogEventSink`] writes each event to the log and accepts all of them.
//! [`HttpEventSink`] POSTs batches as a JSON array to a collector. A success
//! response with an empty body counts as the whole batch accepted.

use async_trait::async_trait;
use reqwest::Client;
use rf402::{Event, EventSink, EventSinkError, SubmitSummary};
use url::Url;

/// Logs every event at `info` and accepts the whole batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn submit(&self, batch: Vec<Event>) -> Result<SubmitSummary, EventSinkError> {
        for event in &batch {
            match event {
                Event::RequestAssessed { url, assessment, .. } => tracing::info!(
                    kind = event.kind(),
                    url = %url,
                    refund_warranted = assessment.refund_warranted(),
                    "Event"
                ),
                Event::RefundExecuted { refund_id, receipt, .. } => tracing::info!(
                    kind = event.kind(),
                    refund_id = %refund_id,
                    tx_id = %receipt.tx_id,
                    "Event"
                ),
                Event::RefundFailed {
                    refund_id,
                    network,
                    message,
                    retryable,
                    ..
                } => tracing::info!(
                    kind = event.kind(),
                    refund_id = %refund_id,
                    network = %network,
                    retryable,
                    "Event: {message}"
                ),
            }
        }
        Ok(SubmitSummary {
            accepted: batch.len(),
            ..SubmitSummary::default()
        })
    }
}

/// Sends event batches to an HTTP collector.
#[derive(Debug, Clone)]
pub struct HttpEventSink {
    client: Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpEventSink {
    /// Creates a sink posting to `url`, with `api_key` as a bearer token.
    #[must_use]
    pub fn new(url: Url, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            api_key,
        }
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn submit(&self, batch: Vec<Event>) -> Result<SubmitSummary, EventSinkError> {
        if batch.is_empty() {
            return Ok(SubmitSummary::default());
        }

        let mut request = self.client.post(self.url.clone()).json(&batch);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| EventSinkError::Unreachable(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventSinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| EventSinkError::Unreachable(Box::new(e)))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(SubmitSummary {
                accepted: batch.len(),
                ..SubmitSummary::default()
            });
        }
        serde_json::from_slice(&body).map_err(|e| EventSinkError::Decode(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use rf402::executor::{CostEstimate, TransferReceipt};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn executed(refund_id: &str) -> Event {
        Event::RefundExecuted {
            timestamp: "2026-05-20T10:00:00.000Z".to_owned(),
            refund_id: refund_id.to_owned(),
            receipt: TransferReceipt {
                tx_id: "0xabc".to_owned(),
                network: "base".to_owned(),
                amount_raw: "250000".to_owned(),
                token: "USDC".to_owned(),
                cost_estimate: CostEstimate {
                    native_amount: "21000".to_owned(),
                    unit: "wei".to_owned(),
                },
            },
        }
    }

    fn failed(refund_id: &str) -> Event {
        Event::RefundFailed {
            timestamp: "2026-05-20T10:00:00.000Z".to_owned(),
            refund_id: refund_id.to_owned(),
            network: "base".to_owned(),
            message: "rpc timeout".to_owned(),
            retryable: true,
            denial: None,
        }
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let summary = LogEventSink
            .submit(vec![executed("r1"), failed("r2")])
            .await
            .unwrap();
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 0);
    }

    #[tokio::test]
    async fn test_http_sink_posts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events"))
            .and(header("authorization", "Bearer collector-key"))
            .and(body_partial_json(serde_json::json!([
                {"type": "refund_executed", "refundId": "r1"},
                {"type": "refund_failed", "refundId": "r2", "retryable": true}
            ])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accepted": 1,
                "rejected": 1,
                "errors": ["duplicate r2"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/events", server.uri())).unwrap();
        let sink = HttpEventSink::new(url, Some("collector-key".to_owned()));
        let summary = sink.submit(vec![executed("r1"), failed("r2")]).await.unwrap();

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.errors, vec!["duplicate r2".to_owned()]);
    }

    #[tokio::test]
    async fn test_http_sink_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let sink = HttpEventSink::new(Url::parse(&server.uri()).unwrap(), None);
        let err = sink.submit(vec![executed("r1")]).await.unwrap_err();
        assert!(matches!(
            err,
            EventSinkError::Status { status: 503, ref body } if body == "overloaded"
        ));
    }

    #[tokio::test]
    async fn test_http_sink_empty_success_accepts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = HttpEventSink::new(Url::parse(&server.uri()).unwrap(), None);
        let summary = sink.submit(vec![executed("r1"), failed("r2")]).await.unwrap();
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_http_sink_non_json_success_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let sink = HttpEventSink::new(Url::parse(&server.uri()).unwrap(), None);
        assert!(matches!(
            sink.submit(vec![executed("r1")]).await,
            Err(EventSinkError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_http_sink_skips_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sink = HttpEventSink::new(Url::parse(&server.uri()).unwrap(), None);
        assert_eq!(sink.submit(Vec::new()).await.unwrap(), SubmitSummary::default());
    }

    #[tokio::test]
    async fn test_http_sink_unreachable() {
        let sink = HttpEventSink::new(Url::parse("http://127.0.0.1:1/events").unwrap(), None);
        assert!(matches!(
            sink.submit(vec![executed("r1")]).await,
            Err(EventSinkError::Unreachable(_))
        ));
    }
}
