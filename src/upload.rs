//! Client for pushing charts into a live server.
//!
//! The counterpart of the `/live` endpoint: registers charts and sends
//! packets, then checks the per-chart acknowledgement the server returns.

use crate::types::{ChartError, ChartResult, Row};
use crate::wire::{self, UploadRequest};
use serde_json::Value;
use tracing::debug;

pub struct UploadClient {
    endpoint: String,
    client: reqwest::Client,
}

impl UploadClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Register an empty chart on the server.
    pub async fn create_chart(&self, chart: &str) -> ChartResult<()> {
        let response = self.post(&[(wire::PARAM_CREATE_CHART, chart)]).await?;
        expect_ack(&response, wire::PARAM_CREATE_CHART, chart)
    }

    /// Send rows for one chart. The server takes the packet whole or not
    /// at all.
    pub async fn upload_rows(&self, chart: &str, rows: &[Row]) -> ChartResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.upload_batch(&[UploadRequest {
            chart_name: chart.to_string(),
            packet: rows.to_vec(),
        }])
        .await
    }

    /// Send packets for several charts in one request. Every packet must
    /// be acknowledged with success.
    pub async fn upload_batch(&self, uploads: &[UploadRequest]) -> ChartResult<()> {
        if uploads.is_empty() {
            return Ok(());
        }
        let value = serde_json::to_string(uploads)?;
        let response = self.post(&[(wire::PARAM_UPLOAD_DATA, &value)]).await?;
        for upload in uploads {
            expect_ack(&response, wire::PARAM_UPLOAD_DATA, &upload.chart_name)?;
            debug!(
                "server accepted {} rows for '{}'",
                upload.packet.len(),
                upload.chart_name
            );
        }
        Ok(())
    }

    async fn post(&self, pairs: &[(&str, &str)]) -> ChartResult<Value> {
        let url = format!("{}/live", self.endpoint);
        let response = self
            .client
            .post(&url)
            .form(pairs)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Check the acknowledgement entry for one action against one chart.
fn expect_ack(response: &Value, action: &str, chart: &str) -> ChartResult<()> {
    let ack = response
        .get(wire::ack_key(action, chart))
        .and_then(Value::as_str);
    if ack == Some(wire::ACK_SUCCESS) {
        Ok(())
    } else {
        Err(ChartError::Rejected {
            action: action.to_string(),
            chart: chart.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_acks_pass() {
        let response = json!({ "create_chart: cpu_load": "success" });
        assert!(expect_ack(&response, "create_chart", "cpu_load").is_ok());
    }

    #[test]
    fn failure_and_missing_acks_are_rejections() {
        let response = json!({ "upload_data: cpu_load": "failure" });
        let err = expect_ack(&response, "upload_data", "cpu_load").unwrap_err();
        assert!(matches!(err, ChartError::Rejected { ref chart, .. } if chart == "cpu_load"));

        let err = expect_ack(&json!({}), "upload_data", "cpu_load").unwrap_err();
        assert!(matches!(err, ChartError::Rejected { .. }));
    }

    #[tokio::test]
    async fn empty_uploads_never_touch_the_network() {
        // The endpoint is unreachable, so this only passes if upload_rows
        // returns before posting.
        let client = UploadClient::new("http://127.0.0.1:1/");
        assert_eq!(client.endpoint(), "http://127.0.0.1:1");
        assert!(client.upload_rows("cpu_load", &[]).await.is_ok());
        assert!(client.upload_batch(&[]).await.is_ok());
    }
}
