//! Wire contract shared by the fetch client and the chart server.
//!
//! Requests are HTTP POSTs with form-encoded parameters; responses are JSON
//! objects. Action parameters may repeat (notably `download_data`, once per
//! requested series), so bodies are parsed as ordered pairs rather than
//! through a map-backed extractor.

use crate::types::Row;
use serde::{Deserialize, Serialize};

// ── Chart endpoint parameters ───────────────────────────────────

pub const PARAM_LIST_KNOWN_CHARTS: &str = "list_known_charts";
pub const PARAM_GET_DATA_NAME: &str = "get_data_name";
pub const PARAM_DOWNLOAD_DATA: &str = "download_data";

// ── Live endpoint parameters ────────────────────────────────────

pub const PARAM_CREATE_CHART: &str = "create_chart";
pub const PARAM_UPLOAD_DATA: &str = "upload_data";

// ── Admin endpoint parameters ───────────────────────────────────

pub const PARAM_IS_CONFIGURED: &str = "is_configured";
pub const PARAM_SET_CONFIGURATION: &str = "set_configuration";

// ── Response keys ───────────────────────────────────────────────

pub const KEY_KNOWN_CHARTS: &str = "known_charts";
pub const KEY_DATA_NAME: &str = "data_name";
pub const KEY_CONFIGURATION_STATE: &str = "configuration_state";
pub const KEY_CONFIGURATION_RESULT: &str = "configuration_result";
pub const KEY_CONFIGURATION_ERROR: &str = "configuration_error";

/// Acknowledgement values used by the live endpoint's per-chart keys.
pub const ACK_SUCCESS: &str = "success";
pub const ACK_FAILURE: &str = "failure";

/// One `download_data` request value: a chart name and the caller's
/// watermark. Everything strictly after `time_of_interest` is wanted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    pub chart_name: String,
    pub time_of_interest: f64,
}

impl DataRequest {
    pub fn new(chart_name: &str, time_of_interest: f64) -> Self {
        Self {
            chart_name: chart_name.to_string(),
            time_of_interest,
        }
    }
}

/// One entry of an `upload_data` request value: the target chart and the
/// rows to append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub chart_name: String,
    pub packet: Vec<Row>,
}

/// Parse a form-encoded request body into ordered (name, value) pairs,
/// preserving repeated keys.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

/// All values for a given parameter name, in arrival order.
pub fn values<'a>(params: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// The response key acknowledging an action against one chart, e.g.
/// `"upload_data: cpu_load"`.
pub fn ack_key(action: &str, chart: &str) -> String {
    format!("{action}: {chart}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_form_preserves_repeated_keys() {
        let body = "download_data=a&download_data=b&list_known_charts=";
        let params = parse_form(body);
        assert_eq!(values(&params, PARAM_DOWNLOAD_DATA), vec!["a", "b"]);
        assert_eq!(values(&params, PARAM_LIST_KNOWN_CHARTS), vec![""]);
        assert!(values(&params, PARAM_GET_DATA_NAME).is_empty());
    }

    #[test]
    fn parse_form_decodes_percent_escapes() {
        let params = parse_form("create_chart=cpu%20load");
        assert_eq!(values(&params, PARAM_CREATE_CHART), vec!["cpu load"]);
    }

    #[test]
    fn data_request_uses_camel_case_fields() {
        let req = DataRequest::new("cpu_load", 100.0);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["chartName"], "cpu_load");
        assert_eq!(json["timeOfInterest"], 100.0);

        let back: DataRequest =
            serde_json::from_str(r#"{"chartName":"cpu_load","timeOfInterest":100.0}"#).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn upload_request_round_trips_packet() {
        let req = UploadRequest {
            chart_name: "live".to_string(),
            packet: vec![Row::new(1.0, 0.5), Row::new(2.0, 0.7)],
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: UploadRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chart_name, "live");
        assert_eq!(back.packet.len(), 2);
        assert_eq!(back.packet[1].time, 2.0);
    }

    #[test]
    fn ack_key_matches_receiver_shape() {
        assert_eq!(ack_key(PARAM_CREATE_CHART, "x"), "create_chart: x");
    }
}
