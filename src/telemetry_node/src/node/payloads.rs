use alloc::string::{String, ToString};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::settings::ConfigFault;

#[derive(Default)]
pub struct NodeSettingsValues {
    pub team_id: Option<u16>,
    pub min_interval_s: Option<u32>,
    pub enable_link: Option<bool>,
    pub ssid: Option<String>,
    pub secret: Option<String>,
    pub endpoint: Option<String>,
    pub send_timeout_ms: Option<u32>,
    pub mount_path: Option<String>,
    pub log_file_name: Option<String>,
    pub temperature_source: Option<u8>,
    pub enable_alerts: Option<bool>,
    pub echo_records: Option<bool>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct NodeSettingsPayload {
    pub team_id: Option<u16>,
    pub min_interval_s: Option<u32>,
    pub enable_link: Option<bool>,
    pub ssid: Option<Value>,
    pub secret: Option<Value>,
    pub endpoint: Option<Value>,
    pub send_timeout_ms: Option<u32>,
    pub mount_path: Option<Value>,
    pub log_file_name: Option<Value>,
    pub temperature_source: Option<u8>,
    pub enable_alerts: Option<bool>,
    pub echo_records: Option<bool>,
}

fn string_value(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

impl NodeSettingsPayload {
    pub fn from_json(text: &str) -> Result<Self, ConfigFault> {
        serde_json::from_str(text).map_err(|e| ConfigFault::Payload(e.to_string()))
    }

    pub fn values(self) -> NodeSettingsValues {
        NodeSettingsValues {
            team_id: self.team_id,
            min_interval_s: self.min_interval_s,
            enable_link: self.enable_link,
            ssid: string_value(self.ssid),
            secret: string_value(self.secret),
            endpoint: string_value(self.endpoint),
            send_timeout_ms: self.send_timeout_ms,
            mount_path: string_value(self.mount_path),
            log_file_name: string_value(self.log_file_name),
            temperature_source: self.temperature_source,
            enable_alerts: self.enable_alerts,
            echo_records: self.echo_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_string_values_are_ignored() {
        let payload =
            NodeSettingsPayload::from_json(r#"{"ssid": 12, "endpoint": "http://c/", "team_id": 7}"#)
                .unwrap();
        let values = payload.values();
        assert_eq!(values.ssid, None);
        assert_eq!(values.endpoint.as_deref(), Some("http://c/"));
        assert_eq!(values.team_id, Some(7));
        assert_eq!(values.enable_link, None);
    }

    #[test]
    fn malformed_payload_is_a_config_fault() {
        assert!(matches!(
            NodeSettingsPayload::from_json("{\"team_id\": \"x\"}"),
            Err(ConfigFault::Payload(_))
        ));
    }
}
