use alloc::string::String;

use bitfield_struct::bitfield;

use super::payloads::{NodeSettingsPayload, NodeSettingsValues};
use crate::storage_sink::DEFAULT_LOG_FILE_NAME;
use crate::uplink::DEFAULT_SEND_TIMEOUT_MS;

pub const DEFAULT_TEAM_ID: u16 = 33;
pub const DEFAULT_MIN_INTERVAL_S: u32 = 1;
pub const DEFAULT_MOUNT_PATH: &str = "/sd";

const MAX_MIN_INTERVAL_S: u32 = 60 * 60;
const MAX_SEND_TIMEOUT_MS: u32 = 60_000;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigFault {
    #[error("link mode enabled without an ssid")]
    MissingSsid,
    #[error("link mode enabled without an endpoint")]
    MissingEndpoint,
    #[error("endpoint {0} is not an http(s) url")]
    InvalidEndpoint(String),
    #[error("storage mount path is empty")]
    EmptyMountPath,
    #[error("log file name {0:?} is not a plain file name")]
    InvalidLogFileName(String),
    #[error("settings payload rejected: {0}")]
    Payload(String),
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct NodeSettingsBitField {
    #[bits(1)]
    pub enable_link: bool,

    #[bits(1)]
    pub enable_alerts: bool,

    #[bits(1)]
    pub echo_records: bool,

    #[bits(5)]
    unused: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSettings {
    pub team_id: u16,
    pub min_interval_s: u32, // seconds
    pub ssid: String,
    pub secret: String,
    pub endpoint: String,
    pub send_timeout_ms: u32,
    pub mount_path: String,
    pub log_file_name: String,
    pub temperature_source: u8,
    pub toggles: NodeSettingsBitField,
}

impl NodeSettings {
    pub fn new() -> Self {
        NodeSettings {
            team_id: DEFAULT_TEAM_ID,
            min_interval_s: DEFAULT_MIN_INTERVAL_S,
            ssid: String::new(),
            secret: String::new(),
            endpoint: String::new(),
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            mount_path: String::from(DEFAULT_MOUNT_PATH),
            log_file_name: String::from(DEFAULT_LOG_FILE_NAME),
            temperature_source: 0,
            toggles: NodeSettingsBitField::new().with_enable_alerts(true),
        }
    }

    /// Parses a settings document, fills in defaults and validates the result.
    pub fn from_json(text: &str) -> Result<Self, ConfigFault> {
        let payload = NodeSettingsPayload::from_json(text)?;
        let settings = NodeSettings::new()
            .with_values(payload.values())
            .configure_defaults();
        settings.validate()?;
        Ok(settings)
    }

    pub fn configure_defaults(self) -> NodeSettings {
        let mut settings = self.clone();

        if self.team_id == 0 {
            settings.team_id = DEFAULT_TEAM_ID;
        }

        if self.min_interval_s == 0 || self.min_interval_s > MAX_MIN_INTERVAL_S {
            settings.min_interval_s = DEFAULT_MIN_INTERVAL_S;
        }

        if self.send_timeout_ms == 0 || self.send_timeout_ms > MAX_SEND_TIMEOUT_MS {
            settings.send_timeout_ms = DEFAULT_SEND_TIMEOUT_MS;
        }

        if self.log_file_name.is_empty() {
            settings.log_file_name = String::from(DEFAULT_LOG_FILE_NAME);
        }

        settings
    }

    pub fn with_values(self, values: NodeSettingsValues) -> NodeSettings {
        let mut settings = NodeSettings::new();
        settings.team_id = values.team_id.unwrap_or(self.team_id);
        settings.min_interval_s = values.min_interval_s.unwrap_or(self.min_interval_s);
        settings.ssid = values.ssid.unwrap_or(self.ssid);
        settings.secret = values.secret.unwrap_or(self.secret);
        settings.endpoint = values.endpoint.unwrap_or(self.endpoint);
        settings.send_timeout_ms = values.send_timeout_ms.unwrap_or(self.send_timeout_ms);
        settings.mount_path = values.mount_path.unwrap_or(self.mount_path);
        settings.log_file_name = values.log_file_name.unwrap_or(self.log_file_name);
        settings.temperature_source = values.temperature_source.unwrap_or(self.temperature_source);
        settings.toggles.set_enable_link(values.enable_link.unwrap_or(self.toggles.enable_link()));
        settings.toggles.set_enable_alerts(values.enable_alerts.unwrap_or(self.toggles.enable_alerts()));
        settings.toggles.set_echo_records(values.echo_records.unwrap_or(self.toggles.echo_records()));
        settings
    }

    pub fn validate(&self) -> Result<(), ConfigFault> {
        if self.toggles.enable_link() {
            if self.ssid.is_empty() {
                return Err(ConfigFault::MissingSsid);
            }
            if self.endpoint.is_empty() {
                return Err(ConfigFault::MissingEndpoint);
            }
        }

        if !self.endpoint.is_empty()
            && !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"))
        {
            return Err(ConfigFault::InvalidEndpoint(self.endpoint.clone()));
        }

        if self.mount_path.is_empty() {
            return Err(ConfigFault::EmptyMountPath);
        }

        if self.log_file_name.contains(|c: char| c == '/' || c == '\\') || self.log_file_name == ".." {
            return Err(ConfigFault::InvalidLogFileName(self.log_file_name.clone()));
        }

        Ok(())
    }

    pub fn link_enabled(&self) -> bool {
        self.toggles.enable_link()
    }

    pub fn alerts_enabled(&self) -> bool {
        self.toggles.enable_alerts()
    }

    pub fn echo_records(&self) -> bool {
        self.toggles.echo_records()
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_s as u64 * 1000
    }
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self::new()
    }
}
