use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Device, DeviceInfo, Mac, Ssid};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceListResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterStatus {
    #[serde(default)]
    pub powered: bool,
    #[serde(default)]
    pub discovering: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub wanted: bool,
    #[serde(default)]
    pub status: AdapterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    On,
    Off,
}

impl ScanCommand {
    pub fn route(self) -> &'static str {
        match self {
            ScanCommand::On => "api/scan_on",
            ScanCommand::Off => "api/scan_off",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacRequest {
    pub mac: Mac,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestAudioRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<Mac>,
}

/// Body of every device action endpoint. The service may send this with a
/// non-2xx status when the operation failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<DeviceInfo>,
}

impl ActionResponse {
    pub fn log_text(&self) -> &str {
        self.log.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsidPayload {
    pub ssid: Ssid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WifiNetworksResponse {
    #[serde(default)]
    pub has_wifi: bool,
    #[serde(default)]
    pub networks: Vec<Ssid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Interface name to address details.
pub type InterfaceMap = BTreeMap<String, InterfaceAddress>;
