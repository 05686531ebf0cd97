use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! key_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

key_newtype!(Mac);
key_newtype!(Ssid);

/// A Bluetooth device as reported by the device-management service.
///
/// `mac` is the registry key. `identity` optionally names a second address
/// under which the same physical unit is known (random vs. public address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub mac: Mac,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Mac>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub paired: bool,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub connected: bool,
}

impl Device {
    pub fn new(mac: impl Into<Mac>) -> Self {
        Self {
            mac: mac.into(),
            identity: None,
            alias: None,
            name: None,
            paired: false,
            trusted: false,
            connected: false,
        }
    }

    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .filter(|alias| !alias.is_empty())
            .or_else(|| self.name.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or("(unknown)")
    }

    /// Identity link to follow, if it names a different address.
    pub fn linked_identity(&self) -> Option<&Mac> {
        self.identity
            .as_ref()
            .filter(|identity| **identity != self.mac && !identity.is_empty())
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            paired: self.paired,
            trusted: self.trusted,
            connected: self.connected,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.status().state()
    }
}

impl From<String> for Mac {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Partial device record returned by the live status endpoint.
///
/// Every field is optional: only the fields present in a response overwrite
/// what the registry already knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Mac>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

impl DeviceInfo {
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            paired: self.paired.unwrap_or(false),
            trusted: self.trusted.unwrap_or(false),
            connected: self.connected.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStatus {
    pub paired: bool,
    pub trusted: bool,
    pub connected: bool,
}

impl DeviceStatus {
    pub fn state(&self) -> DeviceState {
        if self.connected {
            DeviceState::Connected
        } else if self.paired {
            DeviceState::Paired
        } else {
            DeviceState::New
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Connected,
    Paired,
    New,
}

impl DeviceState {
    pub fn label(self) -> &'static str {
        match self {
            DeviceState::Connected => "Connected",
            DeviceState::Paired => "Paired",
            DeviceState::New => "New",
        }
    }
}

/// Client-held discovery filter, sent as `audio_only` on every list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub audio_only: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self { audio_only: true }
    }
}

impl Filter {
    pub fn query_value(&self) -> &'static str {
        if self.audio_only {
            "1"
        } else {
            "0"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_alias_then_name() {
        let mut device = Device::new("AA:BB");
        assert_eq!(device.display_name(), "(unknown)");
        device.name = Some("JBL Go".to_string());
        assert_eq!(device.display_name(), "JBL Go");
        device.alias = Some("Kitchen".to_string());
        assert_eq!(device.display_name(), "Kitchen");
    }

    #[test]
    fn self_referencing_identity_is_not_a_link() {
        let mut device = Device::new("AA:BB");
        device.identity = Some(Mac::new("AA:BB"));
        assert_eq!(device.linked_identity(), None);
        device.identity = Some(Mac::new("CC:DD"));
        assert_eq!(device.linked_identity(), Some(&Mac::new("CC:DD")));
    }

    #[test]
    fn state_label_orders_connected_over_paired() {
        let status = DeviceStatus {
            paired: true,
            trusted: false,
            connected: true,
        };
        assert_eq!(status.state().label(), "Connected");
        assert_eq!(DeviceStatus::default().state().label(), "New");
    }

    #[test]
    fn device_decodes_with_missing_optional_fields() {
        let device: Device =
            serde_json::from_str(r#"{"mac":"11:22","name":"Speaker","uuids":["110b"]}"#)
                .expect("decode");
        assert_eq!(device.mac, Mac::new("11:22"));
        assert_eq!(device.alias, None);
        assert!(!device.paired && !device.connected);
    }

    #[test]
    fn info_keeps_absent_fields_unset() {
        let info: DeviceInfo =
            serde_json::from_str(r#"{"alias":null,"connected":true}"#).expect("decode");
        assert_eq!(info.alias, None);
        assert_eq!(info.connected, Some(true));
        assert_eq!(info.paired, None);
    }
}
