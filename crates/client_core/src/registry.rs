//! Known-device mapping and selection.

use std::collections::HashMap;

use shared::domain::{Device, DeviceInfo, DeviceStatus, Mac};

#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    index: HashMap<Mac, usize>,
    selected: Option<Mac>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn get(&self, mac: &Mac) -> Option<&Device> {
        self.index.get(mac).map(|&slot| &self.devices[slot])
    }

    pub fn contains(&self, mac: &Mac) -> bool {
        self.index.contains_key(mac)
    }

    pub fn selected(&self) -> Option<&Mac> {
        self.selected.as_ref()
    }

    /// Status of the selected device as currently known to the registry.
    pub fn selected_status(&self) -> Option<DeviceStatus> {
        self.selected
            .as_ref()
            .and_then(|mac| self.get(mac))
            .map(Device::status)
    }

    /// Replaces the whole mapping with `incoming`.
    ///
    /// A repeated `mac` keeps the slot of its first occurrence and the data of
    /// its last. The selection is only touched when none exists, in which case
    /// the first device becomes selected.
    pub fn replace_all(&mut self, incoming: Vec<Device>) {
        let mut devices: Vec<Device> = Vec::with_capacity(incoming.len());
        let mut index = HashMap::with_capacity(incoming.len());
        for mut device in incoming {
            if device.mac.is_empty() {
                continue;
            }
            normalize_identity(&mut device);
            match index.get(&device.mac) {
                Some(&slot) => devices[slot] = device,
                None => {
                    index.insert(device.mac.clone(), devices.len());
                    devices.push(device);
                }
            }
        }
        self.devices = devices;
        self.index = index;
        self.apply_default_selection();
    }

    /// Merges a partial status record into an existing entry.
    ///
    /// Returns `false` without touching the mapping when `mac` is unknown;
    /// only a list fetch creates entries.
    pub fn merge_info(&mut self, mac: &Mac, info: &DeviceInfo) -> bool {
        let Some(&slot) = self.index.get(mac) else {
            return false;
        };
        let device = &mut self.devices[slot];
        if let Some(alias) = info.alias.as_ref().filter(|alias| !alias.is_empty()) {
            device.alias = Some(alias.clone());
        }
        if let Some(name) = &info.name {
            device.name = Some(name.clone());
        }
        if let Some(identity) = &info.identity {
            device.identity = Some(identity.clone());
        }
        if let Some(paired) = info.paired {
            device.paired = paired;
        }
        if let Some(trusted) = info.trusted {
            device.trusted = trusted;
        }
        if let Some(connected) = info.connected {
            device.connected = connected;
        }
        normalize_identity(device);
        true
    }

    /// Sets the selection, even to an address that has not been discovered.
    /// An empty address clears it.
    pub fn select(&mut self, mac: Mac) {
        self.selected = if mac.is_empty() { None } else { Some(mac) };
    }

    /// Clears the selection if it currently points at `mac`.
    pub fn clear_selection_if(&mut self, mac: &Mac) -> bool {
        if self.selected.as_ref() == Some(mac) {
            self.selected = None;
            true
        } else {
            false
        }
    }

    pub fn apply_default_selection(&mut self) {
        if self.selected.is_none() {
            self.selected = self.devices.first().map(|device| device.mac.clone());
        }
    }
}

fn normalize_identity(device: &mut Device) {
    if device
        .identity
        .as_ref()
        .is_some_and(|identity| *identity == device.mac || identity.is_empty())
    {
        device.identity = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(mac: &str) -> Device {
        Device::new(mac)
    }

    fn macs(registry: &DeviceRegistry) -> Vec<&str> {
        registry
            .devices()
            .iter()
            .map(|device| device.mac.as_str())
            .collect()
    }

    #[test]
    fn replace_all_keeps_exactly_the_latest_keys() {
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![device("A"), device("B"), device("C")]);
        registry.replace_all(vec![device("C"), device("D")]);
        assert_eq!(macs(&registry), vec!["C", "D"]);
        assert!(!registry.contains(&Mac::new("A")));
        assert_eq!(registry.devices().len(), 2);
    }

    #[test]
    fn default_selection_picks_first_device() {
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![device("A"), device("B")]);
        assert_eq!(registry.selected(), Some(&Mac::new("A")));
    }

    #[test]
    fn existing_selection_survives_replace_even_when_missing() {
        let mut registry = DeviceRegistry::new();
        registry.select(Mac::new("Z"));
        registry.replace_all(vec![device("A")]);
        assert_eq!(registry.selected(), Some(&Mac::new("Z")));
    }

    #[test]
    fn duplicate_macs_take_last_value_in_first_slot() {
        let mut first = device("A");
        first.alias = Some("old".to_string());
        let mut last = device("A");
        last.alias = Some("new".to_string());
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![first, device("B"), last]);
        assert_eq!(macs(&registry), vec!["A", "B"]);
        assert_eq!(
            registry.get(&Mac::new("A")).and_then(|d| d.alias.as_deref()),
            Some("new")
        );
    }

    #[test]
    fn merge_info_preserves_alias_when_absent() {
        let mut speaker = device("11:22");
        speaker.alias = Some("Speaker".to_string());
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![speaker]);

        let merged = registry.merge_info(
            &Mac::new("11:22"),
            &DeviceInfo {
                alias: None,
                connected: Some(true),
                ..DeviceInfo::default()
            },
        );

        assert!(merged);
        let entry = registry.get(&Mac::new("11:22")).expect("entry");
        assert_eq!(entry.alias.as_deref(), Some("Speaker"));
        assert!(entry.connected);
        assert!(!entry.paired);
    }

    #[test]
    fn merge_info_never_creates_entries() {
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![device("A")]);
        let merged = registry.merge_info(
            &Mac::new("B"),
            &DeviceInfo {
                paired: Some(true),
                ..DeviceInfo::default()
            },
        );
        assert!(!merged);
        assert_eq!(macs(&registry), vec!["A"]);
    }

    #[test]
    fn self_identity_is_dropped_on_ingest_and_merge() {
        let mut looped = device("A");
        looped.identity = Some(Mac::new("A"));
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![looped]);
        assert_eq!(registry.get(&Mac::new("A")).and_then(|d| d.identity.clone()), None);

        registry.merge_info(
            &Mac::new("A"),
            &DeviceInfo {
                identity: Some(Mac::new("A")),
                ..DeviceInfo::default()
            },
        );
        assert_eq!(registry.get(&Mac::new("A")).and_then(|d| d.identity.clone()), None);
    }

    #[test]
    fn selecting_empty_mac_clears_selection() {
        let mut registry = DeviceRegistry::new();
        registry.select(Mac::new("A"));
        registry.select(Mac::new(""));
        assert_eq!(registry.selected(), None);
    }

    #[test]
    fn clear_selection_if_only_matches_current_selection() {
        let mut registry = DeviceRegistry::new();
        registry.replace_all(vec![device("A"), device("B")]);
        assert!(!registry.clear_selection_if(&Mac::new("B")));
        assert!(registry.clear_selection_if(&Mac::new("A")));
        assert_eq!(registry.selected(), None);
    }
}
