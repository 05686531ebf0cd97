//! Data handed to the external view renderer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::domain::{Device, DeviceInfo, Mac};

use crate::{coordinator::ControlStates, coordinator::Notice, poller::ScanIntent};

/// Full, self-contained view of the controller. Renderers never receive diffs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub devices: Vec<Device>,
    pub selected: Option<Mac>,
    pub status: Option<DeviceInfo>,
    pub controls: ControlStates,
    pub scan: ScanView,
    pub audio_only: bool,
}

impl ViewSnapshot {
    pub fn selected_device(&self) -> Option<&Device> {
        let selected = self.selected.as_ref()?;
        self.devices.iter().find(|device| &device.mac == selected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanView {
    pub intent: ScanIntent,
    pub polling: bool,
    pub toggle_enabled: bool,
}

/// Raw text of the latest action, replaced wholesale by each new action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogView {
    pub text: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LogView {
    pub fn replace(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.updated_at = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        self.replace(String::new());
    }
}

pub trait ViewRenderer: Send + Sync {
    fn render(&self, snapshot: &ViewSnapshot);
    fn show_log(&self, log: &LogView);
    fn notify(&self, notice: &Notice);
}

/// Operator confirmation for destructive actions.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

pub struct AlwaysConfirm;

#[async_trait]
impl Confirmation for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
