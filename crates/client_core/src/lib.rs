use std::{sync::Arc, time::Duration};

use shared::{
    domain::{Device, DeviceInfo, DeviceStatus, Filter, Mac},
    protocol::ScanCommand,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod coordinator;
pub mod outcome;
pub mod poller;
pub mod registry;
pub mod service;
pub mod view;
pub mod wifi;

pub use coordinator::{Action, Control, ControlStates, Notice};
pub use outcome::CallOutcome;
pub use poller::{ScanIntent, ScanState};
pub use service::{HttpDeviceService, RemoteDeviceService, ServiceError};
pub use view::{AlwaysConfirm, Confirmation, LogView, ScanView, ViewRenderer, ViewSnapshot};
pub use wifi::WifiError;

use coordinator::BusyFlags;
use poller::ScanPoller;
use registry::DeviceRegistry;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    pub filter: Filter,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: poller::DEFAULT_POLL_INTERVAL,
            filter: Filter::default(),
        }
    }
}

/// Live status for one address, as last fetched from the info endpoint.
#[derive(Debug, Clone)]
struct FetchedStatus {
    mac: Mac,
    info: DeviceInfo,
}

struct ControllerState {
    registry: DeviceRegistry,
    status: Option<FetchedStatus>,
    poller: ScanPoller,
    filter: Filter,
    log: LogView,
}

impl ControllerState {
    fn selected_info(&self) -> Option<&DeviceInfo> {
        let selected = self.registry.selected()?;
        self.status
            .as_ref()
            .filter(|status| &status.mac == selected)
            .map(|status| &status.info)
    }

    /// Registry entry first; the info record covers a selection that has not
    /// been discovered yet.
    fn selected_status(&self) -> Option<DeviceStatus> {
        self.registry
            .selected_status()
            .or_else(|| self.selected_info().map(DeviceInfo::status))
    }
}

/// Owns the device registry, selection, scan poller and log, and mediates
/// every exchange with the remote device service.
///
/// The state lock is never held across a remote call: responses are applied
/// in completion order, replacing or merging by key.
pub struct Controller {
    service: Arc<dyn RemoteDeviceService>,
    renderer: Arc<dyn ViewRenderer>,
    confirmation: Arc<dyn Confirmation>,
    busy: BusyFlags,
    inner: Mutex<ControllerState>,
}

impl Controller {
    pub fn new(
        service: Arc<dyn RemoteDeviceService>,
        renderer: Arc<dyn ViewRenderer>,
        confirmation: Arc<dyn Confirmation>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            renderer,
            confirmation,
            busy: BusyFlags::default(),
            inner: Mutex::new(ControllerState {
                registry: DeviceRegistry::new(),
                status: None,
                poller: ScanPoller::new(options.poll_interval),
                filter: options.filter,
                log: LogView::default(),
            }),
        })
    }

    /// Initial load: scan state, device list, then the selection's status.
    /// A failure lands in the log view instead of aborting.
    pub async fn start(self: &Arc<Self>) {
        let result = async {
            self.sync_scan().await?;
            self.load_devices().await?;
            self.refresh_selected().await?;
            Ok::<_, ServiceError>(())
        }
        .await;
        if let Err(err) = result {
            warn!(error = %err, "initial load failed");
            self.replace_log(err.to_string()).await;
        }
    }

    pub async fn shutdown(&self) {
        self.inner.lock().await.poller.stop();
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let state = self.inner.lock().await;
        self.build_snapshot(&state)
    }

    pub async fn selected_mac(&self) -> Option<Mac> {
        self.inner.lock().await.registry.selected().cloned()
    }

    pub async fn devices(&self) -> Vec<Device> {
        self.inner.lock().await.registry.devices().to_vec()
    }

    pub async fn is_polling(&self) -> bool {
        self.inner.lock().await.poller.is_polling()
    }

    pub async fn scan_intent(&self) -> ScanIntent {
        self.inner.lock().await.poller.intent()
    }

    pub fn is_busy(&self, control: Control) -> bool {
        self.busy.is_busy(control)
    }

    /// Fetches the device list and replaces the whole mapping with it.
    pub async fn load_devices(&self) -> Result<Vec<Device>, ServiceError> {
        let filter = self.inner.lock().await.filter;
        let devices = self.service.list_devices(filter).await?;

        let mut state = self.inner.lock().await;
        state.registry.replace_all(devices);
        debug!(count = state.registry.devices().len(), "device list replaced");
        self.render_locked(&state);
        Ok(state.registry.devices().to_vec())
    }

    /// Fetches live status for `mac` and merges it into an existing entry.
    /// An empty `mac` is a no-op returning `None`.
    pub async fn load_info(&self, mac: &Mac) -> Result<Option<DeviceInfo>, ServiceError> {
        if mac.is_empty() {
            return Ok(None);
        }
        let info = self.service.device_info(mac).await?;

        let mut state = self.inner.lock().await;
        if !state.registry.merge_info(mac, &info) {
            debug!(%mac, "status for undiscovered device; registry unchanged");
        }
        if state.registry.selected() == Some(mac) {
            state.status = Some(FetchedStatus {
                mac: mac.clone(),
                info: info.clone(),
            });
        }
        self.render_locked(&state);
        Ok(Some(info))
    }

    /// Refreshes the status of whatever is selected right now.
    pub async fn refresh_selected(&self) -> Result<Option<DeviceInfo>, ServiceError> {
        let selected = {
            let mut state = self.inner.lock().await;
            let selected = state.registry.selected().cloned();
            if selected.is_none() {
                state.status = None;
                self.render_locked(&state);
            }
            selected
        };
        match selected {
            Some(mac) => self.load_info(&mac).await,
            None => Ok(None),
        }
    }

    /// Selects `mac`, which need not be in the current list, and fetches its
    /// status.
    pub async fn select(&self, mac: Mac) -> Result<Option<DeviceInfo>, ServiceError> {
        {
            let mut state = self.inner.lock().await;
            state.registry.select(mac);
            self.render_locked(&state);
        }
        self.refresh_selected().await
    }

    /// Follows the identity link of `mac` to the address it points at.
    pub async fn follow_identity(&self, mac: &Mac) -> Result<Option<DeviceInfo>, ServiceError> {
        let target = {
            let state = self.inner.lock().await;
            state
                .registry
                .get(mac)
                .and_then(Device::linked_identity)
                .cloned()
        };
        match target {
            Some(identity) => {
                info!(from = %mac, to = %identity, "following identity link");
                self.select(identity).await
            }
            None => Ok(None),
        }
    }

    /// Manual refresh: list, then the selection's status.
    pub async fn refresh(&self) -> Result<(), ServiceError> {
        self.load_devices().await?;
        self.refresh_selected().await?;
        Ok(())
    }

    pub async fn set_audio_only(&self, audio_only: bool) -> Result<(), ServiceError> {
        self.inner.lock().await.filter = Filter { audio_only };
        self.refresh().await
    }

    /// Fetches the scan status and aligns the poller with it. On failure the
    /// poller keeps its current state.
    pub async fn sync_scan(self: &Arc<Self>) -> Result<bool, ServiceError> {
        let status = self.service.scan_status().await?;
        let scan = ScanState::from(&status);

        let weak = Arc::downgrade(self);
        let mut state = self.inner.lock().await;
        let on = state.poller.sync(scan, move || {
            let weak = weak.clone();
            async move {
                let Some(controller) = weak.upgrade() else {
                    return;
                };
                if let Err(err) = controller.load_devices().await {
                    warn!(error = %err, "scan poll refresh failed");
                }
            }
        });
        self.render_locked(&state);
        Ok(on)
    }

    /// Issues the opposite of the displayed scan intent, then re-syncs from
    /// the server's own report. Returns the command sent, or `None` when a
    /// toggle is already in flight.
    pub async fn toggle_scan(self: &Arc<Self>) -> Result<Option<ScanCommand>, ServiceError> {
        let result = {
            let Some(_busy) = self.busy.try_acquire(Control::ScanToggle) else {
                return Ok(None);
            };
            self.render().await;
            let command = self.inner.lock().await.poller.intent().toggle_command();
            info!(?command, "scan toggle");
            let sent = self.service.set_scan(command).await;
            if let Err(err) = &sent {
                warn!(?command, error = %err, "scan command failed");
            }
            let synced = self.sync_scan().await;
            sent.and(synced).map(|_| command)
        };
        self.render().await;
        result.map(Some)
    }

    pub async fn last_log(&self) -> String {
        self.inner.lock().await.log.text.clone()
    }

    pub async fn clear_log(&self) {
        let mut state = self.inner.lock().await;
        state.log.clear();
        self.renderer.show_log(&state.log);
    }

    async fn replace_log(&self, text: impl Into<String>) {
        let mut state = self.inner.lock().await;
        state.log.replace(text);
        self.renderer.show_log(&state.log);
    }

    async fn render(&self) {
        let state = self.inner.lock().await;
        self.render_locked(&state);
    }

    fn render_locked(&self, state: &ControllerState) {
        self.renderer.render(&self.build_snapshot(state));
    }

    fn build_snapshot(&self, state: &ControllerState) -> ViewSnapshot {
        ViewSnapshot {
            devices: state.registry.devices().to_vec(),
            selected: state.registry.selected().cloned(),
            status: state.selected_info().cloned(),
            controls: ControlStates::for_status(state.selected_status()).without_busy(&self.busy),
            scan: ScanView {
                intent: state.poller.intent(),
                polling: state.poller.is_polling(),
                toggle_enabled: !self.busy.is_busy(Control::ScanToggle),
            },
            audio_only: state.filter.audio_only,
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
