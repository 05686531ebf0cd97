//! Operator actions against the selected device.
//!
//! Every action runs the same template: require a selection, mark its control
//! busy, issue one remote call, replace the log with the call's output, raise
//! at most one notice, re-sync the registry, then release the control.

use std::sync::atomic::{AtomicBool, Ordering};

use shared::{
    domain::{DeviceStatus, Mac},
    error::RemoteFailure,
    protocol::ActionResponse,
};
use tracing::{debug, info, warn};

use crate::{outcome::CallOutcome, service::ServiceError, Controller};

pub const FORGET_PROMPT: &str = "Forget this device? This will unpair and remove it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Connect,
    Disconnect,
    Forget,
    TestAudio,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Connect,
        Action::Disconnect,
        Action::Forget,
        Action::TestAudio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Connect => "connect",
            Action::Disconnect => "disconnect",
            Action::Forget => "forget",
            Action::TestAudio => "test_audio",
        }
    }

    pub fn control(self) -> Control {
        match self {
            Action::Connect => Control::Connect,
            Action::Disconnect => Control::Disconnect,
            Action::Forget => Control::Forget,
            Action::TestAudio => Control::TestAudio,
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Action::Connect => "Connect failed",
            Action::Disconnect => "Disconnect may not have completed",
            Action::Forget => "Forget may not have completed",
            Action::TestAudio => "Test audio failed",
        }
    }

    fn transport_message(self) -> &'static str {
        match self {
            Action::Connect => "Connect failed",
            Action::Disconnect => "Disconnect failed",
            Action::Forget => "Forget failed",
            Action::TestAudio => "Test audio failed",
        }
    }
}

/// A user-facing, modal-style failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub action: Action,
    pub message: String,
}

impl Notice {
    pub fn failure(action: Action, failure: &RemoteFailure) -> Self {
        let message = match failure.stage.as_deref() {
            Some(stage) => format!("{} (stage: {stage})", action.failure_message()),
            None => action.failure_message().to_string(),
        };
        Self { action, message }
    }

    pub fn transport(action: Action) -> Self {
        Self {
            action,
            message: action.transport_message().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Connect,
    Disconnect,
    Forget,
    TestAudio,
    ScanToggle,
}

/// Enablement of the four device action controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStates {
    pub connect: bool,
    pub disconnect: bool,
    pub forget: bool,
    pub test_audio: bool,
}

impl ControlStates {
    /// Enablement derived from the latest known status of the selection.
    /// Unknown status disables everything.
    pub fn for_status(status: Option<DeviceStatus>) -> Self {
        let Some(status) = status else {
            return Self::default();
        };
        Self {
            connect: !status.connected,
            disconnect: status.connected,
            forget: status.paired || status.trusted,
            test_audio: status.connected,
        }
    }

    pub fn without_busy(mut self, busy: &BusyFlags) -> Self {
        self.connect &= !busy.is_busy(Control::Connect);
        self.disconnect &= !busy.is_busy(Control::Disconnect);
        self.forget &= !busy.is_busy(Control::Forget);
        self.test_audio &= !busy.is_busy(Control::TestAudio);
        self
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        match action {
            Action::Connect => self.connect,
            Action::Disconnect => self.disconnect,
            Action::Forget => self.forget,
            Action::TestAudio => self.test_audio,
        }
    }

    pub fn all_disabled(&self) -> bool {
        Action::ALL.iter().all(|action| !self.is_enabled(*action))
    }
}

#[derive(Debug, Default)]
pub struct BusyFlags {
    flags: [AtomicBool; 5],
}

impl BusyFlags {
    fn flag(&self, control: Control) -> &AtomicBool {
        &self.flags[control as usize]
    }

    pub fn is_busy(&self, control: Control) -> bool {
        self.flag(control).load(Ordering::SeqCst)
    }

    /// Marks `control` busy until the returned guard is dropped. `None` when
    /// it is already busy.
    pub fn try_acquire(&self, control: Control) -> Option<BusyGuard<'_>> {
        self.flag(control)
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                flag: self.flag(control),
                control,
            })
    }
}

pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
    control: Control,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        debug!(control = ?self.control, "control released");
    }
}

impl Controller {
    pub async fn connect(&self) -> Option<CallOutcome<ActionResponse>> {
        self.run_action(Action::Connect).await
    }

    pub async fn disconnect(&self) -> Option<CallOutcome<ActionResponse>> {
        self.run_action(Action::Disconnect).await
    }

    /// Asks for confirmation first; declining is a no-op.
    pub async fn forget(&self) -> Option<CallOutcome<ActionResponse>> {
        self.run_action(Action::Forget).await
    }

    /// Plays the test sound on the selected device.
    pub async fn test_audio(&self) -> Option<CallOutcome<ActionResponse>> {
        self.run_action(Action::TestAudio).await
    }

    /// Runs `action` against the selection. `None` means nothing was sent:
    /// no selection, the control was already busy, or forget was declined.
    pub async fn run_action(&self, action: Action) -> Option<CallOutcome<ActionResponse>> {
        let Some(mac) = self.selected_mac().await else {
            debug!(action = action.name(), "no device selected; ignoring");
            return None;
        };
        if self.busy.is_busy(action.control()) {
            debug!(action = action.name(), "already in flight; ignoring");
            return None;
        }
        if action == Action::Forget && !self.confirmation.confirm(FORGET_PROMPT).await {
            info!(%mac, "forget declined");
            return None;
        }

        let outcome = {
            let Some(_busy) = self.busy.try_acquire(action.control()) else {
                debug!(action = action.name(), "already in flight; ignoring");
                return None;
            };
            self.render().await;

            let result = match action {
                Action::Connect => self.service.connect(&mac).await,
                Action::Disconnect => self.service.disconnect(&mac).await,
                Action::Forget => self.service.forget(&mac).await,
                Action::TestAudio => self.service.test_audio(Some(&mac)).await,
            };
            let outcome = CallOutcome::from_action(result);
            self.publish_outcome(action, &mac, &outcome).await;
            self.resync_after(action, &mac).await;
            outcome
        };

        self.render().await;
        Some(outcome)
    }

    async fn publish_outcome(
        &self,
        action: Action,
        mac: &Mac,
        outcome: &CallOutcome<ActionResponse>,
    ) {
        self.replace_log(outcome.log_text()).await;
        match outcome {
            CallOutcome::Success(_) => {
                info!(action = action.name(), %mac, "action completed");
            }
            CallOutcome::Failure(failure) => {
                warn!(action = action.name(), %mac, stage = ?failure.stage, "action reported failure");
                self.renderer.notify(&Notice::failure(action, failure));
            }
            CallOutcome::TransportError(cause) => {
                warn!(action = action.name(), %mac, error = %cause, "action transport failure");
                self.renderer.notify(&Notice::transport(action));
            }
        }
    }

    /// Runs regardless of the outcome: a failed call may still have changed
    /// remote state.
    async fn resync_after(&self, action: Action, mac: &Mac) {
        let result = match action {
            Action::Forget => self.resync_after_forget(mac).await,
            _ => self.load_info(mac).await.map(|_| ()),
        };
        if let Err(err) = result {
            warn!(action = action.name(), %mac, error = %err, "post-action re-sync failed");
        }
    }

    async fn resync_after_forget(&self, mac: &Mac) -> Result<(), ServiceError> {
        let listed = self.load_devices().await.map(|_| ());
        {
            let mut state = self.inner.lock().await;
            if state.registry.clear_selection_if(mac) {
                state.status = None;
                state.registry.apply_default_selection();
            }
        }
        let refreshed = self.refresh_selected().await.map(|_| ());
        listed.and(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(paired: bool, trusted: bool, connected: bool) -> Option<DeviceStatus> {
        Some(DeviceStatus {
            paired,
            trusted,
            connected,
        })
    }

    #[test]
    fn unknown_status_disables_everything() {
        assert!(ControlStates::for_status(None).all_disabled());
    }

    #[test]
    fn new_device_only_allows_connect() {
        let controls = ControlStates::for_status(status(false, false, false));
        assert_eq!(
            controls,
            ControlStates {
                connect: true,
                disconnect: false,
                forget: false,
                test_audio: false,
            }
        );
    }

    #[test]
    fn connected_paired_device_allows_everything_but_connect() {
        let controls = ControlStates::for_status(status(true, false, true));
        assert!(!controls.connect);
        assert!(controls.disconnect && controls.forget && controls.test_audio);
    }

    #[test]
    fn trusted_only_device_can_be_forgotten() {
        assert!(ControlStates::for_status(status(false, true, false)).forget);
    }

    #[test]
    fn busy_control_is_disabled_until_guard_drops() {
        let busy = BusyFlags::default();
        let controls = ControlStates::for_status(status(false, false, false));
        {
            let guard = busy.try_acquire(Control::Connect);
            assert!(guard.is_some());
            assert!(busy.try_acquire(Control::Connect).is_none());
            assert!(!controls.without_busy(&busy).connect);
        }
        assert!(!busy.is_busy(Control::Connect));
        assert!(controls.without_busy(&busy).connect);
    }

    #[test]
    fn failure_notice_carries_stage() {
        let notice = Notice::failure(
            Action::Connect,
            &RemoteFailure::new("ERROR pairing", Some("pair".to_string())),
        );
        assert_eq!(notice.message, "Connect failed (stage: pair)");
        assert_eq!(
            Notice::failure(Action::Forget, &RemoteFailure::new("", None)).message,
            "Forget may not have completed"
        );
        assert_eq!(Notice::transport(Action::Disconnect).message, "Disconnect failed");
    }
}
