//! Background discovery polling, active exactly while scanning is on.

use std::{future::Future, time::Duration};

use futures::StreamExt;
use shared::protocol::{ScanCommand, ScanStatusResponse};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_stream::wrappers::IntervalStream;
use tracing::info;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// What the operator currently sees: scanning on or off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanIntent {
    #[default]
    Off,
    On,
}

impl ScanIntent {
    pub fn from_on(on: bool) -> Self {
        if on {
            ScanIntent::On
        } else {
            ScanIntent::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == ScanIntent::On
    }

    /// The command a toggle issues from this state.
    pub fn toggle_command(self) -> ScanCommand {
        match self {
            ScanIntent::Off => ScanCommand::On,
            ScanIntent::On => ScanCommand::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub wanted: bool,
    pub discovering: bool,
    pub running: bool,
}

impl ScanState {
    pub fn is_on(&self) -> bool {
        self.wanted || self.discovering || self.running
    }
}

impl From<&ScanStatusResponse> for ScanState {
    fn from(value: &ScanStatusResponse) -> Self {
        Self {
            wanted: value.wanted,
            discovering: value.status.discovering,
            running: value.running,
        }
    }
}

/// Handle to the repeating refresh task. Dropping it stops future ticks.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug)]
pub struct ScanPoller {
    interval: Duration,
    intent: ScanIntent,
    handle: Option<PollHandle>,
}

impl Default for ScanPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ScanPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            intent: ScanIntent::Off,
            handle: None,
        }
    }

    pub fn intent(&self) -> ScanIntent {
        self.intent
    }

    pub fn is_polling(&self) -> bool {
        self.handle.is_some()
    }

    /// Aligns the refresh task with the server-reported scan state and
    /// returns whether scanning is on.
    ///
    /// Each tick spawns `refresh` as its own task, so stopping the poller
    /// never cancels a refresh that is already in flight. Must be called from
    /// within a tokio runtime.
    pub fn sync<F, Fut>(&mut self, state: ScanState, refresh: F) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let on = state.is_on();
        self.intent = ScanIntent::from_on(on);
        match (on, self.handle.is_some()) {
            (true, false) => {
                info!(interval_ms = self.interval.as_millis() as u64, "scan: polling started");
                self.handle = Some(spawn_ticker(self.interval, refresh));
            }
            (false, true) => {
                info!("scan: polling stopped");
                self.handle = None;
            }
            _ => {}
        }
        on
    }

    pub fn stop(&mut self) {
        if self.handle.take().is_some() {
            info!("scan: polling stopped");
        }
    }
}

fn spawn_ticker<F, Fut>(period: Duration, refresh: F) -> PollHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let task = tokio::spawn(async move {
        let mut ticks = IntervalStream::new(interval);
        while ticks.next().await.is_some() {
            tokio::spawn(refresh());
        }
    });
    PollHandle { task }
}
