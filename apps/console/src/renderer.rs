use std::{
    io::{self, Write},
    sync::Arc,
};

use async_trait::async_trait;
use client_core::{Confirmation, LogView, Notice, ScanIntent, ViewRenderer, ViewSnapshot};
use tokio::{
    io::{BufReader, Lines, Stdin},
    sync::Mutex,
};

pub type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Plain-text renderer writing to stdout. Logging goes to stderr.
pub struct TerminalRenderer;

impl TerminalRenderer {
    fn format_snapshot(snapshot: &ViewSnapshot) -> String {
        let mut out = String::new();
        let scan = match (snapshot.scan.intent, snapshot.scan.polling) {
            (ScanIntent::On, true) => "scanning",
            (ScanIntent::On, false) => "scan on",
            (ScanIntent::Off, _) => "scan off",
        };
        let filter = if snapshot.audio_only { "audio only" } else { "all devices" };
        out.push_str(&format!("-- devices ({scan}, {filter}) --\n"));

        if snapshot.devices.is_empty() {
            out.push_str("   (none)\n");
        }
        for device in &snapshot.devices {
            let marker = if snapshot.selected.as_ref() == Some(&device.mac) {
                '>'
            } else {
                ' '
            };
            out.push_str(&format!(
                "{marker}  {:<17}  {:<24} [{}]",
                device.mac,
                device.display_name(),
                device.state().label()
            ));
            if let Some(identity) = device.linked_identity() {
                out.push_str(&format!("  -> {identity}"));
            }
            out.push('\n');
        }

        if let Some(selected) = &snapshot.selected {
            if snapshot.selected_device().is_none() {
                out.push_str(&format!(">  {selected}  (not in list)\n"));
            }
        }

        let controls = snapshot.controls;
        let flag = |enabled: bool, name: &'static str| if enabled { name } else { "-" };
        out.push_str(&format!(
            "   actions: {} {} {} {}\n",
            flag(controls.connect, "connect"),
            flag(controls.disconnect, "disconnect"),
            flag(controls.forget, "forget"),
            flag(controls.test_audio, "test-audio"),
        ));
        out
    }
}

impl ViewRenderer for TerminalRenderer {
    fn render(&self, snapshot: &ViewSnapshot) {
        print!("{}", Self::format_snapshot(snapshot));
        let _ = io::stdout().flush();
    }

    fn show_log(&self, log: &LogView) {
        if log.text.is_empty() {
            return;
        }
        let stamp = log
            .updated_at
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        println!("-- log {stamp} --\n{}", log.text.trim_end());
    }

    fn notify(&self, notice: &Notice) {
        println!("!! {}", notice.message);
    }
}

/// Asks on stdout and reads the answer from the shared stdin reader.
pub struct StdinConfirmation {
    input: SharedInput,
}

impl StdinConfirmation {
    pub fn new(input: SharedInput) -> Self {
        Self { input }
    }
}

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = io::stdout().flush();
        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use client_core::{ControlStates, ScanView};
    use shared::domain::{Device, Mac};

    use super::*;

    #[test]
    fn marks_selection_and_identity_link() {
        let mut speaker = Device::new("AA:01");
        speaker.alias = Some("Kitchen".to_string());
        speaker.connected = true;
        speaker.identity = Some(Mac::new("BB:01"));
        let snapshot = ViewSnapshot {
            devices: vec![speaker, Device::new("AA:02")],
            selected: Some(Mac::new("AA:01")),
            status: None,
            controls: ControlStates {
                disconnect: true,
                test_audio: true,
                ..ControlStates::default()
            },
            scan: ScanView {
                intent: ScanIntent::On,
                polling: true,
                toggle_enabled: true,
            },
            audio_only: true,
        };

        let text = TerminalRenderer::format_snapshot(&snapshot);

        assert!(text.contains("scanning"));
        assert!(text.lines().any(|line| line.starts_with('>')
            && line.contains("Kitchen")
            && line.contains("[Connected]")
            && line.contains("-> BB:01")));
        assert!(text.contains("(unknown)"));
        assert!(text.contains("actions: - disconnect - test-audio"));
    }

    #[test]
    fn undiscovered_selection_is_listed() {
        let snapshot = ViewSnapshot {
            devices: Vec::new(),
            selected: Some(Mac::new("CC:01")),
            status: None,
            controls: ControlStates::default(),
            scan: ScanView {
                intent: ScanIntent::Off,
                polling: false,
                toggle_enabled: true,
            },
            audio_only: false,
        };

        let text = TerminalRenderer::format_snapshot(&snapshot);

        assert!(text.contains("CC:01  (not in list)"));
        assert!(text.contains("all devices"));
    }
}
