mod commands;
mod config;
mod renderer;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    AlwaysConfirm, CallOutcome, Confirmation, Controller, ControllerOptions, HttpDeviceService,
    ViewRenderer,
};
use commands::{Command, HELP};
use renderer::{SharedInput, StdinConfirmation, TerminalRenderer};
use shared::domain::Filter;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Operator console for a Bluetooth/Wi-Fi device service")]
struct Args {
    /// Base URL of the device service, e.g. http://raspberrypi.local:5000
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// List every device instead of audio-capable ones only.
    #[arg(long)]
    all_devices: bool,
    /// Skip the forget confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(url) = args.service_url {
        settings.service_url = url;
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if args.all_devices {
        settings.audio_only = false;
    }

    let base = settings.service_url()?;
    let service = HttpDeviceService::with_timeout(base, settings.request_timeout())
        .context("failed to build http client")?;
    info!(service_url = %service.base_url(), "console starting");

    let input: SharedInput = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let confirmation: Arc<dyn Confirmation> = if args.yes {
        Arc::new(AlwaysConfirm)
    } else {
        Arc::new(StdinConfirmation::new(input.clone()))
    };

    let controller = Controller::new(
        Arc::new(service),
        Arc::new(TerminalRenderer),
        confirmation,
        ControllerOptions {
            poll_interval: settings.poll_interval(),
            filter: Filter {
                audio_only: settings.audio_only,
            },
        },
    );
    controller.start().await;
    println!("type 'help' for commands");

    loop {
        let line = input.lock().await.next_line().await?;
        let Some(line) = line else {
            break;
        };
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(err) = dispatch(&controller, command).await {
            warn!(error = %err, "command failed");
            println!("error: {err:#}");
        }
    }

    controller.shutdown().await;
    Ok(())
}

async fn dispatch(controller: &Arc<Controller>, command: Command) -> Result<()> {
    match command {
        Command::ToggleScan => {
            if controller.toggle_scan().await?.is_none() {
                println!("scan toggle already in progress");
            }
        }
        Command::Select(mac) => {
            controller.select(mac).await?;
        }
        Command::Follow(mac) => {
            if controller.follow_identity(&mac).await?.is_none() {
                println!("{mac} has no identity link");
            }
        }
        Command::Connect => report_action(controller.connect().await),
        Command::Disconnect => report_action(controller.disconnect().await),
        Command::Forget => report_action(controller.forget().await),
        Command::TestAudio => report_action(controller.test_audio().await),
        Command::Refresh => controller.refresh().await?,
        Command::AudioOnly(audio_only) => controller.set_audio_only(audio_only).await?,
        Command::ShowLog => println!("{}", controller.last_log().await),
        Command::ClearLog => controller.clear_log().await,
        Command::AccessPoint => println!("access point: {}", controller.access_point_ssid().await?),
        Command::SetAccessPoint(ssid) => {
            let applied = controller.set_access_point_ssid(&ssid).await?;
            println!("access point renamed to {applied}");
        }
        Command::WifiScan => {
            let scan = controller.scan_wifi_networks().await?;
            if !scan.has_wifi {
                println!("no wifi client interface");
            }
            for network in scan.networks {
                println!("  {network}");
            }
        }
        Command::WifiConnect(ssid) => {
            let ssid = controller.connect_wifi(&ssid).await?;
            println!("connecting to {ssid}");
        }
        Command::WifiInfo => {
            for (name, addr) in controller.wifi_interfaces().await? {
                println!(
                    "  {name}: ip={} mask={} gw={}",
                    addr.ip.as_deref().unwrap_or("-"),
                    addr.mask.as_deref().unwrap_or("-"),
                    addr.gateway.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Status => {
            let snapshot = controller.snapshot().await;
            TerminalRenderer.render(&snapshot);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn report_action<T>(outcome: Option<CallOutcome<T>>) {
    if outcome.is_none() {
        println!("nothing sent");
    }
}
