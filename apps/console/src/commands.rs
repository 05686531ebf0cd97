use anyhow::{anyhow, bail};
use shared::domain::Mac;

use crate::config::parse_flag;

pub const HELP: &str = "\
commands:
  scan                 toggle discovery
  select <mac>         select a device
  follow <mac>         select the identity linked to <mac>
  connect | disconnect | forget | test-audio
  refresh              reload devices and selected status
  audio-only on|off    filter the device list
  log [clear]          show or clear the last action log
  ap                   show access point SSID
  ap-set <ssid>        rename the access point
  wifi-scan            list visible networks
  wifi-connect <ssid>  join a network
  wifi-info            show interface addresses
  status               redraw the device view
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleScan,
    Select(Mac),
    Follow(Mac),
    Connect,
    Disconnect,
    Forget,
    TestAudio,
    Refresh,
    AudioOnly(bool),
    ShowLog,
    ClearLog,
    AccessPoint,
    SetAccessPoint(String),
    WifiScan,
    WifiConnect(String),
    WifiInfo,
    Status,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "scan" => Command::ToggleScan,
        "select" => Command::Select(Mac::new(required(rest, "select <mac>")?)),
        "follow" => Command::Follow(Mac::new(required(rest, "follow <mac>")?)),
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "forget" => Command::Forget,
        "test-audio" | "test" => Command::TestAudio,
        "refresh" => Command::Refresh,
        "audio-only" => Command::AudioOnly(parse_flag(required(rest, "audio-only on|off")?)?),
        "log" => match rest {
            "" => Command::ShowLog,
            "clear" => Command::ClearLog,
            other => bail!("unknown log option '{other}'"),
        },
        "ap" => Command::AccessPoint,
        // SSIDs may contain spaces; take the rest of the line verbatim.
        "ap-set" => Command::SetAccessPoint(rest.to_string()),
        "wifi-scan" => Command::WifiScan,
        "wifi-connect" => Command::WifiConnect(rest.to_string()),
        "wifi-info" => Command::WifiInfo,
        "status" | "ls" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(anyhow!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(command))
}

fn required<'a>(rest: &'a str, usage: &str) -> anyhow::Result<&'a str> {
    if rest.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_commands() {
        assert_eq!(
            parse("select AA:BB:CC:DD:EE:FF").expect("parse"),
            Some(Command::Select(Mac::new("AA:BB:CC:DD:EE:FF")))
        );
        assert_eq!(parse("  forget ").expect("parse"), Some(Command::Forget));
        assert_eq!(parse("").expect("parse"), None);
    }

    #[test]
    fn ssid_keeps_inner_spaces() {
        assert_eq!(
            parse("ap-set  Living Room ").expect("parse"),
            Some(Command::SetAccessPoint("Living Room".to_string()))
        );
    }

    #[test]
    fn audio_only_needs_a_flag() {
        assert_eq!(
            parse("audio-only off").expect("parse"),
            Some(Command::AudioOnly(false))
        );
        assert!(parse("audio-only").is_err());
        assert!(parse("audio-only sometimes").is_err());
    }

    #[test]
    fn unknown_commands_are_errors() {
        assert!(parse("pair AA").is_err());
        assert!(parse("log everything").is_err());
    }
}
