//! Support code for the relay console tools: the JSON-lines wire
//! protocol spoken to the backend process, the TCP transport bridging it
//! into the `usbl_ui` session, local serial enumeration, and the console
//! command grammar.

use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;

use crossbeam::channel;
use serde::{Deserialize, Serialize};

use usbl_ui::transport::{BackendEvent, SendError, Transport};
use usbl_ui::ui::AttrKey;

/// One line from the backend, newline-delimited JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendMessage {
    AttrChanged {
        attr: String,
        value: Option<String>,
    },
    DeviceList {
        devices: Vec<String>,
    },
    Log {
        level: String,
        message: String,
    },
}

impl From<BackendMessage> for BackendEvent {
    fn from(msg: BackendMessage) -> BackendEvent {
        match msg {
            BackendMessage::AttrChanged { attr, value } => {
                BackendEvent::AttrChanged { attr, value }
            }
            BackendMessage::DeviceList { devices } => BackendEvent::DeviceList(devices),
            BackendMessage::Log { level, message } => BackendEvent::Log { level, message },
        }
    }
}

/// One line to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontendMessage {
    SetAttr {
        attr: String,
        value: Option<String>,
    },
    ListDevices,
}

/// Transport shim over a TCP connection to the backend process.
///
/// A reader thread turns inbound JSON lines into `BackendEvent`s;
/// malformed lines are dropped the same way unknown attributes are.
/// When the stream ends the thread exits and the event channel closes,
/// which the session takes as the terminal signal.
pub struct TcpTransport {
    writer: TcpStream,
    events_rx: channel::Receiver<BackendEvent>,
}

impl TcpTransport {
    pub fn connect(addr: &str) -> io::Result<TcpTransport> {
        let writer = TcpStream::connect(addr)?;
        let reader_stream = writer.try_clone()?;
        let (events_tx, events_rx) = channel::bounded::<BackendEvent>(64);
        thread::Builder::new()
            .name("backend-rx".to_string())
            .spawn(move || {
                for line in BufReader::new(reader_stream).lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(_) => break,
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let msg: BackendMessage = match serde_json::from_str(&line) {
                        Ok(msg) => msg,
                        Err(_) => continue,
                    };
                    if events_tx.send(msg.into()).is_err() {
                        break;
                    }
                }
            })?;
        Ok(TcpTransport { writer, events_rx })
    }

    fn send_line(&mut self, msg: &FrontendMessage) -> Result<(), SendError> {
        let mut line = serde_json::to_string(msg).map_err(|_| SendError::Rejected)?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .map_err(|_| SendError::Disconnected)
    }
}

impl Transport for TcpTransport {
    fn request_devices(&mut self) -> Result<(), SendError> {
        self.send_line(&FrontendMessage::ListDevices)
    }

    fn set_attr(&mut self, key: AttrKey, value: Option<&str>) -> Result<(), SendError> {
        self.send_line(&FrontendMessage::SetAttr {
            attr: key.wire_name().to_string(),
            value: value.map(str::to_string),
        })
    }

    fn receiver(&self) -> &channel::Receiver<BackendEvent> {
        &self.events_rx
    }
}

/// List local serial device paths the way the backend enumerates them,
/// with the backend's `/dev/debug` pseudo-device appended.
pub fn local_serial_devices() -> Vec<String> {
    let mut devices: Vec<String> = match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(_) => Vec::new(),
    };
    devices.sort();
    devices.push("/dev/debug".to_string());
    devices
}

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `set <slot> <value>` -- type into the slot's field.
    Set(AttrKey, String),
    /// `clear <slot>` -- empty the field (also unchecks).
    Clear(AttrKey),
    /// `on <slot>` / `off <slot>` -- the enable checkbox.
    Enable(AttrKey),
    Disable(AttrKey),
    /// Show the last device enumeration.
    Devices,
    /// Show the mirrored attribute values.
    Status,
    Quit,
}

/// Console shorthand for the four slots; full wire names work too.
pub fn slot_key(name: &str) -> Option<AttrKey> {
    match name {
        "gps" => Some(AttrKey::DevGps),
        "usbl" => Some(AttrKey::DevUsbl),
        "mav" => Some(AttrKey::AddrMav),
        "echo" => Some(AttrKey::AddrEcho),
        other => AttrKey::from_wire(other),
    }
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let verb = match parts.next() {
        Some(verb) => verb,
        None => return Err("empty command".to_string()),
    };

    fn slot_arg<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<AttrKey, String> {
        let name = parts.next().ok_or("missing slot (gps|usbl|mav|echo)")?;
        slot_key(name).ok_or_else(|| format!("unknown slot '{}'", name))
    }

    match verb {
        "set" => {
            let name = parts.next().ok_or("missing slot (gps|usbl|mav|echo)")?;
            let key = slot_key(name).ok_or_else(|| format!("unknown slot '{}'", name))?;
            let value = parts.next().ok_or("missing value")?;
            Ok(Command::Set(key, value.to_string()))
        }
        "clear" => Ok(Command::Clear(slot_arg(parts)?)),
        "on" => Ok(Command::Enable(slot_arg(parts)?)),
        "off" => Ok(Command::Disable(slot_arg(parts)?)),
        "devices" => Ok(Command::Devices),
        "status" => Ok(Command::Status),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_messages_deserialize() {
        let msg: BackendMessage = serde_json::from_str(
            r#"{"type":"attr_changed","attr":"dev_gps","value":"/dev/ttyACM0"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            BackendMessage::AttrChanged {
                attr: "dev_gps".to_string(),
                value: Some("/dev/ttyACM0".to_string()),
            }
        );

        let msg: BackendMessage =
            serde_json::from_str(r#"{"type":"attr_changed","attr":"addr_mav","value":null}"#)
                .unwrap();
        assert_eq!(
            msg,
            BackendMessage::AttrChanged {
                attr: "addr_mav".to_string(),
                value: None,
            }
        );

        let msg: BackendMessage = serde_json::from_str(
            r#"{"type":"device_list","devices":["/dev/ttyUSB0","/dev/debug"]}"#,
        )
        .unwrap();
        assert_eq!(
            BackendEvent::from(msg),
            BackendEvent::DeviceList(vec![
                "/dev/ttyUSB0".to_string(),
                "/dev/debug".to_string()
            ])
        );

        let msg: BackendMessage =
            serde_json::from_str(r#"{"type":"log","level":"info","message":"started"}"#).unwrap();
        assert_eq!(
            msg,
            BackendMessage::Log {
                level: "info".to_string(),
                message: "started".to_string(),
            }
        );
    }

    #[test]
    fn frontend_messages_serialize() {
        let line = serde_json::to_string(&FrontendMessage::SetAttr {
            attr: "dev_usbl".to_string(),
            value: None,
        })
        .unwrap();
        assert_eq!(line, r#"{"type":"set_attr","attr":"dev_usbl","value":null}"#);

        let line = serde_json::to_string(&FrontendMessage::ListDevices).unwrap();
        assert_eq!(line, r#"{"type":"list_devices"}"#);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(
            parse_command("set gps /dev/ttyACM0"),
            Ok(Command::Set(AttrKey::DevGps, "/dev/ttyACM0".to_string()))
        );
        assert_eq!(
            parse_command("set addr_mav 192.168.2.2:25100"),
            Ok(Command::Set(
                AttrKey::AddrMav,
                "192.168.2.2:25100".to_string()
            ))
        );
        assert_eq!(parse_command("on usbl"), Ok(Command::Enable(AttrKey::DevUsbl)));
        assert_eq!(parse_command("off echo"), Ok(Command::Disable(AttrKey::AddrEcho)));
        assert_eq!(parse_command("clear gps"), Ok(Command::Clear(AttrKey::DevGps)));
        assert_eq!(parse_command("devices"), Ok(Command::Devices));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
    }

    #[test]
    fn bad_commands_report_what_is_wrong() {
        assert!(parse_command("").is_err());
        assert!(parse_command("set").is_err());
        assert!(parse_command("set gps").is_err());
        assert!(parse_command("on sonar").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
