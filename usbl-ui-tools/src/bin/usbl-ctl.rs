//! usbl-ctl
//!
//! Console front end for the USBL relay backend. Binds the four
//! configuration slots (GPS device, USBL device, MAVLink endpoint,
//! echo-sounder endpoint) to discovered serial devices or network
//! addresses, and reflects live status pushed from the backend.

use getopts::Options;
use std::env;
use std::io::BufRead;
use std::process::ExitCode;
use std::time::Duration;

use crossbeam::channel;
use crossbeam::select;

use usbl_ui::session::{Event, Session, DEFAULT_REFRESH_INTERVAL};
use usbl_ui::ui::{AttrKey, UiEvent};
use usbl_ui_tools::{local_serial_devices, parse_command, Command, TcpTransport};

macro_rules! log{
    ($tf:expr, $msg:expr)=>{
    {
        println!("{}{}", chrono::Local::now().format(&$tf), $msg);
    }
    };
    ($tf:expr, $f:expr,$($a:tt)*)=>{
    {
        log!($tf, format!($f, $($a)*));
    }
    };
}

fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(unset)")
}

fn main() -> ExitCode {
    let mut opts = Options::new();
    opts.optopt(
        "c",
        "",
        "Backend address to connect to (default localhost:8077)",
        "host:port",
    );
    opts.optopt(
        "i",
        "",
        "Device refresh interval in seconds (default 5)",
        "seconds",
    );
    opts.optopt("t", "", "Timestamp format (default '%T%.3f ')", "fmt");
    opts.optflag("v", "", "Verbose output");
    opts.optflag("", "enum", "List local serial devices, then quit");

    let args: Vec<String> = env::args().collect();

    macro_rules! die{
        ($f:expr,$($a:tt)*)=>{
        {
            die!(format!($f, $($a)*));
        }
        };
        ($msg:expr)=>{
        {
            eprintln!("ERROR: {}", $msg);
            return ExitCode::FAILURE;
        }
        };
    }
    macro_rules! die_usage{
        ($f:expr,$($a:tt)*)=>{
        {
            die_usage!(format!($f, $($a)*));
        }
        };
        ($msg:expr)=>{
        {
            let usage = format!("Usage: {} [-c host:port] [-i seconds] [-t fmt] [-v]  or  {} --enum", &args[0], &args[0]);
            die!("{}\n{}", $msg, opts.usage(&usage));
        }
        };
    }

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => die_usage!("{}", f.to_string()),
    };

    if matches.opt_present("enum") {
        for dev in local_serial_devices() {
            println!(" * {}", dev);
        }
        return ExitCode::SUCCESS;
    }

    let addr = matches.opt_str("c").unwrap_or("localhost:8077".to_string());
    let interval = if let Some(secs) = matches.opt_str("i") {
        match secs.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => die_usage!("Invalid refresh interval '{}'", secs),
        }
    } else {
        DEFAULT_REFRESH_INTERVAL
    };
    let tf = matches.opt_str("t").unwrap_or("%T%.3f ".to_string());
    let verbose = matches.opt_present("v");

    let transport = match TcpTransport::connect(&addr) {
        Ok(transport) => transport,
        Err(err) => die!("Failed to connect to backend at {}: {}", addr, err),
    };
    log!(tf, "Connected to backend at {}", addr);

    let (ui_tx, ui_rx) = channel::bounded::<UiEvent>(16);
    let (status_tx, status) = channel::bounded::<Event>(64);
    let mut session = Session::with_timer(transport, ui_rx, interval, Some(status_tx));
    std::thread::spawn(move || session.run());

    let (cmd_tx, commands) = channel::bounded::<Command>(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(cmd) => {
                    let quit = cmd == Command::Quit;
                    if cmd_tx.send(cmd).is_err() || quit {
                        break;
                    }
                }
                Err(msg) => eprintln!("? {}", msg),
            }
        }
        // stdin EOF behaves like quit: dropping cmd_tx ends the main loop.
    });

    // Front-end mirror of what the session last reported, for the
    // `status` and `devices` commands.
    let mut attrs: [Option<String>; 4] = Default::default();
    let mut devices: Vec<String> = Vec::new();

    'main: loop {
        select! {
            recv(status) -> event => {
                let event = match event {
                    Ok(event) => event,
                    // Session thread gone.
                    Err(_) => return ExitCode::SUCCESS,
                };
                match event {
                    Event::Started => {
                        if verbose {
                            log!(tf, "Session started");
                        }
                    }
                    Event::RefreshRequested => {
                        if verbose {
                            log!(tf, "Requested device enumeration");
                        }
                    }
                    Event::RefreshSkipped => {
                        if verbose {
                            log!(tf, "Enumeration still outstanding, tick skipped");
                        }
                    }
                    Event::RefreshFailed => {
                        log!(tf, "Device enumeration request failed, will retry");
                    }
                    Event::SnapshotApplied { devices: list, report } => {
                        devices = list;
                        if verbose || !report.is_noop() {
                            log!(
                                tf,
                                "Devices: [{}] (+{} -{} stale {} back {})",
                                devices.join(" "),
                                report.added,
                                report.removed,
                                report.went_stale,
                                report.came_back
                            );
                        }
                    }
                    Event::AttrPushed(key, value) => {
                        attrs[key as usize] = value.clone();
                        if verbose {
                            log!(tf, "-> {} = {}", key.wire_name(), display(&value));
                        }
                    }
                    Event::AttrChangedRemotely(key, value) => {
                        let effective = value.filter(|v| !v.is_empty());
                        attrs[key as usize] = effective.clone();
                        log!(tf, "<- {} = {}", key.wire_name(), display(&effective));
                    }
                    Event::UnknownAttr(attr) => {
                        if verbose {
                            log!(tf, "Ignoring unknown attribute '{}'", attr);
                        }
                    }
                    Event::BackendLog { level, message } => {
                        log!(tf, "[{}] {}", level, message);
                    }
                    Event::SendFailed(key) => {
                        log!(tf, "Failed to send {}", key.wire_name());
                    }
                    Event::Exiting => {
                        log!(tf, "Backend connection closed");
                        return ExitCode::SUCCESS;
                    }
                }
            }
            recv(commands) -> cmd => {
                let ui_event = match cmd {
                    Err(_) | Ok(Command::Quit) => break 'main,
                    Ok(Command::Set(key, value)) => Some(UiEvent::FieldChanged { key, value }),
                    Ok(Command::Clear(key)) => Some(UiEvent::FieldChanged {
                        key,
                        value: String::new(),
                    }),
                    Ok(Command::Enable(key)) => Some(UiEvent::CheckboxToggled { key, checked: true }),
                    Ok(Command::Disable(key)) => Some(UiEvent::CheckboxToggled { key, checked: false }),
                    Ok(Command::Devices) => {
                        if devices.is_empty() {
                            println!("no devices enumerated yet");
                        } else {
                            for dev in &devices {
                                println!(" * {}", dev);
                            }
                        }
                        None
                    }
                    Ok(Command::Status) => {
                        for key in AttrKey::ALL {
                            println!("{:10} {}", key.wire_name(), display(&attrs[key as usize]));
                        }
                        None
                    }
                };
                if let Some(event) = ui_event {
                    if ui_tx.send(event).is_err() {
                        // Session already exited; pick up its last events.
                        continue;
                    }
                }
            }
        }
    }

    // Quit: hang up the UI channel, then give the session its shutdown.
    drop(ui_tx);
    for event in status.iter() {
        if let Event::Exiting = event {
            break;
        }
    }
    ExitCode::SUCCESS
}
