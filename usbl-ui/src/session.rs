//! Session
//!
//! The event loop tying the transport, the device catalog and the
//! attribute sync together. Single-threaded and cooperative: every piece
//! of work runs as a reaction to one of three channels (backend
//! notifications, front-end input, the refresh timer), one handler at a
//! time.
//!
//! The refresh timer is an ordinary `Receiver<Instant>` so that
//! production wires in `crossbeam::channel::tick` while tests feed ticks
//! by hand.

use crate::transport::{BackendEvent, SendError, Transport};
use crate::ui::{AttrKey, ReconcileReport, SyncController, UiEvent};

use std::time::{Duration, Instant};

use crossbeam::channel;

/// Default interval between device enumeration refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Status event sent to an optional user-specified channel.
#[derive(Debug, Clone)]
pub enum Event {
    Started,
    /// An enumeration request went out.
    RefreshRequested,
    /// The timer fired while a request was still outstanding; the tick
    /// was dropped so enumerations never pile up.
    RefreshSkipped,
    /// The enumeration request was rejected. No change this tick.
    RefreshFailed,
    SnapshotApplied {
        devices: Vec<String>,
        report: ReconcileReport,
    },
    /// A local edit pushed this value outbound.
    AttrPushed(AttrKey, Option<String>),
    /// The backend pushed this value; no outbound call was made for it.
    AttrChangedRemotely(AttrKey, Option<String>),
    /// Inbound notification named an attribute outside the closed set.
    UnknownAttr(String),
    BackendLog {
        level: String,
        message: String,
    },
    SendFailed(AttrKey),
    Exiting,
}

struct StatusQueue {
    dest: Option<channel::Sender<Event>>,
}

impl StatusQueue {
    fn send(&self, event: Event) {
        if let Some(dest) = &self.dest {
            // A slow or absent consumer must never stall the UI loop.
            let _ = dest.try_send(event);
        }
    }
}

pub struct Session<T: Transport> {
    transport: T,
    sync: SyncController,
    ui_rx: channel::Receiver<UiEvent>,
    refresh_rx: channel::Receiver<Instant>,
    status: StatusQueue,

    /// An enumeration request is outstanding; timer ticks are skipped
    /// until the snapshot (or the end of the session) arrives.
    refresh_pending: bool,
    closed: bool,
}

impl<T: Transport> Session<T> {
    /// A session with an externally driven refresh channel. Production
    /// code normally goes through `with_timer`.
    pub fn new(
        transport: T,
        ui_rx: channel::Receiver<UiEvent>,
        refresh_rx: channel::Receiver<Instant>,
        status: Option<channel::Sender<Event>>,
    ) -> Session<T> {
        Session {
            transport,
            sync: SyncController::new(),
            ui_rx,
            refresh_rx,
            status: StatusQueue { dest: status },
            refresh_pending: false,
            closed: false,
        }
    }

    /// A session on the production refresh timer.
    pub fn with_timer(
        transport: T,
        ui_rx: channel::Receiver<UiEvent>,
        interval: Duration,
        status: Option<channel::Sender<Event>>,
    ) -> Session<T> {
        Session::new(transport, ui_rx, channel::tick(interval), status)
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Startup work the reference front end did on page load: push every
    /// selector's current (all-disabled) state so the backend's view
    /// matches the rendered one, then request the first enumeration.
    pub fn start(&mut self) {
        self.status.send(Event::Started);
        for key in AttrKey::ALL {
            let result = self.sync.push_current(key, &mut self.transport);
            self.report_push(key, result);
            if self.closed {
                return;
            }
        }
        self.request_refresh();
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.status.send(Event::Exiting);
        }
    }

    fn report_push(&mut self, key: AttrKey, result: Result<Option<String>, SendError>) {
        match result {
            Ok(value) => self.status.send(Event::AttrPushed(key, value)),
            Err(SendError::Rejected) => self.status.send(Event::SendFailed(key)),
            Err(SendError::Disconnected) => self.close(),
        }
    }

    fn request_refresh(&mut self) {
        if self.refresh_pending {
            self.status.send(Event::RefreshSkipped);
            return;
        }
        match self.transport.request_devices() {
            Ok(()) => {
                self.refresh_pending = true;
                self.status.send(Event::RefreshRequested);
            }
            Err(SendError::Rejected) => self.status.send(Event::RefreshFailed),
            Err(SendError::Disconnected) => self.close(),
        }
    }

    /// One refresh timer tick.
    pub fn handle_tick(&mut self) {
        if self.closed {
            return;
        }
        self.request_refresh();
    }

    /// One user edit from the front end.
    pub fn handle_ui_event(&mut self, event: UiEvent) {
        if self.closed {
            return;
        }
        let key = event.key();
        let result = self.sync.user_edit(event, &mut self.transport);
        self.report_push(key, result);
    }

    /// One inbound backend notification.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        if self.closed {
            return;
        }
        match event {
            BackendEvent::AttrChanged { attr, value } => {
                match self.sync.remote_change(&attr, value.as_deref()) {
                    Some(key) => self.status.send(Event::AttrChangedRemotely(key, value)),
                    None => self.status.send(Event::UnknownAttr(attr)),
                }
            }
            BackendEvent::DeviceList(devices) => {
                self.refresh_pending = false;
                let report = self.sync.apply_snapshot(&devices);
                self.status.send(Event::SnapshotApplied { devices, report });
            }
            BackendEvent::Log { level, message } => {
                self.status.send(Event::BackendLog { level, message });
            }
        }
    }

    /// Run until the backend link closes or every front-end input handle
    /// is dropped. Either way the timer stops with the loop and no
    /// further outbound calls are attempted.
    pub fn run(&mut self) {
        let backend_rx = self.transport.receiver().clone();
        let ui_rx = self.ui_rx.clone();
        let mut refresh_rx = Some(self.refresh_rx.clone());

        self.start();

        while !self.closed {
            let mut sel = channel::Select::new();
            let backend_idx = sel.recv(&backend_rx);
            let ui_idx = sel.recv(&ui_rx);
            let refresh_idx = refresh_rx.as_ref().map(|rx| sel.recv(rx));

            let oper = sel.select();
            let index = oper.index();
            if index == backend_idx {
                match oper.recv(&backend_rx) {
                    Ok(event) => self.handle_backend_event(event),
                    Err(channel::RecvError) => self.close(),
                }
            } else if index == ui_idx {
                match oper.recv(&ui_rx) {
                    Ok(event) => self.handle_ui_event(event),
                    Err(channel::RecvError) => self.close(),
                }
            } else if Some(index) == refresh_idx {
                let rx = refresh_rx.as_ref().expect("refresh arm without receiver");
                match oper.recv(rx) {
                    Ok(_) => self.handle_tick(),
                    // The timer was dropped externally; keep serving the
                    // other channels without refreshes.
                    Err(channel::RecvError) => refresh_rx = None,
                }
            }
        }
    }
}
