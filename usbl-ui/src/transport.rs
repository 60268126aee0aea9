//! Boundary to the backend controller process.
//!
//! The sync and session layers only ever talk to a `Transport`. The real
//! implementation is a bridge to the process that owns the serial ports
//! and sockets (see the tools crate); tests and demos use the in-process
//! loopback pair.

use crate::ui::AttrKey;

use crossbeam::channel;

/// Inbound notification from the backend.
///
/// `AttrChanged` carries the raw wire attribute name: unknown names must
/// reach the sync layer unparsed so its closed dispatch drops them there,
/// silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    AttrChanged {
        attr: String,
        value: Option<String>,
    },
    DeviceList(Vec<String>),
    Log {
        level: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The request could not be issued this time. Not fatal; the caller
    /// carries on without it.
    Rejected,
    /// The backend link is gone for good.
    Disconnected,
}

pub trait Transport {
    /// Ask the backend for a fresh device enumeration. The snapshot comes
    /// back asynchronously as `BackendEvent::DeviceList`; a rejected
    /// request means no change this tick.
    fn request_devices(&mut self) -> Result<(), SendError>;

    /// Outbound half of attribute sync. Fire-and-forget: completion order
    /// between calls is not guaranteed, and nothing is reported back
    /// beyond send failure.
    fn set_attr(&mut self, key: AttrKey, value: Option<&str>) -> Result<(), SendError>;

    /// Inbound notification channel. Disconnection of this channel is the
    /// terminal "backend gone" signal.
    fn receiver(&self) -> &channel::Receiver<BackendEvent>;
}

/// A transport whose far end is a set of in-process channels. Records
/// every outbound call for inspection.
pub struct Loopback {
    events_rx: channel::Receiver<BackendEvent>,
    calls_tx: channel::Sender<(AttrKey, Option<String>)>,
    enum_reqs_tx: channel::Sender<()>,
}

/// Backend half of a loopback pair.
pub struct LoopbackBackend {
    /// Inject inbound notifications. Dropping this sender closes the
    /// transport from the session's point of view.
    pub events: channel::Sender<BackendEvent>,
    /// Every `set_attr` the UI side issued, in order.
    pub set_attr_calls: channel::Receiver<(AttrKey, Option<String>)>,
    /// One unit per enumeration request.
    pub enum_requests: channel::Receiver<()>,
}

/// Create a connected loopback transport and its backend handle.
pub fn loopback() -> (Loopback, LoopbackBackend) {
    let (events_tx, events_rx) = channel::unbounded();
    let (calls_tx, calls_rx) = channel::unbounded();
    let (enum_tx, enum_rx) = channel::unbounded();
    (
        Loopback {
            events_rx,
            calls_tx,
            enum_reqs_tx: enum_tx,
        },
        LoopbackBackend {
            events: events_tx,
            set_attr_calls: calls_rx,
            enum_requests: enum_rx,
        },
    )
}

impl Transport for Loopback {
    fn request_devices(&mut self) -> Result<(), SendError> {
        self.enum_reqs_tx
            .send(())
            .map_err(|_| SendError::Disconnected)
    }

    fn set_attr(&mut self, key: AttrKey, value: Option<&str>) -> Result<(), SendError> {
        self.calls_tx
            .send((key, value.map(str::to_string)))
            .map_err(|_| SendError::Disconnected)
    }

    fn receiver(&self) -> &channel::Receiver<BackendEvent> {
        &self.events_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_records_calls_in_order() {
        let (mut transport, backend) = loopback();

        transport
            .set_attr(AttrKey::DevGps, Some("/dev/ttyACM0"))
            .unwrap();
        transport.set_attr(AttrKey::DevGps, None).unwrap();
        transport.request_devices().unwrap();

        assert_eq!(
            backend.set_attr_calls.try_recv().unwrap(),
            (AttrKey::DevGps, Some("/dev/ttyACM0".to_string()))
        );
        assert_eq!(
            backend.set_attr_calls.try_recv().unwrap(),
            (AttrKey::DevGps, None)
        );
        assert!(backend.enum_requests.try_recv().is_ok());
    }

    #[test]
    fn dropped_backend_turns_sends_into_disconnects() {
        let (mut transport, backend) = loopback();
        drop(backend);

        assert_eq!(
            transport.set_attr(AttrKey::AddrMav, None),
            Err(SendError::Disconnected)
        );
        assert_eq!(transport.request_devices(), Err(SendError::Disconnected));
    }
}
