use super::attr::{AttrKey, AttrStore};
use super::catalog::{reconcile, ReconcileReport};
use super::selector::Selector;
use crate::transport::{SendError, Transport};

/// A user edit to one selector, as delivered by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    FieldChanged { key: AttrKey, value: String },
    CheckboxToggled { key: AttrKey, checked: bool },
}

impl UiEvent {
    pub fn key(&self) -> AttrKey {
        match self {
            UiEvent::FieldChanged { key, .. } | UiEvent::CheckboxToggled { key, .. } => *key,
        }
    }
}

/// Mediates every attribute change, in both directions.
///
/// Local edits flow through `user_edit`, which recomputes the candidate
/// value and always pushes it outbound. Remote pushes flow through
/// `remote_change`, which updates the rendered state and never calls the
/// outbound path: a pushed value bouncing straight back out would storm
/// the channel.
///
/// One selector per `AttrKey`, built once and iterated as a fixed table;
/// this is the only writer of the attribute store.
pub struct SyncController {
    store: AttrStore,
    selectors: [Selector; 4],
}

impl SyncController {
    pub fn new() -> SyncController {
        SyncController {
            store: AttrStore::new(),
            selectors: AttrKey::ALL.map(Selector::new),
        }
    }

    pub fn store(&self) -> &AttrStore {
        &self.store
    }

    pub fn selector(&self, key: AttrKey) -> &Selector {
        &self.selectors[key as usize]
    }

    /// Local direction: apply a user edit, then push the resulting value.
    ///
    /// The push happens on every edit even when the value is unchanged;
    /// the backend treats writes as idempotent and the reference front
    /// end never de-duplicated them. Returns the value that was pushed.
    pub fn user_edit<T: Transport>(
        &mut self,
        event: UiEvent,
        transport: &mut T,
    ) -> Result<Option<String>, SendError> {
        let key = event.key();
        let sel = &mut self.selectors[key as usize];
        match event {
            UiEvent::FieldChanged { value, .. } => sel.set_field(&value),
            UiEvent::CheckboxToggled { checked, .. } => sel.set_checked(checked),
        }
        self.push_current(key, transport)
    }

    /// Recompute one attribute's candidate from its selector, store it,
    /// and send it outbound.
    pub fn push_current<T: Transport>(
        &mut self,
        key: AttrKey,
        transport: &mut T,
    ) -> Result<Option<String>, SendError> {
        let candidate = self.selectors[key as usize].candidate().map(str::to_string);
        self.store.set(key, candidate.clone());
        transport.set_attr(key, candidate.as_deref())?;
        Ok(candidate)
    }

    /// Remote direction: apply a backend-pushed change to the one selector
    /// bound to that key. Unknown wire names are dropped here, silently;
    /// the caller learns only that nothing matched.
    pub fn remote_change(&mut self, attr: &str, value: Option<&str>) -> Option<AttrKey> {
        let key = AttrKey::from_wire(attr)?;
        self.selectors[key as usize].apply_remote(value);
        let effective = match value {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => None,
        };
        self.store.set(key, effective);
        Some(key)
    }

    /// Reconcile the latest enumeration into every device-backed selector.
    pub fn apply_snapshot(&mut self, snapshot: &[String]) -> ReconcileReport {
        let mut total = ReconcileReport::default();
        for key in AttrKey::ALL {
            if !key.is_device_backed() {
                continue;
            }
            total.absorb(reconcile(&mut self.selectors[key as usize], snapshot));
        }
        total
    }
}

impl Default for SyncController {
    fn default() -> Self {
        SyncController::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{loopback, LoopbackBackend};

    fn calls(backend: &LoopbackBackend) -> Vec<(AttrKey, Option<String>)> {
        backend.set_attr_calls.try_iter().collect()
    }

    #[test]
    fn unchecking_sends_null_but_keeps_field() {
        // Scenario: operator unchecks USBL while its field holds a device.
        let (mut transport, backend) = loopback();
        let mut sync = SyncController::new();

        sync.user_edit(
            UiEvent::FieldChanged {
                key: AttrKey::DevUsbl,
                value: "/dev/ttyUSB1".to_string(),
            },
            &mut transport,
        )
        .unwrap();
        sync.user_edit(
            UiEvent::CheckboxToggled {
                key: AttrKey::DevUsbl,
                checked: true,
            },
            &mut transport,
        )
        .unwrap();
        sync.user_edit(
            UiEvent::CheckboxToggled {
                key: AttrKey::DevUsbl,
                checked: false,
            },
            &mut transport,
        )
        .unwrap();

        assert_eq!(
            calls(&backend),
            vec![
                (AttrKey::DevUsbl, None),
                (AttrKey::DevUsbl, Some("/dev/ttyUSB1".to_string())),
                (AttrKey::DevUsbl, None),
            ]
        );
        assert_eq!(sync.selector(AttrKey::DevUsbl).field(), "/dev/ttyUSB1");
        assert_eq!(sync.store().get(AttrKey::DevUsbl), None);
    }

    #[test]
    fn remote_push_updates_state_without_outbound_call() {
        // Scenario: backend pushes a MAVLink endpoint.
        let (_transport, backend) = loopback();
        let mut sync = SyncController::new();

        let key = sync.remote_change("addr_mav", Some("192.168.1.5:14550"));
        assert_eq!(key, Some(AttrKey::AddrMav));

        let sel = sync.selector(AttrKey::AddrMav);
        assert_eq!(sel.field(), "192.168.1.5:14550");
        assert!(sel.checked());
        assert_eq!(sync.store().get(AttrKey::AddrMav), Some("192.168.1.5:14550"));
        assert!(calls(&backend).is_empty());
    }

    #[test]
    fn remote_null_disables() {
        let mut sync = SyncController::new();

        sync.remote_change("dev_gps", Some("/dev/ttyACM0"));
        sync.remote_change("dev_gps", None);

        let sel = sync.selector(AttrKey::DevGps);
        assert!(!sel.checked());
        assert_eq!(sel.field(), "/dev/ttyACM0");
        assert_eq!(sync.store().get(AttrKey::DevGps), None);
    }

    #[test]
    fn unknown_attr_is_ignored() {
        let mut sync = SyncController::new();
        assert_eq!(sync.remote_change("dev_sonar", Some("/dev/ttyUSB9")), None);
        for key in AttrKey::ALL {
            assert_eq!(sync.store().get(key), None);
            assert!(!sync.selector(key).checked());
        }
    }

    #[test]
    fn repeated_edits_resend_unchanged_values() {
        let (mut transport, backend) = loopback();
        let mut sync = SyncController::new();

        for _ in 0..3 {
            sync.user_edit(
                UiEvent::FieldChanged {
                    key: AttrKey::AddrEcho,
                    value: "localhost:14401".to_string(),
                },
                &mut transport,
            )
            .unwrap();
        }

        assert_eq!(calls(&backend).len(), 3);
    }

    #[test]
    fn checkbox_field_coupling_holds_across_updates() {
        let (mut transport, _backend) = loopback();
        let mut sync = SyncController::new();

        let edits = [
            UiEvent::FieldChanged {
                key: AttrKey::AddrMav,
                value: "192.168.2.2:25100".to_string(),
            },
            UiEvent::CheckboxToggled {
                key: AttrKey::AddrMav,
                checked: true,
            },
            UiEvent::FieldChanged {
                key: AttrKey::AddrMav,
                value: String::new(),
            },
            UiEvent::CheckboxToggled {
                key: AttrKey::AddrMav,
                checked: true,
            },
        ];
        for edit in edits {
            let _ = sync.user_edit(edit, &mut transport);
            let sel = sync.selector(AttrKey::AddrMav);
            assert!(!sel.checked() || !sel.field().is_empty());
        }

        sync.remote_change("addr_mav", Some(""));
        let sel = sync.selector(AttrKey::AddrMav);
        assert!(!sel.checked() || !sel.field().is_empty());
    }

    #[test]
    fn snapshot_only_touches_device_selectors() {
        let mut sync = SyncController::new();
        let devices = vec!["/dev/ttyUSB0".to_string()];

        let report = sync.apply_snapshot(&devices);

        // One option added per device-backed selector.
        assert_eq!(report.added, 2);
        assert_eq!(sync.selector(AttrKey::DevGps).options().len(), 2);
        assert_eq!(sync.selector(AttrKey::DevUsbl).options().len(), 2);
        assert!(sync.selector(AttrKey::AddrMav).options().is_empty());
        assert!(sync.selector(AttrKey::AddrEcho).options().is_empty());
    }
}
