/// The four configuration slots exposed by the relay backend.
///
/// Wire names are the attribute names of the backend controller object.
/// They are protocol, not display strings, and the set is closed: an
/// inbound notification naming anything else is dropped where it is
/// parsed, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKey {
    DevGps,
    DevUsbl,
    AddrMav,
    AddrEcho,
}

impl AttrKey {
    pub const ALL: [AttrKey; 4] = [
        AttrKey::DevGps,
        AttrKey::DevUsbl,
        AttrKey::AddrMav,
        AttrKey::AddrEcho,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            AttrKey::DevGps => "dev_gps",
            AttrKey::DevUsbl => "dev_usbl",
            AttrKey::AddrMav => "addr_mav",
            AttrKey::AddrEcho => "addr_echo",
        }
    }

    pub fn from_wire(name: &str) -> Option<AttrKey> {
        match name {
            "dev_gps" => Some(AttrKey::DevGps),
            "dev_usbl" => Some(AttrKey::DevUsbl),
            "addr_mav" => Some(AttrKey::AddrMav),
            "addr_echo" => Some(AttrKey::AddrEcho),
            _ => None,
        }
    }

    /// True for the slots whose selector has a candidate list fed by the
    /// device catalog. The other two are free-text network endpoints.
    pub fn is_device_backed(&self) -> bool {
        matches!(self, AttrKey::DevGps | AttrKey::DevUsbl)
    }
}

/// Current value of every attribute, the single source of truth the front
/// end renders from. `None` means unassigned/disabled.
#[derive(Debug, Default)]
pub struct AttrStore {
    values: [Option<String>; 4],
}

impl AttrStore {
    pub fn new() -> AttrStore {
        AttrStore {
            values: Default::default(),
        }
    }

    /// Overwrites the stored value. No validation beyond the key type.
    pub fn set(&mut self, key: AttrKey, value: Option<String>) {
        self.values[key as usize] = value;
    }

    /// Current value, or `None` for a key that was never set.
    pub fn get(&self, key: AttrKey) -> Option<&str> {
        self.values[key as usize].as_deref()
    }
}
