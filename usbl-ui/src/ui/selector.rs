use super::attr::AttrKey;

/// One candidate entry in a device selector's dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    pub value: String,
    /// Set when the option is the current selection but missing from the
    /// latest enumeration (device unplugged while assigned). Stale options
    /// stay in the list so the operator is never silently unbound; they
    /// remain fully selectable.
    pub stale: bool,
}

impl SelectorOption {
    pub(crate) fn new(value: &str) -> SelectorOption {
        SelectorOption {
            value: value.to_string(),
            stale: false,
        }
    }
}

/// UI binding state for one attribute: the backing field (device pick or
/// free-text address), its enable checkbox, and the candidate list for
/// device-backed slots.
///
/// Two invariants hold after every update:
/// - the checkbox is checked only while the field is non-empty;
/// - the first option of a device-backed selector is the permanent
///   empty-value placeholder.
#[derive(Debug, Clone)]
pub struct Selector {
    key: AttrKey,
    pub(crate) options: Vec<SelectorOption>,
    field: String,
    checked: bool,
}

impl Selector {
    pub fn new(key: AttrKey) -> Selector {
        let options = if key.is_device_backed() {
            vec![SelectorOption::new("")]
        } else {
            Vec::new()
        };
        Selector {
            key,
            options,
            field: String::new(),
            checked: false,
        }
    }

    pub fn key(&self) -> AttrKey {
        self.key
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    /// The checkbox control is live only while there is something to
    /// enable. Mirrors `checkbox.disabled = !field.value`.
    pub fn checkbox_enabled(&self) -> bool {
        !self.field.is_empty()
    }

    pub fn options(&self) -> &[SelectorOption] {
        &self.options
    }

    /// Value transmitted to the backend: intent to enable coupled with a
    /// concrete target, `None` otherwise.
    pub fn candidate(&self) -> Option<&str> {
        if self.checked && !self.field.is_empty() {
            Some(self.field.as_str())
        } else {
            None
        }
    }

    pub(crate) fn set_field(&mut self, value: &str) {
        self.field = value.to_string();
        if self.field.is_empty() {
            // An empty field cannot stay enabled.
            self.checked = false;
        }
    }

    pub(crate) fn set_checked(&mut self, checked: bool) {
        self.checked = checked && !self.field.is_empty();
    }

    /// Apply a backend-pushed value: a non-empty value is displayed, and
    /// the checkbox always follows the value's truthiness. An empty or
    /// absent value unchecks but leaves the last text in place.
    pub(crate) fn apply_remote(&mut self, value: Option<&str>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.field = v.to_string();
                self.checked = true;
            }
            _ => {
                self.checked = false;
            }
        }
    }
}
