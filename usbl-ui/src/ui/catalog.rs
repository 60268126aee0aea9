use super::selector::{Selector, SelectorOption};

/// What one reconciliation pass changed in a selector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub went_stale: usize,
    pub came_back: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        *self == ReconcileReport::default()
    }

    pub(crate) fn absorb(&mut self, other: ReconcileReport) {
        self.added += other.added;
        self.removed += other.removed;
        self.went_stale += other.went_stale;
        self.came_back += other.came_back;
    }
}

/// Merge the latest device enumeration into a selector's candidate list.
///
/// Rules, in order:
/// - the empty-value placeholder is permanent;
/// - an option absent from the snapshot is removed, unless it is the
///   current selection, in which case it stays and is marked stale;
/// - a stale option whose device reappears in the snapshot is unmarked;
/// - every snapshot device not already present is appended, device id as
///   both label and value;
/// - the chosen value is never forced.
///
/// Applying the same snapshot twice reports a no-op the second time.
pub fn reconcile(sel: &mut Selector, snapshot: &[String]) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let selected = sel.field().to_string();

    sel.options.retain_mut(|opt| {
        if opt.value.is_empty() {
            return true;
        }
        if snapshot.iter().any(|dev| *dev == opt.value) {
            if opt.stale {
                opt.stale = false;
                report.came_back += 1;
            }
            return true;
        }
        if opt.value == selected {
            if !opt.stale {
                opt.stale = true;
                report.went_stale += 1;
            }
            return true;
        }
        report.removed += 1;
        false
    });

    for device in snapshot {
        // An empty id would collide with the placeholder.
        if device.is_empty() {
            continue;
        }
        if sel.options.iter().any(|opt| opt.value == *device) {
            continue;
        }
        sel.options.push(SelectorOption::new(device));
        report.added += 1;
    }

    report
}
