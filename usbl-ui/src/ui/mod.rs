mod attr;
mod catalog;
mod selector;
mod sync;

pub use attr::{AttrKey, AttrStore};
pub use catalog::{reconcile, ReconcileReport};
pub use selector::{Selector, SelectorOption};
pub use sync::{SyncController, UiEvent};
