//! Resolving listeners, fired in priority order after a top-level resolve.
//!
//! Lower priorities fire first; listeners sharing a priority fire in
//! registration order. Priority [`INJECTOR_DETECTION_PRIORITY`] is
//! reserved for injector detection.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::container::Container;
use crate::error::Result;
use crate::introspect::Instance;

/// A resolving listener. May return a replacement for the instance.
pub type Listener = Arc<dyn Fn(&Container, Instance) -> Result<Instance> + Send + Sync>;

/// Priority of the injector-detection listener, so it runs before user
/// listeners at the default priority.
pub const INJECTOR_DETECTION_PRIORITY: i32 = -255;

#[derive(Clone)]
struct Entry {
    listener: Listener,
    reserved: bool,
}

/// Listeners grouped by priority.
#[derive(Clone, Default)]
pub(crate) struct CallbackPipeline {
    groups: BTreeMap<i32, Vec<Entry>>,
}

impl CallbackPipeline {
    pub fn push(&mut self, priority: i32, listener: Listener) {
        self.groups.entry(priority).or_default().push(Entry {
            listener,
            reserved: false,
        });
    }

    /// Installs the reserved listener, replacing a previous one.
    pub fn install_reserved(&mut self, listener: Listener) {
        let group = self.groups.entry(INJECTOR_DETECTION_PRIORITY).or_default();
        group.retain(|entry| !entry.reserved);
        group.insert(
            0,
            Entry {
                listener,
                reserved: true,
            },
        );
    }

    /// Drops the reserved listener. User listeners at the same priority stay.
    pub fn remove_reserved(&mut self) -> bool {
        let Some(group) = self.groups.get_mut(&INJECTOR_DETECTION_PRIORITY) else {
            return false;
        };
        let before = group.len();
        group.retain(|entry| !entry.reserved);
        let removed = group.len() != before;
        if group.is_empty() {
            self.groups.remove(&INJECTOR_DETECTION_PRIORITY);
        }
        removed
    }

    pub fn has_reserved(&self) -> bool {
        self.groups
            .get(&INJECTOR_DETECTION_PRIORITY)
            .is_some_and(|group| group.iter().any(|entry| entry.reserved))
    }

    /// Listeners in firing order.
    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.groups.values().flatten().map(|entry| &entry.listener)
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
