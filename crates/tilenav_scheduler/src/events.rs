//! Notifications about the progress of navmesh builds.

use std::sync::{Arc, PoisonError, RwLock};

use slotmap::{SlotMap, new_key_type};

use crate::registry::NavmeshId;

/// An event fired by the update scheduler of a navmesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum NavmeshEvent {
    /// A build started. Fired before any geometry is collected.
    BuildStarted(NavmeshId),
    /// A build finished and its navmesh was published.
    /// Fired exactly once per build, no matter how many requests were coalesced into it.
    Updated(NavmeshId),
}

impl NavmeshEvent {
    /// The navmesh the event is about.
    pub fn navmesh(&self) -> NavmeshId {
        match self {
            NavmeshEvent::BuildStarted(id) | NavmeshEvent::Updated(id) => *id,
        }
    }
}

new_key_type! {
    /// Identifies an observer registered with [`NavigationMesh::observe`](crate::NavigationMesh::observe).
    pub struct ObserverId;
}

type Observer = Arc<dyn Fn(&NavmeshEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Observers(RwLock<SlotMap<ObserverId, Observer>>);

impl Observers {
    pub(crate) fn insert(
        &self,
        observer: impl Fn(&NavmeshEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Arc::new(observer))
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Calls every observer. The observers are called without holding the lock, so they may
    /// register or remove observers themselves.
    pub(crate) fn notify(&self, event: NavmeshEvent) {
        let observers: Vec<Observer> = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for observer in observers {
            observer(&event);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.0.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("Observers").field("len", &len).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn removed_observers_are_not_called() {
        let observers = Observers::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = observers.insert(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        observers.notify(NavmeshEvent::Updated(NavmeshId::default()));
        assert!(observers.remove(id));
        assert!(!observers.remove(id));
        observers.notify(NavmeshEvent::Updated(NavmeshId::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observers_may_register_observers() {
        let observers = Arc::new(Observers::default());
        let inner = observers.clone();
        observers.insert(move |_| {
            inner.insert(|_| {});
        });
        observers.notify(NavmeshEvent::BuildStarted(NavmeshId::default()));
        assert_eq!(observers.0.read().unwrap().len(), 2);
    }
}
