use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use super::Listener;
use super::ListenerId;
use super::Registration;
use crate::EventType;
use crate::RegistrationError;

type Slot = ArcSwap<Vec<Arc<Registration>>>;

/// Read-mostly index of active registrations.
///
/// Dispatch reads one per-type slot without locking. Mutations are serialized
/// and republish the affected slots copy-on-write.
pub(crate) struct ListenerRegistry {
    by_id: DashMap<ListenerId, Arc<Registration>>,
    by_type: Vec<Slot>,
    write_lock: Mutex<()>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_type: EventType::ALL.iter().map(|_| ArcSwap::from_pointee(Vec::new())).collect(),
            write_lock: Mutex::new(()),
        }
    }

    pub(crate) fn insert(
        &self,
        registration: Arc<Registration>,
    ) -> std::result::Result<(), RegistrationError> {
        let _guard = self.write_lock.lock();

        if let Some(existing) = self.by_id.get(&registration.id) {
            return Err(RegistrationError::AlreadyRegistered {
                listener_id: *existing.key(),
            });
        }
        if let Some(listener) = &registration.listener {
            if let Some(existing) = self.find_by_listener(listener) {
                return Err(RegistrationError::AlreadyRegistered {
                    listener_id: existing.id,
                });
            }
        }

        for event_type in &registration.interest {
            let slot = &self.by_type[event_type.index()];
            let mut next = Vec::clone(&slot.load());
            next.push(registration.clone());
            slot.store(Arc::new(next));
        }
        self.by_id.insert(registration.id, registration.clone());

        trace!(listener_id = registration.id, interest = ?registration.interest, "Registration indexed");
        Ok(())
    }

    pub(crate) fn remove(
        &self,
        id: ListenerId,
    ) -> Option<Arc<Registration>> {
        let _guard = self.write_lock.lock();

        let (_, registration) = self.by_id.remove(&id)?;
        for event_type in &registration.interest {
            let slot = &self.by_type[event_type.index()];
            let next: Vec<Arc<Registration>> = slot.load().iter().filter(|r| r.id != id).cloned().collect();
            slot.store(Arc::new(next));
        }

        trace!(listener_id = id, "Registration unindexed");
        Some(registration)
    }

    pub(crate) fn clear(&self) -> Vec<Arc<Registration>> {
        let _guard = self.write_lock.lock();

        for slot in &self.by_type {
            slot.store(Arc::new(Vec::new()));
        }
        let ids: Vec<ListenerId> = self.by_id.iter().map(|e| *e.key()).collect();
        ids.into_iter().filter_map(|id| self.by_id.remove(&id).map(|(_, r)| r)).collect()
    }

    pub(crate) fn get(
        &self,
        id: ListenerId,
    ) -> Option<Arc<Registration>> {
        self.by_id.get(&id).map(|e| e.value().clone())
    }

    pub(crate) fn contains(
        &self,
        id: ListenerId,
    ) -> bool {
        self.by_id.contains_key(&id)
    }

    pub(crate) fn find_by_listener(
        &self,
        listener: &Listener,
    ) -> Option<Arc<Registration>> {
        self.by_id
            .iter()
            .find(|e| {
                e.value()
                    .listener
                    .as_ref()
                    .map(|l| l.same_subscriber(listener))
                    .unwrap_or(false)
            })
            .map(|e| e.value().clone())
    }

    /// Registrations interested in `event_type`, in registration order
    pub(crate) fn interested(
        &self,
        event_type: EventType,
    ) -> Arc<Vec<Arc<Registration>>> {
        self.by_type[event_type.index()].load_full()
    }

    pub(crate) fn has_listener(
        &self,
        event_type: EventType,
    ) -> bool {
        !self.by_type[event_type.index()].load().is_empty()
    }

    pub(crate) fn all(&self) -> Vec<Arc<Registration>> {
        let mut all: Vec<Arc<Registration>> = self.by_id.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        all
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}
