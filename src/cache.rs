use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::error::LookupError;
use crate::models::domain::Endpoint;

/// Source of endpoint metadata, normally the agent API.
pub trait IdentityLookup: Send + Sync {
    /// `id` is the endpoint id in decimal.
    fn endpoint_get(&self, id: &str) -> Result<Endpoint, LookupError>;
}

impl<T: IdentityLookup + ?Sized> IdentityLookup for Arc<T> {
    fn endpoint_get(&self, id: &str) -> Result<Endpoint, LookupError> {
        (**self).endpoint_get(id)
    }
}

/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// First sight of the endpoint, fetched from the agent.
    Miss,
    /// Served from the cache with a resolved identity.
    Hit,
    /// Cached without identity, re-fetched and now resolved.
    Refreshed,
    /// Cached without identity and still unresolved after re-fetching.
    Unresolved,
}

#[derive(Debug)]
pub struct Resolution {
    pub endpoint: Arc<Endpoint>,
    pub status: CacheStatus,
    /// Set when a refresh of an unresolved entry failed; the stale entry is
    /// still returned.
    pub refresh_error: Option<LookupError>,
}

impl Resolution {
    fn new(endpoint: Arc<Endpoint>, status: CacheStatus) -> Self {
        Self { endpoint, status, refresh_error: None }
    }
}

type Slot = Arc<Mutex<Option<Arc<Endpoint>>>>;

/// Read-through cache of endpoint metadata keyed by endpoint id.
///
/// Entries with a security identity are trusted for the life of the cache.
/// Entries without one are re-fetched on every access until the agent
/// reports an identity. Each endpoint id has its own slot lock, held for
/// the duration of that id's lookup; the map lock is only taken to find or
/// create a slot.
pub struct EndpointCache<L> {
    lookup: L,
    slots: RwLock<HashMap<u16, Slot>>,
}

impl<L: IdentityLookup> EndpointCache<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup, slots: RwLock::new(HashMap::new()) }
    }

    pub fn identity_for(&self, endpoint_id: u16) -> Result<Resolution, LookupError> {
        let slot = self.slot(endpoint_id);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let cached = match entry.as_ref() {
            Some(cached) => Arc::clone(cached),
            None => match self.fetch(endpoint_id) {
                Ok(fetched) => {
                    let fetched = Arc::new(fetched);
                    *entry = Some(Arc::clone(&fetched));
                    return Ok(Resolution::new(fetched, CacheStatus::Miss));
                }
                Err(err) => {
                    self.release_empty(endpoint_id, &slot);
                    return Err(err);
                }
            },
        };

        if cached.is_resolved() {
            return Ok(Resolution::new(cached, CacheStatus::Hit));
        }

        match self.fetch(endpoint_id) {
            Ok(fresh) if fresh.is_resolved() => {
                let fresh = Arc::new(fresh);
                *entry = Some(Arc::clone(&fresh));
                Ok(Resolution::new(fresh, CacheStatus::Refreshed))
            }
            Ok(_) => Ok(Resolution::new(cached, CacheStatus::Unresolved)),
            Err(err) => Ok(Resolution {
                endpoint: cached,
                status: CacheStatus::Unresolved,
                refresh_error: Some(err),
            }),
        }
    }

    /// Cached value for `endpoint_id`, without consulting the agent.
    pub fn peek(&self, endpoint_id: u16) -> Option<Arc<Endpoint>> {
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint_id)
            .cloned()?;
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    /// Number of endpoints with a cached entry.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fetch(&self, endpoint_id: u16) -> Result<Endpoint, LookupError> {
        debug!(endpoint = endpoint_id, "querying agent for endpoint");
        self.lookup.endpoint_get(&endpoint_id.to_string())
    }

    fn slot(&self, endpoint_id: u16) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint_id)
        {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(endpoint_id).or_default())
    }

    /// Drops the map entry for a slot whose first lookup failed. Called with
    /// the slot lock held; a slot another caller has already cloned is left
    /// for that caller to fill.
    fn release_empty(&self, endpoint_id: u16, slot: &Slot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let unshared = slots
            .get(&endpoint_id)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2);
        if unshared {
            slots.remove(&endpoint_id);
        }
    }
}
