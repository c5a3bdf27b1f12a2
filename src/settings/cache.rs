use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

/// The public landing-page aggregate: setting key to decoded value.
pub type PublicSettings = Map<String, Value>;

/// Holds the public settings aggregate between writes.
///
/// Every `invalidate` starts a new generation. A reader records the
/// generation before loading and hands it to `put`, which drops the value
/// when a write happened in between.
pub trait SettingsCache: Send + Sync {
    fn get(&self) -> Option<Arc<PublicSettings>>;
    fn generation(&self) -> u64;
    fn put(&self, settings: Arc<PublicSettings>, generation: u64);
    fn invalidate(&self);
}

#[derive(Default)]
struct Slot {
    generation: u64,
    settings: Option<Arc<PublicSettings>>,
}

#[derive(Default)]
pub struct InMemorySettingsCache {
    slot: RwLock<Slot>,
}

impl InMemorySettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<T>(&self, f: impl FnOnce(&mut Slot) -> T) -> T {
        match self.slot.write() {
            Ok(mut slot) => f(&mut slot),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl SettingsCache for InMemorySettingsCache {
    fn get(&self) -> Option<Arc<PublicSettings>> {
        match self.slot.read() {
            Ok(slot) => slot.settings.clone(),
            Err(poisoned) => poisoned.into_inner().settings.clone(),
        }
    }

    fn generation(&self) -> u64 {
        match self.slot.read() {
            Ok(slot) => slot.generation,
            Err(poisoned) => poisoned.into_inner().generation,
        }
    }

    fn put(&self, settings: Arc<PublicSettings>, generation: u64) {
        self.with_slot(|slot| {
            if slot.generation == generation {
                slot.settings = Some(settings);
            } else {
                tracing::debug!(
                    loaded = generation,
                    current = slot.generation,
                    "landing settings changed while loading; not cached"
                );
            }
        });
    }

    fn invalidate(&self) {
        self.with_slot(|slot| {
            slot.generation = slot.generation.wrapping_add(1);
            slot.settings = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(phone: &str) -> Arc<PublicSettings> {
        let mut settings = PublicSettings::new();
        settings.insert("contact_phone".into(), Value::from(phone));
        Arc::new(settings)
    }

    #[test]
    fn put_get_invalidate() {
        let cache = InMemorySettingsCache::new();
        assert!(cache.get().is_none());

        cache.put(settings("+62"), cache.generation());
        assert_eq!(cache.get().unwrap()["contact_phone"], "+62");

        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn put_after_invalidate_is_dropped() {
        let cache = InMemorySettingsCache::new();
        let loaded_at = cache.generation();
        cache.invalidate();

        cache.put(settings("stale"), loaded_at);
        assert!(cache.get().is_none());

        cache.put(settings("fresh"), cache.generation());
        assert_eq!(cache.get().unwrap()["contact_phone"], "fresh");
    }
}
