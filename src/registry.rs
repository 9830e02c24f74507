//! Type key to caster mapping.
//!
//! A [`CasterRegistry`] is a value: every change returns a new registry and leaves the
//! receiver untouched. Casters are shared between snapshots through `Arc`.

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    casters::{BoolCaster, Caster, DateCaster, FloatCaster, IntCaster, StringCaster},
    types::{CastTarget, TypeKey},
};

#[derive(Clone)]
pub struct CasterRegistry {
    casters: BTreeMap<TypeKey, Arc<dyn Caster>>,
}

impl Default for CasterRegistry {
    fn default() -> Self {
        let date: Arc<dyn Caster> = Arc::new(DateCaster::new());
        let mut casters: BTreeMap<TypeKey, Arc<dyn Caster>> = BTreeMap::new();
        casters.insert(TypeKey::Int, Arc::new(IntCaster::new()));
        casters.insert(TypeKey::Float, Arc::new(FloatCaster::new()));
        casters.insert(TypeKey::Bool, Arc::new(BoolCaster::new()));
        casters.insert(TypeKey::String, Arc::new(StringCaster::new()));
        for key in TypeKey::DATE_TYPES {
            casters.insert(key, Arc::clone(&date));
        }
        Self { casters }
    }
}

impl fmt::Debug for CasterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.casters.iter()).finish()
    }
}

impl CasterRegistry {
    /// The built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with no casters at all.
    pub fn empty() -> Self {
        Self {
            casters: BTreeMap::new(),
        }
    }

    pub fn reset(&self) -> Self {
        Self::default()
    }

    /// Registers `caster` for every key the targets resolve to. Later registrations win.
    pub fn with_cast<I, T>(&self, caster: impl Caster + 'static, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CastTarget>,
    {
        self.with_shared_cast(Arc::new(caster), targets)
    }

    pub fn with_shared_cast<I, T>(&self, caster: Arc<dyn Caster>, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CastTarget>,
    {
        let mut next = self.clone();
        for target in targets {
            for key in target.into().resolve() {
                next.casters.insert(key, Arc::clone(&caster));
            }
        }
        next
    }

    /// Removes every key the targets resolve to. Missing keys are ignored.
    pub fn without_cast<I, T>(&self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CastTarget>,
    {
        let mut next = self.clone();
        for target in targets {
            for key in target.into().resolve() {
                next.casters.remove(&key);
            }
        }
        next
    }

    /// True when at least one key the target resolves to has a caster.
    pub fn has_caster_for(&self, target: impl Into<CastTarget>) -> bool {
        target
            .into()
            .resolve()
            .iter()
            .any(|key| self.casters.contains_key(key))
    }

    pub fn get(&self, key: &TypeKey) -> Option<&Arc<dyn Caster>> {
        self.casters.get(key)
    }

    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.casters.keys().cloned().collect()
    }
}
