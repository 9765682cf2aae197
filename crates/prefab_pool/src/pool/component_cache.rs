//! Per-instance component lists matched against the template snapshot

use crate::foundation::collections::{ObjectId, SecondaryMap};
use crate::pool::snapshot::TemplateSnapshot;
use crate::scene::object::ComponentAddr;
use crate::scene::Scene;

/// Components of one instance, aligned with a [`TemplateSnapshot`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceComponents {
    /// `matched[i]` receives snapshot entry `i`
    pub matched: Vec<ComponentAddr>,
    /// Components on the instance root with transient motion state
    pub motion: Vec<ComponentAddr>,
    /// Whether every snapshot entry found a component
    pub consistent: bool,
}

impl InstanceComponents {
    /// Walk the instance in capture order and line it up with `snapshot`
    ///
    /// Components are taken greedily: each one either matches the next
    /// expected snapshot type or is passed over. Whatever is left unmatched
    /// at the end marks the instance as drifted.
    pub fn build(scene: &mut Scene, instance: ObjectId, snapshot: &TemplateSnapshot) -> Self {
        let expected: Vec<_> = snapshot.component_types().collect();
        let mut matched = Vec::with_capacity(expected.len());

        for addr in scene.component_addresses(instance) {
            let Some(next) = expected.get(matched.len()) else {
                break;
            };
            if scene
                .component_at(addr)
                .is_some_and(|component| component.component_type() == *next)
            {
                matched.push(addr);
            }
        }

        let root_components = scene.object(instance).map_or(0, |object| object.components().len());
        let motion = (0..root_components)
            .map(|index| ComponentAddr { object: instance, index })
            .filter(|&addr| {
                scene
                    .component_at_mut(addr)
                    .is_some_and(|component| component.motion_mut().is_some())
            })
            .collect();

        let consistent = matched.len() == expected.len();
        if !consistent {
            log::warn!(
                "Instance {:?} matches {} of {} restorable components",
                instance,
                matched.len(),
                expected.len()
            );
        }

        Self {
            matched,
            motion,
            consistent,
        }
    }
}

/// Lazily built [`InstanceComponents`] keyed by instance
#[derive(Debug, Default)]
pub struct InstanceComponentCache {
    entries: SecondaryMap<ObjectId, InstanceComponents>,
}

impl InstanceComponentCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, if the instance has been seen
    pub fn get(&self, instance: ObjectId) -> Option<&InstanceComponents> {
        self.entries.get(instance)
    }

    /// Cached entry, building and storing it on first sight
    pub fn get_or_build(
        &mut self,
        scene: &mut Scene,
        instance: ObjectId,
        snapshot: &TemplateSnapshot,
    ) -> &InstanceComponents {
        if !self.entries.contains_key(instance) {
            let built = InstanceComponents::build(scene, instance, snapshot);
            self.entries.insert(instance, built);
        }
        &self.entries[instance]
    }

    /// Forget an instance
    pub fn remove(&mut self, instance: ObjectId) -> Option<InstanceComponents> {
        self.entries.remove(instance)
    }

    /// Forget every instance
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached instances
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No instance cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
