//! Instance to pool ownership map

use crate::foundation::collections::{ObjectId, PoolId, SecondaryMap};

/// Which pool produced each live instance
///
/// Entries for instances discarded outside the pool API linger until
/// [`InstanceOwners::retain`] (driven by the registry sweep) drops them.
#[derive(Debug, Default)]
pub struct InstanceOwners {
    owners: SecondaryMap<ObjectId, PoolId>,
}

impl InstanceOwners {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `pool` owns `instance`
    pub fn register(&mut self, instance: ObjectId, pool: PoolId) {
        if let Some(previous) = self.owners.insert(instance, pool) {
            if previous != pool {
                log::warn!("Instance {:?} moved from pool {:?} to {:?}", instance, previous, pool);
            }
        }
    }

    /// Forget `instance`
    pub fn unregister(&mut self, instance: ObjectId) -> Option<PoolId> {
        self.owners.remove(instance)
    }

    /// Owning pool of `instance`
    pub fn owner_of(&self, instance: ObjectId) -> Option<PoolId> {
        self.owners.get(instance).copied()
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(ObjectId, PoolId) -> bool) -> usize {
        let before = self.owners.len();
        self.owners.retain(|instance, pool| keep(instance, *pool));
        before - self.owners.len()
    }

    /// Number of tracked instances
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// No instance tracked
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
