//! Pool registry
//!
//! Resolves a template to its pool (creating it on first use) and a live
//! instance to the pool that produced it, so callers can release instances
//! without knowing where they came from. The registry is an ordinary owned
//! value; a host that needs to share it across threads wraps it, together
//! with its [`Scene`], in a single mutex.

use crate::config::RegistryConfig;
use crate::foundation::collections::{ObjectId, PoolId, SecondaryMap, SlotMap, TemplateId};
use crate::foundation::time::SharedClock;
use crate::pool::error::{PoolError, PoolResult};
use crate::pool::instance_pool::{Pool, ReleaseOutcome, TickReport};
use crate::pool::owners::InstanceOwners;
use crate::pool::placement::Placement;
use crate::pool::schedule::DelayedDestroySchedule;
use crate::pool::stats::RegistryStats;
use crate::scene::Scene;

/// Result of a registry destroy request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DestroyOutcome {
    /// Routed to the owning pool
    Pooled(ReleaseOutcome),
    /// Not pooled; discarded from the scene
    Discarded,
    /// Not pooled; will be discarded by the first tick at or after `due`
    DiscardScheduled {
        /// Absolute due time in clock seconds
        due: f32,
    },
    /// The object no longer exists
    Missing,
}

/// Directory of pools by template and by instance
#[derive(Debug)]
pub struct PoolRegistry {
    pools: SlotMap<PoolId, Pool>,
    by_template: SecondaryMap<TemplateId, PoolId>,
    owners: InstanceOwners,
    unpooled: DelayedDestroySchedule,
    clock: SharedClock,
    config: RegistryConfig,
}

impl PoolRegistry {
    /// Create a registry with default settings
    pub fn new(clock: SharedClock) -> Self {
        Self::with_config(RegistryConfig::default(), clock)
    }

    /// Create a registry with `config`
    pub fn with_config(config: RegistryConfig, clock: SharedClock) -> Self {
        log::info!(
            "Created pool registry (pooling {})",
            if config.pooling_enabled { "enabled" } else { "disabled" }
        );
        Self {
            pools: SlotMap::with_key(),
            by_template: SecondaryMap::new(),
            owners: InstanceOwners::new(),
            unpooled: DelayedDestroySchedule::new(),
            clock,
            config,
        }
    }

    // --- pools -----------------------------------------------------------

    /// Pool serving `template`, created and bound on first use
    pub fn find_or_create_pool(&mut self, scene: &mut Scene, template: TemplateId) -> PoolResult<PoolId> {
        if let Some(id) = self.pool_for(template) {
            return Ok(id);
        }
        self.create_pool(scene, template)
    }

    /// Create a pool bound to `template`
    ///
    /// Fails if the template is unknown or already has a pool.
    pub fn create_pool(&mut self, scene: &mut Scene, template: TemplateId) -> PoolResult<PoolId> {
        let id = self.create_unbound_pool();
        if let Err(err) = self.bind_pool(scene, id, template) {
            self.pools.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Create a pool with no template yet
    pub fn create_unbound_pool(&mut self) -> PoolId {
        let config = self.config.pool.clone();
        let clock = self.clock.clone();
        self.pools.insert_with_key(|id| Pool::new(id, config, clock))
    }

    /// Bind `pool` to `template`; the first pool bound to a template keeps it
    pub fn bind_pool(&mut self, scene: &mut Scene, pool: PoolId, template: TemplateId) -> PoolResult<()> {
        if let Some(existing) = self.pool_for(template) {
            if existing != pool {
                log::error!("Template {:?} already has pool {:?}", template, existing);
                return Err(PoolError::TemplateAlreadyPooled {
                    template,
                    pool: existing,
                });
            }
        }
        let target = self.pools.get_mut(pool).ok_or(PoolError::UnknownPool(pool))?;
        target.bind(scene, template)?;
        self.by_template.insert(template, pool);
        Ok(())
    }

    /// Pool bound to `template`, if any
    pub fn pool_for(&self, template: TemplateId) -> Option<PoolId> {
        self.by_template
            .get(template)
            .copied()
            .filter(|&id| self.pools.contains_key(id))
    }

    /// Access a pool
    pub fn pool(&self, pool: PoolId) -> Option<&Pool> {
        self.pools.get(pool)
    }

    /// Every pool
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Number of pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Discard every instance of `pool` and forget the pool
    pub fn teardown_pool(&mut self, scene: &mut Scene, pool: PoolId) -> PoolResult<usize> {
        let mut removed = self.pools.remove(pool).ok_or(PoolError::UnknownPool(pool))?;
        if let Some(template) = removed.template() {
            self.by_template.remove(template);
        }
        Ok(removed.teardown(scene, &mut self.owners))
    }

    // --- instance ownership ----------------------------------------------

    /// Record that `pool` produced `instance`
    pub fn register_instance(&mut self, pool: PoolId, instance: ObjectId) {
        self.owners.register(instance, pool);
    }

    /// Pool that produced `instance`
    pub fn owner_of(&self, instance: ObjectId) -> Option<PoolId> {
        self.owners.owner_of(instance)
    }

    /// Hand an externally created object to `pool`
    pub fn adopt(&mut self, scene: &mut Scene, pool: PoolId, instance: ObjectId) -> PoolResult<bool> {
        let (pool, owners) = self.pool_and_owners(pool)?;
        Ok(pool.adopt(scene, owners, instance))
    }

    // --- instantiate / destroy -------------------------------------------

    /// Take an instance from `pool`
    pub fn acquire(&mut self, scene: &mut Scene, pool: PoolId, placement: &Placement) -> PoolResult<ObjectId> {
        let (pool, owners) = self.pool_and_owners(pool)?;
        pool.acquire(scene, owners, placement)
    }

    /// Produce an instance of `template`, through its pool when pooling is on
    pub fn instantiate(
        &mut self,
        scene: &mut Scene,
        template: TemplateId,
        placement: &Placement,
    ) -> PoolResult<ObjectId> {
        if !self.config.pooling_enabled {
            return instantiate_unpooled(scene, template, placement);
        }
        let pool = self.find_or_create_pool(scene, template)?;
        self.acquire(scene, pool, placement)
    }

    /// Release `instance` to its pool, or discard it if no pool owns it
    ///
    /// `delay < 0` acts now; otherwise the work happens on the first tick at
    /// or after `now + delay`.
    pub fn destroy(&mut self, scene: &mut Scene, instance: ObjectId, delay: f32) -> DestroyOutcome {
        if self.config.pooling_enabled {
            if let Some(owner) = self.owners.owner_of(instance) {
                match self.pools.get_mut(owner) {
                    Some(pool) => return DestroyOutcome::Pooled(pool.release(scene, instance, delay)),
                    None => {
                        self.owners.unregister(instance);
                    }
                }
            }
        }

        if !scene.contains(instance) {
            self.unpooled.remove(instance);
            return DestroyOutcome::Missing;
        }
        if delay >= 0.0 {
            let due = self.clock.now() + delay;
            self.unpooled.insert(instance, due);
            return DestroyOutcome::DiscardScheduled { due };
        }
        self.unpooled.remove(instance);
        scene.despawn(instance);
        log::debug!("Discarded unpooled object {:?}", instance);
        DestroyOutcome::Discarded
    }

    /// [`PoolRegistry::destroy`] without delay
    pub fn destroy_immediate(&mut self, scene: &mut Scene, instance: ObjectId) -> DestroyOutcome {
        self.destroy(scene, instance, -1.0)
    }

    /// Recycle every active instance of every pool
    pub fn destroy_all(&mut self, scene: &mut Scene) -> usize {
        self.pools.values_mut().map(|pool| pool.release_all(scene)).sum()
    }

    /// Recycle every active instance of `template`'s pool
    ///
    /// Returns false if the template has no pool.
    pub fn destroy_all_of(&mut self, scene: &mut Scene, template: TemplateId) -> bool {
        match self.pool_for(template).and_then(|id| self.pools.get_mut(id)) {
            Some(pool) => {
                pool.release_all(scene);
                true
            }
            None => false,
        }
    }

    /// Purge every trace of objects disposed outside the pools
    pub fn sweep_invalid_entries(&mut self, scene: &Scene) -> usize {
        let warn = self.config.warn_on_sweep;
        self.sweep_invalid_entries_with(scene, warn)
    }

    /// [`PoolRegistry::sweep_invalid_entries`] with explicit warning control
    pub fn sweep_invalid_entries_with(&mut self, scene: &Scene, warn: bool) -> usize {
        let mut removed = 0;
        for pool in self.pools.values_mut() {
            removed += pool.remove_invalid(scene, &mut self.owners, warn);
        }

        let pools = &self.pools;
        removed += self
            .owners
            .retain(|instance, pool| scene.contains(instance) && pools.contains_key(pool));

        let dead: Vec<ObjectId> = self.unpooled.ids().filter(|&id| !scene.contains(id)).collect();
        for id in &dead {
            self.unpooled.remove(*id);
        }
        removed + dead.len()
    }

    // --- pooling toggle ----------------------------------------------------

    /// Turn pooling on or off
    ///
    /// While off, `instantiate` clones directly and `destroy` discards
    /// directly. Turning it back on quietly sweeps stale entries.
    pub fn set_pooling_enabled(&mut self, scene: &Scene, enabled: bool) {
        if self.config.pooling_enabled == enabled {
            return;
        }
        self.config.pooling_enabled = enabled;
        log::info!("Pooling {}", if enabled { "enabled" } else { "disabled" });
        if enabled {
            self.sweep_invalid_entries_with(scene, false);
        }
    }

    /// Whether pooling is on
    pub fn pooling_enabled(&self) -> bool {
        self.config.pooling_enabled
    }

    // --- pre-warm and queries ----------------------------------------------

    /// Pre-warm `template`'s pool with `count` instances, creating the pool if needed
    pub fn prewarm(&mut self, scene: &mut Scene, template: TemplateId, count: usize) -> PoolResult<PoolId> {
        let id = self.find_or_create_pool(scene, template)?;
        let (pool, owners) = self.pool_and_owners(id)?;
        pool.prewarm(scene, owners, count)?;
        Ok(id)
    }

    /// Pre-warm every template named in the configuration
    ///
    /// Names with no registered template are skipped with a warning.
    /// Returns the number of pools pre-warmed.
    pub fn apply_prewarm_config(&mut self, scene: &mut Scene) -> PoolResult<usize> {
        let requests: Vec<(String, usize)> = self
            .config
            .prewarm
            .iter()
            .map(|(name, &count)| (name.clone(), count))
            .collect();

        let mut warmed = 0;
        for (name, count) in requests {
            let Some(template) = scene.find_template(&name) else {
                log::warn!("No template named '{}' to pre-warm", name);
                continue;
            };
            self.prewarm(scene, template, count)?;
            warmed += 1;
        }
        Ok(warmed)
    }

    /// Active instances of `template` (0 if it has no pool)
    pub fn active_instances(&self, template: TemplateId) -> usize {
        self.pool_for(template)
            .and_then(|id| self.pools.get(id))
            .map_or(0, Pool::active_count)
    }

    /// Free instances of `template` (0 if it has no pool)
    pub fn cache_size(&self, template: TemplateId) -> usize {
        self.pool_for(template)
            .and_then(|id| self.pools.get(id))
            .map_or(0, Pool::cache_size)
    }

    // --- maintenance ---------------------------------------------------------

    /// Run per-frame maintenance on every pool at the clock's current time
    pub fn tick(&mut self, scene: &mut Scene) -> TickReport {
        let now = self.clock.now();
        self.tick_at(scene, now)
    }

    /// Run per-frame maintenance on every pool as of `now`
    pub fn tick_at(&mut self, scene: &mut Scene, now: f32) -> TickReport {
        let mut report = TickReport::default();
        for pool in self.pools.values_mut() {
            let pool_report = pool.tick_at(scene, now);
            report.first_activations += pool_report.first_activations;
            report.recycled += pool_report.recycled;
        }
        for instance in self.unpooled.pop_due(now) {
            if scene.despawn(instance) {
                report.discarded += 1;
            }
        }
        report
    }

    /// Registry settings
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Clock used for delays
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Aggregate statistics
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            pools: self.pools.len(),
            tracked_instances: self.owners.len(),
            pending_discards: self.unpooled.len(),
            ..Default::default()
        };
        for pool in self.pools.values() {
            stats.active += pool.active_count();
            stats.cached += pool.cache_size();
            stats.totals.merge(&pool.stats());
        }
        stats
    }

    fn pool_and_owners(&mut self, id: PoolId) -> PoolResult<(&mut Pool, &mut InstanceOwners)> {
        let pool = self.pools.get_mut(id).ok_or(PoolError::UnknownPool(id))?;
        Ok((pool, &mut self.owners))
    }
}

fn instantiate_unpooled(scene: &mut Scene, template: TemplateId, placement: &Placement) -> PoolResult<ObjectId> {
    placement.validate(scene)?;
    let instance = scene
        .instantiate_template(template)
        .ok_or(PoolError::InvalidTemplate(template))?;
    if let Some(object) = scene.object_mut(instance) {
        if let Some(position) = placement.position {
            object.transform.position = position;
        }
        if let Some(rotation) = placement.rotation {
            object.transform.rotation = rotation;
        }
    }
    if let Some(parent) = placement.parent {
        scene.set_parent(instance, Some(parent), placement.world_space);
    }
    Ok(instance)
}
