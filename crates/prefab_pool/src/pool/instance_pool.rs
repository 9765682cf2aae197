//! Single-template instance pool
//!
//! A [`Pool`] serves one template. Instances move between four states:
//!
//! ```text
//! WarmFree ──acquire──▶ Active ◀──acquire── ColdFree
//!                         │  ▲                 ▲
//!          release(d ≥ 0) │  │                 │
//!                         ▼  │                 │
//!                   PendingDestroy ──tick──────┤
//!                         Active ──release(<0)─┘
//! ```
//!
//! Warm instances come from a pre-warm pass and have never been handed out.
//! Cold instances have been active and were recycled. Acquire prefers warm,
//! then cold, then clones the template.

use crate::config::{PoolConfig, ShapeMismatchPolicy};
use crate::foundation::collections::{ObjectId, PoolId, SecondaryMap, TemplateId};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::foundation::time::SharedClock;
use crate::pool::component_cache::InstanceComponentCache;
use crate::pool::error::{PoolError, PoolResult};
use crate::pool::owners::InstanceOwners;
use crate::pool::placement::Placement;
use crate::pool::schedule::DelayedDestroySchedule;
use crate::pool::snapshot::TemplateSnapshot;
use crate::pool::stats::PoolStats;
use crate::scene::Scene;

bitflags::bitflags! {
    /// Per-instance bookkeeping
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InstanceFlags: u8 {
        /// The first-activation notification has been delivered
        const STARTED = 1 << 0;
        /// The last restore found components out of line with the template
        const DRIFTED = 1 << 1;
    }
}

/// Lifecycle state of an instance relative to its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Pre-warmed, never handed out
    WarmFree,
    /// Recycled after use
    ColdFree,
    /// In use
    Active,
    /// In use, with a delayed release scheduled
    PendingDestroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Warm,
    Cold,
    Active,
}

#[derive(Debug, Clone, Copy)]
struct InstanceRecord {
    slot: Slot,
    flags: InstanceFlags,
}

/// Result of a release request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseOutcome {
    /// Recycled into the cold free list
    Recycled,
    /// Will be recycled by the first tick at or after `due`
    Scheduled {
        /// Absolute due time in clock seconds
        due: f32,
    },
    /// The instance was already free; nothing changed
    AlreadyFree,
    /// The instance does not belong to this pool
    NotOwned,
    /// The instance was disposed outside the pool and has been forgotten
    Stale,
}

impl ReleaseOutcome {
    /// Whether the request was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Recycled | Self::Scheduled { .. })
    }
}

/// Work done by one maintenance tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// First-activation notifications delivered
    pub first_activations: usize,
    /// Delayed releases fulfilled
    pub recycled: usize,
    /// Unpooled objects discarded after a delay (registry ticks only)
    pub discarded: usize,
}

/// Pool of reusable instances of one template
#[derive(Debug)]
pub struct Pool {
    id: PoolId,
    name: String,
    template: Option<TemplateId>,
    container: Option<ObjectId>,
    default_transform: Transform,
    snapshot: TemplateSnapshot,
    warm: Vec<ObjectId>,
    cold: Vec<ObjectId>,
    active: Vec<ObjectId>,
    records: SecondaryMap<ObjectId, InstanceRecord>,
    pending_first_activation: Vec<ObjectId>,
    schedule: DelayedDestroySchedule,
    components: InstanceComponentCache,
    config: PoolConfig,
    clock: SharedClock,
    stats: PoolStats,
}

impl Pool {
    /// Create an unbound pool
    pub fn new(id: PoolId, config: PoolConfig, clock: SharedClock) -> Self {
        let capacity = config.initial_capacity;
        Self {
            id,
            name: String::new(),
            template: None,
            container: None,
            default_transform: Transform::default(),
            snapshot: TemplateSnapshot::default(),
            warm: Vec::new(),
            cold: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            records: SecondaryMap::new(),
            pending_first_activation: Vec::new(),
            schedule: DelayedDestroySchedule::new(),
            components: InstanceComponentCache::new(),
            config,
            clock,
            stats: PoolStats::default(),
        }
    }

    /// Bind the pool to `template`
    ///
    /// Binding the same template again is a no-op. Captures the template
    /// snapshot and creates the pool's container object.
    pub fn bind(&mut self, scene: &mut Scene, template: TemplateId) -> PoolResult<()> {
        if let Some(bound) = self.template {
            if bound == template {
                return Ok(());
            }
            log::error!("Pool '{}' is already bound; refusing to rebind", self.name);
            return Err(PoolError::AlreadyBound {
                bound,
                requested: template,
            });
        }

        let Some(source) = scene.template(template) else {
            log::error!("Cannot bind pool {:?}: template {:?} is not registered", self.id, template);
            return Err(PoolError::InvalidTemplate(template));
        };

        self.snapshot = TemplateSnapshot::capture(source);
        self.default_transform = source.transform().clone();
        self.name = source.name().to_string();
        self.template = Some(template);
        self.container = Some(scene.spawn(format!("Pool: {}", self.name)));

        log::info!(
            "Created pool '{}' ({} restorable component(s))",
            self.name,
            self.snapshot.len()
        );
        Ok(())
    }

    /// Replace every instance of the pool with `count` freshly cloned ones
    ///
    /// Children of the pool container are destroyed, and so is every tracked
    /// instance, active ones included, along with their pending releases and
    /// first-activation entries. Each new instance goes through one recycle
    /// pass and then waits on the warm list.
    pub fn prewarm(&mut self, scene: &mut Scene, owners: &mut InstanceOwners, count: usize) -> PoolResult<()> {
        let template = self.bound_template(scene)?;

        if let Some(container) = self.container {
            let strays: Vec<ObjectId> = scene
                .children(container)
                .iter()
                .copied()
                .filter(|&child| !self.records.contains_key(child))
                .collect();
            for stray in strays {
                scene.despawn(stray);
            }
        }

        let tracked: Vec<ObjectId> = self.records.keys().collect();
        let active = self.active.len();
        for instance in tracked {
            self.discard(scene, owners, instance);
        }
        if active > 0 {
            log::debug!("Pool '{}' discarded {} active instance(s) before pre-warm", self.name, active);
        }
        self.schedule.clear();
        self.pending_first_activation.clear();

        for _ in 0..count {
            let instance = self.clone_fresh(scene, owners, template)?;
            self.active.push(instance);
            self.recycle(scene, instance);
        }

        self.warm.append(&mut self.cold);
        for &instance in &self.warm {
            if let Some(record) = self.records.get_mut(instance) {
                record.slot = Slot::Warm;
            }
        }
        self.pending_first_activation.reserve(count);
        self.schedule.reserve(count);

        log::info!("Pre-warmed pool '{}' with {} instance(s)", self.name, count);
        Ok(())
    }

    /// Hand out an instance placed per `placement`
    ///
    /// Served from the warm list, then the cold list, then a fresh clone.
    /// The template snapshot is restored before the instance is activated.
    /// Fails only on configuration errors.
    pub fn acquire(
        &mut self,
        scene: &mut Scene,
        owners: &mut InstanceOwners,
        placement: &Placement,
    ) -> PoolResult<ObjectId> {
        let template = self.bound_template(scene)?;
        placement.validate(scene)?;

        let position = placement.position.unwrap_or(self.default_transform.position);
        let rotation = placement.rotation.unwrap_or(self.default_transform.rotation);

        let instance = loop {
            if let Some(instance) = self.peek_free(scene, owners) {
                self.place(scene, instance, position, rotation);
                let consistent = self.restore(scene, instance);
                if consistent || self.config.shape_mismatch == ShapeMismatchPolicy::Degrade {
                    self.stats.reused += 1;
                    log::trace!("Pool '{}' reused {:?}", self.name, instance);
                    break instance;
                }
                log::warn!(
                    "Pool '{}' discarding drifted instance {:?}",
                    self.name,
                    instance
                );
                self.discard(scene, owners, instance);
                continue;
            }

            let instance = self.clone_fresh(scene, owners, template)?;
            scene.set_parent(instance, None, false);
            self.place(scene, instance, position, rotation);
            if let Some(container) = self.container {
                scene.set_parent(instance, Some(container), true);
            }
            self.restore(scene, instance);
            break instance;
        };

        self.activate(scene, instance);
        if let Some(parent) = placement.parent {
            scene.set_parent(instance, Some(parent), placement.world_space);
        }
        Ok(instance)
    }

    /// Release an instance, now (`delay < 0`) or after `delay` seconds
    ///
    /// A delayed release overwrites any earlier one for the same instance.
    /// An immediate release also cancels a scheduled one. Misuse is reported
    /// through the outcome and a warning, never by failing.
    pub fn release(&mut self, scene: &mut Scene, instance: ObjectId, delay: f32) -> ReleaseOutcome {
        let Some(record) = self.records.get(instance).copied() else {
            self.stats.misuse_warnings += 1;
            log::warn!("Instance {:?} is not owned by pool '{}'", instance, self.name);
            return ReleaseOutcome::NotOwned;
        };

        if !scene.contains(instance) {
            log::warn!(
                "Pool '{}': instance {:?} was disposed outside the pool",
                self.name,
                instance
            );
            self.stats.stale_entries += 1;
            self.forget(instance);
            return ReleaseOutcome::Stale;
        }

        if delay >= 0.0 {
            if record.slot != Slot::Active {
                return self.warn_already_free(instance);
            }
            let due = self.clock.now() + delay;
            self.schedule.insert(instance, due);
            log::trace!("Pool '{}' scheduled {:?} at {}", self.name, instance, due);
            return ReleaseOutcome::Scheduled { due };
        }

        self.schedule.remove(instance);
        if record.slot != Slot::Active {
            return self.warn_already_free(instance);
        }
        self.recycle(scene, instance);
        ReleaseOutcome::Recycled
    }

    /// Recycle every active instance immediately
    pub fn release_all(&mut self, scene: &mut Scene) -> usize {
        let active = std::mem::replace(&mut self.active, Vec::with_capacity(self.config.initial_capacity));
        let mut recycled = 0;
        for instance in active {
            self.schedule.remove(instance);
            if scene.contains(instance) {
                self.recycle(scene, instance);
                recycled += 1;
            } else {
                self.stats.stale_entries += 1;
                self.forget(instance);
            }
        }
        if recycled > 0 {
            log::debug!("Pool '{}' recycled {} active instance(s)", self.name, recycled);
        }
        recycled
    }

    /// Run per-frame maintenance at the clock's current time
    pub fn tick(&mut self, scene: &mut Scene) -> TickReport {
        let now = self.clock.now();
        self.tick_at(scene, now)
    }

    /// Run per-frame maintenance as of `now`
    ///
    /// Delivers queued first-activation notifications, then recycles every
    /// instance whose delayed release is due.
    pub fn tick_at(&mut self, scene: &mut Scene, now: f32) -> TickReport {
        let mut report = TickReport::default();

        for instance in std::mem::take(&mut self.pending_first_activation) {
            let Some(record) = self.records.get_mut(instance) else {
                continue;
            };
            if record.slot != Slot::Active
                || record.flags.contains(InstanceFlags::STARTED)
                || !scene.contains(instance)
            {
                continue;
            }
            record.flags.insert(InstanceFlags::STARTED);
            scene.for_each_component_mut(instance, |component| component.notify_first_activation());
            report.first_activations += 1;
        }

        for instance in self.schedule.pop_due(now) {
            let slot = self.records.get(instance).map(|record| record.slot);
            if !scene.contains(instance) {
                if slot.is_some() {
                    self.stats.stale_entries += 1;
                    self.forget(instance);
                }
            } else if slot == Some(Slot::Active) {
                self.recycle(scene, instance);
                report.recycled += 1;
            }
        }
        report
    }

    /// Take over an object created outside the pool
    ///
    /// Active objects join the active list, inactive ones the cold list.
    /// Returns false if the object is gone or already tracked.
    pub fn adopt(&mut self, scene: &mut Scene, owners: &mut InstanceOwners, instance: ObjectId) -> bool {
        if self.records.contains_key(instance) || !scene.contains(instance) {
            return false;
        }

        let record = if scene.is_active_in_hierarchy(instance) {
            self.active.push(instance);
            self.stats.peak_active = self.stats.peak_active.max(self.active.len());
            InstanceRecord {
                slot: Slot::Active,
                flags: InstanceFlags::STARTED,
            }
        } else {
            self.cold.push(instance);
            InstanceRecord {
                slot: Slot::Cold,
                flags: InstanceFlags::empty(),
            }
        };
        self.records.insert(instance, record);
        self.components.get_or_build(scene, instance, &self.snapshot);
        owners.register(instance, self.id);
        log::debug!("Pool '{}' adopted {:?}", self.name, instance);
        true
    }

    /// Forget every instance that was disposed outside the pool
    pub fn remove_invalid(&mut self, scene: &Scene, owners: &mut InstanceOwners, warn: bool) -> usize {
        let dead: Vec<(ObjectId, Slot)> = self
            .records
            .iter()
            .filter(|(instance, _)| !scene.contains(*instance))
            .map(|(instance, record)| (instance, record.slot))
            .collect();

        for &(instance, slot) in &dead {
            if warn {
                log::warn!(
                    "Pool '{}': found disposed instance {:?} in the {:?} list; discard pooled instances through the pool",
                    self.name,
                    instance,
                    slot
                );
            }
            owners.unregister(instance);
            self.forget(instance);
        }
        self.stats.stale_entries += dead.len();
        dead.len()
    }

    /// Discard every instance and the container, and unbind the template
    ///
    /// The only path that releases instance memory.
    pub fn teardown(&mut self, scene: &mut Scene, owners: &mut InstanceOwners) -> usize {
        let tracked: Vec<ObjectId> = self.records.keys().collect();
        let mut discarded = 0;
        for instance in tracked {
            owners.unregister(instance);
            if scene.despawn(instance) {
                discarded += 1;
            }
        }
        if let Some(container) = self.container.take() {
            scene.despawn(container);
        }

        self.warm.clear();
        self.cold.clear();
        self.active.clear();
        self.records.clear();
        self.pending_first_activation.clear();
        self.schedule.clear();
        self.components.clear();
        self.snapshot = TemplateSnapshot::default();
        self.template = None;
        self.stats.discarded += discarded;

        log::info!("Tore down pool '{}' ({} instance(s) discarded)", self.name, discarded);
        discarded
    }

    /// Pool handle
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Name of the bound template
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound template
    pub fn template(&self) -> Option<TemplateId> {
        self.template
    }

    /// Object the pool parents its free instances under
    pub fn container(&self) -> Option<ObjectId> {
        self.container
    }

    /// Captured template state
    pub fn snapshot(&self) -> &TemplateSnapshot {
        &self.snapshot
    }

    /// Pool settings
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of instances in use
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of free instances (warm and cold)
    pub fn cache_size(&self) -> usize {
        self.warm.len() + self.cold.len()
    }

    /// Number of pre-warmed instances not yet handed out
    pub fn warm_count(&self) -> usize {
        self.warm.len()
    }

    /// Number of recycled instances
    pub fn cold_count(&self) -> usize {
        self.cold.len()
    }

    /// Number of instances with a delayed release pending
    pub fn pending_destroy_count(&self) -> usize {
        self.schedule.len()
    }

    /// Every instance the pool tracks
    pub fn instance_count(&self) -> usize {
        self.records.len()
    }

    /// Instances currently in use, in no particular order
    pub fn active_instances(&self) -> &[ObjectId] {
        &self.active
    }

    /// Whether `instance` is tracked by this pool
    pub fn owns(&self, instance: ObjectId) -> bool {
        self.records.contains_key(instance)
    }

    /// State of `instance`, if tracked by this pool
    pub fn state_of(&self, instance: ObjectId) -> Option<InstanceState> {
        let record = self.records.get(instance)?;
        Some(match record.slot {
            Slot::Warm => InstanceState::WarmFree,
            Slot::Cold => InstanceState::ColdFree,
            Slot::Active if self.schedule.contains(instance) => InstanceState::PendingDestroy,
            Slot::Active => InstanceState::Active,
        })
    }

    /// Bookkeeping flags of `instance`
    pub fn flags_of(&self, instance: ObjectId) -> Option<InstanceFlags> {
        self.records.get(instance).map(|record| record.flags)
    }

    /// Pool counters
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    fn bound_template(&self, scene: &Scene) -> PoolResult<TemplateId> {
        let template = self.template.ok_or(PoolError::Unbound(self.id))?;
        if scene.template(template).is_none() {
            log::error!("Pool '{}': template {:?} is no longer registered", self.name, template);
            return Err(PoolError::InvalidTemplate(template));
        }
        Ok(template)
    }

    fn clone_fresh(
        &mut self,
        scene: &mut Scene,
        owners: &mut InstanceOwners,
        template: TemplateId,
    ) -> PoolResult<ObjectId> {
        let instance = scene
            .instantiate_template(template)
            .ok_or(PoolError::InvalidTemplate(template))?;
        if let Some(container) = self.container {
            scene.set_parent(instance, Some(container), true);
        }

        self.records.insert(
            instance,
            InstanceRecord {
                slot: Slot::Active,
                flags: InstanceFlags::empty(),
            },
        );
        self.components.get_or_build(scene, instance, &self.snapshot);
        owners.register(instance, self.id);
        self.stats.created += 1;
        log::debug!("Pool '{}' cloned new instance {:?}", self.name, instance);
        Ok(instance)
    }

    fn peek_free(&mut self, scene: &Scene, owners: &mut InstanceOwners) -> Option<ObjectId> {
        let mut stale = 0;
        let mut found = None;

        'lists: for slot in [Slot::Warm, Slot::Cold] {
            loop {
                let popped = match slot {
                    Slot::Warm => self.warm.pop(),
                    _ => self.cold.pop(),
                };
                let Some(instance) = popped else {
                    break;
                };
                if scene.contains(instance) {
                    found = Some(instance);
                    break 'lists;
                }
                stale += 1;
                owners.unregister(instance);
                self.forget(instance);
            }
        }

        if stale > 0 {
            self.stats.stale_entries += stale;
            if self.config.warn_on_stale_entries {
                log::warn!(
                    "Pool '{}': skipped {} disposed instance(s) on its free lists; discard pooled instances through the pool",
                    self.name,
                    stale
                );
            }
        }
        found
    }

    fn place(&self, scene: &mut Scene, instance: ObjectId, position: Vec3, rotation: Quat) {
        if let Some(object) = scene.object_mut(instance) {
            object.transform = Transform {
                position,
                rotation,
                scale: self.default_transform.scale,
            };
        }
    }

    /// Write the snapshot back and zero motion; false if the shape drifted
    fn restore(&mut self, scene: &mut Scene, instance: ObjectId) -> bool {
        let entry = self.components.get_or_build(scene, instance, &self.snapshot);

        let mut skipped = 0;
        for (addr, captured) in entry.matched.iter().zip(self.snapshot.entries()) {
            match scene.component_at_mut(*addr) {
                Some(component) => skipped += captured.apply(component).skipped,
                None => skipped += 1,
            }
        }
        for addr in &entry.motion {
            if let Some(motion) = scene.component_at_mut(*addr).and_then(|c| c.motion_mut()) {
                motion.reset_motion();
            }
        }

        let consistent = entry.consistent && skipped == 0;
        if let Some(record) = self.records.get_mut(instance) {
            record.flags.set(InstanceFlags::DRIFTED, !consistent);
        }
        if !consistent {
            self.stats.shape_mismatches += 1;
            log::warn!(
                "Pool '{}': instance {:?} no longer matches the template's components",
                self.name,
                instance
            );
        }
        consistent
    }

    fn activate(&mut self, scene: &mut Scene, instance: ObjectId) {
        scene.set_active(instance, true);
        self.active.push(instance);
        self.stats.peak_active = self.stats.peak_active.max(self.active.len());

        if let Some(record) = self.records.get_mut(instance) {
            record.slot = Slot::Active;
            if !record.flags.contains(InstanceFlags::STARTED) {
                self.pending_first_activation.push(instance);
            }
        }
    }

    fn recycle(&mut self, scene: &mut Scene, instance: ObjectId) {
        scene.for_each_component_mut(instance, |component| component.notify_teardown());
        scene.set_active(instance, false);

        if let Some(index) = self.active.iter().position(|&id| id == instance) {
            self.active.swap_remove(index);
        }
        self.pending_first_activation.retain(|&id| id != instance);
        self.cold.push(instance);
        if let Some(record) = self.records.get_mut(instance) {
            record.slot = Slot::Cold;
        }
        if let Some(container) = self.container {
            scene.set_parent(instance, Some(container), true);
        }
        self.stats.recycled += 1;
        log::trace!("Pool '{}' recycled {:?}", self.name, instance);
    }

    fn discard(&mut self, scene: &mut Scene, owners: &mut InstanceOwners, instance: ObjectId) {
        owners.unregister(instance);
        self.forget(instance);
        scene.despawn(instance);
        self.stats.discarded += 1;
    }

    fn forget(&mut self, instance: ObjectId) {
        self.records.remove(instance);
        self.components.remove(instance);
        self.schedule.remove(instance);
        self.warm.retain(|&id| id != instance);
        self.cold.retain(|&id| id != instance);
        self.active.retain(|&id| id != instance);
        self.pending_first_activation.retain(|&id| id != instance);
    }

    fn warn_already_free(&mut self, instance: ObjectId) -> ReleaseOutcome {
        self.stats.misuse_warnings += 1;
        log::warn!(
            "Instance {:?} not found in the active list of pool '{}'",
            instance,
            self.name
        );
        ReleaseOutcome::AlreadyFree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::ManualClock;
    use crate::pool::snapshot::RestorePolicy;
    use crate::scene::component::Component;
    use crate::scene::template::{Template, TemplateNode};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Ball {
        color: &'static str,
        starts: u32,
        teardowns: u32,
    }

    impl Component for Ball {
        fn restore_policy() -> RestorePolicy<Self> {
            RestorePolicy::Fields(vec![crate::restore_field!(Ball, color)])
        }

        fn on_first_activation(&mut self) {
            self.starts += 1;
        }

        fn on_teardown(&mut self) {
            self.teardowns += 1;
        }
    }

    struct Fixture {
        scene: Scene,
        owners: InstanceOwners,
        clock: Arc<ManualClock>,
        pool: Pool,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let template = scene.add_template(Template::new(TemplateNode::new("ball").with_component(Ball {
            color: "red",
            starts: 0,
            teardowns: 0,
        })));
        let clock = Arc::new(ManualClock::new());
        let mut pool = Pool::new(PoolId::default(), PoolConfig::default(), clock.clone());
        pool.bind(&mut scene, template).unwrap();
        Fixture {
            scene,
            owners: InstanceOwners::new(),
            clock,
            pool,
        }
    }

    impl Fixture {
        fn acquire(&mut self) -> ObjectId {
            self.pool
                .acquire(&mut self.scene, &mut self.owners, &Placement::from_template())
                .unwrap()
        }

        fn ball(&self, id: ObjectId) -> &Ball {
            self.scene.component::<Ball>(id).unwrap()
        }
    }

    #[test]
    fn test_bind_names_container() {
        let f = fixture();
        let container = f.pool.container().unwrap();
        assert_eq!(f.scene.object(container).unwrap().name, "Pool: ball");
        assert_eq!(f.pool.name(), "ball");
    }

    #[test]
    fn test_rebind_is_rejected() {
        let mut f = fixture();
        let bound = f.pool.template().unwrap();
        let other = f.scene.add_template(Template::new(TemplateNode::new("other")));

        assert!(f.pool.bind(&mut f.scene, bound).is_ok());
        assert_eq!(
            f.pool.bind(&mut f.scene, other),
            Err(PoolError::AlreadyBound {
                bound,
                requested: other
            })
        );
    }

    #[test]
    fn test_unbound_pool_cannot_acquire() {
        let mut scene = Scene::new();
        let mut owners = InstanceOwners::new();
        let mut pool = Pool::new(PoolId::default(), PoolConfig::default(), Arc::new(ManualClock::new()));
        let result = pool.acquire(&mut scene, &mut owners, &Placement::from_template());
        assert!(matches!(result, Err(PoolError::Unbound(_))));
    }

    #[test]
    fn test_fresh_instance_is_registered_and_active() {
        let mut f = fixture();
        let a = f.acquire();

        assert_eq!(f.owners.owner_of(a), Some(f.pool.id()));
        assert_eq!(f.pool.state_of(a), Some(InstanceState::Active));
        assert!(f.scene.is_active(a));
        assert_eq!(f.scene.parent(a), f.pool.container());
        assert_eq!(f.pool.stats().created, 1);
    }

    #[test]
    fn test_first_activation_waits_for_tick() {
        let mut f = fixture();
        let a = f.acquire();
        assert_eq!(f.ball(a).starts, 0);

        let report = f.pool.tick_at(&mut f.scene, 0.0);
        assert_eq!(report.first_activations, 1);
        assert_eq!(f.ball(a).starts, 1);

        f.pool.tick_at(&mut f.scene, 0.1);
        assert_eq!(f.ball(a).starts, 1);
    }

    #[test]
    fn test_release_before_tick_drops_first_activation() {
        let mut f = fixture();
        let a = f.acquire();
        f.pool.release(&mut f.scene, a, -1.0);

        assert_eq!(f.pool.tick_at(&mut f.scene, 0.0).first_activations, 0);
        assert_eq!(f.ball(a).starts, 0);
        assert_eq!(f.ball(a).teardowns, 1);
    }

    #[test]
    fn test_recycled_instance_is_not_started_twice() {
        let mut f = fixture();
        let a = f.acquire();
        f.pool.tick_at(&mut f.scene, 0.0);
        f.pool.release(&mut f.scene, a, -1.0);

        let b = f.acquire();
        assert_eq!(a, b);
        assert_eq!(f.pool.tick_at(&mut f.scene, 0.1).first_activations, 0);
        assert_eq!(f.ball(b).starts, 1);
    }

    #[test]
    fn test_release_recycles_into_cold_list() {
        let mut f = fixture();
        let a = f.acquire();

        assert_eq!(f.pool.release(&mut f.scene, a, -1.0), ReleaseOutcome::Recycled);
        assert_eq!(f.pool.state_of(a), Some(InstanceState::ColdFree));
        assert!(!f.scene.is_active(a));
        assert_eq!(f.pool.active_count(), 0);
        assert_eq!(f.pool.cache_size(), 1);
    }

    #[test]
    fn test_delayed_release_uses_clock() {
        let mut f = fixture();
        f.clock.set(10.0);
        let a = f.acquire();

        assert_eq!(
            f.pool.release(&mut f.scene, a, 2.0),
            ReleaseOutcome::Scheduled { due: 12.0 }
        );
        assert_eq!(f.pool.state_of(a), Some(InstanceState::PendingDestroy));

        f.clock.set(11.0);
        assert_eq!(f.pool.tick(&mut f.scene).recycled, 0);
        f.clock.set(12.0);
        assert_eq!(f.pool.tick(&mut f.scene).recycled, 1);
        assert_eq!(f.pool.state_of(a), Some(InstanceState::ColdFree));
    }

    #[test]
    fn test_rescheduling_overwrites() {
        let mut f = fixture();
        let a = f.acquire();
        f.pool.release(&mut f.scene, a, 1.0);
        f.pool.release(&mut f.scene, a, 3.0);

        assert_eq!(f.pool.tick_at(&mut f.scene, 2.0).recycled, 0);
        assert_eq!(f.pool.tick_at(&mut f.scene, 3.0).recycled, 1);
        assert_eq!(f.pool.pending_destroy_count(), 0);
    }

    #[test]
    fn test_immediate_release_cancels_schedule() {
        let mut f = fixture();
        let a = f.acquire();
        f.pool.release(&mut f.scene, a, 1.0);
        assert_eq!(f.pool.release(&mut f.scene, a, -1.0), ReleaseOutcome::Recycled);

        let b = f.acquire();
        assert_eq!(a, b);
        assert_eq!(f.pool.tick_at(&mut f.scene, 5.0).recycled, 0);
        assert_eq!(f.pool.state_of(b), Some(InstanceState::Active));
    }

    #[test]
    fn test_nan_delay_is_immediate() {
        let mut f = fixture();
        let a = f.acquire();
        assert_eq!(f.pool.release(&mut f.scene, a, f32::NAN), ReleaseOutcome::Recycled);
    }

    #[test]
    fn test_release_of_foreign_object() {
        let mut f = fixture();
        let stranger = f.scene.spawn("stranger");
        assert_eq!(f.pool.release(&mut f.scene, stranger, -1.0), ReleaseOutcome::NotOwned);
        assert_eq!(f.pool.stats().misuse_warnings, 1);
    }

    #[test]
    fn test_delayed_release_of_free_instance_is_misuse() {
        let mut f = fixture();
        let a = f.acquire();
        f.pool.release(&mut f.scene, a, -1.0);

        assert_eq!(f.pool.release(&mut f.scene, a, 1.0), ReleaseOutcome::AlreadyFree);
        assert_eq!(f.pool.pending_destroy_count(), 0);
    }

    #[test]
    fn test_release_all() {
        let mut f = fixture();
        let a = f.acquire();
        let b = f.acquire();
        f.pool.release(&mut f.scene, b, 5.0);

        assert_eq!(f.pool.release_all(&mut f.scene), 2);
        assert_eq!(f.pool.active_count(), 0);
        assert_eq!(f.pool.cache_size(), 2);
        assert_eq!(f.pool.pending_destroy_count(), 0);
        assert!(!f.scene.is_active(a));
    }

    #[test]
    fn test_prewarm_fills_warm_list() {
        let mut f = fixture();
        f.pool.prewarm(&mut f.scene, &mut f.owners, 3).unwrap();

        assert_eq!(f.pool.warm_count(), 3);
        assert_eq!(f.pool.cold_count(), 0);
        assert_eq!(f.pool.active_count(), 0);
        assert_eq!(f.owners.len(), 3);
        assert_eq!(f.scene.children(f.pool.container().unwrap()).len(), 3);
    }

    #[test]
    fn test_prewarm_replaces_previous_cache() {
        let mut f = fixture();
        f.pool.prewarm(&mut f.scene, &mut f.owners, 4).unwrap();
        f.pool.prewarm(&mut f.scene, &mut f.owners, 1).unwrap();

        assert_eq!(f.pool.cache_size(), 1);
        assert_eq!(f.owners.len(), 1);
        assert_eq!(f.pool.stats().discarded, 4);
        assert_eq!(f.scene.children(f.pool.container().unwrap()).len(), 1);
    }

    #[test]
    fn test_prewarm_discards_active_instances() {
        let mut f = fixture();
        let a = f.acquire();
        let b = f.acquire();
        f.pool.release(&mut f.scene, b, 4.0);
        f.pool.prewarm(&mut f.scene, &mut f.owners, 3).unwrap();

        assert_eq!(f.pool.active_count(), 0);
        assert_eq!(f.pool.cache_size(), 3);
        assert_eq!(f.pool.pending_destroy_count(), 0);
        assert!(!f.scene.contains(a));
        assert!(!f.scene.contains(b));
        assert_eq!(f.pool.state_of(a), None);
        assert_eq!(f.owners.owner_of(a), None);
        assert_eq!(f.owners.len(), 3);
        assert_eq!(f.pool.tick_at(&mut f.scene, 10.0), TickReport::default());
    }

    #[test]
    fn test_prewarm_destroys_stray_children() {
        let mut f = fixture();
        let container = f.pool.container().unwrap();
        let stray = f.scene.spawn("stray");
        f.scene.set_parent(stray, Some(container), false);

        f.pool.prewarm(&mut f.scene, &mut f.owners, 0).unwrap();
        assert!(!f.scene.contains(stray));
    }

    #[test]
    fn test_warm_instance_gets_first_activation() {
        let mut f = fixture();
        f.pool.prewarm(&mut f.scene, &mut f.owners, 1).unwrap();
        let a = f.acquire();

        assert_eq!(f.pool.stats().reused, 1);
        assert_eq!(f.pool.tick_at(&mut f.scene, 0.0).first_activations, 1);
        assert_eq!(f.ball(a).starts, 1);
    }

    #[test]
    fn test_acquire_skips_disposed_free_entries() {
        let mut f = fixture();
        f.pool.prewarm(&mut f.scene, &mut f.owners, 2).unwrap();
        let victims: Vec<ObjectId> = f.scene.children(f.pool.container().unwrap()).to_vec();
        for victim in &victims {
            f.scene.despawn(*victim);
        }

        let a = f.acquire();
        assert!(!victims.contains(&a));
        assert_eq!(f.pool.stats().stale_entries, 2);
        assert_eq!(f.pool.stats().created, 3);
        assert_eq!(f.pool.instance_count(), 1);
        assert_eq!(f.owners.len(), 1);
    }

    #[test]
    fn test_placement_is_applied() {
        let mut f = fixture();
        let parent = f.scene.spawn("turret");
        f.scene.object_mut(parent).unwrap().transform = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));

        let placement = Placement::at(Vec3::new(1.0, 0.0, 0.0)).with_parent(parent, false);
        let a = f
            .pool
            .acquire(&mut f.scene, &mut f.owners, &placement)
            .unwrap();

        assert_eq!(f.scene.parent(a), Some(parent));
        let world = f.scene.world_transform(a).unwrap();
        approx::assert_relative_eq!(world.position, Vec3::new(6.0, 0.0, 0.0), epsilon = 1e-5);

        f.pool.release(&mut f.scene, a, -1.0);
        assert_eq!(f.scene.parent(a), f.pool.container());
    }

    fn rotated_turret(scene: &mut Scene) -> ObjectId {
        let turret = scene.spawn("turret");
        scene.object_mut(turret).unwrap().transform = Transform::from_position_rotation(
            Vec3::new(5.0, 0.0, 0.0),
            Quat::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0),
        );
        turret
    }

    #[test]
    fn test_world_space_parent_on_fresh_clone() {
        let mut f = fixture();
        let turret = rotated_turret(&mut f.scene);
        let requested = Vec3::new(1.0, 2.0, 3.0);

        let placement = Placement::at(requested).with_parent(turret, true);
        let a = f
            .pool
            .acquire(&mut f.scene, &mut f.owners, &placement)
            .unwrap();

        assert_eq!(f.pool.stats().created, 1);
        assert_eq!(f.scene.parent(a), Some(turret));
        let world = f.scene.world_transform(a).unwrap();
        approx::assert_relative_eq!(world.position, requested, epsilon = 1e-4);
    }

    #[test]
    fn test_world_space_parent_on_reused_instance() {
        let mut f = fixture();
        let turret = rotated_turret(&mut f.scene);
        let first = f.acquire();
        f.pool.release(&mut f.scene, first, -1.0);
        let requested = Vec3::new(-2.0, 0.5, 4.0);

        let placement = Placement::at(requested).with_parent(turret, true);
        let a = f
            .pool
            .acquire(&mut f.scene, &mut f.owners, &placement)
            .unwrap();

        assert_eq!(a, first);
        assert_eq!(f.pool.stats().reused, 1);
        assert_eq!(f.scene.parent(a), Some(turret));
        let world = f.scene.world_transform(a).unwrap();
        approx::assert_relative_eq!(world.position, requested, epsilon = 1e-4);

        f.pool.release(&mut f.scene, a, -1.0);
        assert_eq!(f.scene.parent(a), f.pool.container());
        let parked = f.scene.world_transform(a).unwrap();
        approx::assert_relative_eq!(parked.position, requested, epsilon = 1e-4);
    }

    #[test]
    fn test_local_parent_on_reused_instance() {
        let mut f = fixture();
        let turret = f.scene.spawn("turret");
        f.scene.object_mut(turret).unwrap().transform = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        let first = f.acquire();
        f.pool.release(&mut f.scene, first, -1.0);

        let placement = Placement::at(Vec3::new(1.0, 0.0, 0.0)).with_parent(turret, false);
        let a = f
            .pool
            .acquire(&mut f.scene, &mut f.owners, &placement)
            .unwrap();

        assert_eq!(a, first);
        let world = f.scene.world_transform(a).unwrap();
        approx::assert_relative_eq!(world.position, Vec3::new(6.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_remove_invalid_purges_everything() {
        let mut f = fixture();
        let a = f.acquire();
        let b = f.acquire();
        f.pool.release(&mut f.scene, b, 3.0);
        f.scene.despawn(a);
        f.scene.despawn(b);

        assert_eq!(f.pool.remove_invalid(&f.scene, &mut f.owners, false), 2);
        assert_eq!(f.pool.active_count(), 0);
        assert_eq!(f.pool.pending_destroy_count(), 0);
        assert!(f.owners.is_empty());
    }

    #[test]
    fn test_adopt_external_objects() {
        let mut f = fixture();
        let template = f.pool.template().unwrap();
        let live = f.scene.instantiate_template(template).unwrap();
        let parked = f.scene.instantiate_template(template).unwrap();
        f.scene.set_active(parked, false);

        assert!(f.pool.adopt(&mut f.scene, &mut f.owners, live));
        assert!(f.pool.adopt(&mut f.scene, &mut f.owners, parked));
        assert!(!f.pool.adopt(&mut f.scene, &mut f.owners, live));

        assert_eq!(f.pool.state_of(live), Some(InstanceState::Active));
        assert_eq!(f.pool.state_of(parked), Some(InstanceState::ColdFree));
        assert_eq!(f.owners.owner_of(live), Some(f.pool.id()));
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut f = fixture();
        f.pool.prewarm(&mut f.scene, &mut f.owners, 2).unwrap();
        let a = f.acquire();
        let container = f.pool.container().unwrap();

        assert_eq!(f.pool.teardown(&mut f.scene, &mut f.owners), 2);
        assert!(!f.scene.contains(a));
        assert!(!f.scene.contains(container));
        assert!(f.pool.template().is_none());
        assert_eq!(f.pool.instance_count(), 0);
        assert!(f.owners.is_empty());
        assert_eq!(f.scene.object_count(), 0);
    }
}
