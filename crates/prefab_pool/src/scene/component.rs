//! Component trait and type-erased component storage
//!
//! Component types opt into pooling behaviour at compile time: the restore
//! policy, the re-initialisation hook and the lifecycle hooks are all
//! associated items of [`Component`], so no runtime field enumeration is
//! needed. The scene stores components as `Box<dyn DynComponent>`, which is
//! implemented for every [`Component`].

use crate::pool::snapshot::{self, ComponentSnapshot, RestorePolicy};
use std::any::{Any, TypeId};
use std::fmt;

/// Runtime identity of a component type
#[derive(Debug, Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// Identity of `C`
    pub fn of<C: 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// Full type name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl std::hash::Hash for ComponentType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Capability for components carrying transient motion state
///
/// Implemented by rigid-body-like components. The pool zeroes this state every
/// time an instance is handed out again.
pub trait MotionReset {
    /// Zero linear and angular velocity (and anything else transient)
    fn reset_motion(&mut self);
}

/// A component that can live on a pooled object
pub trait Component: Any + Send + Sync + Clone + fmt::Debug {
    /// Which state is put back to the template's values on reuse
    fn restore_policy() -> RestorePolicy<Self> {
        RestorePolicy::Nothing
    }

    /// Zero-argument routine run after captured values are written back
    fn reinit_hook() -> Option<fn(&mut Self)> {
        None
    }

    /// Runs once, on the first maintenance tick after the instance is first handed out
    fn on_first_activation(&mut self) {}

    /// Runs when the instance is recycled, before it is deactivated
    fn on_teardown(&mut self) {}

    /// Cancel any background work still outstanding on this component
    fn cancel_pending_work(&mut self) {}

    /// Expose the motion-reset capability, if this component has one
    fn as_motion_mut(&mut self) -> Option<&mut dyn MotionReset> {
        None
    }
}

/// Object-safe view of a [`Component`]
pub trait DynComponent: Any + Send + Sync + fmt::Debug {
    /// Runtime type of the concrete component
    fn component_type(&self) -> ComponentType;

    /// Deep copy into a new box
    fn clone_boxed(&self) -> Box<dyn DynComponent>;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Capture the restorable state of this component
    fn capture(&self) -> ComponentSnapshot;

    /// Dispatch [`Component::on_first_activation`]
    fn notify_first_activation(&mut self);

    /// Dispatch [`Component::on_teardown`]
    fn notify_teardown(&mut self);

    /// Dispatch [`Component::cancel_pending_work`]
    fn stop_pending_work(&mut self);

    /// Dispatch [`Component::as_motion_mut`]
    fn motion_mut(&mut self) -> Option<&mut dyn MotionReset>;
}

impl<C: Component> DynComponent for C {
    fn component_type(&self) -> ComponentType {
        ComponentType::of::<C>()
    }

    fn clone_boxed(&self) -> Box<dyn DynComponent> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capture(&self) -> ComponentSnapshot {
        snapshot::capture_component(self)
    }

    fn notify_first_activation(&mut self) {
        self.on_first_activation();
    }

    fn notify_teardown(&mut self) {
        self.on_teardown();
    }

    fn stop_pending_work(&mut self) {
        self.cancel_pending_work();
    }

    fn motion_mut(&mut self) -> Option<&mut dyn MotionReset> {
        self.as_motion_mut()
    }
}

impl Clone for Box<dyn DynComponent> {
    fn clone(&self) -> Self {
        (**self).clone_boxed()
    }
}

impl<'a> dyn DynComponent + 'a {
    /// Downcast to a concrete component type
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    /// Mutably downcast to a concrete component type
    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.as_any_mut().downcast_mut::<C>()
    }

    /// Check the concrete type
    pub fn is<C: Component>(&self) -> bool {
        self.as_any().is::<C>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);

    impl Component for Health {}

    #[derive(Debug, Clone, Default)]
    struct Body {
        velocity: f32,
    }

    impl MotionReset for Body {
        fn reset_motion(&mut self) {
            self.velocity = 0.0;
        }
    }

    impl Component for Body {
        fn as_motion_mut(&mut self) -> Option<&mut dyn MotionReset> {
            Some(self)
        }
    }

    #[test]
    fn test_component_type_identity() {
        assert_eq!(ComponentType::of::<Health>(), ComponentType::of::<Health>());
        assert_ne!(ComponentType::of::<Health>(), ComponentType::of::<Body>());
        assert!(ComponentType::of::<Health>().name().ends_with("Health"));
    }

    #[test]
    fn test_boxed_clone_is_deep() {
        let boxed: Box<dyn DynComponent> = Box::new(Health(10));
        let mut copy = boxed.clone();
        copy.downcast_mut::<Health>().unwrap().0 = 3;

        assert_eq!(boxed.downcast_ref::<Health>(), Some(&Health(10)));
        assert_eq!(copy.downcast_ref::<Health>(), Some(&Health(3)));
    }

    #[test]
    fn test_motion_capability_dispatch() {
        let mut body: Box<dyn DynComponent> = Box::new(Body { velocity: 4.0 });
        let mut health: Box<dyn DynComponent> = Box::new(Health(1));

        assert!(health.motion_mut().is_none());
        body.motion_mut().unwrap().reset_motion();
        assert_eq!(body.downcast_ref::<Body>().unwrap().velocity, 0.0);
    }
}
