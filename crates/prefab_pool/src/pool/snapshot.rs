//! Template state capture and restore
//!
//! A [`TemplateSnapshot`] is computed once per bound template. It holds, for
//! every component with something to restore, the values read from the
//! template together with type-erased writers that put them back onto a live
//! component of the same type. Component types describe what is restorable
//! through [`Component::restore_policy`]; nothing is discovered at runtime.

use crate::scene::component::{Component, ComponentType, DynComponent};
use crate::scene::template::Template;
use std::any::Any;
use std::fmt;

/// A captured field value
pub type CapturedValue = Box<dyn Any + Send + Sync>;

type ReadFn<C> = Box<dyn Fn(&C) -> CapturedValue + Send + Sync>;
type WriteFn<C> = Box<dyn Fn(&mut C, &dyn Any) -> bool + Send + Sync>;
type ErasedWriteFn = Box<dyn Fn(&mut dyn Any, &dyn Any) -> bool + Send + Sync>;
type ErasedHookFn = Box<dyn Fn(&mut dyn Any) + Send + Sync>;

/// One restorable field of a component type
pub struct RestoreField<C> {
    name: &'static str,
    read: ReadFn<C>,
    write: WriteFn<C>,
}

impl<C: 'static> RestoreField<C> {
    /// Describe a field through a getter and a setter
    ///
    /// Usually built with [`restore_field!`](crate::restore_field).
    pub fn new<V>(name: &'static str, read: fn(&C) -> V, write: fn(&mut C, V)) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        Self {
            name,
            read: Box::new(move |component: &C| -> CapturedValue { Box::new(read(component)) }),
            write: Box::new(move |component: &mut C, value: &dyn Any| match value.downcast_ref::<V>() {
                Some(value) => {
                    write(component, value.clone());
                    true
                }
                None => false,
            }),
        }
    }

    /// Field name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn capture(self, component: &C) -> CapturedField {
        let write = self.write;
        CapturedField {
            name: self.name,
            value: (self.read)(component),
            write: Box::new(move |target: &mut dyn Any, value: &dyn Any| {
                target
                    .downcast_mut::<C>()
                    .is_some_and(|target| write(target, value))
            }),
        }
    }
}

impl<C: Clone + Send + Sync + 'static> RestoreField<C> {
    /// The whole component as a single value
    pub fn whole() -> Self {
        Self::new("<all>", C::clone, |component, value| *component = value)
    }
}

impl<C> fmt::Debug for RestoreField<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreField").field("name", &self.name).finish()
    }
}

/// Which state of a component type is put back on reuse
#[derive(Debug, Default)]
pub enum RestorePolicy<C> {
    /// Nothing is restored
    #[default]
    Nothing,
    /// Every value of the component is restored
    AllValues,
    /// Only the listed fields are restored
    Fields(Vec<RestoreField<C>>),
}

/// Build a [`RestoreField`] for a public (or in-scope) struct field
///
/// ```
/// use prefab_pool::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct Ball {
///     color: [f32; 3],
///     bounces: u32,
/// }
///
/// impl Component for Ball {
///     fn restore_policy() -> RestorePolicy<Self> {
///         RestorePolicy::Fields(vec![prefab_pool::restore_field!(Ball, color)])
///     }
/// }
/// ```
#[macro_export]
macro_rules! restore_field {
    ($ty:ty, $field:ident) => {
        $crate::pool::snapshot::RestoreField::new(
            stringify!($field),
            |component: &$ty| component.$field.clone(),
            |component: &mut $ty, value| component.$field = value,
        )
    };
}

struct CapturedField {
    name: &'static str,
    value: CapturedValue,
    write: ErasedWriteFn,
}

/// Result of applying a component snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Fields written back
    pub written: usize,
    /// Fields that could not be written
    pub skipped: usize,
    /// Whether the re-initialisation hook ran
    pub reinitialised: bool,
}

impl ApplyReport {
    /// Whether the target's shape matched the captured one
    pub fn is_clean(&self) -> bool {
        self.skipped == 0
    }
}

/// Restorable state of one template component
pub struct ComponentSnapshot {
    component_type: ComponentType,
    fields: Vec<CapturedField>,
    reinit: Option<ErasedHookFn>,
}

impl ComponentSnapshot {
    /// Type the values were captured from
    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Names of the captured fields
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Whether a re-initialisation hook is attached
    pub fn has_reinit(&self) -> bool {
        self.reinit.is_some()
    }

    /// Nothing to restore and no hook to run
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.reinit.is_none()
    }

    /// Write the captured values onto `target`
    ///
    /// Order: values, then pending background work is cancelled, then the
    /// re-initialisation hook. Entries whose value cannot be written are
    /// skipped and reported; this never fails.
    pub fn apply(&self, target: &mut dyn DynComponent) -> ApplyReport {
        let mut report = ApplyReport::default();

        if target.component_type() != self.component_type {
            log::warn!(
                "Snapshot of {} applied to a {}; skipping",
                self.component_type.name(),
                target.component_type().name()
            );
            report.skipped = self.fields.len();
            return report;
        }

        for field in &self.fields {
            if (field.write)(target.as_any_mut(), field.value.as_ref()) {
                report.written += 1;
            } else {
                log::warn!(
                    "Could not restore field '{}' of {}",
                    field.name,
                    self.component_type.name()
                );
                report.skipped += 1;
            }
        }

        target.stop_pending_work();

        if let Some(hook) = &self.reinit {
            hook(target.as_any_mut());
            report.reinitialised = true;
        }
        report
    }
}

impl fmt::Debug for ComponentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSnapshot")
            .field("component_type", &self.component_type.name())
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .field("reinit", &self.reinit.is_some())
            .finish()
    }
}

pub(crate) fn capture_component<C: Component>(component: &C) -> ComponentSnapshot {
    let fields = match C::restore_policy() {
        RestorePolicy::Nothing => Vec::new(),
        RestorePolicy::AllValues => vec![RestoreField::<C>::whole()],
        RestorePolicy::Fields(fields) => fields,
    };

    let reinit = C::reinit_hook().map(|hook| -> ErasedHookFn {
        Box::new(move |target: &mut dyn Any| {
            if let Some(target) = target.downcast_mut::<C>() {
                hook(target);
            }
        })
    });

    ComponentSnapshot {
        component_type: ComponentType::of::<C>(),
        fields: fields.into_iter().map(|field| field.capture(component)).collect(),
        reinit,
    }
}

/// Restorable state of a whole template, in depth-first component order
#[derive(Debug, Default)]
pub struct TemplateSnapshot {
    entries: Vec<ComponentSnapshot>,
}

impl TemplateSnapshot {
    /// Capture every component of `template` that has something to restore
    pub fn capture(template: &Template) -> Self {
        let entries: Vec<ComponentSnapshot> = template
            .root()
            .components_depth_first()
            .into_iter()
            .map(|component| component.capture())
            .filter(|snapshot| !snapshot.is_empty())
            .collect();

        log::debug!(
            "Captured {} restorable component(s) from template '{}'",
            entries.len(),
            template.name()
        );
        Self { entries }
    }

    /// Per-component entries
    pub fn entries(&self) -> &[ComponentSnapshot] {
        &self.entries
    }

    /// Component types in capture order
    pub fn component_types(&self) -> impl Iterator<Item = ComponentType> + '_ {
        self.entries.iter().map(ComponentSnapshot::component_type)
    }

    /// Number of component entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No component has anything to restore
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::template::TemplateNode;

    #[derive(Debug, Clone, PartialEq)]
    struct Ball {
        color: &'static str,
        bounces: u32,
        resets: u32,
    }

    impl Component for Ball {
        fn restore_policy() -> RestorePolicy<Self> {
            RestorePolicy::Fields(vec![crate::restore_field!(Ball, color)])
        }

        fn reinit_hook() -> Option<fn(&mut Self)> {
            Some(|ball| ball.resets += 1)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Score(i32);

    impl Component for Score {
        fn restore_policy() -> RestorePolicy<Self> {
            RestorePolicy::AllValues
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Inert;

    impl Component for Inert {}

    #[derive(Debug, Clone, PartialEq)]
    struct Timer {
        pending: bool,
    }

    impl Component for Timer {
        fn restore_policy() -> RestorePolicy<Self> {
            RestorePolicy::AllValues
        }

        fn cancel_pending_work(&mut self) {
            self.pending = false;
        }
    }

    fn ball() -> Ball {
        Ball {
            color: "red",
            bounces: 0,
            resets: 0,
        }
    }

    #[test]
    fn test_capture_prunes_empty_components() {
        let template = Template::new(
            TemplateNode::new("ball")
                .with_component(Inert)
                .with_component(ball())
                .with_child(TemplateNode::new("hud").with_component(Score(7))),
        );

        let snapshot = TemplateSnapshot::capture(&template);
        let types: Vec<ComponentType> = snapshot.component_types().collect();
        assert_eq!(types, vec![ComponentType::of::<Ball>(), ComponentType::of::<Score>()]);
    }

    #[test]
    fn test_apply_restores_only_marked_fields() {
        let snapshot = capture_component(&ball());
        let mut live: Box<dyn DynComponent> = Box::new(Ball {
            color: "blue",
            bounces: 5,
            resets: 0,
        });

        let report = snapshot.apply(live.as_mut());
        assert_eq!(report.written, 1);
        assert!(report.reinitialised);

        let live = live.downcast_ref::<Ball>().unwrap();
        assert_eq!(live.color, "red");
        assert_eq!(live.bounces, 5);
        assert_eq!(live.resets, 1);
    }

    #[test]
    fn test_apply_is_idempotent_on_values() {
        let snapshot = capture_component(&Score(3));
        let mut live: Box<dyn DynComponent> = Box::new(Score(3));

        snapshot.apply(live.as_mut());
        let first = live.downcast_ref::<Score>().cloned();
        snapshot.apply(live.as_mut());
        assert_eq!(live.downcast_ref::<Score>().cloned(), first);
    }

    #[test]
    fn test_apply_cancels_pending_work_after_restore() {
        let snapshot = capture_component(&Timer { pending: true });
        let mut live: Box<dyn DynComponent> = Box::new(Timer { pending: true });

        snapshot.apply(live.as_mut());
        assert_eq!(live.downcast_ref::<Timer>(), Some(&Timer { pending: false }));
    }

    #[test]
    fn test_apply_to_wrong_type_skips() {
        let snapshot = capture_component(&Score(1));
        let mut live: Box<dyn DynComponent> = Box::new(ball());

        let report = snapshot.apply(live.as_mut());
        assert!(!report.is_clean());
        assert_eq!(live.downcast_ref::<Ball>(), Some(&ball()));
    }

    #[test]
    fn test_empty_snapshot_detection() {
        assert!(capture_component(&Inert).is_empty());
        assert!(!capture_component(&ball()).is_empty());
    }
}
