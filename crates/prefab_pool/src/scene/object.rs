//! Scene objects

use crate::foundation::collections::ObjectId;
use crate::foundation::math::Transform;
use crate::scene::component::{Component, DynComponent};

/// Address of one component inside a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentAddr {
    /// Object carrying the component
    pub object: ObjectId,
    /// Position in that object's component list
    pub index: usize,
}

/// A live object in the scene
#[derive(Debug)]
pub struct GameObject {
    /// Display name
    pub name: String,
    /// Transform relative to the parent (or the world when unparented)
    pub transform: Transform,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) active: bool,
    pub(crate) components: Vec<Box<dyn DynComponent>>,
}

impl GameObject {
    pub(crate) fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            parent: None,
            children: Vec::new(),
            active: true,
            components: Vec::new(),
        }
    }

    /// Parent object, if any
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Direct children
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Whether this object itself is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Components attached to this object
    pub fn components(&self) -> &[Box<dyn DynComponent>] {
        &self.components
    }

    /// Mutable access to the attached components
    pub fn components_mut(&mut self) -> &mut [Box<dyn DynComponent>] {
        &mut self.components
    }

    /// First component of type `C`
    pub fn component<C: Component>(&self) -> Option<&C> {
        self.components.iter().find_map(|c| c.downcast_ref::<C>())
    }

    /// First component of type `C`, mutably
    pub fn component_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components.iter_mut().find_map(|c| c.downcast_mut::<C>())
    }

    /// Attach a component at the end of the list
    pub fn add_component<C: Component>(&mut self, component: C) {
        self.components.push(Box::new(component));
    }

    /// Detach the first component of type `C`
    pub fn remove_component<C: Component>(&mut self) -> Option<C> {
        let index = self.components.iter().position(|c| c.is::<C>())?;
        let boxed = self.components.remove(index);
        boxed.as_any().downcast_ref::<C>().cloned()
    }
}
