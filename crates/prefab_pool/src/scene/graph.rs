//! Scene storage: live objects, their hierarchy, and registered templates

use crate::foundation::collections::{ObjectId, SlotMap, TemplateId};
use crate::foundation::math::Transform;
use crate::scene::component::{Component, DynComponent};
use crate::scene::object::{ComponentAddr, GameObject};
use crate::scene::template::{Template, TemplateNode};

fn spawn_node(
    objects: &mut SlotMap<ObjectId, GameObject>,
    node: &TemplateNode,
    parent: Option<ObjectId>,
) -> ObjectId {
    let mut object = GameObject::new(node.name.clone(), node.transform.clone());
    object.parent = parent;
    object.components = node.components().to_vec();
    let id = objects.insert(object);

    for child in node.children() {
        let child_id = spawn_node(objects, child, Some(id));
        if let Some(object) = objects.get_mut(id) {
            object.children.push(child_id);
        }
    }
    id
}

/// Container for live objects and the templates they are cloned from
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, GameObject>,
    templates: SlotMap<TemplateId, Template>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // --- templates -------------------------------------------------------

    /// Register a template and return its handle
    pub fn add_template(&mut self, template: impl Into<Template>) -> TemplateId {
        let template = template.into();
        log::debug!("Registered template '{}'", template.name());
        self.templates.insert(template)
    }

    /// Unregister a template; its handle becomes invalid
    pub fn remove_template(&mut self, id: TemplateId) -> Option<Template> {
        self.templates.remove(id)
    }

    /// Look up a template
    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Find a template by name
    pub fn find_template(&self, name: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .find(|(_, template)| template.name() == name)
            .map(|(id, _)| id)
    }

    /// Deep-copy a template into new live objects and return the root
    ///
    /// The new root is active, unparented, and placed at the template's
    /// local transform.
    pub fn instantiate_template(&mut self, id: TemplateId) -> Option<ObjectId> {
        let template = self.templates.get(id)?;
        Some(spawn_node(&mut self.objects, template.root(), None))
    }

    // --- objects ---------------------------------------------------------

    /// Create an empty, active, unparented object
    pub fn spawn(&mut self, name: impl Into<String>) -> ObjectId {
        self.objects.insert(GameObject::new(name, Transform::default()))
    }

    /// Whether the handle still refers to a live object
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Access an object
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(id)
    }

    /// Mutable access to an object
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(id)
    }

    /// Discard an object and all its descendants
    ///
    /// This is the raw disposal path: nothing is recycled, and any pool that
    /// still tracks the object will find a dead handle later.
    pub fn despawn(&mut self, id: ObjectId) -> bool {
        let Some(parent) = self.objects.get(id).map(GameObject::parent) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.retain(|&child| child != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(object) = self.objects.remove(current) {
                stack.extend(object.children);
            }
        }
        true
    }

    /// Show or hide an object
    pub fn set_active(&mut self, id: ObjectId, active: bool) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => {
                object.active = active;
                true
            }
            None => false,
        }
    }

    /// Whether the object itself is active
    pub fn is_active(&self, id: ObjectId) -> bool {
        self.objects.get(id).is_some_and(GameObject::is_active)
    }

    /// Whether the object and all its ancestors are active
    pub fn is_active_in_hierarchy(&self, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(object) = current.and_then(|c| self.objects.get(c)) {
            if !object.active {
                return false;
            }
            current = object.parent;
        }
        current.is_none() && self.contains(id)
    }

    /// Parent of an object
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(id).and_then(GameObject::parent)
    }

    /// Children of an object (empty if the object is gone)
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.objects.get(id).map_or(&[], GameObject::children)
    }

    /// Transform of an object in world space
    pub fn world_transform(&self, id: ObjectId) -> Option<Transform> {
        self.world_matrix(id).map(|m| Transform::from_matrix(&m))
    }

    fn world_matrix(&self, id: ObjectId) -> Option<crate::foundation::math::Mat4> {
        let object = self.objects.get(id)?;
        let local = object.transform.to_matrix();
        match object.parent {
            Some(parent) => self.world_matrix(parent).map(|p| p * local),
            None => Some(local),
        }
    }

    /// Move an object under a new parent (or to the root with `None`)
    ///
    /// With `keep_world` the object's world transform is preserved and its
    /// local transform recomputed; otherwise the local transform is kept as
    /// is. Refuses to create cycles.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>, keep_world: bool) -> bool {
        if !self.contains(child) {
            return false;
        }
        if let Some(parent) = parent {
            if !self.contains(parent) || self.is_ancestor_or_self(child, parent) {
                return false;
            }
        }

        let world = if keep_world { self.world_matrix(child) } else { None };

        if let Some(old_parent) = self.parent(child).and_then(|p| self.objects.get_mut(p)) {
            old_parent.children.retain(|&c| c != child);
        }
        if let Some(new_parent) = parent.and_then(|p| self.objects.get_mut(p)) {
            new_parent.children.push(child);
        }

        let parent_world = parent.and_then(|p| self.world_matrix(p));
        if let Some(object) = self.objects.get_mut(child) {
            object.parent = parent;
            if let Some(world) = world {
                let local = match parent_world.and_then(|p| p.try_inverse()) {
                    Some(inverse) => inverse * world,
                    None => world,
                };
                object.transform = Transform::from_matrix(&local);
            }
        }
        true
    }

    fn is_ancestor_or_self(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    // --- components ------------------------------------------------------

    /// Addresses of every component under `root`, depth first
    ///
    /// Matches [`TemplateNode::components_depth_first`] for objects cloned
    /// from a template.
    pub fn component_addresses(&self, root: ObjectId) -> Vec<ComponentAddr> {
        let mut out = Vec::new();
        self.collect_addresses(root, &mut out);
        out
    }

    fn collect_addresses(&self, id: ObjectId, out: &mut Vec<ComponentAddr>) {
        let Some(object) = self.objects.get(id) else {
            return;
        };
        out.extend((0..object.components.len()).map(|index| ComponentAddr { object: id, index }));
        for &child in &object.children {
            self.collect_addresses(child, out);
        }
    }

    /// Component at an address
    pub fn component_at(&self, addr: ComponentAddr) -> Option<&dyn DynComponent> {
        self.objects
            .get(addr.object)?
            .components
            .get(addr.index)
            .map(|c| &**c)
    }

    /// Component at an address, mutably
    pub fn component_at_mut(&mut self, addr: ComponentAddr) -> Option<&mut (dyn DynComponent + 'static)> {
        self.objects
            .get_mut(addr.object)?
            .components
            .get_mut(addr.index)
            .map(|c| &mut **c)
    }

    /// First component of type `C` on an object
    pub fn component<C: Component>(&self, id: ObjectId) -> Option<&C> {
        self.objects.get(id)?.component::<C>()
    }

    /// First component of type `C` on an object, mutably
    pub fn component_mut<C: Component>(&mut self, id: ObjectId) -> Option<&mut C> {
        self.objects.get_mut(id)?.component_mut::<C>()
    }

    /// First component of type `C` anywhere under `root`, depth first
    pub fn component_in_tree<C: Component>(&self, root: ObjectId) -> Option<&C> {
        self.component_addresses(root)
            .into_iter()
            .find_map(|addr| self.component_at(addr)?.downcast_ref::<C>())
    }

    /// Run `f` on every component under `root`, depth first
    pub fn for_each_component_mut(&mut self, root: ObjectId, mut f: impl FnMut(&mut dyn DynComponent)) {
        for addr in self.component_addresses(root) {
            if let Some(component) = self.component_at_mut(addr) {
                f(component);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Vec3};
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(u32);

    impl Component for Tag {}

    fn tree_template() -> Template {
        Template::new(
            TemplateNode::new("ship")
                .with_transform(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))
                .with_component(Tag(1))
                .with_child(TemplateNode::new("turret").with_component(Tag(2)))
                .with_child(TemplateNode::new("engine").with_component(Tag(3))),
        )
    }

    #[test]
    fn test_instantiate_template_clones_tree() {
        let mut scene = Scene::new();
        let template = scene.add_template(tree_template());

        let root = scene.instantiate_template(template).unwrap();
        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.children(root).len(), 2);
        assert_eq!(scene.object(root).unwrap().name, "ship");
        assert_eq!(scene.object(root).unwrap().transform.position, Vec3::new(0.0, 1.0, 0.0));

        let tags: Vec<u32> = scene
            .component_addresses(root)
            .into_iter()
            .map(|addr| scene.component_at(addr).unwrap().downcast_ref::<Tag>().unwrap().0)
            .collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn test_instances_do_not_share_components() {
        let mut scene = Scene::new();
        let template = scene.add_template(tree_template());
        let a = scene.instantiate_template(template).unwrap();
        let b = scene.instantiate_template(template).unwrap();

        scene.component_mut::<Tag>(a).unwrap().0 = 99;
        assert_eq!(scene.component::<Tag>(b), Some(&Tag(1)));
    }

    #[test]
    fn test_despawn_removes_descendants() {
        let mut scene = Scene::new();
        let template = scene.add_template(tree_template());
        let root = scene.instantiate_template(template).unwrap();
        let child = scene.children(root)[0];

        assert!(scene.despawn(root));
        assert!(!scene.contains(root));
        assert!(!scene.contains(child));
        assert_eq!(scene.object_count(), 0);
        assert!(!scene.despawn(root));
    }

    #[test]
    fn test_removed_template_cannot_be_instantiated() {
        let mut scene = Scene::new();
        let template = scene.add_template(tree_template());
        assert_eq!(scene.find_template("ship"), Some(template));

        scene.remove_template(template);
        assert!(scene.instantiate_template(template).is_none());
        assert!(scene.find_template("ship").is_none());
    }

    #[test]
    fn test_set_parent_keeps_world_position() {
        let mut scene = Scene::new();
        let parent = scene.spawn("parent");
        scene.object_mut(parent).unwrap().transform =
            Transform::from_position_rotation(Vec3::new(10.0, 0.0, 0.0), Quat::identity());
        let child = scene.spawn("child");
        scene.object_mut(child).unwrap().transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));

        assert!(scene.set_parent(child, Some(parent), true));
        let world = scene.world_transform(child).unwrap();
        assert_relative_eq!(world.position, Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-5);
        assert_relative_eq!(
            scene.object(child).unwrap().transform.position,
            Vec3::new(-9.0, 2.0, 3.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_set_parent_local_space() {
        let mut scene = Scene::new();
        let parent = scene.spawn("parent");
        scene.object_mut(parent).unwrap().transform = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        let child = scene.spawn("child");
        scene.object_mut(child).unwrap().transform = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));

        assert!(scene.set_parent(child, Some(parent), false));
        let world = scene.world_transform(child).unwrap();
        assert_relative_eq!(world.position, Vec3::new(11.0, 0.0, 0.0), epsilon = 1e-5);
        assert_eq!(scene.children(parent), &[child]);
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        assert!(scene.set_parent(b, Some(a), false));
        assert!(!scene.set_parent(a, Some(b), false));
        assert!(!scene.set_parent(a, Some(a), false));
    }

    #[test]
    fn test_active_in_hierarchy() {
        let mut scene = Scene::new();
        let parent = scene.spawn("parent");
        let child = scene.spawn("child");
        scene.set_parent(child, Some(parent), false);

        assert!(scene.is_active_in_hierarchy(child));
        scene.set_active(parent, false);
        assert!(scene.is_active(child));
        assert!(!scene.is_active_in_hierarchy(child));
    }
}
