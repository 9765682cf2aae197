//! Templates: the blueprints pooled instances are cloned from

use crate::foundation::math::Transform;
use crate::scene::component::{Component, DynComponent};

/// One node of a template tree
#[derive(Debug, Clone)]
pub struct TemplateNode {
    /// Name given to the object created from this node
    pub name: String,
    /// Local transform of the created object
    pub transform: Transform,
    components: Vec<Box<dyn DynComponent>>,
    children: Vec<TemplateNode>,
}

impl TemplateNode {
    /// Create an empty node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Append a component
    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.components.push(Box::new(component));
        self
    }

    /// Append a child node
    pub fn with_child(mut self, child: TemplateNode) -> Self {
        self.children.push(child);
        self
    }

    /// Components on this node only
    pub fn components(&self) -> &[Box<dyn DynComponent>] {
        &self.components
    }

    /// Direct children
    pub fn children(&self) -> &[TemplateNode] {
        &self.children
    }

    /// Every component of this node and its descendants, depth first
    ///
    /// This is the same order [`Scene::component_addresses`](crate::scene::Scene::component_addresses)
    /// walks an instance in.
    pub fn components_depth_first(&self) -> Vec<&dyn DynComponent> {
        let mut out = Vec::new();
        self.collect_components(&mut out);
        out
    }

    fn collect_components<'a>(&'a self, out: &mut Vec<&'a dyn DynComponent>) {
        for component in &self.components {
            out.push(&**component);
        }
        for child in &self.children {
            child.collect_components(out);
        }
    }
}

/// Immutable blueprint for pooled instances
#[derive(Debug, Clone)]
pub struct Template {
    root: TemplateNode,
}

impl Template {
    /// Wrap a root node
    pub fn new(root: TemplateNode) -> Self {
        Self { root }
    }

    /// Template name (the root node's name)
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// Root node
    pub fn root(&self) -> &TemplateNode {
        &self.root
    }

    /// Local transform instances start with
    pub fn transform(&self) -> &Transform {
        &self.root.transform
    }
}

impl From<TemplateNode> for Template {
    fn from(root: TemplateNode) -> Self {
        Self::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Marker(&'static str);

    impl Component for Marker {}

    #[test]
    fn test_depth_first_order() {
        let template = Template::new(
            TemplateNode::new("root")
                .with_component(Marker("a"))
                .with_child(
                    TemplateNode::new("left")
                        .with_component(Marker("b"))
                        .with_child(TemplateNode::new("leaf").with_component(Marker("c"))),
                )
                .with_child(TemplateNode::new("right").with_component(Marker("d")))
                .with_component(Marker("a2")),
        );

        let order: Vec<&str> = template
            .root()
            .components_depth_first()
            .into_iter()
            .map(|c| c.downcast_ref::<Marker>().unwrap().0)
            .collect();

        assert_eq!(order, vec!["a", "a2", "b", "c", "d"]);
        assert_eq!(template.name(), "root");
    }
}
