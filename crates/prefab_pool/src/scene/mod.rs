//! Minimal scene host
//!
//! The pool only needs a handful of things from the engine it runs in: a way
//! to clone a template into a live object, show/hide semantics, parenting, and
//! depth-first access to an object's components. [`Scene`] provides exactly
//! that and nothing more; rendering, physics and the rest of an engine stay
//! outside this crate.

pub mod component;
pub mod object;
pub mod template;
mod graph;

pub use component::{Component, ComponentType, DynComponent, MotionReset};
pub use graph::Scene;
pub use object::{ComponentAddr, GameObject};
pub use template::{Template, TemplateNode};
