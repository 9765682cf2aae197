//! # Prefab Pool
//!
//! Template-driven object recycling for game hosts. Instead of cloning a
//! template and throwing the clone away every time, a [`Pool`] keeps
//! deactivated instances around and hands them out again, writing the
//! template's restorable state back first.
//!
//! ## Features
//!
//! - **Snapshot restore**: component types declare what is reset on reuse
//! - **Warm and cold free lists**: pre-warmed instances skip redundant first-use work
//! - **Delayed release**: schedule recycling at a future clock time
//! - **Registry routing**: find a pool by template, or the owner of any instance
//!
//! ## Quick Start
//!
//! ```rust
//! use prefab_pool::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! struct Ball {
//!     color: &'static str,
//! }
//!
//! impl Component for Ball {
//!     fn restore_policy() -> RestorePolicy<Self> {
//!         RestorePolicy::Fields(vec![prefab_pool::restore_field!(Ball, color)])
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! let ball = scene.add_template(TemplateNode::new("ball").with_component(Ball { color: "red" }));
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut registry = PoolRegistry::new(clock.clone());
//! registry.prewarm(&mut scene, ball, 2)?;
//!
//! let a = registry.instantiate(&mut scene, ball, &Placement::at(Vec3::zeros()))?;
//! scene.component_mut::<Ball>(a).unwrap().color = "blue";
//! registry.destroy(&mut scene, a, -1.0);
//!
//! let b = registry.instantiate(&mut scene, ball, &Placement::at(Vec3::zeros()))?;
//! assert_eq!(scene.component::<Ball>(b).unwrap().color, "red");
//! # Ok::<(), PoolError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod foundation;
pub mod pool;
pub mod scene;

pub use config::{Config, ConfigError, PoolConfig, RegistryConfig, ShapeMismatchPolicy};
pub use pool::{
    DestroyOutcome, Placement, Pool, PoolError, PoolRegistry, PoolResult, ReleaseOutcome, TickReport,
};

/// Common imports for pool users
pub mod prelude {
    pub use crate::{
        config::{Config, PoolConfig, RegistryConfig, ShapeMismatchPolicy},
        foundation::{
            collections::{ObjectId, PoolId, TemplateId},
            math::{Quat, Transform, Vec3},
            time::{Clock, ManualClock, SharedClock, SystemClock},
        },
        pool::{
            DestroyOutcome, InstanceState, Placement, Pool, PoolError, PoolRegistry, PoolStats,
            RegistryStats, ReleaseOutcome, RestoreField, RestorePolicy, TickReport,
        },
        scene::{Component, MotionReset, Scene, Template, TemplateNode},
    };
}

#[cfg(test)]
mod tests;
