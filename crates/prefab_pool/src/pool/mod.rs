//! Object recycling pools
//!
//! - [`snapshot`]: what gets written back onto a reused instance
//! - [`component_cache`]: per-instance component lists lined up with the snapshot
//! - [`schedule`]: delayed releases keyed by due time
//! - [`instance_pool`]: the per-template [`Pool`]
//! - [`registry`]: template and instance routing across pools

pub mod component_cache;
pub mod error;
pub mod instance_pool;
pub mod owners;
pub mod placement;
pub mod registry;
pub mod schedule;
pub mod snapshot;
pub mod stats;

pub use component_cache::{InstanceComponentCache, InstanceComponents};
pub use error::{PoolError, PoolResult};
pub use instance_pool::{InstanceFlags, InstanceState, Pool, ReleaseOutcome, TickReport};
pub use owners::InstanceOwners;
pub use placement::Placement;
pub use registry::{DestroyOutcome, PoolRegistry};
pub use schedule::DelayedDestroySchedule;
pub use snapshot::{ApplyReport, ComponentSnapshot, RestoreField, RestorePolicy, TemplateSnapshot};
pub use stats::{PoolStats, RegistryStats};
