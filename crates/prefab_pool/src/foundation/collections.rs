//! Handle types for stable references
//!
//! All handles are generation-checked slot map keys, so a handle to a
//! discarded object never aliases a newer one that reuses its slot.

pub use slotmap::{SlotMap, SecondaryMap, Key};

slotmap::new_key_type! {
    /// Handle to a live object in a [`Scene`](crate::scene::Scene)
    pub struct ObjectId;

    /// Handle to a template registered in a [`Scene`](crate::scene::Scene)
    pub struct TemplateId;

    /// Handle to a pool owned by a [`PoolRegistry`](crate::pool::PoolRegistry)
    pub struct PoolId;
}
