//! Where an acquired instance goes

use crate::foundation::collections::ObjectId;
use crate::foundation::math::{Quat, Vec3};
use crate::pool::error::{PoolError, PoolResult};
use crate::scene::Scene;

/// Position, rotation and parent for an acquired instance
///
/// Unset position or rotation fall back to the template root's own local
/// values. With a parent, `world_space` decides whether the instance keeps
/// its world placement when attached (`true`) or whether position and
/// rotation are read as local to the parent (`false`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    /// Position, or the template's
    pub position: Option<Vec3>,
    /// Rotation, or the template's
    pub rotation: Option<Quat>,
    /// Object to attach the instance to
    pub parent: Option<ObjectId>,
    /// Keep world placement when attaching to `parent`
    pub world_space: bool,
}

impl Placement {
    /// Use the template's own position and rotation
    pub fn from_template() -> Self {
        Self::default()
    }

    /// Place at `position` with no rotation
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    /// Place at `position` with `rotation`
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position: Some(position),
            rotation: Some(rotation),
            ..Default::default()
        }
    }

    /// Override the rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Attach to `parent` after placement
    pub fn with_parent(mut self, parent: ObjectId, world_space: bool) -> Self {
        self.parent = Some(parent);
        self.world_space = world_space;
        self
    }

    /// Check that the placement can be applied in `scene`
    pub fn validate(&self, scene: &Scene) -> PoolResult<()> {
        if self.position.is_some_and(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(PoolError::InvalidPlacement {
                reason: "position is not finite".to_string(),
            });
        }
        if self
            .rotation
            .is_some_and(|r| !r.coords.iter().all(|c| c.is_finite()))
        {
            return Err(PoolError::InvalidPlacement {
                reason: "rotation is not finite".to_string(),
            });
        }
        if let Some(parent) = self.parent {
            if !scene.contains(parent) {
                return Err(PoolError::InvalidPlacement {
                    reason: format!("parent {parent:?} does not exist"),
                });
            }
        }
        Ok(())
    }
}
