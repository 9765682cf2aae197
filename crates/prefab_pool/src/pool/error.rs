//! Pool configuration errors

use crate::foundation::collections::{PoolId, TemplateId};
use thiserror::Error;

/// Errors that stop a pool operation before any state changes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// The template handle does not refer to a registered template
    #[error("Template {0:?} is not registered in the scene")]
    InvalidTemplate(TemplateId),

    /// The pool is already bound to another template
    #[error("Pool is bound to template {bound:?}; cannot rebind to {requested:?}")]
    AlreadyBound {
        /// Template the pool is bound to
        bound: TemplateId,
        /// Template the caller asked for
        requested: TemplateId,
    },

    /// Another pool already serves this template
    #[error("Template {template:?} is already served by pool {pool:?}")]
    TemplateAlreadyPooled {
        /// The template
        template: TemplateId,
        /// The pool bound to it
        pool: PoolId,
    },

    /// The pool has no template yet
    #[error("Pool {0:?} is not bound to a template")]
    Unbound(PoolId),

    /// The pool handle is unknown to the registry
    #[error("Pool {0:?} does not exist")]
    UnknownPool(PoolId),

    /// The requested placement cannot be applied
    #[error("Invalid placement: {reason}")]
    InvalidPlacement {
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;
