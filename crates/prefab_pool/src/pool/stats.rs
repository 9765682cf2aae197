//! Pool counters

/// Statistics for one pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances cloned from the template
    pub created: usize,
    /// Acquisitions served from a free list
    pub reused: usize,
    /// Instances returned to the cold free list
    pub recycled: usize,
    /// Instances dropped for good (pre-warm replacement, rejection, teardown)
    pub discarded: usize,
    /// Disposed instances found on the pool's lists
    pub stale_entries: usize,
    /// Reuses where components no longer lined up with the template
    pub shape_mismatches: usize,
    /// Releases of instances that were free or not owned
    pub misuse_warnings: usize,
    /// Highest number of instances active at once
    pub peak_active: usize,
}

impl PoolStats {
    /// Add another pool's counters (peaks are summed)
    pub fn merge(&mut self, other: &PoolStats) {
        self.created += other.created;
        self.reused += other.reused;
        self.recycled += other.recycled;
        self.discarded += other.discarded;
        self.stale_entries += other.stale_entries;
        self.shape_mismatches += other.shape_mismatches;
        self.misuse_warnings += other.misuse_warnings;
        self.peak_active += other.peak_active;
    }
}

/// Statistics across every pool of a registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of pools
    pub pools: usize,
    /// Instances with a known owning pool
    pub tracked_instances: usize,
    /// Active instances across all pools
    pub active: usize,
    /// Free instances across all pools
    pub cached: usize,
    /// Unpooled instances waiting for a delayed discard
    pub pending_discards: usize,
    /// Summed pool counters
    pub totals: PoolStats,
}
