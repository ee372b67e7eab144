//! In-flight order tracking
//!
//! At most one latency-delayed order may be outstanding per asset. The
//! registry is a concurrent set keyed by asset id: `try_acquire` is a single
//! atomic insert-if-absent, and the returned guard removes the key when it is
//! dropped, whichever way the owning task exits.

use dashmap::DashSet;
use std::sync::Arc;

/// Set of assets with an order currently in flight
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    assets: Arc<DashSet<String>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `asset_id` as in flight. Returns `None` if it already is.
    pub fn try_acquire(&self, asset_id: &str) -> Option<InFlightGuard> {
        if self.assets.insert(asset_id.to_string()) {
            Some(InFlightGuard {
                assets: Arc::clone(&self.assets),
                asset_id: asset_id.to_string(),
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, asset_id: &str) -> bool {
        self.assets.contains(asset_id)
    }

    /// Number of assets currently in flight
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Releases the in-flight marker for one asset on drop
#[derive(Debug)]
pub struct InFlightGuard {
    assets: Arc<DashSet<String>>,
    asset_id: String,
}

impl InFlightGuard {
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.assets.remove(&self.asset_id);
    }
}
