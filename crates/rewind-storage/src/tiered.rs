//! Tiered routing across storage layers.
//!
//! Layers are ordered by ascending capacity threshold. A write goes to the
//! first layer whose threshold covers the event id, or to the last layer as
//! overflow. Reads ignore thresholds and probe every layer in order, so data
//! written under an older layout is still found.
//!
//! ```text
//! put(id) --> first layer with threshold >= id --(none)--> last layer
//! get(id) --> layer 0 --miss--> layer 1 --miss--> ... --> None
//! ```

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// One storage tier: a backend plus the largest event id routed to it.
pub struct StorageLayer {
    threshold: u64,
    backend: Box<dyn StorageBackend>,
}

impl StorageLayer {
    /// Create a layer that accepts event ids up to and including `threshold`.
    pub fn new(threshold: u64, backend: impl StorageBackend + 'static) -> Self {
        Self {
            threshold,
            backend: Box::new(backend),
        }
    }

    /// Create a layer from an already boxed backend.
    pub const fn from_boxed(threshold: u64, backend: Box<dyn StorageBackend>) -> Self {
        Self { threshold, backend }
    }

    /// The capacity threshold of this layer.
    pub const fn threshold(&self) -> u64 {
        self.threshold
    }

    /// The backend behind this layer.
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }
}

/// Routes checkpoint payloads across an ordered list of [`StorageLayer`]s.
pub struct TieredRouter {
    layers: Vec<StorageLayer>,
}

impl TieredRouter {
    /// Build a router from a non-empty list of layers.
    ///
    /// Layers are sorted by ascending threshold; layers with equal thresholds
    /// keep their given order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if `layers` is empty.
    pub fn new(mut layers: Vec<StorageLayer>) -> Result<Self, StorageError> {
        if layers.is_empty() {
            return Err(StorageError::Config(
                "tiered router needs at least one storage layer".to_owned(),
            ));
        }
        layers.sort_by_key(StorageLayer::threshold);
        Ok(Self { layers })
    }

    /// A router with a single layer that takes every event id.
    pub fn single(backend: impl StorageBackend + 'static) -> Self {
        Self {
            layers: vec![StorageLayer::new(u64::MAX, backend)],
        }
    }

    /// The configured layers, in probe order.
    pub fn layers(&self) -> &[StorageLayer] {
        &self.layers
    }

    /// Index of the layer a write for `event_id` is routed to.
    pub fn layer_for(&self, event_id: u64) -> usize {
        self.layers
            .iter()
            .position(|layer| layer.threshold >= event_id)
            .unwrap_or_else(|| self.layers.len().saturating_sub(1))
    }
}

impl StorageBackend for TieredRouter {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        let index = self.layer_for(event_id);
        let Some(layer) = self.layers.get(index) else {
            return Err(StorageError::write(event_id, "no storage layer configured"));
        };
        layer.backend.put(event_id, payload)?;
        tracing::debug!(
            event_id,
            layer = index,
            backend = layer.backend.name(),
            bytes = payload.len(),
            "Stored checkpoint payload"
        );
        Ok(())
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        for (index, layer) in self.layers.iter().enumerate() {
            if let Some(payload) = layer.backend.get(event_id)? {
                // An empty value counts as a miss for this layer.
                if payload.is_empty() {
                    continue;
                }
                tracing::trace!(event_id, layer = index, "Checkpoint payload hit");
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        for layer in &self.layers {
            layer.backend.remove(event_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStorage;

    fn two_tier() -> (TieredRouter, Arc<MemoryStorage>, Arc<MemoryStorage>) {
        let l1 = Arc::new(MemoryStorage::new());
        let l2 = Arc::new(MemoryStorage::new());
        let router = TieredRouter::new(vec![
            StorageLayer::new(1000, Arc::clone(&l1)),
            StorageLayer::new(5000, Arc::clone(&l2)),
        ])
        .unwrap();
        (router, l1, l2)
    }

    #[test]
    fn empty_layer_list_is_rejected() {
        assert!(TieredRouter::new(Vec::new()).is_err());
    }

    #[test]
    fn routes_by_first_covering_threshold() {
        let (router, l1, l2) = two_tier();
        router.put(1000, b"a").unwrap();
        router.put(1001, b"b").unwrap();
        assert!(l1.contains(1000));
        assert!(!l2.contains(1000));
        assert!(l2.contains(1001));
    }

    #[test]
    fn overflow_goes_to_last_layer() {
        let (router, l1, l2) = two_tier();
        router.put(6000, b"data").unwrap();
        assert!(!l1.contains(6000));
        assert!(l2.contains(6000));
        assert_eq!(router.get(6000).unwrap().as_deref(), Some(&b"data"[..]));
    }

    #[test]
    fn layers_are_sorted_by_threshold() {
        let slow = Arc::new(MemoryStorage::new());
        let fast = Arc::new(MemoryStorage::new());
        let router = TieredRouter::new(vec![
            StorageLayer::new(5000, Arc::clone(&slow)),
            StorageLayer::new(1000, Arc::clone(&fast)),
        ])
        .unwrap();
        assert_eq!(router.layers()[0].threshold(), 1000);
        router.put(10, b"x").unwrap();
        assert!(fast.contains(10));
    }

    #[test]
    fn get_probes_every_layer_in_order() {
        let (router, l1, l2) = two_tier();
        // Written out-of-band into the "wrong" tier, still found.
        l2.put(5, b"late").unwrap();
        assert_eq!(router.get(5).unwrap().as_deref(), Some(&b"late"[..]));

        l1.put(5, b"early").unwrap();
        assert_eq!(router.get(5).unwrap().as_deref(), Some(&b"early"[..]));
    }

    #[test]
    fn empty_payload_counts_as_miss() {
        let (router, l1, l2) = two_tier();
        l1.put(8, b"").unwrap();
        assert_eq!(router.get(8).unwrap(), None);
        l2.put(8, b"real").unwrap();
        assert_eq!(router.get(8).unwrap().as_deref(), Some(&b"real"[..]));
    }

    #[test]
    fn remove_clears_all_layers() {
        let (router, l1, l2) = two_tier();
        l1.put(3, b"a").unwrap();
        l2.put(3, b"b").unwrap();
        router.remove(3).unwrap();
        assert_eq!(router.get(3).unwrap(), None);
    }

    #[test]
    fn single_layer_takes_everything() {
        let router = TieredRouter::single(MemoryStorage::new());
        assert_eq!(router.layer_for(u64::MAX), 0);
        router.put(u64::MAX, b"edge").unwrap();
        assert!(router.get(u64::MAX).unwrap().is_some());
    }
}
