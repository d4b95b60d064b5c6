//! Shared world store for exported resources.

use crate::resource::ManagedResource;
use std::sync::RwLock;

/// Failure reported by a world backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// Backend cannot be reached
    #[error("world unavailable: {reason}")]
    Unavailable {
        /// Backend message
        reason: String,
    },

    /// Backend refused the batch
    #[error("export rejected: {reason}")]
    Rejected {
        /// Backend message
        reason: String,
    },
}

/// Store that exported resources are published to
///
/// The compiler calls [`World::export`] exactly once per pass, with the
/// possibly empty list of exported resources.
pub trait World: Send + Sync {
    /// Publish this host's exported resources
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot accept the batch
    fn export(&self, resources: Vec<ManagedResource>) -> Result<(), WorldError>;
}

/// In-memory world that records every batch
#[derive(Debug, Default)]
pub struct MemoryWorld {
    batches: RwLock<Vec<Vec<ManagedResource>>>,
    failure: Option<WorldError>,
}

impl MemoryWorld {
    /// Create an empty world
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world that rejects every export with the given error
    #[must_use]
    pub fn failing(error: WorldError) -> Self {
        Self {
            batches: RwLock::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// Every batch received so far
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<ManagedResource>> {
        match self.batches.read() {
            Ok(batches) => batches.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of export calls received
    #[must_use]
    pub fn export_count(&self) -> usize {
        self.batches().len()
    }

    /// The most recent batch, empty if nothing was exported yet
    #[must_use]
    pub fn exported(&self) -> Vec<ManagedResource> {
        self.batches().pop().unwrap_or_default()
    }
}

impl World for MemoryWorld {
    fn export(&self, resources: Vec<ManagedResource>) -> Result<(), WorldError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut batches = self.batches.write().map_err(|_| WorldError::Unavailable {
            reason: "store lock poisoned".to_string(),
        })?;
        batches.push(resources);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_batches() {
        let world = MemoryWorld::new();
        assert_eq!(world.export_count(), 0);
        assert!(world.exported().is_empty());

        world.export(Vec::new()).unwrap();
        world
            .export(vec![ManagedResource::new("file", "x")])
            .unwrap();

        assert_eq!(world.export_count(), 2);
        assert_eq!(world.exported().len(), 1);
        assert!(world.batches()[0].is_empty());
    }

    #[test]
    fn test_failing_world() {
        let world = MemoryWorld::failing(WorldError::Rejected {
            reason: "read only".to_string(),
        });
        let err = world.export(Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "export rejected: read only");
        assert_eq!(world.export_count(), 0);
    }

    #[test]
    fn test_world_as_trait_object() {
        let world: std::sync::Arc<dyn World> = std::sync::Arc::new(MemoryWorld::new());
        assert!(world.export(Vec::new()).is_ok());
    }
}
