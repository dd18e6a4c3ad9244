//! Registry

use crate::queue::tube::{Tube, TubeOptions, TubeStats};
use crate::task::{Task, TaskId};
use crate::TubeQueueError;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Name to tube mapping shared by every producer and consumer
///
/// Constructed explicitly and passed around by reference, so independent
/// registries can live side by side.
#[derive(Default)]
pub struct TubeRegistry {
    tubes: DashMap<String, Arc<Tube>>,
    default_options: TubeOptions,
}

impl TubeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry whose tubes default to `options`
    pub fn with_default_options(options: TubeOptions) -> Self {
        Self {
            tubes: DashMap::new(),
            default_options: options,
        }
    }

    /// Build a registry from configuration
    pub fn from_config(config: &crate::Config) -> Self {
        Self::with_default_options(TubeOptions::with_capacity(config.max_tasks_per_tube))
    }

    /// Create a tube, or return the existing one with that name
    ///
    /// Options are only applied when the tube is actually created; at most
    /// one tube is ever constructed per name.
    pub fn create_tube(
        &self,
        name: &str,
        options: Option<TubeOptions>,
    ) -> crate::Result<Arc<Tube>> {
        if name.is_empty() {
            return Err(TubeQueueError::InvalidArgument(
                "tube name must not be empty".to_string(),
            ));
        }
        let tube = self
            .tubes
            .entry(name.to_string())
            .or_insert_with(|| {
                let options = options.unwrap_or_else(|| self.default_options.clone());
                info!("Tube {} created ({:?})", name, options);
                Arc::new(Tube::new(name, options))
            })
            .clone();
        Ok(tube)
    }

    /// Look up a tube by name
    pub fn tube(&self, name: &str) -> crate::Result<Arc<Tube>> {
        self.tubes
            .get(name)
            .map(|tube| Arc::clone(tube.value()))
            .ok_or_else(|| TubeQueueError::TubeNotFound(name.to_string()))
    }

    /// Remove and close a tube; its blocked takers fail with `TubeNotFound`
    pub fn drop_tube(&self, name: &str) -> crate::Result<()> {
        let (_, tube) = self
            .tubes
            .remove(name)
            .ok_or_else(|| TubeQueueError::TubeNotFound(name.to_string()))?;
        tube.close();
        info!("Tube {} dropped", name);
        Ok(())
    }

    /// Names of all tubes, sorted
    pub fn tube_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tubes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Put a task into the named tube
    pub fn put(
        &self,
        tube: &str,
        payload: serde_json::Value,
        priority: i64,
    ) -> crate::Result<TaskId> {
        self.tube(tube)?.put(payload, priority)
    }

    /// Take a task from the named tube, see [`Tube::take`]
    pub async fn take(&self, tube: &str, timeout: Option<Duration>) -> crate::Result<Option<Task>> {
        let tube = self.tube(tube)?;
        tube.take(timeout).await
    }

    /// Delete a task from the named tube
    pub fn delete(&self, tube: &str, id: &TaskId) -> crate::Result<Task> {
        self.tube(tube)?.delete(id)
    }

    /// Release a leased task in the named tube
    pub fn release(&self, tube: &str, id: &TaskId) -> crate::Result<()> {
        self.tube(tube)?.release(id)
    }

    /// Statistics of the named tube
    pub fn stats(&self, tube: &str) -> crate::Result<TubeStats> {
        Ok(self.tube(tube)?.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_apply_to_new_tubes() {
        let registry = TubeRegistry::with_default_options(TubeOptions::with_capacity(3));
        let tube = registry.create_tube("jobs", None).unwrap();
        assert_eq!(tube.options().capacity, Some(3));

        let custom = registry
            .create_tube("other", Some(TubeOptions::default()))
            .unwrap();
        assert_eq!(custom.options().capacity, None);
    }
}
