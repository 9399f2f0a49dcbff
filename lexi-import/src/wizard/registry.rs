//! Wizards in progress, by session id
//!
//! A wizard leaves the registry when it is abandoned, when its import is
//! submitted, or when it has not been touched for longer than the idle
//! timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::wizard::ImportWizard;

/// How often the idle sweep runs, at most
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct Entry {
    wizard: Arc<Mutex<ImportWizard>>,
    last_access: Instant,
}

#[derive(Clone, Default)]
pub struct WizardRegistry {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl WizardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, wizard: ImportWizard) -> Arc<Mutex<ImportWizard>> {
        let id = wizard.id();
        let wizard = Arc::new(Mutex::new(wizard));
        self.entries.write().await.insert(
            id,
            Entry {
                wizard: wizard.clone(),
                last_access: Instant::now(),
            },
        );
        wizard
    }

    /// Wizard by id; resets its idle timer
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<ImportWizard>>> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id)?;
        entry.last_access = Instant::now();
        Some(entry.wizard.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop wizards idle for at least `idle_timeout`, returning how many
    ///
    /// A wizard still referenced by a request in flight is kept.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|id, entry| {
            let keep = entry.last_access.elapsed() < idle_timeout
                || Arc::strong_count(&entry.wizard) > 1;
            if !keep {
                tracing::info!(session_id = %id, "Idle wizard evicted");
            }
            keep
        });
        before - entries.len()
    }

    /// Run [`evict_idle`](Self::evict_idle) periodically in the background
    pub fn spawn_idle_sweep(&self, idle_timeout: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(
                SWEEP_INTERVAL.min(idle_timeout).max(MIN_SWEEP_INTERVAL),
            );
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let evicted = registry.evict_idle(idle_timeout).await;
                if evicted > 0 {
                    let remaining = registry.count().await;
                    tracing::debug!(evicted, remaining, "Idle sweep done");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::MemoryRepository;
    use crate::models::ImportKind;
    use lexi_common::AuthContext;

    async fn wizard() -> ImportWizard {
        ImportWizard::start(
            ImportKind::Legislation,
            Arc::new(MemoryRepository::new()),
            AuthContext::anonymous(),
            10,
        )
        .await
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = WizardRegistry::new();
        let wizard = wizard().await;
        let id = wizard.id();

        registry.insert(wizard).await;
        assert_eq!(registry.count().await, 1);
        assert!(registry.get(id).await.is_some());

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert!(registry.get(id).await.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_recent_wizards() {
        let registry = WizardRegistry::new();
        registry.insert(wizard().await).await;
        registry.insert(wizard().await).await;

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.count().await, 2);

        assert_eq!(registry.evict_idle(Duration::ZERO).await, 2);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_wizard_in_use() {
        let registry = WizardRegistry::new();
        let in_use = registry.insert(wizard().await).await;
        registry.insert(wizard().await).await;

        assert_eq!(registry.evict_idle(Duration::ZERO).await, 1);
        let id = in_use.lock().await.id();
        assert!(registry.get(id).await.is_some());
    }
}
