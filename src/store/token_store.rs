use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::config::store::{StoreConfig, StoreType};
use crate::store::file_store::FileTokenStore;
use crate::store::token_pair::TokenPair;

/// Persistence boundary for the current token pair.
///
/// Implementations never fail outward: a broken or missing medium reads as
/// "no session" and writes are dropped after logging.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<TokenPair>;
    fn set(&self, pair: &TokenPair);
    fn clear(&self);
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self { inner: RwLock::new(Some(pair)) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<TokenPair> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, pair: &TokenPair) {
        *self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pair.clone());
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Used where no storage medium exists
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTokenStore;

impl TokenStore for NoopTokenStore {
    fn get(&self) -> Option<TokenPair> {
        None
    }

    fn set(&self, _pair: &TokenPair) {
        debug!("noop token store: set ignored");
    }

    fn clear(&self) {}
}

/// Pick the store implementation once, at construction time
pub fn build_token_store(cfg: &StoreConfig) -> Arc<dyn TokenStore> {
    info!("token store: {:?}", cfg.store_type);
    match (cfg.store_type, cfg.path.as_deref()) {
        (StoreType::File, Some(path)) => Arc::new(FileTokenStore::new(path)),
        (StoreType::File, None) => {
            // validator rejects this; degrade instead of panicking
            warn!("token store: file store without path, falling back to noop");
            Arc::new(NoopTokenStore)
        }
        (StoreType::Memory, _) => Arc::new(MemoryTokenStore::new()),
        (StoreType::None, _) => Arc::new(NoopTokenStore),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_replaces_and_clears_wholesale() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());

        store.set(&TokenPair::new("T1", Some("R1".into())));
        store.set(&TokenPair::new("T2", None));
        assert_eq!(store.get(), Some(TokenPair::new("T2", None)));

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn noop_store_never_holds_a_session() {
        let store = NoopTokenStore;
        store.set(&TokenPair::new("T1", None));
        assert!(store.get().is_none());
        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn builder_selects_implementation_from_config() {
        let none = build_token_store(&StoreConfig { store_type: StoreType::None, path: None });
        none.set(&TokenPair::new("T1", None));
        assert!(none.get().is_none());

        let memory = build_token_store(&StoreConfig::default());
        memory.set(&TokenPair::new("T1", None));
        assert_eq!(memory.get().map(|p| p.access_token), Some("T1".to_owned()));
    }
}
