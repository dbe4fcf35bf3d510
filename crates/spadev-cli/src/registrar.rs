//! A registrar that keeps the target provider for the CLI itself.
//!
//! A real host would hand the provider to its reverse proxy. The CLI has no
//! proxy, so it just holds on to the provider and resolves it once.

use spadev_core::{ProxyTargetProvider, ProxyTargetRegistrar};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Stores the first registered provider.
#[derive(Default)]
pub struct TargetSlot {
    provider: OnceLock<Arc<dyn ProxyTargetProvider>>,
}

impl TargetSlot {
    /// The registered provider, if any.
    pub fn provider(&self) -> Option<Arc<dyn ProxyTargetProvider>> {
        self.provider.get().cloned()
    }
}

impl ProxyTargetRegistrar for TargetSlot {
    fn register(&self, provider: Arc<dyn ProxyTargetProvider>) {
        if self.provider.set(provider).is_err() {
            warn!("A proxy target provider was already registered; ignoring the new one");
        }
    }
}
