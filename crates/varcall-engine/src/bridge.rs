//! Bridge: owns the stub generator and the call sites it serves
//!
//! Call sites are interned by `(kind, signature)`, the way a JIT keys its
//! vararg cookies and indirect-call stubs by signature. Interned descriptors
//! live as long as the bridge; the table only grows.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use varcall_sdk::{CallSignature, CallSiteKind, StubGenerator};

use crate::config::DispatchConfig;
use crate::site::CallSiteDescriptor;
use crate::stats::{DispatchStats, StatsSnapshot};

/// State every descriptor of one bridge points back to
pub(crate) struct BridgeShared {
    pub(crate) generator: Arc<dyn StubGenerator>,
    pub(crate) config: DispatchConfig,
    pub(crate) stats: DispatchStats,
}

type SiteKey = (CallSiteKind, CallSignature);

/// Entry point for creating dispatchable call sites
pub struct Bridge {
    shared: Arc<BridgeShared>,
    sites: RwLock<FxHashMap<SiteKey, Arc<CallSiteDescriptor>>>,
}

impl Bridge {
    /// Create a bridge with the default configuration
    pub fn new<G: StubGenerator + 'static>(generator: G) -> Self {
        Self::with_config(generator, DispatchConfig::default())
    }

    /// Create a bridge with an explicit configuration
    pub fn with_config<G: StubGenerator + 'static>(generator: G, config: DispatchConfig) -> Self {
        Self::from_shared_generator(Arc::new(generator), config)
    }

    /// Create a bridge around a generator that is shared with other owners
    pub fn from_shared_generator(generator: Arc<dyn StubGenerator>, config: DispatchConfig) -> Self {
        tracing::debug!(
            generator = generator.name(),
            validate_entry_points = config.validate_entry_points,
            record_stats = config.record_stats,
            "bridge created"
        );
        Bridge {
            shared: Arc::new(BridgeShared {
                generator,
                config,
                stats: DispatchStats::new(),
            }),
            sites: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create a fresh, unshared descriptor with an empty cache slot
    pub fn create_site(&self, kind: CallSiteKind, signature: CallSignature) -> Arc<CallSiteDescriptor> {
        Arc::new(CallSiteDescriptor::new(kind, signature, self.shared.clone()))
    }

    /// Descriptor shared by every site with the same kind and signature
    pub fn intern_site(&self, kind: CallSiteKind, signature: CallSignature) -> Arc<CallSiteDescriptor> {
        let key = (kind, signature);
        if let Some(site) = self.sites.read().get(&key) {
            return site.clone();
        }

        let mut sites = self.sites.write();
        sites
            .entry(key)
            .or_insert_with_key(|(kind, signature)| {
                tracing::trace!(%kind, %signature, "interning call site");
                self.create_site(*kind, signature.clone())
            })
            .clone()
    }

    /// Interned variadic call site
    pub fn vararg_site(&self, signature: CallSignature) -> Arc<CallSiteDescriptor> {
        self.intern_site(CallSiteKind::Vararg, signature)
    }

    /// Interned generic indirect call site
    pub fn calli_site(&self, signature: CallSignature) -> Arc<CallSiteDescriptor> {
        self.intern_site(CallSiteKind::GenericCalli, signature)
    }

    /// Number of interned call sites
    pub fn site_count(&self) -> usize {
        self.sites.read().len()
    }

    /// The active configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.shared.config
    }

    /// Name of the stub generator
    pub fn generator_name(&self) -> &str {
        self.shared.generator.name()
    }

    /// Current slow-path counters
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("generator", &self.generator_name())
            .field("config", &self.shared.config)
            .field("sites", &self.site_count())
            .finish()
    }
}
