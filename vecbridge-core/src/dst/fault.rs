//! FaultInjector - Probabilistic Fault Injection
//!
//! `TigerStyle`: Backend failures are declared up front and rolled from a
//! seeded RNG, so a failing chunk in a batch run can be replayed exactly.

use std::collections::HashMap;
use std::sync::Mutex;

use super::rng::DeterministicRng;
use crate::constants::DST_FAULT_PROBABILITY_MAX;

/// Faults a simulated vector backend or embedding service can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    // =========================================================================
    // Write Path
    // =========================================================================
    /// Backend throttles the write (HTTP 429 / RESOURCE_EXHAUSTED)
    WriteRateLimit,
    /// Write does not complete in time
    WriteTimeout,
    /// Backend rejects the payload outright
    WriteRejected,

    // =========================================================================
    // Read Path
    // =========================================================================
    /// Query does not complete in time
    QueryTimeout,
    /// Query fails with a backend error
    QueryFail,

    // =========================================================================
    // Backend
    // =========================================================================
    /// Backend unreachable (5xx, connection refused)
    BackendUnavailable,
    /// Index vanished between calls
    IndexMissing,
    /// No free connection in the pool
    PoolExhausted,

    // =========================================================================
    // Embedding Service
    // =========================================================================
    /// Embedding request does not complete in time
    EmbeddingTimeout,
    /// Embedding service throttles the request
    EmbeddingRateLimit,
}

impl FaultType {
    /// Stable snake_case name, used as the stats key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteRateLimit => "write_rate_limit",
            Self::WriteTimeout => "write_timeout",
            Self::WriteRejected => "write_rejected",
            Self::QueryTimeout => "query_timeout",
            Self::QueryFail => "query_fail",
            Self::BackendUnavailable => "backend_unavailable",
            Self::IndexMissing => "index_missing",
            Self::PoolExhausted => "pool_exhausted",
            Self::EmbeddingTimeout => "embedding_timeout",
            Self::EmbeddingRateLimit => "embedding_rate_limit",
        }
    }

    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::WriteRejected | Self::IndexMissing)
    }
}

/// Configuration for a specific fault.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// The type of fault
    pub fault_type: FaultType,
    /// Probability of injection (0.0 to 1.0)
    pub probability: f64,
    /// Only operations whose name contains this substring are affected
    pub operation_filter: Option<String>,
    /// Stop injecting after this many hits (None = unlimited)
    pub max_injections: Option<u64>,
}

impl FaultConfig {
    /// Create a new fault configuration.
    ///
    /// # Panics
    /// Panics if probability is not in [0, 1].
    #[must_use]
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        // Precondition
        assert!(
            (0.0..=DST_FAULT_PROBABILITY_MAX).contains(&probability),
            "probability must be in [0, {DST_FAULT_PROBABILITY_MAX}], got {probability}"
        );

        Self {
            fault_type,
            probability,
            operation_filter: None,
            max_injections: None,
        }
    }

    /// Restrict the fault to operations containing `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.operation_filter = Some(filter.into());
        self
    }

    /// Cap the number of injections.
    ///
    /// # Panics
    /// Panics if `max` is zero.
    #[must_use]
    pub fn with_max_injections(mut self, max: u64) -> Self {
        // Precondition
        assert!(max > 0, "max_injections must be positive");
        self.max_injections = Some(max);
        self
    }

    fn applies_to(&self, operation: &str) -> bool {
        self.operation_filter
            .as_deref()
            .map_or(true, |filter| operation.contains(filter))
    }
}

/// Fault injector for simulation testing.
///
/// `TigerStyle`:
/// - Faults registered before sharing via Arc
/// - Deterministic through RNG
/// - Per-config hit counts drive `max_injections`
#[derive(Debug)]
pub struct FaultInjector {
    rng: Mutex<DeterministicRng>,
    configs: Vec<FaultConfig>,
    /// Hits per registered config (index-aligned with `configs`)
    hits: Mutex<Vec<u64>>,
}

impl FaultInjector {
    /// Create an injector with no faults registered.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            configs: Vec::new(),
            hits: Mutex::new(Vec::new()),
        }
    }

    /// Register a fault configuration.
    pub fn register(&mut self, config: FaultConfig) {
        self.configs.push(config);
        self.hits.get_mut().expect("hits lock poisoned").push(0);

        // Postcondition
        assert_eq!(
            self.configs.len(),
            self.hits.get_mut().expect("hits lock poisoned").len(),
            "hits must track every config"
        );
    }

    /// Roll every matching config in registration order.
    ///
    /// Returns the first fault that fires, or None.
    pub fn should_inject(&self, operation: &str) -> Option<FaultType> {
        let mut hits = self.hits.lock().expect("hits lock poisoned");

        for (idx, config) in self.configs.iter().enumerate() {
            if !config.applies_to(operation) {
                continue;
            }
            if config.max_injections.is_some_and(|max| hits[idx] >= max) {
                continue;
            }

            let fired = self
                .rng
                .lock()
                .expect("rng lock poisoned")
                .next_bool(config.probability);

            if fired {
                hits[idx] += 1;
                tracing::trace!(
                    operation,
                    fault = config.fault_type.as_str(),
                    "DST: injecting fault"
                );
                return Some(config.fault_type);
            }
        }

        None
    }

    /// Injection counts keyed by fault name.
    #[must_use]
    pub fn injection_stats(&self) -> HashMap<String, u64> {
        let hits = self.hits.lock().expect("hits lock poisoned");
        let mut stats = HashMap::new();
        for (config, count) in self.configs.iter().zip(hits.iter()) {
            *stats
                .entry(config.fault_type.as_str().to_string())
                .or_insert(0) += count;
        }
        stats
    }

    /// Total number of injections across all faults.
    #[must_use]
    pub fn total_injections(&self) -> u64 {
        self.hits.lock().expect("hits lock poisoned").iter().sum()
    }

    /// Zero all hit counts (re-arms `max_injections`).
    pub fn reset_stats(&self) {
        let mut hits = self.hits.lock().expect("hits lock poisoned");
        hits.iter_mut().for_each(|count| *count = 0);
    }
}

/// Builder for `FaultInjector`.
pub struct FaultInjectorBuilder {
    rng: DeterministicRng,
    configs: Vec<FaultConfig>,
}

impl FaultInjectorBuilder {
    /// Create a new builder with the given RNG.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            rng,
            configs: Vec::new(),
        }
    }

    /// Add a fault configuration.
    #[must_use]
    pub fn with_fault(mut self, config: FaultConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Throttling and timeouts on upserts.
    #[must_use]
    pub fn with_write_faults(self, probability: f64) -> Self {
        self.with_fault(
            FaultConfig::new(FaultType::WriteRateLimit, probability).with_filter("upsert"),
        )
        .with_fault(FaultConfig::new(FaultType::WriteTimeout, probability).with_filter("upsert"))
    }

    /// Timeouts and failures on searches.
    #[must_use]
    pub fn with_query_faults(self, probability: f64) -> Self {
        self.with_fault(FaultConfig::new(FaultType::QueryTimeout, probability).with_filter("query"))
            .with_fault(FaultConfig::new(FaultType::QueryFail, probability).with_filter("query"))
    }

    /// Timeouts and throttling on the embedding service.
    #[must_use]
    pub fn with_embedding_faults(self, probability: f64) -> Self {
        self.with_fault(
            FaultConfig::new(FaultType::EmbeddingTimeout, probability).with_filter("embed"),
        )
        .with_fault(
            FaultConfig::new(FaultType::EmbeddingRateLimit, probability).with_filter("embed"),
        )
    }

    /// Build the FaultInjector.
    #[must_use]
    pub fn build(self) -> FaultInjector {
        let mut injector = FaultInjector::new(self.rng);
        for config in self.configs {
            injector.register(config);
        }
        injector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn injector_with(config: FaultConfig) -> FaultInjector {
        FaultInjectorBuilder::new(DeterministicRng::new(42))
            .with_fault(config)
            .build()
    }

    #[test]
    fn test_no_faults_registered() {
        let injector = FaultInjector::new(DeterministicRng::new(42));

        for _ in 0..100 {
            assert!(injector.should_inject("upsert").is_none());
        }
    }

    #[test]
    fn test_always_and_never() {
        let always = injector_with(FaultConfig::new(FaultType::WriteRateLimit, 1.0));
        let never = injector_with(FaultConfig::new(FaultType::WriteRateLimit, 0.0));

        for _ in 0..50 {
            assert_eq!(
                always.should_inject("upsert"),
                Some(FaultType::WriteRateLimit)
            );
            assert!(never.should_inject("upsert").is_none());
        }
    }

    #[test]
    fn test_operation_filter() {
        let injector =
            injector_with(FaultConfig::new(FaultType::QueryTimeout, 1.0).with_filter("query"));

        assert_eq!(
            injector.should_inject("query_dense"),
            Some(FaultType::QueryTimeout)
        );
        assert!(injector.should_inject("upsert").is_none());
    }

    #[test]
    fn test_max_injections_then_reset() {
        let injector = injector_with(
            FaultConfig::new(FaultType::BackendUnavailable, 1.0).with_max_injections(2),
        );

        assert!(injector.should_inject("upsert").is_some());
        assert!(injector.should_inject("upsert").is_some());
        assert!(injector.should_inject("upsert").is_none());

        injector.reset_stats();
        assert_eq!(injector.total_injections(), 0);
        assert!(injector.should_inject("upsert").is_some());
    }

    #[test]
    fn test_first_matching_config_wins() {
        let injector = FaultInjectorBuilder::new(DeterministicRng::new(7))
            .with_fault(FaultConfig::new(FaultType::IndexMissing, 1.0).with_filter("delete"))
            .with_fault(FaultConfig::new(FaultType::WriteRejected, 1.0))
            .build();

        assert_eq!(
            injector.should_inject("delete_vectors"),
            Some(FaultType::IndexMissing)
        );
        assert_eq!(
            injector.should_inject("upsert"),
            Some(FaultType::WriteRejected)
        );
    }

    #[test]
    fn test_injection_stats() {
        let injector = injector_with(FaultConfig::new(FaultType::WriteTimeout, 1.0));

        for _ in 0..3 {
            injector.should_inject("upsert");
        }

        let stats = injector.injection_stats();
        assert_eq!(stats.get("write_timeout"), Some(&3));
        assert_eq!(injector.total_injections(), 3);
    }

    #[test]
    fn test_same_seed_same_rolls() {
        let roll = |seed| {
            let injector = FaultInjectorBuilder::new(DeterministicRng::new(seed))
                .with_write_faults(0.3)
                .build();
            (0..50)
                .map(|_| injector.should_inject("upsert"))
                .collect::<Vec<_>>()
        };

        assert_eq!(roll(99), roll(99));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FaultType::WriteRateLimit.is_transient());
        assert!(FaultType::PoolExhausted.is_transient());
        assert!(!FaultType::WriteRejected.is_transient());
        assert!(!FaultType::IndexMissing.is_transient());
    }

    #[test]
    #[should_panic(expected = "probability must be in")]
    fn test_invalid_probability() {
        let _ = FaultConfig::new(FaultType::QueryFail, 1.5);
    }

    #[test]
    #[should_panic(expected = "max_injections must be positive")]
    fn test_invalid_max_injections() {
        let _ = FaultConfig::new(FaultType::QueryFail, 0.5).with_max_injections(0);
    }

    #[test]
    fn test_arc_sharing() {
        let injector = Arc::new(injector_with(FaultConfig::new(
            FaultType::EmbeddingRateLimit,
            1.0,
        )));
        let injector2 = Arc::clone(&injector);

        assert!(injector.should_inject("embed").is_some());
        assert!(injector2.should_inject("embed").is_some());
        assert_eq!(injector.total_injections(), 2);
    }
}
