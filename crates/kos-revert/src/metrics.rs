//! Prometheus counters for revert outcomes.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Final outcome of a revert attempt, as counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricOutcome {
    /// The revert completed.
    Done,
    /// The revert was refused before anything changed.
    Rejected,
    /// The identity provider refused a compensating call.
    Failed,
    /// The identity provider changed but a later write failed.
    Diverged,
}

impl MetricOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Diverged => "diverged",
        }
    }
}

/// Counters exported by the revert engine.
///
/// Exposes `kos_revert_total{outcome="done|rejected|failed|diverged"}`.
#[derive(Debug, Clone)]
pub struct RevertMetrics {
    registry: Registry,
    total: IntCounterVec,
}

impl RevertMetrics {
    /// Creates the counters in a private registry.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        match Self::with_registry(Registry::new()) {
            Ok(metrics) => metrics,
            Err(e) => unreachable!("fresh registry rejected revert counters: {e}"),
        }
    }

    /// Creates the counters and registers them in `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry already holds a collector with the
    /// same name.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let total = IntCounterVec::new(
            Opts::new("kos_revert_total", "Revert attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(total.clone()))?;
        Ok(Self { registry, total })
    }

    /// Counts one attempt.
    pub fn observe(&self, outcome: MetricOutcome) {
        self.total.with_label_values(&[outcome.as_str()]).inc();
    }

    /// Returns the current count for an outcome.
    #[must_use]
    pub fn count(&self, outcome: MetricOutcome) -> u64 {
        self.total.with_label_values(&[outcome.as_str()]).get()
    }

    /// Returns the registry holding the counters.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders the registry in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for RevertMetrics {
    fn default() -> Self {
        Self::new()
    }
}
