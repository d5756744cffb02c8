//! Store configuration.
//!
//! Read from environment variables by [`StoreConfig::from_env`]:
//! - `SCHEMADOC_READ_POLICY`: `fill-defaults` (default) or `sparse`
//! - `SCHEMADOC_LINEAGE_POLICY`: `reset` (default) or `reject`
//!
//! Unrecognised values fall back to the default and are logged.

use serde::{Deserialize, Serialize};

pub use schemadoc_core::LineagePolicy;

/// Whether reads materialize schema defaults for untouched properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadPolicy {
    /// Fold a synthetic "create empty root object" entry tagged with the
    /// target schema first, so every declared property shows its default.
    #[default]
    FillDefaults,
    /// Only properties some entry actually wrote are present.
    Sparse,
}

/// Configuration for a [`crate::DocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub read_policy: ReadPolicy,
    pub lineage_policy: LineagePolicy,
}

impl StoreConfig {
    pub const READ_POLICY_VAR: &'static str = "SCHEMADOC_READ_POLICY";
    pub const LINEAGE_POLICY_VAR: &'static str = "SCHEMADOC_LINEAGE_POLICY";

    /// Builds a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = StoreConfig::default();
        if let Some(raw) = lookup(Self::READ_POLICY_VAR) {
            match raw.trim() {
                "fill-defaults" => config.read_policy = ReadPolicy::FillDefaults,
                "sparse" => config.read_policy = ReadPolicy::Sparse,
                other => tracing::warn!(var = Self::READ_POLICY_VAR, value = other, "ignoring unknown read policy"),
            }
        }
        if let Some(raw) = lookup(Self::LINEAGE_POLICY_VAR) {
            match raw.trim() {
                "reset" => config.lineage_policy = LineagePolicy::Reset,
                "reject" => config.lineage_policy = LineagePolicy::Reject,
                other => tracing::warn!(var = Self::LINEAGE_POLICY_VAR, value = other, "ignoring unknown lineage policy"),
            }
        }
        config
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_lineage_policy(mut self, policy: LineagePolicy) -> Self {
        self.lineage_policy = policy;
        self
    }
}
