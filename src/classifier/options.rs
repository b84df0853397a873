use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::smtp::ProbeOptions;

/// What to do with domains on the blacklist.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlacklistPolicy {
    /// Blacklisted, non-whitelisted domains are `Blocklisted` before any
    /// network I/O.
    #[default]
    ShortCircuit,
    /// The list is not consulted; only server wording can yield
    /// `Blocklisted`.
    Ignore,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierOptions {
    pub probe: ProbeOptions,
    pub dns_timeout_ms: u64,
    pub blacklist_policy: BlacklistPolicy,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            probe: ProbeOptions::default(),
            dns_timeout_ms: 5_000,
            blacklist_policy: BlacklistPolicy::default(),
        }
    }
}

impl ClassifierOptions {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms.max(1))
    }
}
