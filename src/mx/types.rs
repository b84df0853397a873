use std::fmt;

/// One mail exchanger worth probing. Lower `priority` is preferred.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxCandidate {
    pub priority: u32,
    pub host: String,
}

impl MxCandidate {
    /// Priority given to records whose preference could not be read.
    pub const UNPARSABLE_PRIORITY: u32 = u32::MAX;

    pub fn new(priority: u32, host: impl Into<String>) -> Self {
        Self {
            priority,
            host: host.into(),
        }
    }
}

impl fmt::Display for MxCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.priority, self.host)
    }
}
