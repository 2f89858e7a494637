//! Problem domains
//!
//! A domain selects which rule subset and variable catalog apply to a request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TriageError;

/// Top-level problem category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Connectivity, routing, wireless and name resolution problems
    Network,
    /// Hardware and operating-system problems on a single machine
    Computer,
}

impl Domain {
    /// All domains, in catalog order
    pub const ALL: [Domain; 2] = [Domain::Network, Domain::Computer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Network => "Network",
            Domain::Computer => "Computer",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = TriageError;

    /// Accepts the canonical names case-insensitively. Anything else is
    /// rejected here, before a request reaches the engine.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "network" => Ok(Domain::Network),
            "computer" => Ok(Domain::Computer),
            _ => Err(TriageError::UnknownDomain(s.to_string())),
        }
    }
}
