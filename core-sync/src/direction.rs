use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which store is the source of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    CanonicalToAdmin,
    AdminToCanonical,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::CanonicalToAdmin => "canonical-to-admin",
            Direction::AdminToCanonical => "admin-to-canonical",
        }
    }

    pub fn reverse(&self) -> Self {
        match self {
            Direction::CanonicalToAdmin => Direction::AdminToCanonical,
            Direction::AdminToCanonical => Direction::CanonicalToAdmin,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical-to-admin" => Ok(Direction::CanonicalToAdmin),
            "admin-to-canonical" => Ok(Direction::AdminToCanonical),
            other => Err(SyncError::InvalidDirection {
                value: other.to_string(),
            }),
        }
    }
}
