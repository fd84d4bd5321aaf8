//! Core type definitions for the PeopleDesk portal

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Coarse user category used to pick a default agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular employee, routed to the document Q&A agent by default
    Employee,
    /// HR staff, routed to the candidate-screening agent by default
    Hr,
}

impl UserRole {
    /// Role string as used in the role mapping and session records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Hr => "hr",
        }
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Self::Employee),
            "hr" => Ok(Self::Hr),
            other => Err(Error::invalid_input(format!("invalid role: {other:?}"))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Employee, UserRole::Hr] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_invalid_role_rejected() {
        assert!("manager".parse::<UserRole>().is_err());
        assert!("".parse::<UserRole>().is_err());
    }
}
