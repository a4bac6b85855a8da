//! Wallet ownership.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::id::{TeamId, UserId};

/// Exclusive owner of a wallet: exactly one user or one team, never both.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner_type", content = "owner_id", rename_all = "snake_case")]
pub enum WalletOwner {
    User(UserId),
    Team(TeamId),
}

impl WalletOwner {
    pub fn owner_type(&self) -> &'static str {
        match self {
            WalletOwner::User(_) => "user",
            WalletOwner::Team(_) => "team",
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            WalletOwner::User(id) => *id.as_uuid(),
            WalletOwner::Team(id) => *id.as_uuid(),
        }
    }

    /// Parse from the `(owner_type, owner_id)` pair used in persisted state
    /// and URL paths.
    pub fn parse(owner_type: &str, owner_id: &str) -> Result<Self, DomainError> {
        match owner_type {
            "user" => Ok(WalletOwner::User(UserId::from_str(owner_id)?)),
            "team" => Ok(WalletOwner::Team(TeamId::from_str(owner_id)?)),
            other => Err(DomainError::validation(format!(
                "owner_type must be 'user' or 'team', got '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for WalletOwner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.owner_type(), self.owner_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        let owner = WalletOwner::User(UserId::new());
        let parsed =
            WalletOwner::parse(owner.owner_type(), &owner.owner_id().to_string()).unwrap();
        assert_eq!(owner, parsed);
    }

    #[test]
    fn parse_rejects_unknown_owner_type() {
        let id = Uuid::now_v7().to_string();
        assert!(WalletOwner::parse("org", &id).is_err());
    }
}
