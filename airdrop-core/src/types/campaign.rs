//! Campaign singleton state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Identifier of the single active campaign document
pub const MAIN_CAMPAIGN_ID: &str = "main";

/// Campaign state
///
/// `reserved_slots` counts submissions holding a capacity slot while their
/// transfer is in flight. A reservation either becomes a participant
/// (`current_users += 1`) or is released; `current_users` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub max_users: u32,
    pub current_users: u32,
    #[serde(default)]
    pub reserved_slots: u32,
    /// Reward per participant, kept as an exact decimal
    pub reward_amount: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Create the campaign document from defaults
    pub fn from_defaults(defaults: &CampaignDefaults) -> Self {
        Self {
            id: MAIN_CAMPAIGN_ID.to_string(),
            max_users: defaults.max_users,
            current_users: 0,
            reserved_slots: 0,
            reward_amount: defaults.reward_amount,
            is_active: defaults.is_active,
            created_at: Utc::now(),
        }
    }

    /// Slots taken by rewarded participants and in-flight submissions
    pub fn occupied(&self) -> u32 {
        self.current_users.saturating_add(self.reserved_slots)
    }

    /// The single closure predicate: active and not at capacity
    pub fn is_open(&self) -> bool {
        self.is_active && self.occupied() < self.max_users
    }

    pub fn remaining_spots(&self) -> u32 {
        self.max_users.saturating_sub(self.occupied())
    }

    /// Take one capacity slot if the campaign is open
    pub fn reserve_slot(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.reserved_slots += 1;
        true
    }

    /// Turn one reservation into a counted participant
    pub fn commit_slot(&mut self) {
        self.reserved_slots = self.reserved_slots.saturating_sub(1);
        self.current_users += 1;
    }

    /// Give a reservation back
    pub fn release_slot(&mut self) {
        self.reserved_slots = self.reserved_slots.saturating_sub(1);
    }
}

/// Values used when the campaign document is created lazily
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDefaults {
    pub max_users: u32,
    pub reward_amount: Decimal,
    pub is_active: bool,
}

impl Default for CampaignDefaults {
    fn default() -> Self {
        Self {
            max_users: 5,
            reward_amount: Decimal::new(2, 3),
            is_active: true,
        }
    }
}

impl CampaignDefaults {
    /// Load defaults from environment variables
    ///
    /// Environment variables:
    /// - AIRDROP_MAX_USERS: participant cap
    /// - AIRDROP_REWARD_AMOUNT: reward per participant (decimal string)
    /// - AIRDROP_CAMPAIGN_ACTIVE: whether a fresh campaign accepts entries
    pub fn from_env() -> Self {
        let fallback = Self::default();
        Self {
            max_users: env::var("AIRDROP_MAX_USERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback.max_users),
            reward_amount: env::var("AIRDROP_REWARD_AMOUNT")
                .ok()
                .and_then(|s| Decimal::from_str(s.trim()).ok())
                .unwrap_or(fallback.reward_amount),
            is_active: env::var("AIRDROP_CAMPAIGN_ACTIVE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback.is_active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(max_users: u32) -> Campaign {
        Campaign::from_defaults(&CampaignDefaults {
            max_users,
            ..Default::default()
        })
    }

    #[test]
    fn test_defaults() {
        let defaults = CampaignDefaults::default();
        assert_eq!(defaults.max_users, 5);
        assert_eq!(defaults.reward_amount.to_string(), "0.002");
        assert!(defaults.is_active);
    }

    #[test]
    fn test_reserve_until_full() {
        let mut c = campaign(2);
        assert!(c.reserve_slot());
        assert!(c.reserve_slot());
        assert!(!c.reserve_slot());
        assert!(!c.is_open());
        assert_eq!(c.remaining_spots(), 0);

        c.release_slot();
        assert!(c.is_open());
        c.commit_slot();
        assert_eq!(c.current_users, 1);
        assert_eq!(c.reserved_slots, 0);
    }

    #[test]
    fn test_inactive_campaign_is_closed() {
        let mut c = campaign(10);
        c.is_active = false;
        assert!(!c.is_open());
        assert!(!c.reserve_slot());
    }

    #[test]
    fn test_reward_amount_serializes_as_string() {
        let c = campaign(1);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["reward_amount"], "0.002");
    }
}
