//! Domain entities: participant progress and the daily check-in log.
//!
//! `Progress` is the mutable, materialized summary; `DailyLog` rows are the
//! append-only source of truth. Everything on `Progress` must stay
//! derivable by replaying the log set in date order (see `streaks::replay`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// One of the three fixed completion thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneId {
    Seven,
    Fourteen,
    TwentyEight,
}

impl MilestoneId {
    pub const ALL: [MilestoneId; 3] = [
        MilestoneId::Seven,
        MilestoneId::Fourteen,
        MilestoneId::TwentyEight,
    ];

    /// Completed-day count required for this milestone.
    pub fn threshold(self) -> usize {
        match self {
            MilestoneId::Seven => 7,
            MilestoneId::Fourteen => 14,
            MilestoneId::TwentyEight => 28,
        }
    }

    /// External id as exposed to callers ("1", "2", "3").
    pub fn external_id(self) -> u8 {
        match self {
            MilestoneId::Seven => 1,
            MilestoneId::Fourteen => 2,
            MilestoneId::TwentyEight => 3,
        }
    }

    /// Parse an external id.
    ///
    /// # Errors
    /// `InvalidArgument` for ids outside 1..=3.
    pub fn from_external_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(MilestoneId::Seven),
            2 => Ok(MilestoneId::Fourteen),
            3 => Ok(MilestoneId::TwentyEight),
            _ => Err(CoreError::InvalidArgument(format!(
                "milestoneId must be 1, 2 or 3, got {id}"
            ))),
        }
    }
}

/// Transaction references for the three milestones, `None` until minted.
///
/// A fixed-shape struct: every milestone slot always exists, so there is
/// nothing to backfill on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    #[serde(rename = "1")]
    pub seven: Option<String>,
    #[serde(rename = "2")]
    pub fourteen: Option<String>,
    #[serde(rename = "3")]
    pub twenty_eight: Option<String>,
}

impl Milestones {
    pub fn get(&self, id: MilestoneId) -> Option<&str> {
        match id {
            MilestoneId::Seven => self.seven.as_deref(),
            MilestoneId::Fourteen => self.fourteen.as_deref(),
            MilestoneId::TwentyEight => self.twenty_eight.as_deref(),
        }
    }

    /// Set a milestone reference if still unset. First write wins.
    ///
    /// Returns whether the write was applied.
    pub fn set_if_unset(&mut self, id: MilestoneId, tx_hash: &str) -> bool {
        let slot = match id {
            MilestoneId::Seven => &mut self.seven,
            MilestoneId::Fourteen => &mut self.fourteen,
            MilestoneId::TwentyEight => &mut self.twenty_eight,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(tx_hash.to_string());
        true
    }
}

/// Per-participant materialized progress, one row per address+challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub address: String,
    pub challenge_id: i64,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: String,
    /// Calendar date of first contact. Fixed for the life of the challenge.
    pub start_date_key: String,
    /// Consecutive-day count ending at `last_date_key`.
    pub streak: u32,
    pub last_date_key: Option<String>,
    pub last_day_index: Option<u8>,
    pub day_mint_count: u32,
    pub final_minted: bool,
    pub final_tx_hash: Option<String>,
    pub milestones: Milestones,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// Fresh progress row for a participant first seen on `start_date_key`.
    pub fn new(address: &str, challenge_id: i64, timezone: &str, start_date_key: &str) -> Self {
        let now = Utc::now();
        Self {
            address: address.to_string(),
            challenge_id,
            display_name: None,
            avatar_url: None,
            timezone: timezone.to_string(),
            start_date_key: start_date_key.to_string(),
            streak: 0,
            last_date_key: None,
            last_day_index: None,
            day_mint_count: 0,
            final_minted: false,
            final_tx_hash: None,
            milestones: Milestones::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle status of a daily log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Created,
    Submitted,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Created => "CREATED",
            LogStatus::Submitted => "SUBMITTED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "SUBMITTED" => LogStatus::Submitted,
            _ => LogStatus::Created,
        }
    }
}

/// Generated reflection attached to a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// Empathetic response to the day's entry.
    pub note: String,
    /// One small, concrete next action.
    pub next: String,
}

/// One check-in, one row per address+challenge+calendar day.
///
/// Append-only after creation: only the transaction-attachment and
/// reward-mint fields may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: String,
    pub address: String,
    pub challenge_id: i64,
    /// 1-based ordinal within the 28-day challenge.
    pub day_index: u8,
    pub date_key: String,
    /// SHA-256 of the normalized text, absent for empty submissions.
    pub input_hash: Option<String>,
    pub normalized_text: String,
    pub reflection: Reflection,
    pub salt_hex: String,
    pub proof_hash: String,
    pub status: LogStatus,
    pub tx_hash: Option<String>,
    pub chain_id: Option<i64>,
    pub contract_address: Option<String>,
    pub block_number: Option<i64>,
    /// Day-reward mint reference, set at most once.
    pub mint_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Proof-submission transaction details attached via `tx/confirm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxAttachment {
    pub tx_hash: String,
    pub chain_id: i64,
    pub contract_address: String,
    pub block_number: Option<i64>,
}

/// Descriptor of the contract call an external client should perform.
/// The system itself never talks to a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitHint {
    pub method: String,
    pub params: (u8, String),
    pub contract: String,
}

impl SubmitHint {
    /// Hint for submitting a day's proof to the registry contract.
    pub fn submit_proof(day_index: u8, proof_hash: &str, contract: &str) -> Self {
        Self {
            method: "submitProof".to_string(),
            params: (day_index, proof_hash.to_string()),
            contract: contract.to_string(),
        }
    }
}

/// Normalize and validate a participant address: `0x` + 40 hex digits,
/// lowercased.
///
/// # Errors
/// `InvalidArgument` for anything else.
pub fn normalize_address(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let valid = trimmed.len() == 42
        && trimmed.starts_with("0x")
        && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(CoreError::InvalidArgument(format!(
            "invalid address: {address}"
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_first_write_wins() {
        let mut m = Milestones::default();
        assert!(m.set_if_unset(MilestoneId::Seven, "0xaaa"));
        assert!(!m.set_if_unset(MilestoneId::Seven, "0xbbb"));
        assert_eq!(m.get(MilestoneId::Seven), Some("0xaaa"));
        assert_eq!(m.get(MilestoneId::Fourteen), None);
    }

    #[test]
    fn milestone_external_ids_round_trip() {
        for id in MilestoneId::ALL {
            assert_eq!(
                MilestoneId::from_external_id(id.external_id()).unwrap(),
                id
            );
        }
        assert!(MilestoneId::from_external_id(0).is_err());
        assert!(MilestoneId::from_external_id(4).is_err());
    }

    #[test]
    fn milestones_serialize_with_external_keys() {
        let m = Milestones {
            seven: Some("0xaaa".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["1"], "0xaaa");
        assert!(json["2"].is_null());
        assert!(json["3"].is_null());
    }

    #[test]
    fn address_normalization() {
        let addr = normalize_address("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(addr, "0xabcdef0123456789abcdef0123456789abcdef01");
        assert!(normalize_address("0x123").is_err());
        assert!(normalize_address("abcdef0123456789abcdef0123456789abcdef0101").is_err());
        assert!(normalize_address("0xZZcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn status_round_trips() {
        assert_eq!(LogStatus::parse(LogStatus::Submitted.as_str()), LogStatus::Submitted);
        assert_eq!(LogStatus::parse("CREATED"), LogStatus::Created);
        assert_eq!(LogStatus::parse("weird"), LogStatus::Created);
    }
}
