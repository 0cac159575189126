//! Confirmation flows: transaction attachment and reward-mint references.
//!
//! Every confirmation is guarded by the same rule: the first successful
//! write wins, and an unset field is the only writable one. Proof-submission
//! hashes reject a second write (`Conflict`); mint references treat repeats
//! as idempotent no-ops.

use serde::Deserialize;

use super::{next_tx_confirm_stage, snapshot_for, ProgressSnapshot, Stage};
use crate::error::{CoreError, Result};
use crate::model::{normalize_address, MilestoneId, Milestones, TxAttachment};
use crate::reflection::ReflectionGenerator;
use crate::storage::Store;

use super::ChallengeService;

/// `tx_confirm` request: attach proof-submission details to a log.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxConfirmRequest {
    pub log_id: String,
    pub address: String,
    pub tx_hash: String,
    pub chain_id: i64,
    pub contract_address: String,
    pub block_number: Option<i64>,
}

/// Day-reward mint confirmation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMintRequest {
    pub address: String,
    pub log_id: String,
    pub tx_hash: String,
}

/// Milestone mint confirmation. `milestone_id` is the external id 1..=3.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneConfirmRequest {
    pub address: String,
    pub milestone_id: u8,
    pub tx_hash: String,
}

/// Final badge confirmation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalConfirmRequest {
    pub address: String,
    pub tx_hash: String,
}

impl<S: Store, G: ReflectionGenerator> ChallengeService<S, G> {
    /// Run the `tx_confirm` flow: attach, then recompute.
    ///
    /// # Errors
    /// `NotFound` for an unknown or foreign log id; `Conflict` when a
    /// transaction hash is already attached.
    pub fn confirm_tx(&mut self, req: TxConfirmRequest) -> Result<ProgressSnapshot> {
        let address = normalize_address(&req.address)?;
        let mut stage = Stage::AttachTx;
        let mut snapshot = None;
        loop {
            tracing::debug!(flow = "tx_confirm", stage = ?stage, log_id = %req.log_id, "stage");
            match stage {
                Stage::AttachTx => {
                    let log = self
                        .store
                        .find_log_by_id(&req.log_id)?
                        .filter(|l| l.address == address)
                        .ok_or_else(|| {
                            CoreError::NotFound(format!("log {} not found", req.log_id))
                        })?;
                    let attachment = TxAttachment {
                        tx_hash: req.tx_hash.clone(),
                        chain_id: req.chain_id,
                        contract_address: req.contract_address.clone(),
                        block_number: req.block_number,
                    };
                    self.store.attach_tx(&log.id, &attachment)?;
                }
                Stage::RecomputeProgress => {
                    snapshot = Some(self.snapshot_now(&address)?);
                }
                _ => {
                    return Err(CoreError::Internal(format!(
                        "stage {stage:?} does not belong to the tx_confirm flow"
                    )))
                }
            }
            match next_tx_confirm_stage(stage) {
                Some(next) => stage = next,
                None => break,
            }
        }
        snapshot.ok_or_else(|| {
            CoreError::Internal("tx_confirm flow finished without a snapshot".to_string())
        })
    }

    /// Attach a day-reward mint reference. Idempotent: repeats return the
    /// stored state without counting again.
    pub fn confirm_day_mint(&mut self, req: DayMintRequest) -> Result<ProgressSnapshot> {
        let address = normalize_address(&req.address)?;
        let log = self
            .store
            .find_log_by_id(&req.log_id)?
            .filter(|l| l.address == address)
            .ok_or_else(|| CoreError::NotFound(format!("log {} not found", req.log_id)))?;
        self.store.attach_day_mint(&log.id, &req.tx_hash)?;
        self.snapshot_now(&address)
    }

    /// Attach a milestone mint reference. Idempotent no-op when already
    /// set; returns the stored references either way.
    pub fn confirm_milestone(&mut self, req: MilestoneConfirmRequest) -> Result<Milestones> {
        let address = normalize_address(&req.address)?;
        let id = MilestoneId::from_external_id(req.milestone_id)?;
        self.store.attach_milestone(&address, id, &req.tx_hash)
    }

    /// Record the final badge mint. Idempotent.
    pub fn confirm_final(&mut self, req: FinalConfirmRequest) -> Result<ProgressSnapshot> {
        let address = normalize_address(&req.address)?;
        self.store.attach_final(&address, &req.tx_hash)?;
        self.snapshot_now(&address)
    }

    fn snapshot_now(&self, address: &str) -> Result<ProgressSnapshot> {
        let progress = self
            .store
            .find_progress(address)?
            .ok_or_else(|| CoreError::NotFound(format!("no progress for {address}")))?;
        let logs = self.store.list_logs(address, progress.challenge_id)?;
        let today = crate::dates::date_key_now(&progress.timezone)?;
        Ok(snapshot_for(&progress, &logs, &today))
    }
}
