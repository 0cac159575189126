//! The `checkin` flow: one daily submission through the staged pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{next_checkin_stage, snapshot_for, with_timeout, ProgressSnapshot, Stage};
use crate::dates;
use crate::error::{CoreError, Result};
use crate::model::{
    normalize_address, DailyLog, LogStatus, Progress, Reflection, SubmitHint,
};
use crate::proof;
use crate::reflection::{fallback_reflection, ReflectionGenerator};
use crate::storage::{InsertOutcome, Store};
use crate::streaks;
use crate::tasks::{self, DailyTask, CHALLENGE_DAYS};

use super::ChallengeService;

/// Inbound check-in request.
///
/// `date_key` overrides the clock for deterministic callers (demo runs,
/// tests); when absent the day is resolved from the timezone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub address: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub timezone: Option<String>,
    pub date_key: Option<String>,
}

/// Check-in result: the stored log plus recomputed derived state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub log: DailyLog,
    pub already_checked_in: bool,
    /// Present only for a fresh check-in; an already-checked-in reply skips
    /// the content-generating stages.
    pub submit_hint: Option<SubmitHint>,
    pub progress: ProgressSnapshot,
}

/// Mutable state threaded through the `checkin` stages.
///
/// Carries only what this flow's stages read and write.
pub struct CheckinState {
    pub address: String,
    pub challenge_id: i64,
    pub date_key: String,
    pub day_index: u8,
    pub text: String,
    pub image_url: Option<String>,
    pub task: Option<&'static DailyTask>,
    pub normalized_text: String,
    /// Recorded, never processed: image understanding is a deferred
    /// capability, not a failure.
    pub image_note: Option<String>,
    pub reflection: Option<Reflection>,
    pub salt_hex: String,
    pub proof_hash: String,
    pub input_hash: Option<String>,
    pub submit_hint: Option<SubmitHint>,
    pub log: Option<DailyLog>,
    pub already_checked_in: bool,
    pub progress: Progress,
}

impl CheckinState {
    #[cfg(test)]
    pub(crate) fn stub(already_checked_in: bool) -> Self {
        Self {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            challenge_id: 1,
            date_key: "2026-01-01".to_string(),
            day_index: 1,
            text: String::new(),
            image_url: None,
            task: None,
            normalized_text: String::new(),
            image_note: None,
            reflection: None,
            salt_hex: String::new(),
            proof_hash: String::new(),
            input_hash: None,
            submit_hint: None,
            log: None,
            already_checked_in,
            progress: Progress::new(
                "0x0000000000000000000000000000000000000001",
                1,
                "UTC",
                "2026-01-01",
            ),
        }
    }
}

impl<S: Store, G: ReflectionGenerator> ChallengeService<S, G> {
    /// Run the `checkin` flow.
    ///
    /// Guaranteed to persist a log on success even when the generator is
    /// degraded; only invalid input and storage failures surface as errors.
    pub async fn checkin(&mut self, req: CheckinRequest) -> Result<CheckinResponse> {
        let address = normalize_address(&req.address)?;

        let text = req.text.unwrap_or_default();
        if text.trim().is_empty() && req.image_url.is_none() {
            return Err(CoreError::InvalidArgument(
                "text or imageUrl required".to_string(),
            ));
        }

        let timezone = req
            .timezone
            .unwrap_or_else(|| self.config.default_timezone.clone());
        dates::parse_timezone(&timezone)?;
        let date_key = match req.date_key {
            Some(key) => {
                dates::parse_date_key(&key)?;
                key
            }
            None => dates::date_key_now(&timezone)?,
        };

        // Fix start date at first contact; later check-ins keep the stored
        // row untouched.
        let template = Progress::new(&address, self.config.challenge_id, &timezone, &date_key);
        let progress = self.store.ensure_progress(&template)?;

        let offset = dates::diff_days(&progress.start_date_key, &date_key)?;
        let day_index = offset + 1;
        if day_index < 1 {
            return Err(CoreError::InvalidArgument(format!(
                "date {date_key} is before the challenge start {}",
                progress.start_date_key
            )));
        }
        if day_index > i64::from(CHALLENGE_DAYS) {
            return Err(CoreError::InvalidArgument(
                "challenge completed: all 28 days have passed".to_string(),
            ));
        }

        let mut state = CheckinState {
            address,
            challenge_id: self.config.challenge_id,
            date_key,
            day_index: day_index as u8,
            text,
            image_url: req.image_url,
            task: None,
            normalized_text: String::new(),
            image_note: None,
            reflection: None,
            salt_hex: String::new(),
            proof_hash: String::new(),
            input_hash: None,
            submit_hint: None,
            log: None,
            already_checked_in: false,
            progress,
        };

        let mut stage = Stage::ResolvePrompt;
        loop {
            tracing::debug!(flow = "checkin", stage = ?stage, date_key = %state.date_key, "stage");
            self.run_checkin_stage(stage, &mut state).await?;
            match next_checkin_stage(stage, &state) {
                Some(next) => stage = next,
                None => break,
            }
        }

        let log = state.log.take().ok_or_else(|| {
            CoreError::Internal("check-in pipeline finished without a log row".to_string())
        })?;
        let logs = self.store.list_logs(&state.address, state.challenge_id)?;
        let snapshot = snapshot_for(&state.progress, &logs, &state.date_key);

        Ok(CheckinResponse {
            submit_hint: state.submit_hint.take(),
            already_checked_in: state.already_checked_in,
            log,
            progress: snapshot,
        })
    }

    async fn run_checkin_stage(&mut self, stage: Stage, state: &mut CheckinState) -> Result<()> {
        match stage {
            Stage::ResolvePrompt => self.resolve_prompt(state),
            Stage::NormalizeInput => {
                Self::normalize_input(state);
                Ok(())
            }
            Stage::GenerateReflection => self.generate_reflection(state).await,
            Stage::BuildProof => Self::build_proof(state),
            Stage::BuildSubmitHint => {
                self.build_submit_hint(state);
                Ok(())
            }
            Stage::Persist => self.persist(state),
            Stage::RecomputeProgress => self.recompute_progress(state),
            Stage::AttachTx | Stage::Aggregate => Err(CoreError::Internal(format!(
                "stage {stage:?} does not belong to the checkin flow"
            ))),
        }
    }

    fn resolve_prompt(&self, state: &mut CheckinState) -> Result<()> {
        state.task = Some(tasks::task_for_day(state.day_index)?);
        if let Some(existing) =
            self.store
                .find_log_by_key(&state.address, state.challenge_id, &state.date_key)?
        {
            tracing::debug!(log_id = %existing.id, "already checked in, short-circuiting");
            state.log = Some(existing);
            state.already_checked_in = true;
        }
        Ok(())
    }

    fn normalize_input(state: &mut CheckinState) {
        state.normalized_text = proof::normalize_text(&state.text);
        if state.image_url.is_some() {
            state.image_note = Some("image attached, not processed".to_string());
        }
    }

    /// Bounded generator call, before any write transaction is opened.
    /// Every failure path degrades to the fixed neutral reflection.
    async fn generate_reflection(&mut self, state: &mut CheckinState) -> Result<()> {
        let task = state.task.ok_or_else(|| {
            CoreError::Internal("reflection stage reached without a resolved task".to_string())
        })?;
        let generated = with_timeout(
            self.config.reflection_timeout(),
            self.generator.reflect(task, &state.normalized_text),
        )
        .await;
        state.reflection = Some(match generated {
            Ok(reflection) => reflection,
            Err(e) => {
                tracing::warn!(error = %e, "reflection generation degraded, using fallback");
                fallback_reflection()
            }
        });
        Ok(())
    }

    fn build_proof(state: &mut CheckinState) -> Result<()> {
        state.salt_hex = proof::generate_salt_hex()
            .map_err(|e| CoreError::Internal(format!("entropy source failed: {e}")))?;
        state.proof_hash =
            proof::compute_proof_hash(&state.date_key, &state.normalized_text, &state.salt_hex);
        if !state.normalized_text.is_empty() {
            state.input_hash = Some(proof::sha256_hex(&state.normalized_text));
        }
        Ok(())
    }

    fn build_submit_hint(&self, state: &mut CheckinState) {
        state.submit_hint = Some(SubmitHint::submit_proof(
            state.day_index,
            &state.proof_hash,
            &self.config.proof_registry_address,
        ));
    }

    /// Speculative insert; a lost race reshapes the response around the
    /// winner's row and discards this caller's generated content.
    fn persist(&mut self, state: &mut CheckinState) -> Result<()> {
        let reflection = state.reflection.clone().ok_or_else(|| {
            CoreError::Internal("persistence stage reached without a reflection".to_string())
        })?;
        let log = DailyLog {
            id: Uuid::new_v4().to_string(),
            address: state.address.clone(),
            challenge_id: state.challenge_id,
            day_index: state.day_index,
            date_key: state.date_key.clone(),
            input_hash: state.input_hash.clone(),
            normalized_text: state.normalized_text.clone(),
            reflection,
            salt_hex: state.salt_hex.clone(),
            proof_hash: state.proof_hash.clone(),
            status: LogStatus::Created,
            tx_hash: None,
            chain_id: None,
            contract_address: None,
            block_number: None,
            mint_tx_hash: None,
            created_at: Utc::now(),
        };

        let mut advanced = state.progress.clone();
        streaks::apply_checkin(&mut advanced, &state.date_key, state.day_index)?;

        match self.store.insert_checkin(&log, &advanced)? {
            InsertOutcome::Created => {
                state.log = Some(log);
                state.progress = advanced;
            }
            InsertOutcome::AlreadyExists(winner) => {
                state.already_checked_in = true;
                state.submit_hint = None;
                state.log = Some(winner);
            }
        }
        Ok(())
    }

    fn recompute_progress(&mut self, state: &mut CheckinState) -> Result<()> {
        // Re-read: under a lost race the winner's progress is the truth.
        if let Some(stored) = self.store.find_progress(&state.address)? {
            state.progress = stored;
        }
        Ok(())
    }
}
