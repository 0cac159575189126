//! Check-in workflow pipeline.
//!
//! A fixed, small state machine: an enumerated [`Stage`] plus one
//! transition function per flow. Four flows share the stage set --
//! `checkin`, `tx_confirm`, `report_week`, `report_final` -- and each flow
//! carries its own state struct with only the fields its stages touch.
//! Deliberately not a generic graph engine; the topology never changes.

mod checkin;
mod confirm;

pub use checkin::{CheckinRequest, CheckinResponse, CheckinState};
pub use confirm::{DayMintRequest, FinalConfirmRequest, MilestoneConfirmRequest, TxConfirmRequest};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ChallengeConfig;
use crate::dates;
use crate::error::{CoreError, Result};
use crate::model::{normalize_address, DailyLog, Milestones, Progress};
use crate::reflection::ReflectionGenerator;
use crate::report::{self, Report, ReportRange, WEEK_WINDOW};
use crate::storage::Store;
use crate::streaks;
use crate::tasks::{self, DailyTask};

/// Pipeline stages across all flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Task lookup + already-checked-in short-circuit.
    ResolvePrompt,
    /// Whitespace normalization, image reference recording.
    NormalizeInput,
    /// Bounded call into the opaque generator, with fallback.
    GenerateReflection,
    /// Salted commitment + audit hash.
    BuildProof,
    /// Contract-call descriptor for the external client.
    BuildSubmitHint,
    /// Idempotent log insert + progress write, one transaction.
    Persist,
    /// Derived state: streak, completed days, eligibility.
    RecomputeProgress,
    /// `tx_confirm` entry: attach submission details to a log.
    AttachTx,
    /// Report flows: read-only aggregation.
    Aggregate,
}

/// Transition function for the `checkin` flow.
///
/// Linear, with one branch: an existing log short-circuits straight to
/// progress recomputation, skipping every content-generating stage.
pub fn next_checkin_stage(stage: Stage, state: &CheckinState) -> Option<Stage> {
    match stage {
        Stage::ResolvePrompt => {
            if state.already_checked_in {
                Some(Stage::RecomputeProgress)
            } else {
                Some(Stage::NormalizeInput)
            }
        }
        Stage::NormalizeInput => Some(Stage::GenerateReflection),
        Stage::GenerateReflection => Some(Stage::BuildProof),
        Stage::BuildProof => Some(Stage::BuildSubmitHint),
        Stage::BuildSubmitHint => Some(Stage::Persist),
        Stage::Persist => Some(Stage::RecomputeProgress),
        Stage::RecomputeProgress => None,
        // Not part of this flow.
        Stage::AttachTx | Stage::Aggregate => None,
    }
}

/// Transition function for the `tx_confirm` flow: attachment always
/// proceeds to progress recomputation.
pub fn next_tx_confirm_stage(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::AttachTx => Some(Stage::RecomputeProgress),
        _ => None,
    }
}

/// Derived per-participant view returned by most operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub address: String,
    pub challenge_id: i64,
    /// The calendar day this snapshot was computed for.
    pub date_key: String,
    pub start_date_key: String,
    pub timezone: String,
    pub streak: u32,
    pub last_date_key: Option<String>,
    pub completed_days: Vec<u8>,
    pub today_checked_in: bool,
    /// External ids (1, 2, 3) of milestones currently mintable.
    pub eligible_milestones: Vec<u8>,
    pub milestones: Milestones,
    pub day_mint_count: u32,
    pub final_minted: bool,
    pub final_tx_hash: Option<String>,
    pub should_mint_day: bool,
    pub mintable_day_index: Option<u8>,
    pub should_compose_final: bool,
}

/// Build a snapshot from stored state. `date_key` selects which calendar
/// day counts as "today".
fn snapshot_for(progress: &Progress, logs: &[DailyLog], date_key: &str) -> ProgressSnapshot {
    let completed_days = streaks::completed_days(logs);
    let eligible = streaks::eligible_milestones(completed_days.len(), &progress.milestones)
        .into_iter()
        .map(|m| m.external_id())
        .collect();
    let today_log = logs.iter().find(|l| l.date_key == date_key);

    ProgressSnapshot {
        address: progress.address.clone(),
        challenge_id: progress.challenge_id,
        date_key: date_key.to_string(),
        start_date_key: progress.start_date_key.clone(),
        timezone: progress.timezone.clone(),
        streak: progress.streak,
        last_date_key: progress.last_date_key.clone(),
        completed_days,
        today_checked_in: today_log.is_some(),
        eligible_milestones: eligible,
        milestones: progress.milestones.clone(),
        day_mint_count: progress.day_mint_count,
        final_minted: progress.final_minted,
        final_tx_hash: progress.final_tx_hash.clone(),
        should_mint_day: today_log.is_some_and(|l| l.mint_tx_hash.is_none()),
        mintable_day_index: today_log.map(|l| l.day_index),
        should_compose_final: streaks::should_compose_final(progress),
    }
}

/// The service surface over the pipeline.
///
/// Holds the store, the generator and the injected configuration; no
/// process-wide state. One instance per deployment, one call per request.
pub struct ChallengeService<S: Store, G: ReflectionGenerator> {
    store: S,
    generator: G,
    config: ChallengeConfig,
}

impl<S: Store, G: ReflectionGenerator> ChallengeService<S, G> {
    pub fn new(store: S, generator: G, config: ChallengeConfig) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    /// Direct access to the underlying store (read paths, tooling).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Task card for a challenge day.
    pub fn daily_prompt(&self, day_index: u8) -> Result<&'static DailyTask> {
        tasks::task_for_day(day_index)
    }

    /// Current derived state for a participant.
    pub fn progress(&self, address: &str) -> Result<ProgressSnapshot> {
        let address = normalize_address(address)?;
        let progress = self
            .store
            .find_progress(&address)?
            .ok_or_else(|| CoreError::NotFound(format!("no progress for {address}")))?;
        let logs = self.store.list_logs(&address, progress.challenge_id)?;
        let today = dates::date_key_now(&progress.timezone)?;
        Ok(snapshot_for(&progress, &logs, &today))
    }

    /// Report flow: read-only aggregation over the stored logs.
    ///
    /// When a generator is available its summary replaces the rule-based
    /// text; any failure or timeout keeps the template.
    pub async fn report(&self, address: &str, range: ReportRange) -> Result<Report> {
        let address = normalize_address(address)?;
        let streak = self
            .store
            .find_progress(&address)?
            .map(|p| p.streak)
            .unwrap_or(0);
        let logs = self.store.list_logs(&address, self.config.challenge_id)?;
        let window = match range {
            ReportRange::Week => &logs[logs.len().saturating_sub(WEEK_WINDOW)..],
            ReportRange::Final => &logs[..],
        };

        let mut built = report::build_report(window, range, streak);
        let digest = report::ReportDigest {
            total: built.total,
            minted: built.minted,
            streak,
            range,
        };
        match with_timeout(
            self.config.reflection_timeout(),
            self.generator.summarize(&digest),
        )
        .await
        {
            Ok(text) => built.report_text = text,
            Err(e) => {
                tracing::debug!(error = %e, "report summarization degraded, keeping template");
            }
        }
        Ok(built)
    }

    /// Create or update a participant profile.
    ///
    /// Lazily creates the progress row; the timezone and start date are
    /// fixed at creation and later updates leave them untouched.
    pub fn update_profile(
        &mut self,
        address: &str,
        display_name: Option<String>,
        avatar_url: Option<String>,
        timezone: &str,
    ) -> Result<Progress> {
        let address = normalize_address(address)?;
        dates::parse_timezone(timezone)?;
        let start = dates::date_key_now(timezone)?;
        let template = Progress::new(&address, self.config.challenge_id, timezone, &start);
        let mut progress = self.store.ensure_progress(&template)?;
        progress.display_name = display_name;
        progress.avatar_url = avatar_url;
        progress.updated_at = chrono::Utc::now();
        self.store.upsert_progress(&progress)?;
        Ok(progress)
    }
}

/// Bound an external-generation future. Timeouts surface as
/// `UpstreamUnavailable`, like any other generator failure.
pub(crate) async fn with_timeout<T>(
    duration: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::UpstreamUnavailable(format!(
            "generation exceeded {}s",
            duration.as_secs()
        ))),
    }
}
