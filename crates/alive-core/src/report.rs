//! Report aggregation over a participant's check-in history.
//!
//! A read-only pipeline: logs in, fixed-shape summary out. Summary text is
//! rule-based by default; when a generator is available the caller may
//! replace it with generated text built from derived counts only -- raw
//! participant text never reaches the summary.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::DailyLog;
use crate::tasks::CHALLENGE_DAYS;

/// Number of logs shown in the recent slice.
pub const RECENT_LOGS: usize = 6;

/// Number of logs a weekly report looks back over.
pub const WEEK_WINDOW: usize = 7;

/// Which report to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRange {
    Week,
    Final,
}

impl ReportRange {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportRange::Week => "week",
            ReportRange::Final => "final",
        }
    }

    /// Parse a caller-supplied range.
    ///
    /// # Errors
    /// `InvalidArgument` for anything but `week` or `final`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "week" => Ok(ReportRange::Week),
            "final" => Ok(ReportRange::Final),
            other => Err(CoreError::InvalidArgument(format!(
                "range must be week or final, got {other}"
            ))),
        }
    }
}

/// Derived counts handed to the generator for summary text.
///
/// Carries no raw participant text by construction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportDigest {
    pub total: usize,
    pub minted: usize,
    pub streak: u32,
    pub range: ReportRange,
}

/// Fixed-shape report returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub report_text: String,
    pub total: usize,
    /// Logs with an attached day-reward mint reference.
    pub minted: usize,
    /// Histogram over day indexes 1..=28 (bucket 0 = day 1).
    pub chart_by_day: Vec<u32>,
    /// Most recent logs, newest first, at most [`RECENT_LOGS`].
    pub recent_logs: Vec<DailyLog>,
    pub range: ReportRange,
}

/// Build a report from logs ordered by date ascending.
///
/// For [`ReportRange::Week`] the caller passes the last-7 slice; for
/// [`ReportRange::Final`] the full set.
pub fn build_report(logs: &[DailyLog], range: ReportRange, streak: u32) -> Report {
    let total = logs.len();
    let minted = logs.iter().filter(|l| l.mint_tx_hash.is_some()).count();

    let mut chart_by_day = vec![0u32; CHALLENGE_DAYS as usize];
    for log in logs {
        if (1..=CHALLENGE_DAYS).contains(&log.day_index) {
            chart_by_day[(log.day_index - 1) as usize] += 1;
        }
    }

    let recent_logs: Vec<DailyLog> = logs.iter().rev().take(RECENT_LOGS).cloned().collect();

    let digest = ReportDigest {
        total,
        minted,
        streak,
        range,
    };

    Report {
        title: match range {
            ReportRange::Week => "Weekly report".to_string(),
            ReportRange::Final => "Final report".to_string(),
        },
        report_text: template_text(&digest),
        total,
        minted,
        chart_by_day,
        recent_logs,
        range,
    }
}

/// Rule-based summary text. Uses counts only, never raw entries.
pub fn template_text(digest: &ReportDigest) -> String {
    if digest.total == 0 {
        return "No check-ins yet. Start on the daily page with one sentence about today."
            .to_string();
    }
    match digest.range {
        ReportRange::Week => format!(
            "You logged {} day(s) in this stretch and attached {} mint reference(s). \
             Your rhythm reads as one small step, then the next. To keep going, keep \
             only the single most important sentence each day.",
            digest.total, digest.minted,
        ),
        ReportRange::Final => format!(
            "You logged {} day(s) across the challenge and attached {} mint \
             reference(s). Closing suggestion: pick the one boundary you most want \
             to keep, write it as a fixed sentence, and reread it weekly.",
            digest.total, digest.minted,
        ),
    }
}
