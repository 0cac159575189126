//! Streak and milestone engine.
//!
//! Pure functions over a participant's log set and progress row. Nothing
//! here touches storage; every value is recomputable by replaying the
//! append-only log in date order, which `replay` makes testable as a law.

use std::collections::BTreeSet;

use crate::dates;
use crate::error::Result;
use crate::model::{DailyLog, MilestoneId, Milestones, Progress};

/// Day-mint count at which the final badge becomes composable.
pub const FINAL_MINT_TARGET: u32 = 28;

/// Streak value after a check-in on `date_key`.
///
/// Exactly one calendar day after the last check-in extends the streak; the
/// same day leaves it unchanged (idempotency upstream makes this
/// unreachable for real check-ins); a gap or a first-ever entry resets to 1.
pub fn advance(progress: &Progress, date_key: &str) -> Result<u32> {
    let Some(last) = progress.last_date_key.as_deref() else {
        return Ok(1);
    };
    if last == date_key {
        return Ok(progress.streak);
    }
    if dates::diff_days(last, date_key)? == 1 {
        Ok(progress.streak + 1)
    } else {
        Ok(1)
    }
}

/// Apply a successful check-in to the progress row.
pub fn apply_checkin(progress: &mut Progress, date_key: &str, day_index: u8) -> Result<()> {
    progress.streak = advance(progress, date_key)?;
    progress.last_date_key = Some(date_key.to_string());
    progress.last_day_index = Some(day_index);
    progress.updated_at = chrono::Utc::now();
    Ok(())
}

/// Distinct day indexes across the logs, ascending.
///
/// Deliberately a set, not a count: duplicate day indexes across different
/// calendar dates cannot happen under the uniqueness invariant, but the
/// computation stays correct if that ever changes.
pub fn completed_days(logs: &[DailyLog]) -> Vec<u8> {
    logs.iter()
        .map(|l| l.day_index)
        .collect::<BTreeSet<u8>>()
        .into_iter()
        .collect()
}

/// Milestones that are mintable: threshold reached and still unset.
pub fn eligible_milestones(completed_count: usize, milestones: &Milestones) -> Vec<MilestoneId> {
    MilestoneId::ALL
        .into_iter()
        .filter(|id| completed_count >= id.threshold() && milestones.get(*id).is_none())
        .collect()
}

/// Whether the final badge composition is due.
pub fn should_compose_final(progress: &Progress) -> bool {
    progress.day_mint_count >= FINAL_MINT_TARGET && !progress.final_minted
}

/// Recompute `(streak, last_date_key)` from scratch by replaying logs.
///
/// `logs` must be ordered by date ascending. The result must always match
/// the materialized progress row; tests hold the two together.
pub fn replay(logs: &[DailyLog]) -> Result<(u32, Option<String>)> {
    let mut streak = 0u32;
    let mut last: Option<&str> = None;
    for log in logs {
        streak = match last {
            None => 1,
            Some(prev) if prev == log.date_key => streak,
            Some(prev) if dates::diff_days(prev, &log.date_key)? == 1 => streak + 1,
            Some(_) => 1,
        };
        last = Some(&log.date_key);
    }
    Ok((streak, last.map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogStatus, Reflection};
    use chrono::Utc;

    fn progress_with(streak: u32, last_date_key: Option<&str>) -> Progress {
        let mut p = Progress::new(
            "0x0000000000000000000000000000000000000001",
            1,
            "UTC",
            "2026-01-01",
        );
        p.streak = streak;
        p.last_date_key = last_date_key.map(str::to_string);
        p
    }

    fn make_log(day_index: u8, date_key: &str) -> DailyLog {
        DailyLog {
            id: format!("log-{day_index}-{date_key}"),
            address: "0x0000000000000000000000000000000000000001".to_string(),
            challenge_id: 1,
            day_index,
            date_key: date_key.to_string(),
            input_hash: None,
            normalized_text: String::new(),
            reflection: Reflection {
                note: "n".to_string(),
                next: "x".to_string(),
            },
            salt_hex: "0x00".to_string(),
            proof_hash: format!("0x{:064x}", day_index),
            status: LogStatus::Created,
            tx_hash: None,
            chain_id: None,
            contract_address: None,
            block_number: None,
            mint_tx_hash: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_checkin_starts_streak() {
        let p = progress_with(0, None);
        assert_eq!(advance(&p, "2026-01-01").unwrap(), 1);
    }

    #[test]
    fn consecutive_day_extends() {
        let p = progress_with(3, Some("2026-01-03"));
        assert_eq!(advance(&p, "2026-01-04").unwrap(), 4);
    }

    #[test]
    fn same_day_is_unchanged() {
        let p = progress_with(3, Some("2026-01-03"));
        assert_eq!(advance(&p, "2026-01-03").unwrap(), 3);
    }

    #[test]
    fn gap_resets_to_one() {
        let p = progress_with(3, Some("2026-01-03"));
        assert_eq!(advance(&p, "2026-01-08").unwrap(), 1);
    }

    #[test]
    fn month_boundary_is_consecutive() {
        let p = progress_with(5, Some("2026-01-31"));
        assert_eq!(advance(&p, "2026-02-01").unwrap(), 6);
    }

    #[test]
    fn completed_days_is_a_set() {
        let logs = vec![
            make_log(1, "2026-01-01"),
            make_log(3, "2026-01-03"),
            make_log(3, "2026-01-04"),
            make_log(5, "2026-01-05"),
        ];
        assert_eq!(completed_days(&logs), vec![1, 3, 5]);
    }

    #[test]
    fn eligibility_respects_thresholds_and_set_slots() {
        let empty = Milestones::default();
        assert!(eligible_milestones(6, &empty).is_empty());
        assert_eq!(eligible_milestones(7, &empty), vec![MilestoneId::Seven]);
        assert_eq!(
            eligible_milestones(14, &empty),
            vec![MilestoneId::Seven, MilestoneId::Fourteen]
        );
        assert_eq!(
            eligible_milestones(28, &empty),
            vec![
                MilestoneId::Seven,
                MilestoneId::Fourteen,
                MilestoneId::TwentyEight
            ]
        );

        let mut minted = Milestones::default();
        minted.set_if_unset(MilestoneId::Seven, "0xaaa");
        assert_eq!(
            eligible_milestones(14, &minted),
            vec![MilestoneId::Fourteen]
        );
    }

    #[test]
    fn final_composition_trigger() {
        let mut p = progress_with(0, None);
        assert!(!should_compose_final(&p));
        p.day_mint_count = 28;
        assert!(should_compose_final(&p));
        p.final_minted = true;
        assert!(!should_compose_final(&p));
    }

    #[test]
    fn replay_matches_incremental_updates() {
        let mut p = progress_with(0, None);
        let entries = [
            (1u8, "2026-01-01"),
            (2, "2026-01-02"),
            (3, "2026-01-03"),
            (8, "2026-01-08"),
            (9, "2026-01-09"),
        ];
        let mut logs = Vec::new();
        for (day, key) in entries {
            apply_checkin(&mut p, key, day).unwrap();
            logs.push(make_log(day, key));
        }
        let (replayed_streak, replayed_last) = replay(&logs).unwrap();
        assert_eq!(replayed_streak, p.streak);
        assert_eq!(replayed_last, p.last_date_key);
        assert_eq!(p.streak, 2);
    }

    #[test]
    fn streak_law_three_consecutive_then_gap() {
        let mut p = progress_with(0, None);
        apply_checkin(&mut p, "2026-03-01", 1).unwrap();
        apply_checkin(&mut p, "2026-03-02", 2).unwrap();
        apply_checkin(&mut p, "2026-03-03", 3).unwrap();
        assert_eq!(p.streak, 3);
        apply_checkin(&mut p, "2026-03-06", 6).unwrap();
        assert_eq!(p.streak, 1);
    }
}
